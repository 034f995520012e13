//! Application orchestration for publishing a site directory.

use crate::deploy::{DeployPlan, DeployReport, Deployer};
use crate::models::{Config, OutputConfig};
use crate::output::{MockOutput, NetstorageOutput, Output, S3Output};
use crate::walker::walk;
use crate::Result;
use std::path::Path;
use tracing::info;

/// Owns the configured output and publishes directories through it.
pub struct App {
    output: Box<dyn Output>,
}

impl App {
    /// Build an app around an already constructed output.
    ///
    /// Tests and dry runs use this to inject [`MockOutput`].
    pub fn with_output(output: Box<dyn Output>) -> Self {
        Self { output }
    }

    /// Construct the configured backend and install the prefix, if any.
    pub async fn new(config: &Config, dry_run: bool) -> Result<Self> {
        let mut output: Box<dyn Output> = if dry_run {
            info!("Dry run enabled, uploads go to an in-memory output");
            Box::new(MockOutput::new())
        } else {
            match &config.output {
                OutputConfig::S3 {
                    bucket,
                    region,
                    endpoint,
                } => Box::new(
                    S3Output::new(bucket.clone(), region.clone(), endpoint.clone()).await?,
                ),
                OutputConfig::Netstorage {
                    host,
                    folder,
                    key_name,
                    secret,
                    base_url,
                } => Box::new(NetstorageOutput::new(
                    host.clone(),
                    folder.clone(),
                    key_name.clone(),
                    secret.clone(),
                    base_url.clone(),
                )),
            }
        };

        if let Some(prefix) = &config.prefix {
            output.set_prefix(prefix);
        }

        Ok(Self::with_output(output))
    }

    pub fn output(&self) -> &dyn Output {
        self.output.as_ref()
    }

    /// Upload every file under `root`, referenced content first.
    pub async fn run(&self, root: &Path) -> Result<DeployReport> {
        info!(
            "Publishing {} to {}",
            root.display(),
            self.output.describe()
        );

        let plan = DeployPlan::new(root, walk(root)?)?;
        info!(
            "Discovered {} files ({} referenced, {} HTML)",
            plan.len(),
            plan.assets.len(),
            plan.entry_points.len()
        );

        let report = Deployer::new(self.output.as_ref()).deploy(&plan).await?;

        if let Some(first_page) = plan.entry_points.first() {
            info!("Published, e.g. {}", self.output.url_for(&first_page.key));
        }
        Ok(report)
    }
}
