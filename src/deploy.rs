//! Two-phase deployment of a site tree
//!
//! Referenced content (stylesheets, scripts, images, data) is uploaded in full
//! before any HTML page, so a page never becomes reachable ahead of the files
//! it links to. The first failure stops the run; nothing is rolled back.

use crate::mime::content_type_for;
use crate::models::SourceFile;
use crate::output::Output;
use crate::{Error, Result};
use std::path::{Component, Path, PathBuf};
use tokio::fs::File;
use tracing::{error, info};

/// Files partitioned into upload phases, each in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployPlan {
    pub assets: Vec<SourceFile>,
    pub entry_points: Vec<SourceFile>,
}

impl DeployPlan {
    pub fn new(root: &Path, paths: Vec<PathBuf>) -> Result<Self> {
        let mut plan = Self::default();
        for path in paths {
            let key = key_for(root, &path)?;
            let file = SourceFile::new(path, key);
            if file.is_entry_point() {
                plan.entry_points.push(file);
            } else {
                plan.assets.push(file);
            }
        }
        Ok(plan)
    }

    pub fn len(&self) -> usize {
        self.assets.len() + self.entry_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Slash-separated key for `path` relative to `root`.
pub fn key_for(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|_| {
        Error::InvalidPath(format!(
            "{} is not under {}",
            path.display(),
            root.display()
        ))
    })?;

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str().ok_or_else(|| {
                Error::InvalidPath(format!("{} is not valid UTF-8", path.display()))
            })?),
            Component::CurDir => {}
            _ => {
                return Err(Error::InvalidPath(format!(
                    "{} cannot be expressed relative to {}",
                    path.display(),
                    root.display()
                )))
            }
        }
    }

    if parts.is_empty() {
        return Err(Error::InvalidPath(format!(
            "{} has no key relative to {}",
            path.display(),
            root.display()
        )));
    }
    Ok(parts.join("/"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployState {
    NotStarted,
    UploadingAssets,
    UploadingEntryPoints,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeployReport {
    pub assets: usize,
    pub entry_points: usize,
}

/// Drives one deployment against an [`Output`]. Single use.
pub struct Deployer<'a> {
    output: &'a dyn Output,
    state: DeployState,
}

impl<'a> Deployer<'a> {
    pub fn new(output: &'a dyn Output) -> Self {
        Self {
            output,
            state: DeployState::NotStarted,
        }
    }

    pub fn state(&self) -> DeployState {
        self.state
    }

    pub async fn deploy(&mut self, plan: &DeployPlan) -> Result<DeployReport> {
        if self.state != DeployState::NotStarted {
            return Err(Error::Invariant(format!(
                "deployer already used (state {:?})",
                self.state
            )));
        }

        self.state = DeployState::UploadingAssets;
        info!("Uploading {} referenced files", plan.assets.len());
        let assets = self.upload_all(&plan.assets).await?;

        self.state = DeployState::UploadingEntryPoints;
        info!("Uploading {} HTML pages", plan.entry_points.len());
        let entry_points = self.upload_all(&plan.entry_points).await?;

        self.state = DeployState::Done;
        Ok(DeployReport {
            assets,
            entry_points,
        })
    }

    async fn upload_all(&mut self, files: &[SourceFile]) -> Result<usize> {
        for file in files {
            if let Err(e) = self.upload(file).await {
                error!("Deploy stopped at {} during {:?}: {}", file.key, self.state, e);
                self.state = DeployState::Failed;
                return Err(e);
            }
        }
        Ok(files.len())
    }

    async fn upload(&self, file: &SourceFile) -> Result<()> {
        let content_type = content_type_for(&file.path);
        let mut handle = File::open(&file.path).await?;
        self.output
            .put_reader(&file.key, &mut handle, &content_type)
            .await
    }
}
