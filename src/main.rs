use anyhow::Result;
use clap::Parser;
use static_site_deploy::app::App;
use static_site_deploy::models::Config;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "static-site-deploy")]
#[command(about = "Publish a static site directory to S3 or Akamai Netstorage")]
struct CliArgs {
    /// Local folder holding the built site.
    #[arg(value_name = "LOCAL_FOLDER")]
    local_folder: PathBuf,

    /// Prefix for every uploaded key (overrides DEPLOY_PREFIX).
    #[arg(long)]
    prefix: Option<String>,

    /// Upload to an in-memory output instead of the configured backend.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "static_site_deploy=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    if args.prefix.is_some() {
        config.prefix = args.prefix;
    }

    match App::new(&config, args.dry_run).await {
        Ok(app) => match app.run(&args.local_folder).await {
            Ok(report) => {
                info!(
                    "Deploy complete: {} referenced files, {} HTML pages",
                    report.assets, report.entry_points
                );
                Ok(())
            }
            Err(e) => {
                error!("Deploy failed: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            error!("Failed to initialize output: {}", e);
            std::process::exit(1);
        }
    }
}
