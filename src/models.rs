//! Data models and structures
//!
//! Defines the process configuration that selects an output backend and the
//! source file records flowing from the walker into the deployer.

use std::path::PathBuf;

const DEFAULT_S3_REGION: &str = "ap-southeast-2";

/// A local file discovered under the deployment root, with its storage key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub key: String,
}

impl SourceFile {
    pub fn new(path: PathBuf, key: String) -> Self {
        Self { path, key }
    }

    /// HTML documents are entry points; everything else is referenced content.
    pub fn is_entry_point(&self) -> bool {
        self.key.ends_with(".html")
    }
}

/// Backend selection and its settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputConfig {
    S3 {
        bucket: String,
        region: String,
        endpoint: Option<String>,
    },
    Netstorage {
        host: String,
        folder: String,
        key_name: String,
        secret: String,
        base_url: String,
    },
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub output: OutputConfig,
    pub prefix: Option<String>,
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source. Empty values
    /// are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.is_empty());
        let required = |name: &str| {
            var(name).ok_or_else(|| crate::Error::Config(format!("{} not set", name)))
        };

        let output = if let Some(bucket) = var("S3_BUCKET") {
            OutputConfig::S3 {
                bucket,
                region: var("S3_REGION").unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
                endpoint: var("S3_ENDPOINT"),
            }
        } else if let Some(host) = var("NETSTORAGE_HOST") {
            OutputConfig::Netstorage {
                folder: var("NETSTORAGE_FOLDER").unwrap_or_default(),
                key_name: required("NETSTORAGE_UPLOAD_KEY_NAME")?,
                secret: required("NETSTORAGE_UPLOAD_SECRET")?,
                base_url: var("NETSTORAGE_BASE_URL").unwrap_or_else(|| format!("http://{}", host)),
                host,
            }
        } else {
            return Err(crate::Error::Config(
                "Either a netstorage or s3 output should be configured in the env.".to_string(),
            ));
        };

        Ok(Self {
            output,
            prefix: var("DEPLOY_PREFIX"),
        })
    }
}
