//! Publisher for static sites
//!
//! Walks a local directory of built site assets and uploads every file to a
//! remote origin store (S3-compatible or Akamai Netstorage). Non-HTML assets
//! are uploaded before HTML pages so that pages never go live ahead of the
//! files they reference.

pub mod app;
pub mod deploy;
pub mod error;
pub mod mime;
pub mod models;
pub mod output;
pub mod walker;

pub use error::{Error, Result};
