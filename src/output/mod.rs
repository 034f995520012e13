//! Output backends for publishing site files
//!
//! Every backend implements [`Output`]: put an object by key, delete it, and
//! derive a browsable URL for it. Callers treat S3 and Netstorage identically.

pub mod mock;
pub mod netstorage;
pub mod s3;
pub mod signer;

pub use mock::MockOutput;
pub use netstorage::NetstorageOutput;
pub use s3::S3Output;

use crate::Result;
use async_trait::async_trait;
use std::io::SeekFrom;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

/// Byte stream handed to [`Output::put_reader`].
///
/// Streams must be rewindable: a backend seeks to the start before reading,
/// and may replay the body if the transport restarts the request.
pub trait ContentReader: AsyncRead + AsyncSeek + Send + Unpin {}

impl<T> ContentReader for T where T: AsyncRead + AsyncSeek + Send + Unpin {}

#[async_trait]
pub trait Output: Send + Sync {
    /// Install the prefix joined in front of every key. Applies to calls made
    /// after it is set.
    fn set_prefix(&mut self, prefix: &str);

    async fn put_reader(
        &self,
        key: &str,
        content: &mut dyn ContentReader,
        content_type: &str,
    ) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Browsable URL for `key`. Never touches the network.
    fn url_for(&self, key: &str) -> String;

    /// Short description of the destination, for logs.
    fn describe(&self) -> String;
}

/// Rewind `content` and read it to the end.
pub(crate) async fn read_from_start(content: &mut dyn ContentReader) -> Result<Vec<u8>> {
    content.seek(SeekFrom::Start(0)).await?;
    let mut data = Vec::new();
    content.read_to_end(&mut data).await?;
    Ok(data)
}

/// Join slash-separated path segments into a clean relative path.
///
/// Empty segments, repeated separators and `.` are dropped and `..` is
/// resolved lexically. The result has no leading or trailing slash.
pub fn join_storage_path(segments: &[&str]) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in segments.iter().flat_map(|segment| segment.split('/')) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }
    parts.join("/")
}
