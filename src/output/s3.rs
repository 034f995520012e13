use super::{join_storage_path, read_from_start, ContentReader, Output};
use crate::{Error, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{config::Region, types::ObjectCannedAcl, Client as S3Client};

/// Publishes objects into an S3 (or S3-compatible) bucket.
pub struct S3Output {
    client: S3Client,
    bucket: String,
    prefix: String,
}

impl S3Output {
    /// Build a client from the default credential chain. A custom `endpoint`
    /// targets an S3-compatible store with path-style addressing.
    pub async fn new(bucket: String, region: String, endpoint: Option<String>) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region));
        if let Some(endpoint) = &endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(endpoint.is_some())
            .build();

        Ok(Self::with_client(S3Client::from_conf(s3_config), bucket))
    }

    pub fn with_client(client: S3Client, bucket: String) -> Self {
        Self {
            client,
            bucket,
            prefix: String::new(),
        }
    }

    fn object_key(&self, key: &str) -> String {
        join_storage_path(&[&self.prefix, key])
    }
}

#[async_trait]
impl Output for S3Output {
    fn set_prefix(&mut self, prefix: &str) {
        self.prefix = prefix.to_string();
    }

    async fn put_reader(
        &self,
        key: &str,
        content: &mut dyn ContentReader,
        content_type: &str,
    ) -> Result<()> {
        // Buffered so the SDK can replay the body when it retries a connection.
        let body = ByteStream::from(read_from_start(content).await?);
        let object_key = self.object_key(key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .body(body)
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| Error::S3(DisplayErrorContext(e).to_string()))?;

        tracing::info!("output: put {}", object_key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let object_key = self.object_key(key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
            .map_err(|e| Error::S3(DisplayErrorContext(e).to_string()))?;

        tracing::info!("output: delete {}", object_key);
        Ok(())
    }

    fn url_for(&self, key: &str) -> String {
        format!("http://{}/{}.json", self.bucket, self.object_key(key))
    }

    fn describe(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.prefix)
    }
}
