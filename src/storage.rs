//! Object storage for uploaded images

use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;

use crate::error::ApiError;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `body` under `key` and returns its public URL.
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<String, ApiError>;
    async fn delete(&self, key: &str) -> Result<(), ApiError>;
}

/// Public-read S3 bucket addressed as `https://<bucket>.s3.<region>.amazonaws.com/<key>`.
pub struct S3Store {
    client: S3Client,
    bucket: String,
    region: String,
}

impl S3Store {
    pub async fn new(region: String, bucket: String) -> Self {
        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.clone()))
            .load()
            .await;
        Self { client: S3Client::new(&aws_config), bucket, region }
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://{}.s3.{}.amazonaws.com/{}", self.bucket, self.region, key)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<String, ApiError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body.into())
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(key = %key, error = %e, "S3 upload failed");
                ApiError::Storage(format!("upload of {key} failed"))
            })?;
        tracing::info!(key = %key, bucket = %self.bucket, "Object uploaded");
        Ok(self.public_url(key))
    }

    async fn delete(&self, key: &str) -> Result<(), ApiError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(key = %key, error = %e, "S3 delete failed");
                ApiError::Storage(format!("delete of {key} failed"))
            })?;
        tracing::info!(key = %key, bucket = %self.bucket, "Object deleted");
        Ok(())
    }
}
