use super::{content_type_for, BlobStore};
use crate::{Error, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{config::Region, types::ObjectCannedAcl, Client as S3Client};

pub struct S3BlobStore {
    client: S3Client,
    bucket: String,
}

impl S3BlobStore {
    pub async fn new(
        access_key_id: String,
        secret_access_key: String,
        endpoint: Option<String>,
        region: String,
        bucket: String,
    ) -> Result<Self> {
        let credentials = aws_sdk_s3::config::Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "upload-variants",
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region));
        // Non-AWS providers (Spaces, MinIO, R2) need an explicit endpoint
        if let Some(endpoint) = endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let config = loader.load().await;

        Ok(Self {
            client: S3Client::new(&config),
            bucket,
        })
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, path: &str, data: &[u8]) -> Result<()> {
        let body = ByteStream::from(data.to_vec());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(body)
            .content_type(content_type_for(path))
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("Failed to upload {}: {}", path, e)))?;

        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    Ok(false)
                } else {
                    Err(Error::Storage(format!("Failed to check {}: {}", path, e)))
                }
            }
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("Failed to delete {}: {}", path, e)))?;

        Ok(())
    }
}
