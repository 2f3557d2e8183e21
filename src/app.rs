//! Application wiring and upload intake.

use crate::config::{Config, StorageBackend};
use crate::image::Encoder;
use crate::models::{UploadRequest, UploadResult};
use crate::pipeline::{Cleaner, VariantGenerator};
use crate::storage::{BlobStore, LocalBlobStore, S3BlobStore};
use crate::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Pre-validation the core expects to have happened before it runs.
#[derive(Debug, Clone, Copy)]
pub struct UploadIntake {
    max_upload_bytes: u64,
}

impl UploadIntake {
    pub fn new(max_upload_bytes: u64) -> Self {
        Self { max_upload_bytes }
    }

    /// Build a request from a client filename and payload, enforcing the size ceiling.
    pub fn accept(&self, original_filename: &str, bytes: Vec<u8>) -> Result<UploadRequest> {
        let original_size = bytes.len() as u64;
        if original_size == 0 {
            return Err(Error::Validation("upload is empty".to_string()));
        }
        if original_size > self.max_upload_bytes {
            return Err(Error::Validation(format!(
                "upload is {} bytes, limit is {}",
                original_size, self.max_upload_bytes
            )));
        }

        let extension = Path::new(original_filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .ok_or_else(|| {
                Error::Validation(format!("{:?} has no file extension", original_filename))
            })?
            .to_ascii_lowercase();

        Ok(UploadRequest {
            bytes,
            original_filename: original_filename.to_string(),
            extension,
            original_size,
        })
    }
}

/// Generator, cleaner, and intake built from one [`Config`].
pub struct App {
    intake: UploadIntake,
    generator: VariantGenerator,
}

impl App {
    /// Build an app around an already-constructed store.
    ///
    /// Useful for tests and harnesses that inject [`crate::storage::MockBlobStore`].
    pub fn with_store(config: Config, store: Arc<dyn BlobStore>) -> Result<Self> {
        let encoder = Encoder::from_config(&config.pipeline, config.webp_enabled);
        info!(
            "WebP output {}",
            if encoder.webp_available() { "enabled" } else { "unavailable" }
        );

        Ok(Self {
            intake: UploadIntake::new(config.max_upload_bytes),
            generator: VariantGenerator::new(store, encoder, config.pipeline)?,
        })
    }

    pub async fn new(config: Config) -> Result<Self> {
        let store: Arc<dyn BlobStore> = match &config.storage {
            StorageBackend::Local { root } => {
                info!("Storage backend: local ({})", root.display());
                Arc::new(LocalBlobStore::new(root))
            }
            StorageBackend::S3 {
                bucket,
                endpoint,
                region,
                access_key_id,
                secret_access_key,
            } => {
                info!("Storage backend: s3 (bucket: {})", bucket);
                Arc::new(
                    S3BlobStore::new(
                        access_key_id.clone(),
                        secret_access_key.clone(),
                        endpoint.clone(),
                        region.clone(),
                        bucket.clone(),
                    )
                    .await?,
                )
            }
        };

        Self::with_store(config, store)
    }

    pub async fn from_env() -> Result<Self> {
        Self::new(Config::from_env()?).await
    }

    pub fn generator(&self) -> &VariantGenerator {
        &self.generator
    }

    pub fn cleaner(&self) -> &Cleaner {
        self.generator.cleaner()
    }

    /// Intake validation followed by variant generation.
    pub async fn upload(&self, original_filename: &str, bytes: Vec<u8>) -> Result<UploadResult> {
        let request = self.intake.accept(original_filename, bytes)?;
        self.generator.process_upload(request).await
    }

    pub async fn delete(&self, any_variant_path: &str) -> Result<usize> {
        self.cleaner().delete_all_variants(any_variant_path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::storage::MockBlobStore;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    fn test_config(max_upload_bytes: u64) -> Config {
        Config {
            storage: StorageBackend::Local {
                root: "unused".into(),
            },
            pipeline: PipelineConfig::default(),
            webp_enabled: false,
            max_upload_bytes,
        }
    }

    fn png_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(50, 40))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_intake_derives_extension() {
        let request = UploadIntake::new(1024)
            .accept("Holiday.Photo.PNG", vec![1, 2, 3])
            .unwrap();
        assert_eq!(request.extension, "png");
        assert_eq!(request.original_size, 3);
        assert_eq!(request.original_filename, "Holiday.Photo.PNG");
    }

    #[test]
    fn test_intake_rejects_oversize_and_empty() {
        let intake = UploadIntake::new(2);
        assert!(matches!(
            intake.accept("a.jpg", vec![0; 3]),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            intake.accept("a.jpg", Vec::new()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_intake_requires_extension() {
        let err = UploadIntake::new(1024).accept("noext", vec![1]).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_app_upload_and_delete() {
        let store = MockBlobStore::new();
        let app = App::with_store(test_config(1024 * 1024), Arc::new(store.clone())).unwrap();

        let result = app.upload("logo.png", png_bytes()).await.unwrap();
        assert!(result.path.ends_with("_medium.png"));
        assert_eq!(store.get_files().len(), 3);

        let removed = app.delete(&result.path).await.unwrap();
        assert_eq!(removed, 3);
        assert!(store.get_files().is_empty());
    }
}
