//! Upload orchestration: decode once, then scale, encode, and persist each
//! size class as an independent unit of work.

use super::Cleaner;
use crate::config::PipelineConfig;
use crate::image::{decode, plan, EncodedPrimary, Encoder, SourceImage};
use crate::models::{OriginalStats, SizeClass, SizeClassName, UploadRequest, UploadResult, Variant};
use crate::naming::{generate_base_id, public_url, variant_path};
use crate::storage::BlobStore;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Produces the full variant set for one upload, all or nothing.
pub struct VariantGenerator {
    store: Arc<dyn BlobStore>,
    encoder: Encoder,
    config: Arc<PipelineConfig>,
    cleaner: Cleaner,
}

impl VariantGenerator {
    pub fn new(store: Arc<dyn BlobStore>, encoder: Encoder, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            cleaner: Cleaner::new(Arc::clone(&store)),
            store,
            encoder,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cleaner(&self) -> &Cleaner {
        &self.cleaner
    }

    pub async fn process_upload(&self, request: UploadRequest) -> Result<UploadResult> {
        self.process_upload_until(request, std::future::pending()).await
    }

    /// Like [`process_upload`](Self::process_upload), but gives up once
    /// `cancelled` resolves.
    ///
    /// On cancellation or any failure no new writes are issued, in-flight
    /// units are drained, and whatever was already persisted is removed.
    pub async fn process_upload_until<F>(
        &self,
        request: UploadRequest,
        cancelled: F,
    ) -> Result<UploadResult>
    where
        F: Future<Output = ()>,
    {
        let UploadRequest {
            bytes,
            original_filename,
            extension,
            original_size,
        } = request;

        info!(
            "Processing upload {:?} ({} bytes, .{})",
            original_filename, original_size, extension
        );

        let source = tokio::task::spawn_blocking(move || decode(&bytes, &extension))
            .await
            .map_err(|e| Error::Invariant(format!("Decode task join error: {}", e)))??;

        let original = OriginalStats {
            width: source.width,
            height: source.height,
            size: original_size,
        };
        let base_id = generate_base_id(self.config.base_id_length);
        info!(
            "[{}] Decoded {:?} source {}x{}",
            base_id, source.format, source.width, source.height
        );

        let halt = Arc::new(AtomicBool::new(false));
        let mut units = self.spawn_units(Arc::new(source), &base_id, &halt);

        let outcome = match collect_variants(&mut units, &halt, cancelled).await {
            Ok(variants) => UploadResult::assemble(original, variants),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => {
                info!(
                    "[{}] Generated {} variants, canonical {} ({}% smaller)",
                    base_id,
                    result.variants.len(),
                    result.path,
                    result.savings_percent
                );
                Ok(result)
            }
            Err(e) => {
                error!("[{}] Upload failed: {}", base_id, e);
                self.rollback(&base_id).await;
                Err(e)
            }
        }
    }

    fn spawn_units(
        &self,
        source: Arc<SourceImage>,
        base_id: &str,
        halt: &Arc<AtomicBool>,
    ) -> JoinSet<Result<(SizeClassName, Variant)>> {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut units = JoinSet::new();

        for class in &self.config.size_classes {
            let unit = VariantUnit {
                store: Arc::clone(&self.store),
                encoder: self.encoder.clone(),
                config: Arc::clone(&self.config),
                source: Arc::clone(&source),
                class: *class,
                base_id: base_id.to_string(),
                halt: Arc::clone(halt),
            };
            let permits = Arc::clone(&permits);

            units.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::Invariant(format!("Worker pool closed: {}", e)))?;
                unit.run().await
            });
        }

        units
    }

    async fn rollback(&self, base_id: &str) {
        match self.cleaner.delete_base(&self.config.directory, base_id).await {
            Ok(0) => debug!("[{}] Nothing to roll back", base_id),
            Ok(removed) => info!("[{}] Rolled back {} partial file(s)", base_id, removed),
            Err(e) => warn!("[{}] Rollback incomplete: {}", base_id, e),
        }
    }
}

/// Wait for every unit, keeping only the first failure.
///
/// The first failure (or cancellation) raises `halt` so remaining units stop
/// before their next write; they are still awaited so nothing is in flight
/// when the caller rolls back.
async fn collect_variants<F>(
    units: &mut JoinSet<Result<(SizeClassName, Variant)>>,
    halt: &AtomicBool,
    cancelled: F,
) -> Result<BTreeMap<SizeClassName, Variant>>
where
    F: Future<Output = ()>,
{
    tokio::pin!(cancelled);

    let mut variants = BTreeMap::new();
    let mut first_error: Option<Error> = None;

    let record = |e: Error, first_error: &mut Option<Error>| {
        if first_error.is_none() {
            halt.store(true, Ordering::SeqCst);
            *first_error = Some(e);
        } else {
            debug!("Suppressed follow-up failure: {}", e);
        }
    };

    loop {
        tokio::select! {
            joined = units.join_next() => match joined {
                None => break,
                Some(Ok(Ok((name, variant)))) => {
                    variants.insert(name, variant);
                }
                Some(Ok(Err(e))) => record(e, &mut first_error),
                Some(Err(e)) => record(
                    Error::Invariant(format!("Variant task join error: {}", e)),
                    &mut first_error,
                ),
            },
            _ = &mut cancelled, if first_error.is_none() => {
                warn!("Upload cancelled, draining in-flight variants");
                record(Error::Cancelled, &mut first_error);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(variants),
    }
}

struct EncodedVariant {
    primary: EncodedPrimary,
    webp: Option<Vec<u8>>,
}

/// Scale → encode → persist for one size class.
struct VariantUnit {
    store: Arc<dyn BlobStore>,
    encoder: Encoder,
    config: Arc<PipelineConfig>,
    source: Arc<SourceImage>,
    class: SizeClass,
    base_id: String,
    halt: Arc<AtomicBool>,
}

impl VariantUnit {
    async fn run(self) -> Result<(SizeClassName, Variant)> {
        let name = self.class.name;
        let (width, height) = plan(
            self.source.width,
            self.source.height,
            self.class.max_width,
            self.class.max_height,
        );
        debug!(
            "[{}/{}] Scaling {}x{} -> {}x{}",
            self.base_id, name, self.source.width, self.source.height, width, height
        );

        let encoded = {
            let encoder = self.encoder.clone();
            let source = Arc::clone(&self.source);
            tokio::task::spawn_blocking(move || -> Result<EncodedVariant> {
                // The scaled raster lives only for this closure.
                let scaled = encoder.scale(&source.raster, source.format, width, height);
                let primary = encoder.encode_primary(&scaled, source.format)?;
                let webp = encoder.encode_webp(&scaled)?;
                Ok(EncodedVariant { primary, webp })
            })
            .await
            .map_err(|e| Error::Invariant(format!("Encode task join error: {}", e)))??
        };

        let path = variant_path(
            &self.config.directory,
            &self.base_id,
            name,
            encoded.primary.extension,
        );
        self.persist(&path, &encoded.primary.bytes).await?;

        let (webp_path, webp_size) = match &encoded.webp {
            Some(bytes) => {
                let webp_path = variant_path(&self.config.directory, &self.base_id, name, "webp");
                self.persist(&webp_path, bytes).await?;
                (Some(webp_path), Some(bytes.len() as u64))
            }
            None => (None, None),
        };

        debug!(
            "[{}/{}] Stored {} bytes primary, {:?} bytes webp",
            self.base_id,
            name,
            encoded.primary.bytes.len(),
            webp_size
        );

        let prefix = &self.config.public_url_prefix;
        Ok((
            name,
            Variant {
                url: public_url(prefix, &path),
                webp_url: webp_path.as_deref().map(|p| public_url(prefix, p)),
                path,
                webp_path,
                width,
                height,
                size: encoded.primary.bytes.len() as u64,
                webp_size,
            },
        ))
    }

    async fn persist(&self, path: &str, bytes: &[u8]) -> Result<()> {
        if self.halt.load(Ordering::SeqCst) {
            return Err(Error::Cancelled);
        }
        self.store.put(path, bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PngCompression;
    use crate::image::WebpEncoder;
    use crate::storage::MockBlobStore;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn jpeg_upload(width: u32, height: u32) -> UploadRequest {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
            .unwrap();
        UploadRequest {
            original_size: bytes.len() as u64,
            bytes,
            original_filename: "photo.jpg".to_string(),
            extension: "jpg".to_string(),
        }
    }

    fn generator(store: &MockBlobStore, webp: bool) -> VariantGenerator {
        VariantGenerator::new(
            Arc::new(store.clone()),
            Encoder::new(80, PngCompression::Fast, WebpEncoder::detect(75, webp)),
            PipelineConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_generates_three_variants() {
        let store = MockBlobStore::new();
        let result = generator(&store, false)
            .process_upload(jpeg_upload(400, 200))
            .await
            .unwrap();

        assert_eq!(result.variants.len(), 3);
        let thumb = result.variant(SizeClassName::Thumbnail).unwrap();
        assert_eq!((thumb.width, thumb.height), (300, 150));
        let medium = result.variant(SizeClassName::Medium).unwrap();
        assert_eq!((medium.width, medium.height), (400, 200));
        assert_eq!(result.path, medium.path);
        assert_eq!(store.get_files().len(), 3);
    }

    #[tokio::test]
    async fn test_variants_share_base_id() {
        let store = MockBlobStore::new();
        let result = generator(&store, false)
            .process_upload(jpeg_upload(64, 64))
            .await
            .unwrap();

        let base = result
            .path
            .trim_start_matches("images/")
            .trim_end_matches("_medium.jpg")
            .to_string();
        assert_eq!(base.len(), 20);
        for (name, variant) in &result.variants {
            assert_eq!(variant.path, format!("images/{}_{}.jpg", base, name));
            assert_eq!(variant.url, format!("/storage/{}", variant.path));
        }
    }

    #[tokio::test]
    async fn test_decode_failure_writes_nothing() {
        let store = MockBlobStore::new();
        let mut request = jpeg_upload(32, 32);
        request.extension = "tiff".to_string();

        let err = generator(&store, false)
            .process_upload(request)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
        assert_eq!(store.get_put_count(), 0);
    }

    #[tokio::test]
    async fn test_storage_failure_rolls_back() {
        let store = MockBlobStore::new().with_put_failure("_large");
        let err = generator(&store, false)
            .process_upload(jpeg_upload(64, 32))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Storage(_)));
        assert!(store.get_files().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_rolls_back() {
        let store = MockBlobStore::new();
        let err = generator(&store, false)
            .process_upload_until(jpeg_upload(64, 32), std::future::ready(()))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert!(store.get_files().is_empty());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = PipelineConfig::default().with_size_classes(Vec::new());
        let result = VariantGenerator::new(
            Arc::new(MockBlobStore::new()),
            Encoder::new(80, PngCompression::Fast, None),
            config,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
