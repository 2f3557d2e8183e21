//! Blob storage for generated variants
//!
//! The pipeline only needs put/exists/delete on string paths. Backends are a
//! local directory (served as `/storage/...`), any S3-compatible bucket, and
//! an in-memory mock for tests.

pub mod local;
pub mod mock;
pub mod s3;

pub use local::LocalBlobStore;
pub use mock::MockBlobStore;
pub use s3::S3BlobStore;

use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, path: &str, data: &[u8]) -> Result<()>;
    async fn exists(&self, path: &str) -> Result<bool>;
    /// Remove `path`. Callers check `exists` first; a missing path may error.
    async fn delete(&self, path: &str) -> Result<()>;
}

/// MIME type for a variant path, by extension.
pub fn content_type_for(path: &str) -> &'static str {
    match path.rsplit('.').next().map(|ext| ext.to_ascii_lowercase()).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("images/a_medium.jpg"), "image/jpeg");
        assert_eq!(content_type_for("images/a_medium.PNG"), "image/png");
        assert_eq!(content_type_for("images/a_medium.webp"), "image/webp");
        assert_eq!(content_type_for("images/a_medium"), "application/octet-stream");
    }
}
