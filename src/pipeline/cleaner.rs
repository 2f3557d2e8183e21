//! Best-effort removal of a whole variant set from one of its paths.

use crate::naming::{parse_variant_path, sibling_paths};
use crate::storage::BlobStore;
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Deletes every sibling of a variant, reconstructed from the naming convention.
#[derive(Clone)]
pub struct Cleaner {
    store: Arc<dyn BlobStore>,
}

impl Cleaner {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Remove all size classes and codecs that share `any_variant_path`'s base id.
    ///
    /// Missing files are skipped, so repeating the call is a no-op. Returns the
    /// number of files removed.
    pub async fn delete_all_variants(&self, any_variant_path: &str) -> Result<usize> {
        let parsed = parse_variant_path(any_variant_path);
        self.delete_base(&parsed.directory, &parsed.base_id).await
    }

    /// Every candidate path is attempted even after a store fault; the first
    /// fault is returned once the sweep finishes.
    pub async fn delete_base(&self, directory: &str, base_id: &str) -> Result<usize> {
        if base_id.is_empty() {
            warn!("Refusing to clean variants with an empty base id in {:?}", directory);
            return Ok(0);
        }

        let mut removed = 0;
        let mut first_error: Option<Error> = None;
        for path in sibling_paths(directory, base_id) {
            match self.delete_if_present(&path).await {
                Ok(true) => {
                    debug!("[{}] Deleted {}", base_id, path);
                    removed += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("[{}] Could not delete {}: {}", base_id, path, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        info!("[{}] Removed {} variant file(s)", base_id, removed);
        match first_error {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }

    async fn delete_if_present(&self, path: &str) -> Result<bool> {
        if !self.store.exists(path).await? {
            return Ok(false);
        }
        self.store.delete(path).await?;
        Ok(true)
    }
}
