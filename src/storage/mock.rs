//! In-memory blob store for tests and dry runs.

use super::BlobStore;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory store with call counters and put/delete failure injection.
#[derive(Clone)]
pub struct MockBlobStore {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    put_count: Arc<Mutex<usize>>,
    delete_count: Arc<Mutex<usize>>,
    fail_puts_matching: Arc<Mutex<Option<String>>>,
    fail_deletes_matching: Arc<Mutex<Option<String>>>,
}

impl MockBlobStore {
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            put_count: Arc::new(Mutex::new(0)),
            delete_count: Arc::new(Mutex::new(0)),
            fail_puts_matching: Arc::new(Mutex::new(None)),
            fail_deletes_matching: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_file(self, path: String, content: Vec<u8>) -> Self {
        self.files.lock().unwrap().insert(path, content);
        self
    }

    /// Any `put` whose path contains `pattern` fails with a storage error.
    pub fn with_put_failure(self, pattern: &str) -> Self {
        *self.fail_puts_matching.lock().unwrap() = Some(pattern.to_string());
        self
    }

    /// Any `delete` whose path contains `pattern` fails and leaves the file in place.
    pub fn with_delete_failure(self, pattern: &str) -> Self {
        *self.fail_deletes_matching.lock().unwrap() = Some(pattern.to_string());
        self
    }

    pub fn get_put_count(&self) -> usize {
        *self.put_count.lock().unwrap()
    }

    pub fn get_delete_count(&self) -> usize {
        *self.delete_count.lock().unwrap()
    }

    pub fn get_files(&self) -> HashMap<String, Vec<u8>> {
        self.files.lock().unwrap().clone()
    }

    pub fn get_file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }
}

impl Default for MockBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn put(&self, path: &str, data: &[u8]) -> Result<()> {
        if let Some(pattern) = self.fail_puts_matching.lock().unwrap().as_deref() {
            if path.contains(pattern) {
                return Err(Error::Storage(format!("Mock put failure for {}", path)));
            }
        }

        *self.put_count.lock().unwrap() += 1;
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.files.lock().unwrap().contains_key(path))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        if let Some(pattern) = self.fail_deletes_matching.lock().unwrap().as_deref() {
            if path.contains(pattern) {
                return Err(Error::Storage(format!("Mock delete failure for {}", path)));
            }
        }

        *self.delete_count.lock().unwrap() += 1;
        match self.files.lock().unwrap().remove(path) {
            Some(_) => Ok(()),
            None => Err(Error::Storage(format!("File not found: {}", path))),
        }
    }
}
