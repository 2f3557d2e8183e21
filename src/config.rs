//! Pipeline and process configuration
//!
//! [`PipelineConfig`] is the immutable value handed to the generator.
//! [`Config`] holds process-level settings read from the environment.

use crate::models::{SizeClass, SizeClassName};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PngCompression {
    Fast,
    Default,
    Best,
}

impl PngCompression {
    pub fn compression_type(self) -> image::codecs::png::CompressionType {
        use image::codecs::png::CompressionType;
        match self {
            Self::Fast => CompressionType::Fast,
            Self::Default => CompressionType::Default,
            Self::Best => CompressionType::Best,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Processed in order; must include `medium`.
    pub size_classes: Vec<SizeClass>,
    pub primary_quality: u8,
    pub webp_quality: u8,
    pub png_compression: PngCompression,
    /// Blob-store directory variants are written under.
    pub directory: String,
    pub public_url_prefix: String,
    pub base_id_length: usize,
    pub max_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            size_classes: vec![
                SizeClass::new(SizeClassName::Thumbnail, 300, 200),
                SizeClass::new(SizeClassName::Medium, 600, 400),
                SizeClass::new(SizeClassName::Large, 1200, 800),
            ],
            primary_quality: 80,
            webp_quality: 75,
            png_compression: PngCompression::Best,
            directory: "images".to_string(),
            public_url_prefix: "/storage".to_string(),
            base_id_length: 20,
            max_concurrency: 3,
        }
    }
}

impl PipelineConfig {
    pub fn with_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = directory.into();
        self
    }

    pub fn with_public_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.public_url_prefix = prefix.into();
        self
    }

    pub fn with_size_classes(mut self, size_classes: Vec<SizeClass>) -> Self {
        self.size_classes = size_classes;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.size_classes.is_empty() {
            return Err(Error::Config("at least one size class is required".to_string()));
        }

        let mut seen = HashSet::new();
        for class in &self.size_classes {
            if !seen.insert(class.name) {
                return Err(Error::Config(format!("duplicate size class '{}'", class.name)));
            }
            if class.max_width == 0 || class.max_height == 0 {
                return Err(Error::Config(format!(
                    "size class '{}' has a zero bound",
                    class.name
                )));
            }
        }
        if !seen.contains(&SizeClassName::Medium) {
            return Err(Error::Config(
                "the medium size class is required for the canonical variant".to_string(),
            ));
        }

        for (label, quality) in [
            ("primary", self.primary_quality),
            ("webp", self.webp_quality),
        ] {
            if !(1..=100).contains(&quality) {
                return Err(Error::Config(format!(
                    "{} quality must be within 1..=100, got {}",
                    label, quality
                )));
            }
        }

        if self.max_concurrency == 0 {
            return Err(Error::Config("max_concurrency must be positive".to_string()));
        }
        if self.base_id_length == 0 {
            return Err(Error::Config("base_id_length must be positive".to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageBackend {
    Local {
        root: PathBuf,
    },
    S3 {
        bucket: String,
        endpoint: Option<String>,
        region: String,
        access_key_id: String,
        secret_access_key: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageBackend,
    pub pipeline: PipelineConfig,
    pub webp_enabled: bool,
    pub max_upload_bytes: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup so tests don't touch process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| Error::Config(format!("{} not set", key)))
        };

        let storage = match lookup("STORAGE_BACKEND")
            .unwrap_or_else(|| "local".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "local" => StorageBackend::Local {
                root: PathBuf::from(
                    lookup("STORAGE_ROOT").unwrap_or_else(|| "storage/app/public".to_string()),
                ),
            },
            "s3" => StorageBackend::S3 {
                bucket: required("S3_BUCKET")?,
                endpoint: lookup("S3_ENDPOINT"),
                region: lookup("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                access_key_id: required("S3_ACCESS_KEY_ID")?,
                secret_access_key: required("S3_SECRET_ACCESS_KEY")?,
            },
            other => {
                return Err(Error::Config(format!(
                    "STORAGE_BACKEND must be 'local' or 's3', got '{}'",
                    other
                )))
            }
        };

        let mut pipeline = PipelineConfig::default();
        if let Some(directory) = lookup("UPLOAD_DIRECTORY") {
            pipeline.directory = directory;
        }
        if let Some(prefix) = lookup("PUBLIC_URL_PREFIX") {
            pipeline.public_url_prefix = prefix;
        }
        pipeline.validate()?;

        let webp_enabled = match lookup("WEBP_ENABLED") {
            Some(value) => parse_bool("WEBP_ENABLED", &value)?,
            None => true,
        };

        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(value) => value.parse().map_err(|_| {
                Error::Config(format!("MAX_UPLOAD_BYTES must be an integer, got '{}'", value))
            })?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            storage,
            pipeline,
            webp_enabled,
            max_upload_bytes,
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!(
            "{} must be a boolean, got '{}'",
            key, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_pipeline_is_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.size_classes.len(), 3);
        assert_eq!(config.primary_quality, 80);
        assert_eq!(config.webp_quality, 75);
        assert_eq!(config.base_id_length, 20);
    }

    #[test]
    fn test_validate_requires_medium() {
        let config = PipelineConfig::default().with_size_classes(vec![SizeClass::new(
            SizeClassName::Thumbnail,
            300,
            200,
        )]);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_duplicates_and_zero_bounds() {
        let duplicate = PipelineConfig::default().with_size_classes(vec![
            SizeClass::new(SizeClassName::Medium, 600, 400),
            SizeClass::new(SizeClassName::Medium, 300, 200),
        ]);
        assert!(duplicate.validate().is_err());

        let zero = PipelineConfig::default()
            .with_size_classes(vec![SizeClass::new(SizeClassName::Medium, 0, 400)]);
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_quality() {
        let mut config = PipelineConfig::default();
        config.webp_quality = 0;
        assert!(config.validate().is_err());
        config.webp_quality = 75;
        config.primary_quality = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(
            config.storage,
            StorageBackend::Local {
                root: PathBuf::from("storage/app/public")
            }
        );
        assert!(config.webp_enabled);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(config.pipeline.directory, "images");
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("STORAGE_ROOT", "/srv/public"),
            ("UPLOAD_DIRECTORY", "uploads"),
            ("PUBLIC_URL_PREFIX", "https://cdn.test"),
            ("WEBP_ENABLED", "false"),
            ("MAX_UPLOAD_BYTES", "2048"),
        ]))
        .unwrap();

        assert_eq!(
            config.storage,
            StorageBackend::Local {
                root: PathBuf::from("/srv/public")
            }
        );
        assert_eq!(config.pipeline.directory, "uploads");
        assert_eq!(config.pipeline.public_url_prefix, "https://cdn.test");
        assert!(!config.webp_enabled);
        assert_eq!(config.max_upload_bytes, 2048);
    }

    #[test]
    fn test_s3_requires_credentials() {
        let result = Config::from_lookup(lookup_from(&[
            ("STORAGE_BACKEND", "s3"),
            ("S3_BUCKET", "uploads"),
        ]));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("S3_ACCESS_KEY_ID"));
    }

    #[test]
    fn test_s3_backend() {
        let config = Config::from_lookup(lookup_from(&[
            ("STORAGE_BACKEND", "S3"),
            ("S3_BUCKET", "uploads"),
            ("S3_ENDPOINT", "https://nyc3.digitaloceanspaces.com"),
            ("S3_ACCESS_KEY_ID", "key"),
            ("S3_SECRET_ACCESS_KEY", "secret"),
        ]))
        .unwrap();

        match config.storage {
            StorageBackend::S3 {
                bucket,
                endpoint,
                region,
                ..
            } => {
                assert_eq!(bucket, "uploads");
                assert_eq!(
                    endpoint.as_deref(),
                    Some("https://nyc3.digitaloceanspaces.com")
                );
                assert_eq!(region, "us-east-1");
            }
            other => panic!("unexpected backend: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_values() {
        assert!(Config::from_lookup(lookup_from(&[("STORAGE_BACKEND", "ftp")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("WEBP_ENABLED", "maybe")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("MAX_UPLOAD_BYTES", "ten")])).is_err());
    }
}
