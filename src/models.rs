//! Data models and structures
//!
//! Defines the size classes, upload requests, and the result shape returned
//! to callers. Field names on the serialized types are the wire contract.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Declared format of an uploaded source image.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl SourceFormat {
    /// Map a declared file extension (case-insensitive, no dot) to a format.
    pub fn from_extension(extension: &str) -> Result<Self> {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "gif" => Ok(Self::Gif),
            "webp" => Ok(Self::Webp),
            other => Err(Error::UnsupportedFormat(format!(
                "unrecognized extension '{}'",
                other
            ))),
        }
    }

    pub fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
            Self::Gif => image::ImageFormat::Gif,
            Self::Webp => image::ImageFormat::WebP,
        }
    }

    /// Extension of the primary-codec output for this source.
    pub fn primary_extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            _ => "jpg",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SizeClassName {
    Thumbnail,
    Medium,
    Large,
}

impl SizeClassName {
    pub const ALL: [SizeClassName; 3] = [Self::Thumbnail, Self::Medium, Self::Large];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Thumbnail => "thumbnail",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }
}

impl fmt::Display for SizeClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named bounding box every variant of that class is scaled to fit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SizeClass {
    pub name: SizeClassName,
    pub max_width: u32,
    pub max_height: u32,
}

impl SizeClass {
    pub const fn new(name: SizeClassName, max_width: u32, max_height: u32) -> Self {
        Self {
            name,
            max_width,
            max_height,
        }
    }
}

/// What the upload intake hands to the pipeline.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub bytes: Vec<u8>,
    pub original_filename: String,
    pub extension: String,
    pub original_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Variant {
    pub path: String,
    pub url: String,
    pub webp_path: Option<String>,
    pub webp_url: Option<String>,
    pub width: u32,
    pub height: u32,
    pub size: u64,
    pub webp_size: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OriginalStats {
    pub width: u32,
    pub height: u32,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadResult {
    pub original: OriginalStats,
    pub variants: BTreeMap<SizeClassName, Variant>,
    pub path: String,
    pub url: String,
    pub webp_url: Option<String>,
    pub size: u64,
    pub original_size: u64,
    pub savings_percent: i64,
}

impl UploadResult {
    /// Assemble the result, aliasing the canonical fields to the medium variant.
    pub fn assemble(
        original: OriginalStats,
        variants: BTreeMap<SizeClassName, Variant>,
    ) -> Result<Self> {
        let medium = variants
            .get(&SizeClassName::Medium)
            .cloned()
            .ok_or_else(|| Error::Invariant("medium variant missing from result".to_string()))?;

        Ok(Self {
            original,
            path: medium.path,
            url: medium.url,
            webp_url: medium.webp_url,
            size: medium.size,
            original_size: original.size,
            savings_percent: savings_percent(medium.size, original.size),
            variants,
        })
    }

    pub fn variant(&self, name: SizeClassName) -> Option<&Variant> {
        self.variants.get(&name)
    }
}

/// `round((1 - encoded / original) * 100)`; zero when the original size is unknown.
pub fn savings_percent(encoded_size: u64, original_size: u64) -> i64 {
    if original_size == 0 {
        return 0;
    }
    ((1.0 - encoded_size as f64 / original_size as f64) * 100.0).round() as i64
}
