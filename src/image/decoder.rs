//! Decoding of uploaded bytes by declared extension.

use crate::models::SourceFormat;
use crate::{Error, Result};
use image::DynamicImage;

/// A decoded upload. Dropped as soon as the last variant is produced.
#[derive(Debug)]
pub struct SourceImage {
    pub raster: DynamicImage,
    pub format: SourceFormat,
    pub width: u32,
    pub height: u32,
    pub byte_size: u64,
}

/// Decode `bytes` as the declared extension.
///
/// The extension alone picks the codec; the payload is not sniffed. Either an
/// unknown extension or bytes the codec rejects is `UnsupportedFormat`.
pub fn decode(bytes: &[u8], declared_extension: &str) -> Result<SourceImage> {
    let format = SourceFormat::from_extension(declared_extension)?;

    let raster = image::load_from_memory_with_format(bytes, format.image_format())
        .map_err(|e| {
            Error::UnsupportedFormat(format!(
                "could not decode {} bytes as {:?}: {}",
                bytes.len(),
                format,
                e
            ))
        })?;

    let (width, height) = (raster.width(), raster.height());
    if width == 0 || height == 0 {
        return Err(Error::UnsupportedFormat(format!(
            "decoded image has empty dimensions {}x{}",
            width, height
        )));
    }

    Ok(SourceImage {
        raster,
        format,
        width,
        height,
        byte_size: bytes.len() as u64,
    })
}
