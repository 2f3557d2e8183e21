//! Scaling and re-encoding of decoded rasters
//!
//! The primary codec follows the source (PNG stays PNG, everything else
//! becomes JPEG); WebP is produced only when the codec was detected at startup.

use crate::config::{PipelineConfig, PngCompression};
use crate::models::SourceFormat;
use crate::{Error, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{FilterType as PngFilter, PngEncoder};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, Rgba32FImage, RgbaImage};

/// Bytes produced by the primary codec plus the extension they belong under.
#[derive(Debug, Clone)]
pub struct EncodedPrimary {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
}

/// Lossy WebP output. Only constructed when the codec is available.
#[derive(Debug, Clone, Copy)]
pub struct WebpEncoder {
    quality: u8,
}

impl WebpEncoder {
    /// Resolve the WebP capability once, at startup.
    pub fn detect(quality: u8, enabled: bool) -> Option<Self> {
        if enabled && cfg!(feature = "webp") {
            Some(Self { quality })
        } else {
            None
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Alpha is kept when the raster carries it.
    #[cfg(feature = "webp")]
    pub fn encode(&self, raster: &DynamicImage) -> Result<Vec<u8>> {
        let (w, h) = (raster.width(), raster.height());
        let encoded = if raster.color().has_alpha() {
            let rgba = raster.to_rgba8();
            webp::Encoder::from_rgba(&rgba, w, h)
                .encode_simple(false, self.quality as f32)
                .map(|memory| memory.to_vec())
        } else {
            let rgb = raster.to_rgb8();
            webp::Encoder::from_rgb(&rgb, w, h)
                .encode_simple(false, self.quality as f32)
                .map(|memory| memory.to_vec())
        };

        encoded.map_err(|e| Error::Encode(format!("WebP encode failed: {:?}", e)))
    }

    #[cfg(not(feature = "webp"))]
    pub fn encode(&self, _raster: &DynamicImage) -> Result<Vec<u8>> {
        Err(Error::Encode("WebP support not compiled in".to_string()))
    }
}

/// Scales rasters and encodes them with the primary codec and, if present, WebP.
#[derive(Debug, Clone)]
pub struct Encoder {
    primary_quality: u8,
    png_compression: PngCompression,
    webp: Option<WebpEncoder>,
}

impl Encoder {
    pub fn new(primary_quality: u8, png_compression: PngCompression, webp: Option<WebpEncoder>) -> Self {
        Self {
            primary_quality,
            png_compression,
            webp,
        }
    }

    pub fn from_config(config: &PipelineConfig, webp_enabled: bool) -> Self {
        Self::new(
            config.primary_quality,
            config.png_compression,
            WebpEncoder::detect(config.webp_quality, webp_enabled),
        )
    }

    pub fn webp_available(&self) -> bool {
        self.webp.is_some()
    }

    /// Produce a `width`×`height` copy of `source` for the given source format.
    ///
    /// PNG sources are resampled with premultiplied alpha so fully transparent
    /// pixels contribute no colour to their neighbours.
    pub fn scale(
        &self,
        source: &DynamicImage,
        format: SourceFormat,
        width: u32,
        height: u32,
    ) -> DynamicImage {
        if format == SourceFormat::Png {
            if (source.width(), source.height()) == (width, height) {
                return DynamicImage::ImageRgba8(source.to_rgba8());
            }
            return DynamicImage::ImageRgba8(resize_premultiplied(source, width, height));
        }

        if (source.width(), source.height()) == (width, height) {
            source.clone()
        } else {
            source.resize_exact(width, height, FilterType::Lanczos3)
        }
    }

    /// PNG sources stay PNG with alpha; everything else becomes JPEG.
    pub fn encode_primary(&self, raster: &DynamicImage, format: SourceFormat) -> Result<EncodedPrimary> {
        let mut bytes = Vec::new();

        if format == SourceFormat::Png {
            let encoder = PngEncoder::new_with_quality(
                &mut bytes,
                self.png_compression.compression_type(),
                PngFilter::Adaptive,
            );
            raster
                .to_rgba8()
                .write_with_encoder(encoder)
                .map_err(|e| Error::Encode(format!("PNG encode failed: {}", e)))?;
        } else {
            let encoder = JpegEncoder::new_with_quality(&mut bytes, self.primary_quality);
            raster
                .to_rgb8()
                .write_with_encoder(encoder)
                .map_err(|e| Error::Encode(format!("JPEG encode failed: {}", e)))?;
        }

        Ok(EncodedPrimary {
            bytes,
            extension: format.primary_extension(),
        })
    }

    /// `None` when the WebP codec is unavailable; that is not an error.
    pub fn encode_webp(&self, raster: &DynamicImage) -> Result<Option<Vec<u8>>> {
        self.webp.as_ref().map(|webp| webp.encode(raster)).transpose()
    }
}

/// Lanczos3 resize in premultiplied space, written onto a transparent canvas.
///
/// Pixels whose resampled alpha rounds to zero are left as `(0, 0, 0, 0)`;
/// the rest are un-premultiplied back to straight colour.
fn resize_premultiplied(source: &DynamicImage, width: u32, height: u32) -> RgbaImage {
    let mut premultiplied: Rgba32FImage = source.to_rgba32f();
    for pixel in premultiplied.pixels_mut() {
        let alpha = pixel[3];
        pixel[0] *= alpha;
        pixel[1] *= alpha;
        pixel[2] *= alpha;
    }

    let resized = imageops::resize(&premultiplied, width, height, FilterType::Lanczos3);

    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let alpha = pixel[3].clamp(0.0, 1.0);
        let alpha_byte = (alpha * 255.0).round() as u8;
        if alpha_byte == 0 {
            continue;
        }
        let channel = |value: f32| ((value / alpha).clamp(0.0, 1.0) * 255.0).round() as u8;
        canvas.put_pixel(
            x,
            y,
            Rgba([channel(pixel[0]), channel(pixel[1]), channel(pixel[2]), alpha_byte]),
        );
    }
    canvas
}
