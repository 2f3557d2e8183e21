//! Image decoding, dimension planning, and encoding
//!
//! Turns an uploaded payload into a raster, works out the size of each
//! variant, and re-encodes scaled rasters as JPEG/PNG and WebP.

pub mod decoder;
pub mod encoder;
pub mod planner;

pub use decoder::{decode, SourceImage};
pub use encoder::{EncodedPrimary, Encoder, WebpEncoder};
pub use planner::plan;
