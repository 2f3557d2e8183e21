//! Image variant generation for uploaded rasters
//!
//! Decodes one upload, produces thumbnail/medium/large variants that keep the
//! aspect ratio and never upscale, encodes each as JPEG or PNG plus optional
//! WebP, and stores them under a shared random base id so the whole set can
//! later be removed from any one of its paths.

pub mod app;
pub mod config;
pub mod error;
pub mod image;
pub mod models;
pub mod naming;
pub mod pipeline;
pub mod storage;

pub use error::{Error, Result};
