//! Variant generation and cleanup
//!
//! The generator turns one upload into the full variant set and persists it;
//! the cleaner removes that set again given any one of its paths.

pub mod cleaner;
pub mod generator;

pub use cleaner::Cleaner;
pub use generator::VariantGenerator;
