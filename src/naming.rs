//! Deterministic variant naming.
//!
//! Every variant of one upload shares a random base identifier and is stored as
//! `{directory}/{base_id}_{size_class}.{ext}`. The Cleaner relies on this layout
//! to rebuild the sibling set from any single path, so it must not drift.

use crate::models::SizeClassName;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Extensions a variant can be written with, across both codecs.
pub const VARIANT_EXTENSIONS: [&str; 3] = ["jpg", "png", "webp"];

/// Random alphanumeric token shared by all variants of one upload.
pub fn generate_base_id(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub fn variant_file_name(base_id: &str, size_class: SizeClassName, extension: &str) -> String {
    format!("{}_{}.{}", base_id, size_class, extension)
}

pub fn variant_path(
    directory: &str,
    base_id: &str,
    size_class: SizeClassName,
    extension: &str,
) -> String {
    join(directory, &variant_file_name(base_id, size_class, extension))
}

/// Public URL for a stored path, e.g. `/storage/images/abc_medium.jpg`.
pub fn public_url(prefix: &str, path: &str) -> String {
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// A variant path broken into the parts the Cleaner needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedVariantPath {
    /// Directory portion, empty when the path has none.
    pub directory: String,
    pub base_id: String,
}

/// Recover `(directory, base_id)` from any one variant path.
///
/// Strips the extension, then at most one trailing `_thumbnail`, `_medium`, or
/// `_large`. A stem without a size-class suffix is taken as the base id as-is.
pub fn parse_variant_path(path: &str) -> ParsedVariantPath {
    let (directory, file_name) = match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    };

    let stem = match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    };

    let base_id = SizeClassName::ALL
        .iter()
        .find_map(|name| stem.strip_suffix(&format!("_{}", name)))
        .unwrap_or(stem);

    ParsedVariantPath {
        directory: directory.to_string(),
        base_id: base_id.to_string(),
    }
}

/// All nine candidate sibling paths for a base id.
pub fn sibling_paths(directory: &str, base_id: &str) -> Vec<String> {
    SizeClassName::ALL
        .iter()
        .flat_map(|name| {
            VARIANT_EXTENSIONS
                .iter()
                .map(move |ext| variant_path(directory, base_id, *name, ext))
        })
        .collect()
}

fn join(directory: &str, file_name: &str) -> String {
    let directory = directory.trim_end_matches('/');
    if directory.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", directory, file_name)
    }
}
