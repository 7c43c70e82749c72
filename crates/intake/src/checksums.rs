//! Checksum manifest for a dataset

use crate::error::Result;
use crate::store::MetadataStore;
use tracing::warn;

/// Checksum type assumed for values without a `<type>:` prefix
pub const DEFAULT_CHECKSUM_TYPE: &str = "md5";

/// Split a stored checksum into `(type, value)`.
///
/// `sha2:abc` yields `("sha2", "abc")`, a bare `abc` yields `("md5", "abc")`.
/// Only the first `:` separates, so `a:b:c` yields `("a", "b:c")`.
pub fn chop_checksum(checksum: &str) -> (&str, &str) {
    match checksum.split_once(':') {
        Some((kind, value)) => (kind, value),
        None => (DEFAULT_CHECKSUM_TYPE, checksum),
    }
}

/// One line per data object in and beneath `dataset_path`, ordered by path:
/// `<type> <checksum> <size> <path>`
pub fn generate_dataset_checksums<S: MetadataStore + ?Sized>(
    store: &S,
    dataset_path: &str,
) -> Result<String> {
    let mut manifest = String::new();
    for object in store.subtree_objects(dataset_path)? {
        let Some(checksum) = object.checksum.as_deref() else {
            warn!("No checksum for {}, leaving it out of the manifest", object.path);
            continue;
        };
        let (kind, value) = chop_checksum(checksum);
        manifest.push_str(&format!("{} {} {} {}\n", kind, value, object.size, object.path));
    }
    Ok(manifest)
}
