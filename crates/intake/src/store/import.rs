//! Mirror a local directory into the catalog

use super::memory::MemoryStore;
use crate::error::Result;
use crate::types;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

const HASH_BUFFER_SIZE: usize = 8192;

/// Counts from one import run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    pub collections: usize,
    pub data_objects: usize,
    pub bytes: u64,
    pub pruned: usize,
}

/// Register every file and directory under `local_dir` beneath `logical_root`.
///
/// Re-imports refresh size, checksum and timestamp but keep attributes.
/// Catalog nodes under `logical_root` that no longer exist on disk are pruned.
pub fn import_directory(
    store: &mut MemoryStore,
    local_dir: &Path,
    logical_root: &str,
) -> Result<ImportStats> {
    let mut stats = ImportStats::default();
    let mut seen: HashSet<String> = HashSet::new();
    let logical_root = logical_root.trim_end_matches('/');

    for entry in WalkDir::new(local_dir).sort_by_file_name() {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(local_dir)
            .map(|p| {
                p.components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default();
        let logical = if rel.is_empty() {
            logical_root.to_string()
        } else {
            types::join(logical_root, &rel)
        };

        let metadata = entry.metadata()?;
        let created: DateTime<Utc> = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        if metadata.is_dir() {
            store.create_collection(&logical, created)?;
            stats.collections += 1;
        } else if metadata.is_file() {
            let checksum = format!("sha2:{}", sha256_file(entry.path())?);
            store.put_data_object(&logical, metadata.len(), Some(checksum), created)?;
            stats.data_objects += 1;
            stats.bytes += metadata.len();
        } else {
            debug!("Skipping special file {}", entry.path().display());
            continue;
        }
        seen.insert(logical);
    }

    let stale: Vec<String> = store
        .paths_within(logical_root)
        .filter(|p| !seen.contains(*p))
        .map(str::to_string)
        .collect();
    for path in stale {
        // parents are visited first, so children may already be gone
        if store.contains(&path) {
            stats.pruned += store.remove_subtree(&path);
        }
    }

    info!(
        "Imported {} collections and {} data objects ({} bytes) into {}, pruned {}",
        stats.collections, stats.data_objects, stats.bytes, logical_root, stats.pruned
    );
    Ok(stats)
}

fn sha256_file(path: &Path) -> Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; HASH_BUFFER_SIZE];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MetadataStore;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_import_mirrors_tree_and_checksums() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("ds1")).unwrap();
        fs::write(temp.path().join("ds1").join("a.txt"), b"abc").unwrap();

        let mut store = MemoryStore::new();
        let stats = import_directory(&mut store, temp.path(), "/z/home/p").unwrap();
        assert_eq!(stats.data_objects, 1);
        assert_eq!(stats.collections, 2);

        let node = store.node("/z/home/p/ds1/a.txt").unwrap();
        assert_eq!(node.size, 3);
        assert_eq!(
            node.checksum.as_deref(),
            Some("sha2:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn test_reimport_keeps_attributes_and_prunes() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("keep.txt"), b"1").unwrap();
        fs::write(temp.path().join("gone.txt"), b"2").unwrap();

        let mut store = MemoryStore::new();
        import_directory(&mut store, temp.path(), "/z/home/p").unwrap();
        store.set_attribute("/z/home/p/keep.txt", "wave", "10w").unwrap();

        fs::remove_file(temp.path().join("gone.txt")).unwrap();
        let stats = import_directory(&mut store, temp.path(), "/z/home/p").unwrap();

        assert_eq!(stats.pruned, 1);
        assert!(!store.contains("/z/home/p/gone.txt"));
        assert_eq!(
            store.attribute("/z/home/p/keep.txt", "wave").unwrap().as_deref(),
            Some("10w")
        );
    }
}
