//! The geometry engine's disk read-through cache.
//!
//! `spec.md §4.2` "Side effects" and `spec.md §5` "Shared resources":
//! the augmented event table is cached keyed by `(mass, flavour,
//! sample-hash, detector-hash)`; concurrent writers use file-level atomic
//! rename, and readers prefer an existing cache file, recomputing only on
//! a miss.

use crate::error::Result;
use crate::flavour::Flavour;
use crate::geometry::GeometryTable;
use std::hash::{Hash, Hasher};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use rustc_hash::FxHasher;
use tracing::{debug, warn};

/// Identifies one cache entry: a (mass, flavour, sample, detector) point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheKey {
    /// Mass point, GeV.
    pub mass_gev: f64,
    /// Lepton-coupling flavour.
    pub flavour: Flavour,
    /// Hash of the combined sample's contents (e.g. file mtimes/sizes or a
    /// content digest); identifies which event rows fed the geometry
    /// pass.
    pub sample_hash: u64,
    /// Hash of the detector mesh used.
    pub detector_hash: u64,
}

impl CacheKey {
    /// The cache file path for this key under `cache_dir`.
    #[must_use]
    pub fn cache_path(&self, cache_dir: &Path) -> PathBuf {
        let mass_tag = format!("{:.2}", self.mass_gev).replace('.', "p");
        cache_dir.join(format!(
            "geom_{mass_tag}GeV_{}_{:016x}_{:016x}.bin",
            self.flavour.as_str(),
            self.sample_hash,
            self.detector_hash
        ))
    }
}

/// Hashes a set of input file paths (by path, size, and modified time) to
/// identify which sample produced an event table, without reading file
/// contents.
///
/// # Errors
///
/// Returns an I/O error if any path's metadata cannot be read.
pub fn hash_sample_files(paths: &[PathBuf]) -> Result<u64> {
    let mut hasher = FxHasher::default();
    let mut sorted: Vec<&PathBuf> = paths.iter().collect();
    sorted.sort();
    for path in sorted {
        path.hash(&mut hasher);
        let meta = std::fs::metadata(path)?;
        meta.len().hash(&mut hasher);
        if let Ok(modified) = meta.modified() {
            modified.hash(&mut hasher);
        }
    }
    Ok(hasher.finish())
}

/// Read-through cache lookup: returns the cached [`GeometryTable`] for
/// `key` if present and deserialisable, recomputing via `compute`
/// (and writing the result back, atomically) on a miss.
///
/// A corrupt or unreadable cache file is treated as a miss rather than an
/// error: it is overwritten by the freshly computed result.
///
/// # Errors
///
/// Propagates any error from `compute`, or an I/O error writing the cache
/// file.
pub fn load_or_compute<F>(cache_dir: &Path, key: &CacheKey, compute: F) -> Result<GeometryTable>
where
    F: FnOnce() -> Result<GeometryTable>,
{
    let path = key.cache_path(cache_dir);

    if let Ok(file) = std::fs::File::open(&path) {
        match bincode::deserialize_from::<_, GeometryTable>(BufReader::new(file)) {
            Ok(table) => {
                debug!(path = %path.display(), "geometry cache hit");
                return Ok(table);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "geometry cache file unreadable, recomputing");
            }
        }
    }

    let table = compute()?;
    if let Err(e) = write_atomic(&path, &table) {
        warn!(path = %path.display(), error = %e, "failed to write geometry cache entry");
    }
    Ok(table)
}

fn write_atomic(path: &Path, table: &GeometryTable) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("bin.tmp");
    {
        let file = std::fs::File::create(&tmp_path)?;
        bincode::serialize_into(BufWriter::new(file), table)?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventTable;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn cache_path_is_deterministic() {
        let key = CacheKey { mass_gev: 2.6, flavour: Flavour::Muon, sample_hash: 0xdead_beef, detector_hash: 0x1234 };
        let dir = Path::new("/tmp/hnl-geom-cache");
        assert_eq!(key.cache_path(dir), key.cache_path(dir));
        assert!(key.cache_path(dir).to_string_lossy().contains("2p60GeV_muon"));
    }

    #[test]
    fn second_lookup_is_a_cache_hit() {
        let dir = tempfile::tempdir().unwrap();
        let key = CacheKey { mass_gev: 1.0, flavour: Flavour::Electron, sample_hash: 1, detector_hash: 2 };
        let calls = AtomicUsize::new(0);
        let build = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(GeometryTable { events: EventTable::default(), ..GeometryTable::default() })
        };

        load_or_compute(dir.path(), &key, build).unwrap();
        load_or_compute(dir.path(), &key, build).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
