//! # Per-run debug store.
//!
//! [`DebugStore`] is an exclusively-owned directory that receives diagnostic
//! artifacts for exactly one run: the rendered bootstrap, admin-endpoint
//! snapshots, and error notes from collectors.
//!
//! ## Rules
//! - Created **eagerly** at runtime construction, so even a subprocess that
//!   fails to launch leaves a directory for partial diagnostics.
//! - One directory per run, named `<prefix>-<timestamp>`; never shared
//!   across runs.
//! - Filenames are fixed, well-known names (see the `*_FILE` constants) so
//!   downstream tooling and tests can locate them deterministically.
//! - Retention is caller-controlled: removed after a clean run unless the
//!   configuration retains it.
//!
//! Concurrently running shutdown hooks each own a distinct filename, so
//! writes need no locking.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Disambiguates stores created within the same timestamp tick.
static STORE_SEQ: AtomicU64 = AtomicU64::new(0);

use crate::error::StoreError;

/// Well-known filename for the rendered bootstrap document.
pub const BOOTSTRAP_FILE: &str = "bootstrap.json";
/// Well-known filename for the admin `/server_info` snapshot.
pub const SERVER_INFO_FILE: &str = "server_info.json";
/// Well-known filename for the admin `/clusters` snapshot.
pub const CLUSTERS_FILE: &str = "clusters.txt";
/// Well-known filename for the admin `/stats` snapshot.
pub const STATS_FILE: &str = "stats.txt";

/// Exclusively-owned per-run diagnostics directory.
#[derive(Debug)]
pub struct DebugStore {
    dir: PathBuf,
}

impl DebugStore {
    /// Creates the store directory under `base`, named with a run-scoped
    /// timestamp.
    ///
    /// The directory exists when this returns; partial diagnostics can be
    /// written even if the subprocess never starts.
    pub fn create(base: &Path) -> Result<Self, StoreError> {
        let name = format!(
            "run-{}-{}",
            Utc::now().format("%Y%m%d-%H%M%S"),
            STORE_SEQ.fetch_add(1, Ordering::Relaxed)
        );
        let dir = base.join(name);
        std::fs::create_dir_all(&dir).map_err(|source| StoreError {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Returns the store directory path.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Writes `bytes` to the well-known file `name`, returning its full path.
    pub async fn write(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        let path = self.dir.join(name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| StoreError {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }

    /// Removes the store directory and everything in it.
    ///
    /// Called by the runtime after a run unless retention was requested.
    pub fn remove(&self) -> Result<(), StoreError> {
        std::fs::remove_dir_all(&self.dir).map_err(|source| StoreError {
            path: self.dir.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_write_remove() {
        let base = tempfile::tempdir().unwrap();
        let store = DebugStore::create(base.path()).unwrap();
        assert!(store.path().is_dir());

        let written = store.write(CLUSTERS_FILE, b"xds-grpc::healthy").await.unwrap();
        assert_eq!(written.file_name().unwrap(), CLUSTERS_FILE);
        assert_eq!(std::fs::read(&written).unwrap(), b"xds-grpc::healthy");

        store.remove().unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn two_stores_never_share_a_directory() {
        let base = tempfile::tempdir().unwrap();
        let a = DebugStore::create(base.path()).unwrap();
        let b = DebugStore::create(base.path()).unwrap();
        assert_ne!(a.path(), b.path());
    }
}
