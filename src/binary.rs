//! # Binary resolution seam.
//!
//! The version/install pipeline (manifest fetch, archive download and
//! extraction) is an external collaborator: given a requested version
//! string it yields an absolute path to a runnable binary, or fails. The
//! runtime never downloads anything itself.
//!
//! [`BinaryResolver`] is that seam; [`InstalledBinary`] is the trivial
//! implementation over an installation directory laid out as
//! `<root>/<version>/bin/envoy`.

use std::path::PathBuf;

use thiserror::Error;

/// Errors resolving a version string to a runnable binary.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The requested version is not installed locally.
    #[error("version {version:?} is not installed (looked in {dir:?})")]
    NotInstalled {
        /// The requested version string.
        version: String,
        /// Directory that was searched.
        dir: PathBuf,
    },

    /// Something exists at the expected path but is not a file.
    #[error("{path:?} exists but is not an executable file")]
    NotAFile {
        /// The offending path.
        path: PathBuf,
    },
}

/// Resolves a requested version string to an executable binary path.
pub trait BinaryResolver: Send + Sync {
    /// Returns the absolute path of a runnable binary for `version`.
    fn resolve(&self, version: &str) -> Result<PathBuf, ResolveError>;
}

/// Resolver over an already-populated installation directory.
pub struct InstalledBinary {
    root: PathBuf,
}

impl InstalledBinary {
    /// Creates a resolver rooted at the installation directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn binary_path(&self, version: &str) -> PathBuf {
        self.root.join(version).join("bin").join("envoy")
    }
}

impl BinaryResolver for InstalledBinary {
    fn resolve(&self, version: &str) -> Result<PathBuf, ResolveError> {
        let path = self.binary_path(version);
        if !path.exists() {
            return Err(ResolveError::NotInstalled {
                version: version.to_string(),
                dir: self.root.clone(),
            });
        }
        if !path.is_file() {
            return Err(ResolveError::NotAFile { path });
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_installed_version() {
        let root = tempfile::tempdir().unwrap();
        let bin_dir = root.path().join("1.18.3").join("bin");
        std::fs::create_dir_all(&bin_dir).unwrap();
        std::fs::write(bin_dir.join("envoy"), b"#!/bin/sh\n").unwrap();

        let resolver = InstalledBinary::new(root.path());
        let path = resolver.resolve("1.18.3").unwrap();
        assert!(path.ends_with("1.18.3/bin/envoy"));
    }

    #[test]
    fn missing_version_is_not_installed() {
        let root = tempfile::tempdir().unwrap();
        let resolver = InstalledBinary::new(root.path());
        let err = resolver.resolve("1.99.0").unwrap_err();
        assert!(matches!(err, ResolveError::NotInstalled { .. }));
        assert!(err.to_string().contains("1.99.0"));
    }

    #[test]
    fn directory_at_binary_path_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("1.18.3").join("bin").join("envoy")).unwrap();
        let resolver = InstalledBinary::new(root.path());
        let err = resolver.resolve("1.18.3").unwrap_err();
        assert!(matches!(err, ResolveError::NotAFile { .. }));
    }
}
