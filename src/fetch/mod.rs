//! fetch
//!
//! The artifact-fetcher seam.
//!
//! # Design
//!
//! The resolver needs two artifacts per repository module: the
//! descriptor (`weft-xml` classifier) and, when no export snapshot can
//! answer, the extracted source archive (`sources` classifier). How
//! artifacts arrive — network download, pre-warmed cache, test
//! fixture — is not the resolver's concern, so it talks to a trait.
//!
//! [`LocalCacheFetcher`] is the production implementation: it resolves
//! against the configured cache directory and never touches the
//! network; a missing artifact is simply [`FetchError::NotFound`].

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::ArtifactCoords;

/// Errors from artifact fetching.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("artifact not found: {coords} classifier '{classifier}'")]
    NotFound {
        coords: ArtifactCoords,
        classifier: String,
    },

    #[error("failed to fetch {coords}: {source}")]
    Io {
        coords: ArtifactCoords,
        source: std::io::Error,
    },
}

/// Supplies artifact files for repository modules.
pub trait ArtifactFetcher {
    /// Resolve one artifact to a local path.
    ///
    /// Classifier `weft-xml` yields the module descriptor file;
    /// classifier `sources` yields the extracted source directory.
    fn fetch(&self, coords: &ArtifactCoords, classifier: &str) -> Result<PathBuf, FetchError>;
}

/// Fetcher backed by the local artifact cache.
///
/// Cache layout: `<cache>/<group-as-path>/<artifact>/<version>/`
/// containing `<artifact>-<version>-weft.xml` and optionally
/// `sources/`.
#[derive(Debug, Clone)]
pub struct LocalCacheFetcher {
    cache_dir: PathBuf,
}

impl LocalCacheFetcher {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Home directory of one artifact inside the cache.
    pub fn artifact_dir(&self, coords: &ArtifactCoords) -> PathBuf {
        self.cache_dir
            .join(coords.group_path())
            .join(&coords.artifact)
            .join(&coords.version)
    }
}

impl ArtifactFetcher for LocalCacheFetcher {
    fn fetch(&self, coords: &ArtifactCoords, classifier: &str) -> Result<PathBuf, FetchError> {
        let dir = self.artifact_dir(coords);
        let path = match classifier {
            "weft-xml" => dir.join(format!("{}-{}-weft.xml", coords.artifact, coords.version)),
            "sources" => dir.join("sources"),
            other => dir.join(format!("{}-{}-{}", coords.artifact, coords.version, other)),
        };
        if path.exists() {
            Ok(path)
        } else {
            Err(FetchError::NotFound {
                coords: coords.clone(),
                classifier: classifier.to_string(),
            })
        }
    }
}

/// Write an artifact file into a cache directory laid out the way
/// [`LocalCacheFetcher`] expects. Shared by tests and the snapshot
/// command's fixtures.
pub fn cache_artifact_path(cache_dir: &Path, coords: &ArtifactCoords, file_name: &str) -> PathBuf {
    cache_dir
        .join(coords.group_path())
        .join(&coords.artifact)
        .join(&coords.version)
        .join(file_name)
}
