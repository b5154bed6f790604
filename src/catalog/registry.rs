//! Identifier to pyramid lookup.
//!
//! The catalog is built once from a directory before the server starts and
//! never changes afterwards, so lookups need no locking.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::IoError;
use crate::format::tiff::TiffPyramid;

/// File extensions recognised as containers (compared case-insensitively).
pub const CONTAINER_EXTENSIONS: &[&str] = &["tif", "tiff", "ptif", "btf"];

/// Whether `path` has a container extension.
pub fn is_container_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            CONTAINER_EXTENSIONS
                .iter()
                .any(|known| e.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Identifier for a container: its file name without the extension.
pub fn identifier_for(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Immutable map from identifier to parsed pyramid.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    images: HashMap<String, Arc<TiffPyramid>>,
}

impl Catalog {
    /// A catalog with no images.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `dir` (not recursively) and parse every container in it.
    ///
    /// Files are visited in sorted order and the first file to claim an
    /// identifier keeps it. Containers that fail to parse are logged and
    /// left out. Only failing to list the directory is an error.
    pub async fn load_dir(dir: impl AsRef<Path>) -> Result<Self, IoError> {
        let dir = dir.as_ref();
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut paths: Vec<PathBuf> = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_container_path(&path) && entry.file_type().await?.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut catalog = Catalog::new();
        for path in paths {
            let Some(identifier) = identifier_for(&path) else {
                continue;
            };
            if catalog.images.contains_key(&identifier) {
                warn!(
                    identifier = %identifier,
                    path = %path.display(),
                    "Identifier already taken, skipping container"
                );
                continue;
            }

            match TiffPyramid::open(&path).await {
                Ok(pyramid) => {
                    debug!(
                        identifier = %identifier,
                        width = pyramid.width,
                        height = pyramid.height,
                        levels = pyramid.levels.len(),
                        "Loaded container"
                    );
                    catalog.images.insert(identifier, Arc::new(pyramid));
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable container");
                }
            }
        }

        info!(
            dir = %dir.display(),
            images = catalog.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    /// Add a pyramid under `identifier` unless the identifier is taken.
    ///
    /// Returns whether it was added.
    pub fn insert(&mut self, identifier: impl Into<String>, pyramid: TiffPyramid) -> bool {
        let identifier = identifier.into();
        if self.images.contains_key(&identifier) {
            return false;
        }
        self.images.insert(identifier, Arc::new(pyramid));
        true
    }

    /// Look up a pyramid.
    pub fn get(&self, identifier: &str) -> Option<Arc<TiffPyramid>> {
        self.images.get(identifier).cloned()
    }

    /// All identifiers, sorted.
    pub fn identifiers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.images.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
