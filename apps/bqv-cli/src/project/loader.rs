//! Discovery of view definitions on disk.
//!
//! Errors that concern a single view (unreadable query, malformed `meta.json`) are
//! collected next to the definitions that did load, so one broken directory does not
//! hide the rest of the project. Only an unreadable base or dataset directory fails the
//! whole load.

use std::fs;
use std::path::{Path, PathBuf};

use crate::framework::core::definition_set::{DefinitionSet, DefinitionSetError};
use crate::framework::core::infrastructure::view::{ViewDefinition, ViewId, ViewMetadata};
use crate::utilities::constants::{META_FILE, QUERY_FILE};

#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("Failed to read directory {path}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed metadata in {path}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    DefinitionSet(#[from] DefinitionSetError),
}

/// Result of a load: the definitions that parsed, and the views that did not.
#[derive(Debug, Default)]
pub struct LoadedDefinitions {
    pub definitions: DefinitionSet,
    pub errors: Vec<(ViewId, LoaderError)>,
}

impl LoadedDefinitions {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Lists the visible subdirectories of `dir`, sorted by name.
fn subdirectories(dir: &Path) -> Result<Vec<(String, PathBuf)>, LoaderError> {
    let read_dir_error = |source| LoaderError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_error)? {
        let entry = entry.map_err(read_dir_error)?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            tracing::warn!("Skipping directory with a non UTF-8 name: {:?}", path);
            continue;
        };
        if is_hidden(&name) {
            continue;
        }
        dirs.push((name, path));
    }
    dirs.sort();
    Ok(dirs)
}

/// Reads one view directory. `Ok(None)` means there is no `query.sql`.
fn load_view(
    dataset_name: &str,
    view_name: &str,
    dir: &Path,
) -> Result<Option<ViewDefinition>, LoaderError> {
    let query_path = dir.join(QUERY_FILE);
    if !query_path.exists() {
        tracing::debug!("File not found. skip {}.{}", dataset_name, view_name);
        return Ok(None);
    }

    let query = fs::read_to_string(&query_path).map_err(|source| LoaderError::ReadFile {
        path: query_path.clone(),
        source,
    })?;
    let mut definition = ViewDefinition::new(dataset_name, view_name, query);

    let meta_path = dir.join(META_FILE);
    if meta_path.exists() {
        let content = fs::read_to_string(&meta_path).map_err(|source| LoaderError::ReadFile {
            path: meta_path.clone(),
            source,
        })?;
        let metadata: ViewMetadata =
            serde_json::from_str(&content).map_err(|source| LoaderError::Metadata {
                path: meta_path.clone(),
                source,
            })?;
        definition = definition.with_metadata(metadata);
    }

    Ok(Some(definition))
}

pub fn load_definitions(base_dir: &Path) -> Result<LoadedDefinitions, LoaderError> {
    let mut loaded = LoadedDefinitions::default();

    for (dataset_name, dataset_dir) in subdirectories(base_dir)? {
        for (view_name, view_dir) in subdirectories(&dataset_dir)? {
            match load_view(&dataset_name, &view_name, &view_dir) {
                Ok(Some(definition)) => loaded.definitions.insert(definition)?,
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("Failed to load view({}.{}): {}", dataset_name, view_name, e);
                    loaded
                        .errors
                        .push((ViewId::new(&dataset_name, &view_name), e));
                }
            }
        }
    }

    tracing::debug!(
        "Loaded {} view definitions from {:?}",
        loaded.definitions.len(),
        base_dir
    );
    Ok(loaded)
}
