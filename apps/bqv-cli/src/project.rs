//! # Project
//!
//! A project is a directory of view definitions plus an optional parameter file:
//!
//! ```text
//! <base_dir>/
//!   <dataset>/
//!     <view>/
//!       query.sql     required
//!       meta.json     optional
//! .params             JSON object of template parameters
//! ```
//!
//! Both paths are passed in explicitly by the CLI; nothing here reads process-wide state.

use std::path::{Path, PathBuf};

use crate::framework::core::template::{Parameters, ParametersError};
use crate::utilities::constants::{DEFAULT_BASE_DIR, DEFAULT_PARAM_FILE};

pub mod loader;

pub use loader::{LoadedDefinitions, LoaderError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub base_dir: PathBuf,
    pub param_file: PathBuf,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            param_file: PathBuf::from(DEFAULT_PARAM_FILE),
        }
    }
}

impl Project {
    pub fn new(base_dir: impl Into<PathBuf>, param_file: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            param_file: param_file.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Loads every view definition under the base directory.
    pub fn load_definitions(&self) -> Result<LoadedDefinitions, LoaderError> {
        loader::load_definitions(&self.base_dir)
    }

    pub fn load_parameters(&self) -> Result<Parameters, ParametersError> {
        Parameters::load(&self.param_file)
    }
}
