//! # Query Templates
//!
//! View queries are Handlebars templates rendered against the invocation's parameters:
//!
//! ```sql
//! SELECT * FROM `{{project}}.raw.events` WHERE env = '{{env}}'
//! ```
//!
//! Rendering is pure. HTML escaping is disabled so SQL passes through verbatim, and the
//! registry runs in strict mode: a placeholder without a matching parameter is an error
//! rather than an empty substitution.
//!
//! Trees written for the Go version of bqv use `{{.name}}`. Those placeholders are
//! rejected up front with the Handlebars spelling to migrate to.

use std::collections::BTreeMap;
use std::path::Path;

use handlebars::{no_escape, Handlebars};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref DOTTED_PLACEHOLDER: Regex =
        Regex::new(r"\{\{-?\s*\.([A-Za-z_][A-Za-z0-9_]*)").expect("placeholder pattern is valid");
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Failed to render query template")]
    Render(#[from] handlebars::RenderError),

    #[error("Placeholder {{{{.{name}}}}} uses Go template syntax, write {{{{{name}}}}} instead")]
    GoSyntax { name: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ParametersError {
    #[error("Failed to read parameter file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Parameter file {path} must be a JSON object of strings")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Placeholder name to value mapping applied to every template of an invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, String>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Reads a JSON parameter file. A missing file yields an empty set.
    pub fn load(path: &Path) -> Result<Self, ParametersError> {
        if !path.exists() {
            tracing::debug!("Parameter file {:?} not found, using no parameters", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ParametersError::Read {
            path: path.display().to_string(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ParametersError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

impl FromIterator<(String, String)> for Parameters {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Renders `template` with `params`.
pub fn render_query(template: &str, params: &Parameters) -> Result<String, TemplateError> {
    if let Some(captures) = DOTTED_PLACEHOLDER.captures(template) {
        return Err(TemplateError::GoSyntax {
            name: captures[1].to_string(),
        });
    }

    let mut reg = Handlebars::new();
    reg.register_escape_fn(no_escape);
    reg.set_strict_mode(true);

    Ok(reg.render_template(template, params)?)
}
