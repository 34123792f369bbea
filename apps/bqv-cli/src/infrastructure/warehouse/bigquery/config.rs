//! # BigQuery Config
//! Connection settings for the BigQuery REST API, read from the `[bigquery]` section of
//! the user config and overridable through `BQV_BIGQUERY__*` variables.

use serde::{Deserialize, Serialize};

use crate::utilities::constants::{ACCESS_TOKEN_ENV_VAR, BIGQUERY_ENDPOINT, PROJECT_ID_ENV_VAR};

fn default_endpoint() -> String {
    BIGQUERY_ENDPOINT.to_string()
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BigQueryConfigError {
    #[error("No project id configured. Pass --project-id, set BQV_BIGQUERY__PROJECT_ID or {PROJECT_ID_ENV_VAR}")]
    MissingProjectId,

    #[error("No access token configured. Set BQV_BIGQUERY__ACCESS_TOKEN or {ACCESS_TOKEN_ENV_VAR}")]
    MissingAccessToken,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BigQueryConfig {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Location used when a dataset has to be created. BigQuery picks its default when unset.
    #[serde(default)]
    pub location: Option<String>,
}

impl Default for BigQueryConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            access_token: None,
            endpoint: default_endpoint(),
            location: None,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl BigQueryConfig {
    pub fn with_project_id(mut self, project_id: Option<String>) -> Self {
        if let Some(project_id) = non_empty(project_id) {
            self.project_id = Some(project_id);
        }
        self
    }

    pub fn resolve_project_id(&self) -> Result<String, BigQueryConfigError> {
        non_empty(self.project_id.clone())
            .or_else(|| non_empty(std::env::var(PROJECT_ID_ENV_VAR).ok()))
            .ok_or(BigQueryConfigError::MissingProjectId)
    }

    pub fn resolve_access_token(&self) -> Result<String, BigQueryConfigError> {
        non_empty(self.access_token.clone())
            .or_else(|| non_empty(std::env::var(ACCESS_TOKEN_ENV_VAR).ok()))
            .ok_or(BigQueryConfigError::MissingAccessToken)
    }
}
