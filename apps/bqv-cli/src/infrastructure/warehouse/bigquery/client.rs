//! HTTP client for the BigQuery v2 REST API.
//!
//! Authentication is a bearer access token obtained outside of bqv (for instance with
//! `gcloud auth print-access-token`). Requests are not retried.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Response, StatusCode};
use tracing::debug;

use super::config::{BigQueryConfig, BigQueryConfigError};
use super::model::{
    DatasetReference, DatasetResource, ErrorBody, JobInsert, TableInsert, TablePatch,
    TableReference, TableResource, ViewResource,
};
use crate::framework::core::infrastructure::view::{ConcurrencyToken, LiveViewState, ViewUpdate};
use crate::infrastructure::warehouse::{WarehouseClient, WarehouseError};

const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'-').remove(b'.');

fn segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// What a request was doing. The same status means different things per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Request {
    Read,
    Create,
    /// PATCH carrying `If-Match`.
    GuardedUpdate,
    Delete,
    DryRun,
}

/// Maps a non-success status to the warehouse error taxonomy.
///
/// 409 on an insert means another writer created the resource first, while 409 or 412
/// on a guarded update means the etag went stale.
fn classify(
    status: StatusCode,
    request: Request,
    resource: String,
    message: String,
) -> WarehouseError {
    match (status, request) {
        (StatusCode::NOT_FOUND, _) => WarehouseError::NotFound { resource },
        (StatusCode::PRECONDITION_FAILED | StatusCode::CONFLICT, Request::GuardedUpdate) => {
            WarehouseError::Conflict { resource }
        }
        (StatusCode::CONFLICT, Request::Create) => WarehouseError::AlreadyExists { resource },
        (StatusCode::BAD_REQUEST, Request::DryRun) => WarehouseError::Validation { message },
        _ => WarehouseError::Transport {
            message: format!("{resource}: {status} {message}"),
        },
    }
}

async fn error_from_response(
    response: Response,
    request: Request,
    resource: String,
) -> WarehouseError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or(text);
    debug!("BigQuery responded {} for {}: {}", status, resource, message);
    classify(status, request, resource, message)
}

pub struct BigQueryClient {
    http: reqwest::Client,
    endpoint: String,
    project_id: String,
    access_token: String,
    location: Option<String>,
}

impl BigQueryClient {
    pub fn new(config: &BigQueryConfig) -> Result<Self, BigQueryConfigError> {
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            project_id: config.resolve_project_id()?,
            access_token: config.resolve_access_token()?,
            location: config.location.clone(),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn datasets_url(&self) -> String {
        format!("{}/projects/{}/datasets", self.endpoint, segment(&self.project_id))
    }

    fn dataset_url(&self, dataset: &str) -> String {
        format!("{}/{}", self.datasets_url(), segment(dataset))
    }

    fn tables_url(&self, dataset: &str) -> String {
        format!("{}/tables", self.dataset_url(dataset))
    }

    fn table_url(&self, dataset: &str, view: &str) -> String {
        format!("{}/{}", self.tables_url(dataset), segment(view))
    }

    fn jobs_url(&self) -> String {
        format!("{}/projects/{}/jobs", self.endpoint, segment(&self.project_id))
    }
}

#[async_trait::async_trait]
impl WarehouseClient for BigQueryClient {
    async fn dataset_exists(&self, dataset: &str) -> Result<bool, WarehouseError> {
        let response = self
            .http
            .get(self.dataset_url(dataset))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(
                error_from_response(response, Request::Read, format!("Dataset({dataset})")).await,
            ),
        }
    }

    async fn create_dataset(&self, dataset: &str) -> Result<(), WarehouseError> {
        let body = DatasetResource {
            dataset_reference: DatasetReference {
                project_id: self.project_id.clone(),
                dataset_id: dataset.to_string(),
            },
            location: self.location.clone(),
        };
        let response = self
            .http
            .post(self.datasets_url())
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(
                error_from_response(response, Request::Create, format!("Dataset({dataset})")).await,
            );
        }
        Ok(())
    }

    async fn get_view(
        &self,
        dataset: &str,
        view: &str,
    ) -> Result<Option<LiveViewState>, WarehouseError> {
        let resource = format!("View({dataset}.{view})");
        let response = self
            .http
            .get(self.table_url(dataset, view))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(error_from_response(response, Request::Read, resource).await);
        }

        let table: TableResource = response.json().await?;
        if !table.is_view() {
            return Err(WarehouseError::Transport {
                message: format!("{dataset}.{view} exists but is not a view"),
            });
        }
        Ok(Some(table.into_live_state()))
    }

    async fn create_view(
        &self,
        dataset: &str,
        view: &str,
        query: &str,
        description: Option<&str>,
    ) -> Result<(), WarehouseError> {
        let body = TableInsert {
            table_reference: TableReference {
                project_id: self.project_id.clone(),
                dataset_id: dataset.to_string(),
                table_id: view.to_string(),
            },
            description: description.map(str::to_string),
            view: ViewResource::standard_sql(query),
        };
        let response = self
            .http
            .post(self.tables_url(dataset))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let resource = format!("View({dataset}.{view})");
            return Err(error_from_response(response, Request::Create, resource).await);
        }
        Ok(())
    }

    async fn update_view(
        &self,
        dataset: &str,
        view: &str,
        update: &ViewUpdate,
        token: &ConcurrencyToken,
    ) -> Result<(), WarehouseError> {
        let mut request = self
            .http
            .patch(self.table_url(dataset, view))
            .bearer_auth(&self.access_token)
            .json(&TablePatch::from(update));
        if !token.as_str().is_empty() {
            request = request.header("If-Match", token.as_str());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let resource = format!("View({dataset}.{view})");
            return Err(error_from_response(response, Request::GuardedUpdate, resource).await);
        }
        Ok(())
    }

    async fn delete_view(&self, dataset: &str, view: &str) -> Result<(), WarehouseError> {
        let response = self
            .http
            .delete(self.table_url(dataset, view))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let resource = format!("View({dataset}.{view})");
            return Err(error_from_response(response, Request::Delete, resource).await);
        }
        Ok(())
    }

    async fn dry_validate_query(&self, query: &str) -> Result<(), WarehouseError> {
        let response = self
            .http
            .post(self.jobs_url())
            .bearer_auth(&self.access_token)
            .json(&JobInsert::dry_run(query))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response, Request::DryRun, "Query".to_string()).await);
        }
        Ok(())
    }
}
