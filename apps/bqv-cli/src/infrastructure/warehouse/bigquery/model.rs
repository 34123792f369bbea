//! Wire types of the BigQuery v2 REST API, limited to the fields views need.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::framework::core::infrastructure::view::{
    ConcurrencyToken, LabelOp, LiveColumn, LiveViewState, ViewUpdate,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetReference {
    pub project_id: String,
    pub dataset_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetResource {
    pub dataset_reference: DatasetReference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableReference {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<LiveColumn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewResource {
    pub query: String,
    #[serde(default)]
    pub use_legacy_sql: bool,
}

impl ViewResource {
    pub fn standard_sql(query: &str) -> Self {
        Self {
            query: query.to_string(),
            use_legacy_sql: false,
        }
    }
}

/// A `tables` resource as returned by `tables.get`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableResource {
    #[serde(rename = "type")]
    pub table_type: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub schema: Option<TableSchema>,
    pub view: Option<ViewResource>,
    pub etag: Option<String>,
}

impl TableResource {
    pub fn is_view(&self) -> bool {
        self.view.is_some() || self.table_type.as_deref() == Some("VIEW")
    }

    pub fn into_live_state(self) -> LiveViewState {
        LiveViewState {
            view_query: self.view.map(|v| v.query).unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            columns: self.schema.map(|s| s.fields).unwrap_or_default(),
            labels: self.labels,
            token: ConcurrencyToken(self.etag.unwrap_or_default()),
        }
    }
}

/// Body of `tables.insert` for a new view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInsert {
    pub table_reference: TableReference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub view: ViewResource,
}

/// Body of `tables.patch`. Absent fields are left alone by the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePatch {
    pub view: ViewResource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<TableSchema>,
    /// `null` values delete the label.
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub labels: serde_json::Map<String, serde_json::Value>,
}

impl From<&ViewUpdate> for TablePatch {
    fn from(update: &ViewUpdate) -> Self {
        let mut labels = serde_json::Map::new();
        for op in &update.label_ops {
            match op {
                LabelOp::Delete(key) => {
                    labels.insert(key.clone(), serde_json::Value::Null);
                }
                LabelOp::Set(key, value) => {
                    labels.insert(key.clone(), serde_json::Value::String(value.clone()));
                }
            }
        }

        TablePatch {
            view: ViewResource::standard_sql(&update.query),
            description: update.description.clone(),
            schema: update.columns.clone().map(|fields| TableSchema { fields }),
            labels,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryConfiguration {
    pub query: String,
    pub use_legacy_sql: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfiguration {
    pub dry_run: bool,
    pub query: QueryConfiguration,
}

/// Body of `jobs.insert`.
#[derive(Debug, Clone, Serialize)]
pub struct JobInsert {
    pub configuration: JobConfiguration,
}

impl JobInsert {
    pub fn dry_run(query: &str) -> Self {
        Self {
            configuration: JobConfiguration {
                dry_run: true,
                query: QueryConfiguration {
                    query: query.to_string(),
                    use_legacy_sql: false,
                },
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub message: String,
}
