use std::collections::HashMap;
use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Identity of a view inside the warehouse: `(dataset, view)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewId {
    pub dataset_name: String,
    pub view_name: String,
}

impl ViewId {
    pub fn new(dataset_name: impl Into<String>, view_name: impl Into<String>) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            view_name: view_name.into(),
        }
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.dataset_name, self.view_name)
    }
}

/// Documentation for a single column, as declared in `meta.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDoc {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Metadata managed alongside a view.
///
/// The on-disk shape is the `meta.json` sidecar:
///
/// ```json
/// {
///   "description": "Daily active users",
///   "schema": [{ "name": "user_id", "description": "Hashed user id" }],
///   "labels": { "team": "growth" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewMetadata {
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "schema")]
    pub columns: Vec<ColumnDoc>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl ViewMetadata {
    /// Canonical serialization of the declared metadata.
    ///
    /// Built from the description, the column descriptions in declaration order and the
    /// labels sorted by key. The live side is serialized with [`LiveViewState::canonical_metadata`]
    /// against the same column order, so both strings are comparable byte for byte.
    pub fn canonical(&self) -> String {
        canonical_metadata(
            &self.description,
            self.columns.iter().map(|c| c.description.as_str()),
            &self.labels,
        )
    }
}

/// A view as declared in the configuration directory.
///
/// `metadata` is `None` when the view has no `meta.json`; in that case description, schema
/// documentation and labels are left alone by every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewDefinition {
    pub dataset_name: String,
    pub view_name: String,
    pub query_template: String,
    pub metadata: Option<ViewMetadata>,
}

impl ViewDefinition {
    pub fn new(
        dataset_name: impl Into<String>,
        view_name: impl Into<String>,
        query_template: impl Into<String>,
    ) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            view_name: view_name.into(),
            query_template: query_template.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: ViewMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn id(&self) -> ViewId {
        ViewId::new(&self.dataset_name, &self.view_name)
    }
}

/// Opaque last-observed-version marker returned with a read and required on update.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConcurrencyToken(pub String);

impl ConcurrencyToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A column of the live view schema.
///
/// Only `name` and `description` matter to reconciliation. Every other attribute the
/// warehouse returned (type, mode, nested fields, ...) is kept in `attributes` so the
/// schema can be written back without loss.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LiveColumn {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl LiveColumn {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            attributes: serde_json::Map::new(),
        }
    }
}

/// Snapshot of an existing view. Never cached: every operation fetches a fresh one.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveViewState {
    pub view_query: String,
    pub description: String,
    pub columns: Vec<LiveColumn>,
    pub labels: HashMap<String, String>,
    pub token: ConcurrencyToken,
}

impl LiveViewState {
    /// Serializes the live metadata the same way [`ViewMetadata::canonical`] does.
    ///
    /// Column descriptions are looked up by name following `declared` order, so columns
    /// that only exist in the warehouse never contribute. A declared column missing from
    /// the live schema contributes an empty description.
    pub fn canonical_metadata(&self, declared: &[ColumnDoc]) -> String {
        canonical_metadata(
            &self.description,
            declared.iter().map(|doc| {
                self.column(&doc.name)
                    .map(|c| c.description.as_str())
                    .unwrap_or("")
            }),
            &self.labels,
        )
    }

    pub fn column(&self, name: &str) -> Option<&LiveColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Result of looking a view up in the warehouse.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveLookup {
    DatasetAbsent,
    ViewAbsent,
    Present(LiveViewState),
}

impl LiveLookup {
    pub fn state(&self) -> Option<&LiveViewState> {
        match self {
            LiveLookup::Present(state) => Some(state),
            LiveLookup::DatasetAbsent | LiveLookup::ViewAbsent => None,
        }
    }

    pub fn into_state(self) -> Option<LiveViewState> {
        match self {
            LiveLookup::Present(state) => Some(state),
            LiveLookup::DatasetAbsent | LiveLookup::ViewAbsent => None,
        }
    }
}

/// A single label mutation. Operations are applied in order by the warehouse client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelOp {
    Delete(String),
    Set(String, String),
}

/// Everything an update pushes for one view.
///
/// `None` fields are left untouched in the warehouse.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewUpdate {
    pub query: String,
    pub description: Option<String>,
    pub columns: Option<Vec<LiveColumn>>,
    pub label_ops: Vec<LabelOp>,
}

impl ViewUpdate {
    /// Merges declared metadata onto a fetched state.
    ///
    /// Description and matching column descriptions are overridden, live-only columns keep
    /// their description, and the label set is replaced wholesale: every live label is
    /// deleted, then every declared label is set.
    pub fn merge(state: &LiveViewState, query: String, metadata: Option<&ViewMetadata>) -> Self {
        let Some(metadata) = metadata else {
            return Self {
                query,
                description: None,
                columns: None,
                label_ops: Vec::new(),
            };
        };

        let columns = state
            .columns
            .iter()
            .map(|column| {
                let mut column = column.clone();
                if let Some(doc) = metadata.columns.iter().find(|doc| doc.name == column.name) {
                    column.description = doc.description.clone();
                }
                column
            })
            .collect();

        let label_ops = state
            .labels
            .keys()
            .sorted()
            .map(|key| LabelOp::Delete(key.clone()))
            .chain(
                metadata
                    .labels
                    .iter()
                    .sorted()
                    .map(|(key, value)| LabelOp::Set(key.clone(), value.clone())),
            )
            .collect();

        Self {
            query,
            description: Some(metadata.description.clone()),
            columns: Some(columns),
            label_ops,
        }
    }
}

fn canonical_metadata<'a>(
    description: &str,
    column_descriptions: impl Iterator<Item = &'a str>,
    labels: &HashMap<String, String>,
) -> String {
    let mut out = String::from(description);
    for column_description in column_descriptions {
        out.push_str(column_description);
    }

    for (key, value) in labels.iter().sorted_by(|a, b| a.0.cmp(b.0)) {
        out.push_str(key);
        out.push_str(value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn live(description: &str, columns: Vec<LiveColumn>, pairs: &[(&str, &str)]) -> LiveViewState {
        LiveViewState {
            view_query: "SELECT 1".to_string(),
            description: description.to_string(),
            columns,
            labels: labels(pairs),
            token: ConcurrencyToken("etag-1".to_string()),
        }
    }

    #[test]
    fn test_metadata_parses_sidecar_shape() {
        let json = r#"{
            "description": "users",
            "schema": [{"name": "id", "description": "primary id"}, {"name": "email"}],
            "labels": {"team": "growth"}
        }"#;
        let metadata: ViewMetadata = serde_json::from_str(json).unwrap();

        assert_eq!(metadata.description, "users");
        assert_eq!(metadata.columns.len(), 2);
        assert_eq!(metadata.columns[1].description, "");
        assert_eq!(metadata.labels.get("team").map(String::as_str), Some("growth"));
    }

    #[test]
    fn test_metadata_fields_default_when_missing() {
        let metadata: ViewMetadata = serde_json::from_str("{}").unwrap();
        assert_eq!(metadata, ViewMetadata::default());
    }

    #[test]
    fn test_canonical_is_label_order_independent() {
        let mut first = HashMap::new();
        first.insert("b".to_string(), "2".to_string());
        first.insert("a".to_string(), "1".to_string());
        first.insert("c".to_string(), "3".to_string());

        let mut second = HashMap::new();
        second.insert("c".to_string(), "3".to_string());
        second.insert("a".to_string(), "1".to_string());
        second.insert("b".to_string(), "2".to_string());

        let left = ViewMetadata {
            labels: first,
            ..Default::default()
        };
        let right = ViewMetadata {
            labels: second,
            ..Default::default()
        };
        assert_eq!(left.canonical(), right.canonical());
        assert_eq!(left.canonical(), "a1b2c3");
    }

    #[test]
    fn test_live_canonical_follows_declared_column_order() {
        let state = live(
            "desc",
            vec![
                LiveColumn::new("b", "second"),
                LiveColumn::new("extra", "ignored"),
                LiveColumn::new("a", "first"),
            ],
            &[("env", "prod")],
        );
        let declared = vec![
            ColumnDoc {
                name: "a".to_string(),
                description: "first".to_string(),
            },
            ColumnDoc {
                name: "b".to_string(),
                description: "second".to_string(),
            },
            ColumnDoc {
                name: "missing".to_string(),
                description: String::new(),
            },
        ];

        assert_eq!(state.canonical_metadata(&declared), "descfirstsecondenvprod");
    }

    #[test]
    fn test_merge_overrides_matching_columns_and_replaces_labels() {
        let mut typed = LiveColumn::new("id", "old");
        typed
            .attributes
            .insert("type".to_string(), serde_json::json!("INTEGER"));
        let state = live(
            "old description",
            vec![typed, LiveColumn::new("live_only", "kept")],
            &[("team", "x"), ("env", "staging")],
        );
        let metadata = ViewMetadata {
            description: "new description".to_string(),
            columns: vec![ColumnDoc {
                name: "id".to_string(),
                description: "new".to_string(),
            }],
            labels: labels(&[("env", "prod")]),
        };

        let update = ViewUpdate::merge(&state, "SELECT 2".to_string(), Some(&metadata));

        assert_eq!(update.description.as_deref(), Some("new description"));
        let columns = update.columns.unwrap();
        assert_eq!(columns[0].description, "new");
        assert_eq!(columns[0].attributes.get("type"), Some(&serde_json::json!("INTEGER")));
        assert_eq!(columns[1].description, "kept");
        assert_eq!(
            update.label_ops,
            vec![
                LabelOp::Delete("env".to_string()),
                LabelOp::Delete("team".to_string()),
                LabelOp::Set("env".to_string(), "prod".to_string()),
            ]
        );
    }

    #[test]
    fn test_merge_without_metadata_only_carries_query() {
        let state = live("keep me", vec![LiveColumn::new("id", "doc")], &[("env", "x")]);
        let update = ViewUpdate::merge(&state, "SELECT 3".to_string(), None);

        assert_eq!(update.query, "SELECT 3");
        assert!(update.description.is_none());
        assert!(update.columns.is_none());
        assert!(update.label_ops.is_empty());
    }

    #[test]
    fn test_view_id_display() {
        assert_eq!(ViewId::new("sales", "daily").to_string(), "sales.daily");
    }
}
