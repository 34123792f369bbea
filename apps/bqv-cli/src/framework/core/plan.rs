/// # View Planning Module
///
/// Compares a declared view against what the warehouse currently holds and describes the
/// difference, if any. The same comparison backs `bqv plan` and the skip decision of
/// `bqv apply`, so a view that plans clean is never touched by apply.
///
/// Queries are compared verbatim: the warehouse stores and returns the query text as
/// submitted, so any whitespace change is a real change. Metadata is compared through a
/// canonical string built the same way on both sides (see [`ViewMetadata::canonical`]),
/// because the warehouse hands labels back in no particular order.
use serde::Serialize;

use super::batch::ViewError;
use super::infrastructure::view::{LiveLookup, ViewDefinition, ViewMetadata};
use super::template::{render_query, Parameters, TemplateError};
use crate::infrastructure::warehouse::{lookup_view, WarehouseClient};

/// What would change for one view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewDiff {
    pub dataset_name: String,
    pub view_name: String,
    /// Empty when the view does not exist yet.
    pub old_query: String,
    pub new_query: String,
    pub metadata_changed: bool,
}

impl ViewDiff {
    pub fn query_changed(&self) -> bool {
        self.old_query != self.new_query
    }

    /// Markdown block shown by `bqv plan`.
    pub fn to_markdown(&self) -> String {
        format!(
            "## {}.{}\n### Old\n```sql\n{}\n```\n### New\n```sql\n{}\n```\nMetadata changed: {}\n",
            self.dataset_name,
            self.view_name,
            self.old_query,
            self.new_query,
            self.metadata_changed
        )
    }
}

/// Computes the diff for an already-rendered query.
///
/// Returns `None` when neither the query nor the managed metadata differ.
pub fn diff_rendered(
    definition: &ViewDefinition,
    live: &LiveLookup,
    new_query: String,
) -> Option<ViewDiff> {
    let metadata = definition.metadata.as_ref();

    let state = match live {
        LiveLookup::DatasetAbsent | LiveLookup::ViewAbsent => {
            return Some(ViewDiff {
                dataset_name: definition.dataset_name.clone(),
                view_name: definition.view_name.clone(),
                old_query: String::new(),
                new_query,
                metadata_changed: metadata.is_some(),
            });
        }
        LiveLookup::Present(state) => state,
    };

    let metadata_changed = metadata.is_some_and(|metadata: &ViewMetadata| {
        let declared = metadata.canonical();
        let current = state.canonical_metadata(&metadata.columns);
        tracing::debug!(
            "Old metadata string({}.{}): {}",
            definition.dataset_name,
            definition.view_name,
            current
        );
        tracing::debug!(
            "New metadata string({}.{}): {}",
            definition.dataset_name,
            definition.view_name,
            declared
        );
        declared != current
    });

    if state.view_query == new_query && !metadata_changed {
        return None;
    }

    Some(ViewDiff {
        dataset_name: definition.dataset_name.clone(),
        view_name: definition.view_name.clone(),
        old_query: state.view_query.clone(),
        new_query,
        metadata_changed,
    })
}

/// Renders the definition and diffs it against `live`.
pub fn diff_view(
    definition: &ViewDefinition,
    live: &LiveLookup,
    params: &Parameters,
) -> Result<Option<ViewDiff>, TemplateError> {
    let new_query = render_query(&definition.query_template, params)?;
    Ok(diff_rendered(definition, live, new_query))
}

/// Fetches live state and diffs one definition against it. Never mutates the warehouse.
pub async fn plan_view<W: WarehouseClient + ?Sized>(
    warehouse: &W,
    definition: &ViewDefinition,
    params: &Parameters,
) -> Result<Option<ViewDiff>, ViewError> {
    let new_query = render_query(&definition.query_template, params)?;
    let live = lookup_view(warehouse, &definition.dataset_name, &definition.view_name).await?;
    Ok(diff_rendered(definition, &live, new_query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::core::infrastructure::view::{
        ColumnDoc, ConcurrencyToken, LiveColumn, LiveViewState,
    };
    use crate::infrastructure::warehouse::memory::InMemoryWarehouse;
    use std::collections::HashMap;

    fn present(query: &str) -> LiveLookup {
        LiveLookup::Present(LiveViewState {
            view_query: query.to_string(),
            description: String::new(),
            columns: vec![],
            labels: HashMap::new(),
            token: ConcurrencyToken("etag".to_string()),
        })
    }

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_changed_query_produces_diff() {
        let definition = ViewDefinition::new("d", "v", "SELECT 2");
        let diff = diff_view(&definition, &present("SELECT 1"), &Parameters::new())
            .unwrap()
            .unwrap();

        assert_eq!(diff.old_query, "SELECT 1");
        assert_eq!(diff.new_query, "SELECT 2");
        assert!(!diff.metadata_changed);
        assert!(diff.query_changed());
    }

    #[test]
    fn test_identical_query_without_metadata_is_no_diff() {
        let definition = ViewDefinition::new("d", "v", "SELECT 1");
        let mut live = present("SELECT 1");
        if let LiveLookup::Present(state) = &mut live {
            state.description = "managed elsewhere".to_string();
            state.labels = labels(&[("owner", "someone")]);
        }

        assert!(diff_view(&definition, &live, &Parameters::new())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_query_comparison_is_whitespace_sensitive() {
        let definition = ViewDefinition::new("d", "v", "SELECT 1\n");
        let diff = diff_view(&definition, &present("SELECT 1"), &Parameters::new()).unwrap();
        assert!(diff.is_some());
    }

    #[test]
    fn test_rendered_query_is_compared() {
        let definition = ViewDefinition::new("d", "v", "SELECT * FROM `{{project}}.raw.t`");
        let params = Parameters::new().with("project", "acme");

        let diff = diff_view(&definition, &present("SELECT * FROM `acme.raw.t`"), &params).unwrap();
        assert!(diff.is_none());
    }

    #[test]
    fn test_absent_view_diffs_from_empty_query() {
        let definition = ViewDefinition::new("d", "v", "SELECT 1");
        for lookup in [LiveLookup::DatasetAbsent, LiveLookup::ViewAbsent] {
            let diff = diff_view(&definition, &lookup, &Parameters::new())
                .unwrap()
                .unwrap();
            assert_eq!(diff.old_query, "");
            assert_eq!(diff.new_query, "SELECT 1");
            assert!(!diff.metadata_changed);
        }

        let with_metadata = definition.with_metadata(ViewMetadata::default());
        let diff = diff_view(&with_metadata, &LiveLookup::ViewAbsent, &Parameters::new())
            .unwrap()
            .unwrap();
        assert!(diff.metadata_changed);
    }

    #[test]
    fn test_label_change_is_metadata_diff() {
        let definition = ViewDefinition::new("d", "v", "SELECT 1").with_metadata(ViewMetadata {
            labels: labels(&[("env", "prod")]),
            ..Default::default()
        });
        let mut live = present("SELECT 1");
        if let LiveLookup::Present(state) = &mut live {
            state.labels = labels(&[("env", "staging"), ("team", "x")]);
        }

        let diff = diff_view(&definition, &live, &Parameters::new())
            .unwrap()
            .unwrap();
        assert!(diff.metadata_changed);
        assert!(!diff.query_changed());
    }

    #[test]
    fn test_matching_metadata_is_no_diff() {
        let definition = ViewDefinition::new("d", "v", "SELECT 1").with_metadata(ViewMetadata {
            description: "users".to_string(),
            columns: vec![ColumnDoc {
                name: "id".to_string(),
                description: "primary id".to_string(),
            }],
            labels: labels(&[("b", "2"), ("a", "1")]),
        });
        let mut live = present("SELECT 1");
        if let LiveLookup::Present(state) = &mut live {
            state.description = "users".to_string();
            state.columns = vec![
                LiveColumn::new("id", "primary id"),
                LiveColumn::new("created_at", "documented in the console"),
            ];
            state.labels = labels(&[("a", "1"), ("b", "2")]);
        }

        assert!(diff_view(&definition, &live, &Parameters::new())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_column_description_change_is_metadata_diff() {
        let definition = ViewDefinition::new("d", "v", "SELECT 1").with_metadata(ViewMetadata {
            columns: vec![ColumnDoc {
                name: "id".to_string(),
                description: "new".to_string(),
            }],
            ..Default::default()
        });
        let mut live = present("SELECT 1");
        if let LiveLookup::Present(state) = &mut live {
            state.columns = vec![LiveColumn::new("id", "old")];
        }

        let diff = diff_view(&definition, &live, &Parameters::new())
            .unwrap()
            .unwrap();
        assert!(diff.metadata_changed);
    }

    #[test]
    fn test_template_error_is_reported() {
        let definition = ViewDefinition::new("d", "v", "SELECT {{missing}}");
        assert!(diff_view(&definition, &present("SELECT 1"), &Parameters::new()).is_err());
    }

    #[test]
    fn test_markdown_contains_both_queries() {
        let diff = ViewDiff {
            dataset_name: "d".to_string(),
            view_name: "v".to_string(),
            old_query: "SELECT 1".to_string(),
            new_query: "SELECT 2".to_string(),
            metadata_changed: true,
        };
        let markdown = diff.to_markdown();
        assert!(markdown.starts_with("## d.v\n### Old\n```sql\nSELECT 1\n```"));
        assert!(markdown.contains("### New\n```sql\nSELECT 2\n```"));
        assert!(markdown.contains("Metadata changed: true"));
    }

    #[tokio::test]
    async fn test_plan_view_never_mutates() {
        let warehouse = InMemoryWarehouse::new().with_view("d", "v", "SELECT 1");
        let changed = ViewDefinition::new("d", "v", "SELECT 2");
        let missing = ViewDefinition::new("other", "v", "SELECT 1");

        let diff = plan_view(&warehouse, &changed, &Parameters::new())
            .await
            .unwrap();
        assert!(diff.is_some());
        let diff = plan_view(&warehouse, &missing, &Parameters::new())
            .await
            .unwrap();
        assert_eq!(diff.unwrap().old_query, "");

        assert!(warehouse.mutations().is_empty());
    }
}
