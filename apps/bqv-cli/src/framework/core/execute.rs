/// # View Execution Module
///
/// Converges one view towards its definition:
///
/// ```text
/// Absent          --create--> Created
/// Present+NoDiff  --skip----> Unchanged
/// Present+Diff    --update--> Updated
/// ```
///
/// A missing dataset is resolved first and independently of the view. The skip decision
/// uses the same diff as `bqv plan`, and a skipped view never sees a mutating call, which
/// is what makes repeated unattended runs safe. Updates carry the concurrency token of the
/// state they were computed from, so an edit made by someone else in between fails with
/// a conflict instead of being overwritten. Nothing here retries.
use serde::Serialize;

use super::batch::ViewError;
use super::infrastructure::view::{LiveLookup, LiveViewState, ViewDefinition, ViewUpdate};
use super::plan::diff_rendered;
use super::template::{render_query, Parameters};
use crate::infrastructure::warehouse::{
    dataset_present, lookup_view, WarehouseClient, WarehouseError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ApplyOutcome {
    Created,
    Updated,
    Unchanged,
}

impl ApplyOutcome {
    pub fn changed(&self) -> bool {
        !matches!(self, ApplyOutcome::Unchanged)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyOutcome::Created => "created",
            ApplyOutcome::Updated => "updated",
            ApplyOutcome::Unchanged => "unchanged",
        }
    }
}

/// Creates the dataset when it does not exist yet.
///
/// Views sharing a new dataset may race to create it; losing that race is success.
async fn ensure_dataset<W: WarehouseClient + ?Sized>(
    warehouse: &W,
    dataset: &str,
) -> Result<(), WarehouseError> {
    if dataset_present(warehouse, dataset).await? {
        return Ok(());
    }

    tracing::info!("Dataset({}) was not found. creating it...", dataset);
    match warehouse.create_dataset(dataset).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_already_exists() => {
            tracing::debug!("Dataset({}) was created by someone else", dataset);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Failed to create dataset({}): {}", dataset, e);
            Err(e)
        }
    }
}

/// Creates or updates the view so that it matches `definition`.
pub async fn apply_view<W: WarehouseClient + ?Sized>(
    warehouse: &W,
    definition: &ViewDefinition,
    params: &Parameters,
) -> Result<ApplyOutcome, ViewError> {
    let dataset = definition.dataset_name.as_str();
    let view = definition.view_name.as_str();

    let query = render_query(&definition.query_template, params).map_err(|e| {
        tracing::error!("Failed to render query of view({}.{}): {}", dataset, view, e);
        e
    })?;

    ensure_dataset(warehouse, dataset).await?;

    let live = lookup_view(warehouse, dataset, view).await?;
    let Some(state) = live.state() else {
        create_view(warehouse, definition, query).await?;
        return Ok(ApplyOutcome::Created);
    };

    let Some(diff) = diff_rendered(definition, &live, query) else {
        tracing::info!(
            "Skipping View({}.{}). It exists and hasn't changed.",
            dataset,
            view
        );
        return Ok(ApplyOutcome::Unchanged);
    };

    tracing::info!(
        "Updating view({}.{}) (query changed: {}, metadata changed: {})",
        dataset,
        view,
        diff.query_changed(),
        diff.metadata_changed
    );
    push_update(warehouse, definition, state, diff.new_query).await?;
    Ok(ApplyOutcome::Updated)
}

async fn create_view<W: WarehouseClient + ?Sized>(
    warehouse: &W,
    definition: &ViewDefinition,
    query: String,
) -> Result<(), ViewError> {
    let dataset = definition.dataset_name.as_str();
    let view = definition.view_name.as_str();
    let description = definition
        .metadata
        .as_ref()
        .map(|m| m.description.as_str())
        .filter(|d| !d.is_empty());

    tracing::info!("Creating view({}.{}) ...", dataset, view);
    warehouse
        .create_view(dataset, view, &query, description)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create view({}.{}): {}", dataset, view, e);
            e
        })?;

    if definition.metadata.is_none() {
        return Ok(());
    }

    // Column docs and labels can only be written through an update against the created
    // view, so the fresh state becomes the baseline.
    let baseline = warehouse
        .get_view(dataset, view)
        .await?
        .map(LiveLookup::Present)
        .ok_or_else(|| WarehouseError::NotFound {
            resource: format!("View({dataset}.{view})"),
        })?;

    if let (Some(state), Some(diff)) = (
        baseline.state(),
        diff_rendered(definition, &baseline, query),
    ) {
        push_update(warehouse, definition, state, diff.new_query).await?;
    }
    Ok(())
}

async fn push_update<W: WarehouseClient + ?Sized>(
    warehouse: &W,
    definition: &ViewDefinition,
    state: &LiveViewState,
    query: String,
) -> Result<(), ViewError> {
    let dataset = definition.dataset_name.as_str();
    let view = definition.view_name.as_str();
    let update = ViewUpdate::merge(state, query, definition.metadata.as_ref());

    for op in &update.label_ops {
        tracing::debug!("Label operation on view({}.{}): {:?}", dataset, view, op);
    }

    warehouse
        .update_view(dataset, view, &update, &state.token)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update view({}.{}): {}", dataset, view, e);
            e
        })?;
    Ok(())
}

/// Deletes the view if it exists. Returns `true` when something was deleted.
///
/// The dataset is never deleted.
pub async fn destroy_view<W: WarehouseClient + ?Sized>(
    warehouse: &W,
    definition: &ViewDefinition,
) -> Result<bool, ViewError> {
    let dataset = definition.dataset_name.as_str();
    let view = definition.view_name.as_str();

    if lookup_view(warehouse, dataset, view).await?.state().is_none() {
        tracing::debug!("View({}.{}) doesn't exist, nothing to delete", dataset, view);
        return Ok(false);
    }

    tracing::info!("View({}.{}) was found. deleting...", dataset, view);
    match warehouse.delete_view(dataset, view).await {
        Ok(()) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e.into()),
    }
}
