use serde::Serialize;

use crate::framework::core::batch::ViewError;
use crate::framework::core::infrastructure::view::ViewDefinition;
use crate::framework::core::template::{render_query, Parameters};
use crate::infrastructure::warehouse::{lookup_view, WarehouseClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DryRunOutcome {
    /// The live view already runs this exact query. Validation was not invoked.
    Unchanged,
    /// The query would change live state and the warehouse accepted it.
    Valid,
}

impl DryRunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DryRunOutcome::Unchanged => "unchanged",
            DryRunOutcome::Valid => "valid",
        }
    }
}

/// Checks whether applying `definition` would submit a query the warehouse accepts.
///
/// Only the query is considered. Metadata is not validated by the warehouse, so a
/// metadata-only change reports [`DryRunOutcome::Unchanged`].
pub async fn dry_run_view<W: WarehouseClient + ?Sized>(
    warehouse: &W,
    definition: &ViewDefinition,
    params: &Parameters,
) -> Result<DryRunOutcome, ViewError> {
    let query = render_query(&definition.query_template, params)?;
    let live = lookup_view(warehouse, &definition.dataset_name, &definition.view_name).await?;

    if live.state().is_some_and(|state| state.view_query == query) {
        tracing::info!(
            "Skipping View({}.{}). It exists and hasn't changed.",
            definition.dataset_name,
            definition.view_name
        );
        return Ok(DryRunOutcome::Unchanged);
    }

    tracing::info!(
        "Validating query of view({}.{})",
        definition.dataset_name,
        definition.view_name
    );
    warehouse.dry_validate_query(&query).await?;
    Ok(DryRunOutcome::Valid)
}
