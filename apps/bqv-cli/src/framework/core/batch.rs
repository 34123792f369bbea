//! # Batch Execution
//!
//! Runs one per-view operation (plan, apply, dry-run, destroy) over a whole
//! [`DefinitionSet`]. Every definition is attempted regardless of what happened to the
//! others; failures are logged with the view identity and collected in a [`BatchReport`].
//!
//! The fan-out is a stream of independent futures polled with a bounded concurrency and
//! collected in definition order. A concurrency of 1 runs views strictly one after the
//! other. Cancelling the token stops new views from starting and drops in-flight warehouse
//! calls; every view that did not finish is reported as [`ViewError::Cancelled`].

use std::future::Future;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use super::definition_set::DefinitionSet;
use super::infrastructure::view::{ViewDefinition, ViewId};
use super::template::TemplateError;
use crate::infrastructure::warehouse::WarehouseError;

/// Error scoped to a single view. Never aborts the batch.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("Invalid view configuration")]
    Config(#[from] TemplateError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error("Cancelled before completion")]
    Cancelled,
}

/// Outcome of one view within a batch.
#[derive(Debug)]
pub struct ViewReport<T> {
    pub id: ViewId,
    pub result: Result<T, ViewError>,
}

#[derive(Debug)]
pub struct BatchReport<T> {
    pub reports: Vec<ViewReport<T>>,
}

impl<T> BatchReport<T> {
    pub fn failure_count(&self) -> usize {
        self.reports.iter().filter(|r| r.result.is_err()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }

    pub fn successes(&self) -> impl Iterator<Item = (&ViewId, &T)> {
        self.reports
            .iter()
            .filter_map(|r| r.result.as_ref().ok().map(|value| (&r.id, value)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&ViewId, &ViewError)> {
        self.reports
            .iter()
            .filter_map(|r| r.result.as_ref().err().map(|e| (&r.id, e)))
    }
}

/// Applies `operation` to every definition and collects the per-view results.
///
/// `concurrency` is clamped to at least 1.
pub async fn run_batch<'a, T, F, Fut>(
    definitions: &'a DefinitionSet,
    concurrency: usize,
    cancel: &CancellationToken,
    operation: F,
) -> BatchReport<T>
where
    F: Fn(&'a ViewDefinition) -> Fut,
    Fut: Future<Output = Result<T, ViewError>> + 'a,
{
    let operation = &operation;
    let reports = stream::iter(definitions.iter())
        .map(move |definition| async move {
            let id = definition.id();
            let result = if cancel.is_cancelled() {
                Err(ViewError::Cancelled)
            } else {
                tokio::select! {
                    biased;
                    result = operation(definition) => result,
                    _ = cancel.cancelled() => Err(ViewError::Cancelled),
                }
            };

            if let Err(e) = &result {
                tracing::error!("View({}) failed: {}", id, error_chain(e));
            }
            ViewReport { id, result }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    BatchReport { reports }
}

/// Flattens an error and its sources into one line.
pub fn error_chain(e: &(dyn std::error::Error + 'static)) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
