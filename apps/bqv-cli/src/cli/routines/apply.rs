use crate::cli::display::status::{format_success, format_unchanged};
use crate::cli::display::{Message, MessageType};
use crate::framework::core::execute::{apply_view, ApplyOutcome};
use crate::framework::core::validation::{dry_run_view, DryRunOutcome};
use crate::infrastructure::warehouse::WarehouseClient;

use super::{RoutineFailure, RoutineSuccess, RunContext};

/// Creates or updates every view. Views that already match are left untouched.
pub async fn apply<W: WarehouseClient + ?Sized>(
    warehouse: &W,
    context: &RunContext<'_>,
) -> Result<RoutineSuccess, RoutineFailure> {
    let report = context
        .run(|definition| apply_view(warehouse, definition, context.params))
        .await;

    let (mut created, mut updated, mut unchanged) = (0, 0, 0);
    for (id, outcome) in report.successes() {
        let id = id.to_string();
        match outcome {
            ApplyOutcome::Created => created += 1,
            ApplyOutcome::Updated => updated += 1,
            ApplyOutcome::Unchanged => unchanged += 1,
        }
        if outcome.changed() {
            show_message!(
                MessageType::Success,
                Message::new("Applied".to_string(), format_success(&id, outcome.as_str()))
            );
        } else {
            show_message!(
                MessageType::Info,
                Message::new("Skipped".to_string(), format_unchanged(&id, outcome.as_str()))
            );
        }
    }

    context.finish(
        "Apply",
        &report,
        format!("{created} created, {updated} updated, {unchanged} unchanged"),
    )
}

/// Validates, without applying, every query that would change live state.
pub async fn dry_run<W: WarehouseClient + ?Sized>(
    warehouse: &W,
    context: &RunContext<'_>,
) -> Result<RoutineSuccess, RoutineFailure> {
    let report = context
        .run(|definition| dry_run_view(warehouse, definition, context.params))
        .await;

    let (mut valid, mut unchanged) = (0, 0);
    for (id, outcome) in report.successes() {
        let id = id.to_string();
        match outcome {
            DryRunOutcome::Valid => {
                valid += 1;
                show_message!(
                    MessageType::Success,
                    Message::new("Valid".to_string(), format_success(&id, outcome.as_str()))
                );
            }
            DryRunOutcome::Unchanged => {
                unchanged += 1;
                show_message!(
                    MessageType::Info,
                    Message::new("Skipped".to_string(), format_unchanged(&id, outcome.as_str()))
                );
            }
        }
    }

    context.finish(
        "Dry run",
        &report,
        format!("{valid} valid, {unchanged} unchanged"),
    )
}
