use crate::cli::display::{Message, MessageType};
use crate::framework::core::plan::plan_view;
use crate::infrastructure::warehouse::WarehouseClient;

use super::{RoutineFailure, RoutineSuccess, RunContext};

/// Prints a Markdown block for every view that would change. Never mutates the warehouse.
pub async fn plan<W: WarehouseClient + ?Sized>(
    warehouse: &W,
    context: &RunContext<'_>,
) -> Result<RoutineSuccess, RoutineFailure> {
    let report = context
        .run(|definition| plan_view(warehouse, definition, context.params))
        .await;

    let mut changes = 0;
    for (id, diff) in report.successes() {
        match diff {
            Some(diff) => {
                changes += 1;
                println!("{}", diff.to_markdown());
            }
            None => tracing::debug!("View({}) has no changes", id),
        }
    }

    if changes == 0 && !report.has_failures() && context.loaded.errors.is_empty() {
        show_message!(
            MessageType::Info,
            Message::new("Plan".to_string(), "No changes".to_string())
        );
    }

    context.finish(
        "Plan",
        &report,
        format!("{} of {} views would change", changes, context.view_count()),
    )
}
