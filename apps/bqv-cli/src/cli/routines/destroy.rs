use crate::cli::display::status::{format_success, format_unchanged};
use crate::cli::display::{Message, MessageType};
use crate::framework::core::execute::destroy_view;
use crate::infrastructure::warehouse::WarehouseClient;

use super::{RoutineFailure, RoutineSuccess, RunContext};

/// Deletes every defined view that exists.
pub async fn destroy<W: WarehouseClient + ?Sized>(
    warehouse: &W,
    context: &RunContext<'_>,
) -> Result<RoutineSuccess, RoutineFailure> {
    let report = context
        .run(|definition| destroy_view(warehouse, definition))
        .await;

    let mut deleted = 0;
    for (id, was_deleted) in report.successes() {
        let id = id.to_string();
        if *was_deleted {
            deleted += 1;
            show_message!(
                MessageType::Success,
                Message::new("Deleted".to_string(), format_success(&id, "deleted"))
            );
        } else {
            show_message!(
                MessageType::Info,
                Message::new("Skipped".to_string(), format_unchanged(&id, "absent"))
            );
        }
    }

    context.finish(
        "Destroy",
        &report,
        format!("{} of {} views deleted", deleted, context.view_count()),
    )
}
