use crate::cli::display::Message;
use crate::framework::core::template::render_query;
use crate::project::Project;
use crate::utilities::identifiers::parse_view_name;

use super::{load_definitions, load_parameters, RoutineFailure, RoutineSuccess};

/// Renders one view and prints the SQL as is. BigQuery is not contacted.
pub fn query(project: &Project, name: &str) -> Result<RoutineSuccess, RoutineFailure> {
    let id = parse_view_name(name).ok_or_else(|| {
        RoutineFailure::error(Message::new(
            "Query".to_string(),
            format!("argument must be in <dataset>.<view> format, got {name:?}"),
        ))
    })?;

    let loaded = load_definitions(project)?;
    let definition = loaded
        .definitions
        .find(&id.dataset_name, &id.view_name)
        .ok_or_else(|| {
            RoutineFailure::error(Message::new(
                "Query".to_string(),
                format!("View {id} not found in {:?}", project.base_dir()),
            ))
        })?;

    let params = load_parameters(project)?;
    let rendered = render_query(&definition.query_template, &params).map_err(|e| {
        RoutineFailure::new(
            Message::new("Query".to_string(), format!("Failed to render {id}")),
            e,
        )
    })?;

    print!("{rendered}");
    Ok(RoutineSuccess::silent())
}
