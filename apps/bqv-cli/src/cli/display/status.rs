//! Per-view status lines, e.g. `✓ sales.daily: created`.

pub const STATUS_SUCCESS: &str = "✓";

pub const STATUS_UNCHANGED: &str = "-";

pub const STATUS_ERROR: &str = "✗";

pub fn format_success(item: &str, message: &str) -> String {
    format!("{} {}: {}", STATUS_SUCCESS, item, message)
}

pub fn format_unchanged(item: &str, message: &str) -> String {
    format!("{} {}: {}", STATUS_UNCHANGED, item, message)
}

pub fn format_error(item: &str, message: &str) -> String {
    format!("{} {}: {}", STATUS_ERROR, item, message)
}
