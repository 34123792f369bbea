use lazy_static::lazy_static;
use regex::Regex;

use crate::framework::core::infrastructure::view::ViewId;

lazy_static! {
    static ref VIEW_NAME_PATTERN: Regex =
        Regex::new(r"^([^.]+)\.([^.]+)$").expect("view name pattern is valid");
}

/// Parses a `dataset.view` name. Returns `None` unless there is exactly one dot with a
/// non-empty name on each side.
pub fn parse_view_name(name: &str) -> Option<ViewId> {
    let captures = VIEW_NAME_PATTERN.captures(name)?;
    Some(ViewId::new(&captures[1], &captures[2]))
}
