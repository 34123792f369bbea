//! Query validation against the warehouse.
//!
//! Validation never persists anything: the warehouse parses and plans the query and
//! reports whether it would run.

pub mod dry_run;
pub use dry_run::*;
