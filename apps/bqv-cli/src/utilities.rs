pub mod constants;
pub mod identifiers;
