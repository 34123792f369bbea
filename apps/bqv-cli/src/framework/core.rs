pub mod batch;
pub mod definition_set;
pub mod execute;
pub mod infrastructure;
pub mod plan;
pub mod template;
pub mod validation;
