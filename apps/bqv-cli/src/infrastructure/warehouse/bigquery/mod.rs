pub mod client;
pub mod config;
pub mod model;

pub use client::BigQueryClient;
pub use config::{BigQueryConfig, BigQueryConfigError};
