//! # CLI Commands
//! A module for all the commands that can be run from the CLI

use clap::Subcommand;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Shows, per view, the query that is live and the query that would be applied
    Plan,
    /// Creates or updates every view so that it matches its definition
    Apply {
        /// Validate the queries that would change with a BigQuery dry run instead of applying them
        #[arg(long)]
        dry_run: bool,
    },
    /// Deletes every defined view that exists. Datasets are kept
    Destroy,
    /// Prints the rendered query of a single view without contacting BigQuery
    Query {
        /// View to render, as <dataset>.<view>
        name: String,
    },
}
