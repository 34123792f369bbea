//! # Routines
//!
//! A routine is what a command runs: a function returning [`RoutineSuccess`] or
//! [`RoutineFailure`]. Routines print per-view lines as they go; the returned message is the
//! summary `main` shows last, and a failure makes the process exit non-zero.
//!
//! Warehouse-backed routines share one shape: load definitions and parameters, run a
//! per-view operation over the whole set with [`run_batch`], report each view, then
//! summarize. A view that fails never stops the others, and loader errors count as
//! failures in the summary.

use tokio_util::sync::CancellationToken;

use crate::cli::display::status::format_error;
use crate::cli::display::{show_message_wrapper, Message, MessageType};
use crate::framework::core::batch::{error_chain, run_batch, BatchReport, ViewError};
use crate::framework::core::infrastructure::view::ViewDefinition;
use crate::framework::core::template::Parameters;
use crate::project::{LoadedDefinitions, Project};

pub mod apply;
pub mod destroy;
pub mod plan;
pub mod query;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutineSuccess {
    pub message: Message,
    pub message_type: MessageType,
}

impl From<RoutineFailure> for anyhow::Error {
    fn from(failure: RoutineFailure) -> Self {
        if let Some(err) = failure.error {
            err
        } else {
            anyhow::anyhow!("{}: {}", failure.message.action, failure.message.details)
        }
    }
}

impl RoutineSuccess {
    pub fn success(message: Message) -> Self {
        Self {
            message,
            message_type: MessageType::Success,
        }
    }

    pub fn highlight(message: Message) -> Self {
        Self {
            message,
            message_type: MessageType::Highlight,
        }
    }

    /// A success with nothing left to display.
    pub fn silent() -> Self {
        Self::success(Message::new(String::new(), String::new()))
    }

    pub fn is_silent(&self) -> bool {
        self.message.action.is_empty() && self.message.details.is_empty()
    }

    pub fn show(&self) {
        show_message_wrapper(self.message_type, self.message.clone());
    }
}

#[derive(Debug)]
pub struct RoutineFailure {
    pub message: Message,
    pub message_type: MessageType,
    pub error: Option<anyhow::Error>,
}

impl RoutineFailure {
    pub fn new<F: Into<anyhow::Error>>(message: Message, error: F) -> Self {
        Self {
            message,
            message_type: MessageType::Error,
            error: Some(error.into()),
        }
    }

    /// create a RoutineFailure error without an error
    pub fn error(message: Message) -> Self {
        Self {
            message,
            message_type: MessageType::Error,
            error: None,
        }
    }
}

/// Everything a warehouse-backed routine needs besides the warehouse itself.
pub struct RunContext<'a> {
    pub loaded: &'a LoadedDefinitions,
    pub params: &'a Parameters,
    pub concurrency: usize,
    pub cancel: &'a CancellationToken,
}

impl RunContext<'_> {
    /// Runs `operation` over every loaded definition.
    pub async fn run<'a, T, F, Fut>(&'a self, operation: F) -> BatchReport<T>
    where
        F: Fn(&'a ViewDefinition) -> Fut,
        Fut: std::future::Future<Output = Result<T, ViewError>> + 'a,
    {
        run_batch(
            &self.loaded.definitions,
            self.concurrency,
            self.cancel,
            operation,
        )
        .await
    }

    /// Total number of views attempted, including the ones that failed to load.
    pub fn view_count(&self) -> usize {
        self.loaded.definitions.len() + self.loaded.errors.len()
    }

    /// Shows the failed views and turns the batch into the routine result.
    pub fn finish<T>(
        &self,
        action: &str,
        report: &BatchReport<T>,
        summary: String,
    ) -> Result<RoutineSuccess, RoutineFailure> {
        for (id, error) in report.failures() {
            show_message_wrapper(
                MessageType::Error,
                Message::new(
                    "Failed".to_string(),
                    format_error(&id.to_string(), &error_chain(error)),
                ),
            );
        }

        let failed = report.failure_count() + self.loaded.errors.len();
        if failed > 0 {
            return Err(RoutineFailure::error(Message::new(
                action.to_string(),
                format!("{} of {} views failed", failed, self.view_count()),
            )));
        }

        Ok(RoutineSuccess::success(Message::new(
            action.to_string(),
            summary,
        )))
    }
}

pub fn load_definitions(project: &Project) -> Result<LoadedDefinitions, RoutineFailure> {
    let loaded = project.load_definitions().map_err(|e| {
        RoutineFailure::new(
            Message::new(
                "Loading".to_string(),
                format!("Failed to read view definitions from {:?}", project.base_dir()),
            ),
            e,
        )
    })?;

    for (id, error) in &loaded.errors {
        show_message_wrapper(
            MessageType::Error,
            Message::new(
                "Invalid".to_string(),
                format_error(&id.to_string(), &error_chain(error)),
            ),
        );
    }

    Ok(loaded)
}

pub fn load_parameters(project: &Project) -> Result<Parameters, RoutineFailure> {
    project.load_parameters().map_err(|e| {
        RoutineFailure::new(
            Message::new(
                "Parameters".to_string(),
                format!("Failed to load parameters from {:?}", project.param_file),
            ),
            e,
        )
    })
}
