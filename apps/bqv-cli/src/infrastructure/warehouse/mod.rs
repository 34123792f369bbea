use crate::framework::core::infrastructure::view::{
    ConcurrencyToken, LiveLookup, LiveViewState, ViewUpdate,
};

pub mod bigquery;
#[cfg(test)]
pub mod memory;

#[derive(Debug, thiserror::Error)]
pub enum WarehouseError {
    /// Expected absence. Drives the create path and is not a user-visible failure there.
    #[error("{resource} was not found")]
    NotFound { resource: String },

    /// The concurrency token did not match: something else edited the resource since it was read.
    #[error("{resource} was modified concurrently, refusing to overwrite it")]
    Conflict { resource: String },

    /// A create raced with another writer that created the same resource first.
    #[error("{resource} already exists")]
    AlreadyExists { resource: String },

    /// The warehouse rejected a query during dry validation.
    #[error("Query validation failed: {message}")]
    Validation { message: String },

    #[error("Warehouse request failed: {message}")]
    Transport { message: String },
}

impl WarehouseError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, WarehouseError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, WarehouseError::AlreadyExists { .. })
    }
}

impl From<reqwest::Error> for WarehouseError {
    fn from(e: reqwest::Error) -> Self {
        WarehouseError::Transport {
            message: e.to_string(),
        }
    }
}

/// Operations the reconciler needs from a data warehouse.
///
/// Implementations own transport, authentication and retries. Absence of a resource is
/// reported either as a value (`Ok(false)`, `Ok(None)`) or as [`WarehouseError::NotFound`];
/// callers accept both.
#[async_trait::async_trait]
pub trait WarehouseClient: Send + Sync {
    /// Checks whether a dataset exists.
    async fn dataset_exists(&self, dataset: &str) -> Result<bool, WarehouseError>;

    /// # Errors
    ///
    /// Returns [`WarehouseError::AlreadyExists`] if the dataset was created in the meantime.
    async fn create_dataset(&self, dataset: &str) -> Result<(), WarehouseError>;

    /// Fetches the live state of a view, `None` if it does not exist.
    async fn get_view(
        &self,
        dataset: &str,
        view: &str,
    ) -> Result<Option<LiveViewState>, WarehouseError>;

    async fn create_view(
        &self,
        dataset: &str,
        view: &str,
        query: &str,
        description: Option<&str>,
    ) -> Result<(), WarehouseError>;

    /// Pushes an update guarded by `token`.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::Conflict`] if `token` is no longer current.
    async fn update_view(
        &self,
        dataset: &str,
        view: &str,
        update: &ViewUpdate,
        token: &ConcurrencyToken,
    ) -> Result<(), WarehouseError>;

    async fn delete_view(&self, dataset: &str, view: &str) -> Result<(), WarehouseError>;

    /// Validates a query without running it or persisting anything.
    async fn dry_validate_query(&self, query: &str) -> Result<(), WarehouseError>;
}

/// Resolves dataset existence. `NotFound` is folded into `false`.
pub async fn dataset_present<W: WarehouseClient + ?Sized>(
    warehouse: &W,
    dataset: &str,
) -> Result<bool, WarehouseError> {
    match warehouse.dataset_exists(dataset).await {
        Ok(exists) => Ok(exists),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Fetches the current state of a view, resolving the dataset first.
pub async fn lookup_view<W: WarehouseClient + ?Sized>(
    warehouse: &W,
    dataset: &str,
    view: &str,
) -> Result<LiveLookup, WarehouseError> {
    if !dataset_present(warehouse, dataset).await? {
        tracing::debug!("Dataset({}) doesn't exist", dataset);
        return Ok(LiveLookup::DatasetAbsent);
    }

    match warehouse.get_view(dataset, view).await {
        Ok(Some(state)) => {
            tracing::debug!("View({}.{}) was found", dataset, view);
            Ok(LiveLookup::Present(state))
        }
        Ok(None) => Ok(LiveLookup::ViewAbsent),
        Err(e) if e.is_not_found() => Ok(LiveLookup::ViewAbsent),
        Err(e) => Err(e),
    }
}
