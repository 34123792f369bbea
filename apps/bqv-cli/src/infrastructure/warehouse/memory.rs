//! In-memory warehouse used by unit tests.
//!
//! Behaves like the real thing where reconciliation cares: tokens change on every write,
//! stale tokens are rejected, label operations apply in order. Every call is recorded so
//! tests can assert on exactly which mutations happened.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::framework::core::infrastructure::view::{
    ConcurrencyToken, LabelOp, LiveColumn, LiveViewState, ViewUpdate,
};

use super::{WarehouseClient, WarehouseError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    DatasetExists(String),
    CreateDataset(String),
    GetView(String, String),
    CreateView(String, String),
    UpdateView(String, String),
    DeleteView(String, String),
    DryValidate(String),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::CreateDataset(_) | Call::CreateView(..) | Call::UpdateView(..) | Call::DeleteView(..)
        )
    }
}

#[derive(Default)]
struct State {
    datasets: HashSet<String>,
    views: HashMap<(String, String), LiveViewState>,
    version: u64,
    calls: Vec<Call>,
    updates: Vec<ViewUpdate>,
    failing_datasets: HashSet<String>,
    failing_dataset_lookups: HashSet<String>,
    yield_after_dataset_lookup: bool,
    failing_views: HashSet<(String, String)>,
    invalid_queries: HashSet<String>,
    stale_tokens_on_update: bool,
}

impl State {
    fn next_token(&mut self) -> ConcurrencyToken {
        self.version += 1;
        ConcurrencyToken(format!("etag-{}", self.version))
    }
}

#[derive(Default)]
pub struct InMemoryWarehouse {
    state: Mutex<State>,
}

impl InMemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(self, dataset: &str) -> Self {
        self.state.lock().unwrap().datasets.insert(dataset.to_string());
        self
    }

    /// Seeds an existing view. Its dataset is created as well.
    pub fn with_view(self, dataset: &str, view: &str, query: &str) -> Self {
        self.with_view_state(dataset, view, query, "", vec![], &[])
    }

    pub fn with_view_state(
        self,
        dataset: &str,
        view: &str,
        query: &str,
        description: &str,
        columns: Vec<LiveColumn>,
        labels: &[(&str, &str)],
    ) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.datasets.insert(dataset.to_string());
            let token = state.next_token();
            state.views.insert(
                (dataset.to_string(), view.to_string()),
                LiveViewState {
                    view_query: query.to_string(),
                    description: description.to_string(),
                    columns,
                    labels: labels
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                    token,
                },
            );
        }
        self
    }

    /// Makes `create_dataset` fail for `dataset`.
    pub fn failing_dataset(self, dataset: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_datasets
            .insert(dataset.to_string());
        self
    }

    /// Makes `dataset_exists` fail for `dataset` with a transport error.
    pub fn failing_dataset_lookup(self, dataset: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_dataset_lookups
            .insert(dataset.to_string());
        self
    }

    /// Yields to the executor after every dataset lookup, letting concurrent views
    /// interleave between the existence check and the create.
    pub fn yielding_dataset_lookups(self) -> Self {
        self.state.lock().unwrap().yield_after_dataset_lookup = true;
        self
    }

    /// Makes every call touching `dataset.view` fail with a transport error.
    pub fn failing_view(self, dataset: &str, view: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_views
            .insert((dataset.to_string(), view.to_string()));
        self
    }

    pub fn rejecting_query(self, query: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .invalid_queries
            .insert(query.to_string());
        self
    }

    /// Simulates an external edit landing between every read and the following update.
    pub fn with_concurrent_edits(self) -> Self {
        self.state.lock().unwrap().stale_tokens_on_update = true;
        self
    }

    pub fn view(&self, dataset: &str, view: &str) -> Option<LiveViewState> {
        self.state
            .lock()
            .unwrap()
            .views
            .get(&(dataset.to_string(), view.to_string()))
            .cloned()
    }

    pub fn has_dataset(&self, dataset: &str) -> bool {
        self.state.lock().unwrap().datasets.contains(dataset)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn updates(&self) -> Vec<ViewUpdate> {
        self.state.lock().unwrap().updates.clone()
    }

    pub fn clear_calls(&self) {
        let mut state = self.state.lock().unwrap();
        state.calls.clear();
        state.updates.clear();
    }

    fn check_view(state: &State, dataset: &str, view: &str) -> Result<(), WarehouseError> {
        if state
            .failing_views
            .contains(&(dataset.to_string(), view.to_string()))
        {
            return Err(WarehouseError::Transport {
                message: format!("injected failure for {dataset}.{view}"),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl WarehouseClient for InMemoryWarehouse {
    async fn dataset_exists(&self, dataset: &str) -> Result<bool, WarehouseError> {
        let (result, yield_now) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::DatasetExists(dataset.to_string()));
            let result = if state.failing_dataset_lookups.contains(dataset) {
                Err(WarehouseError::Transport {
                    message: format!("cannot look up dataset {dataset}"),
                })
            } else if state.datasets.contains(dataset) {
                Ok(true)
            } else {
                Err(WarehouseError::NotFound {
                    resource: format!("Dataset({dataset})"),
                })
            };
            (result, state.yield_after_dataset_lookup)
        };

        if yield_now {
            tokio::task::yield_now().await;
        }
        result
    }

    async fn create_dataset(&self, dataset: &str) -> Result<(), WarehouseError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateDataset(dataset.to_string()));
        if state.failing_datasets.contains(dataset) {
            return Err(WarehouseError::Transport {
                message: format!("cannot create dataset {dataset}"),
            });
        }
        if !state.datasets.insert(dataset.to_string()) {
            return Err(WarehouseError::AlreadyExists {
                resource: format!("Dataset({dataset})"),
            });
        }
        Ok(())
    }

    async fn get_view(
        &self,
        dataset: &str,
        view: &str,
    ) -> Result<Option<LiveViewState>, WarehouseError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(Call::GetView(dataset.to_string(), view.to_string()));
        Self::check_view(&state, dataset, view)?;
        Ok(state
            .views
            .get(&(dataset.to_string(), view.to_string()))
            .cloned())
    }

    async fn create_view(
        &self,
        dataset: &str,
        view: &str,
        query: &str,
        description: Option<&str>,
    ) -> Result<(), WarehouseError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(Call::CreateView(dataset.to_string(), view.to_string()));
        Self::check_view(&state, dataset, view)?;
        if !state.datasets.contains(dataset) {
            return Err(WarehouseError::NotFound {
                resource: format!("Dataset({dataset})"),
            });
        }
        let token = state.next_token();
        state.views.insert(
            (dataset.to_string(), view.to_string()),
            LiveViewState {
                view_query: query.to_string(),
                description: description.unwrap_or_default().to_string(),
                columns: vec![],
                labels: HashMap::new(),
                token,
            },
        );
        Ok(())
    }

    async fn update_view(
        &self,
        dataset: &str,
        view: &str,
        update: &ViewUpdate,
        token: &ConcurrencyToken,
    ) -> Result<(), WarehouseError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(Call::UpdateView(dataset.to_string(), view.to_string()));
        state.updates.push(update.clone());
        Self::check_view(&state, dataset, view)?;

        let resource = format!("View({dataset}.{view})");
        let key = (dataset.to_string(), view.to_string());
        let current = state
            .views
            .get(&key)
            .map(|v| v.token.clone())
            .ok_or_else(|| WarehouseError::NotFound {
                resource: resource.clone(),
            })?;
        if state.stale_tokens_on_update || &current != token {
            return Err(WarehouseError::Conflict { resource });
        }

        let next = state.next_token();
        if let Some(live) = state.views.get_mut(&key) {
            live.view_query = update.query.clone();
            if let Some(description) = &update.description {
                live.description = description.clone();
            }
            if let Some(columns) = &update.columns {
                live.columns = columns.clone();
            }
            for op in &update.label_ops {
                match op {
                    LabelOp::Delete(k) => {
                        live.labels.remove(k);
                    }
                    LabelOp::Set(k, v) => {
                        live.labels.insert(k.clone(), v.clone());
                    }
                }
            }
            live.token = next;
        }
        Ok(())
    }

    async fn delete_view(&self, dataset: &str, view: &str) -> Result<(), WarehouseError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(Call::DeleteView(dataset.to_string(), view.to_string()));
        Self::check_view(&state, dataset, view)?;
        state
            .views
            .remove(&(dataset.to_string(), view.to_string()))
            .map(|_| ())
            .ok_or_else(|| WarehouseError::NotFound {
                resource: format!("View({dataset}.{view})"),
            })
    }

    async fn dry_validate_query(&self, query: &str) -> Result<(), WarehouseError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::DryValidate(query.to_string()));
        if state.invalid_queries.contains(query) {
            return Err(WarehouseError::Validation {
                message: format!("Syntax error in: {query}"),
            });
        }
        Ok(())
    }
}
