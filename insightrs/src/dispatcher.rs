//! Asynchronous retrieval lifecycle of the results area.
//!
//! Every accepted `run` allocates a fresh request id and moves the state to
//! `Loading`. A completed retrieval is committed only if its id is still the
//! latest issued one; anything older is dropped without touching the state, so
//! the visible result always belongs to the most recent request regardless of
//! the order in which responses arrive.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::backends::QueryBackend;
use crate::config::DispatcherConfig;
use crate::error::{InsightError, Result};
use crate::models::{AnalyticsQuery, ResultRow};
use crate::result_cache::ResultCache;
use crate::signature::QuerySignature;

pub type SharedRows = Arc<Vec<ResultRow>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, Default)]
pub struct RequestState {
    pub status: RequestStatus,
    pub query: Option<AnalyticsQuery>,
    pub rows: Option<SharedRows>,
    pub error: Option<Arc<InsightError>>,
    /// Id of the latest issued request; 0 until the first run.
    pub request_id: u64,
}

impl RequestState {
    pub fn is_loading(&self) -> bool {
        self.status == RequestStatus::Loading
    }
}

/// Handle to one accepted run. Dropping it does not cancel anything.
#[derive(Debug)]
pub struct DispatchTicket {
    pub request_id: u64,
    pub signature: QuerySignature,
    task: Option<JoinHandle<()>>,
}

impl DispatchTicket {
    /// True when the run was answered from the result cache.
    pub fn served_from_cache(&self) -> bool {
        self.task.is_none()
    }

    /// Wait until this request's response has been committed or discarded.
    pub async fn finished(self) {
        if let Some(task) = self.task {
            if let Err(err) = task.await {
                tracing::warn!(request_id = self.request_id, error = %err, "retrieval task failed");
            }
        }
    }
}

#[derive(Clone)]
pub struct QueryDispatcher {
    backend: Arc<dyn QueryBackend>,
    state: Arc<watch::Sender<RequestState>>,
    cache: Arc<Mutex<ResultCache>>,
}

impl QueryDispatcher {
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        Self::with_config(backend, &DispatcherConfig::default())
    }

    pub fn with_config(backend: Arc<dyn QueryBackend>, config: &DispatcherConfig) -> Self {
        let (state, _) = watch::channel(RequestState::default());
        Self {
            backend,
            state: Arc::new(state),
            cache: Arc::new(Mutex::new(ResultCache::with_config(config))),
        }
    }

    pub fn current_state(&self) -> RequestState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every committed state change.
    pub fn subscribe(&self) -> watch::Receiver<RequestState> {
        self.state.subscribe()
    }

    /// Wait until no request is loading and return the state at that point.
    pub async fn settled(&self) -> RequestState {
        let mut receiver = self.subscribe();
        let settled = receiver
            .wait_for(|state| !state.is_loading())
            .await
            .map(|state| state.clone());
        // The sender lives in `self`, so the channel cannot close under us.
        settled.unwrap_or_else(|_| self.current_state())
    }

    /// Start retrieving `query`.
    ///
    /// A query that is not runnable is rejected with a validation error and
    /// leaves the state untouched. Otherwise the request gets a new id, the
    /// state turns `Loading`, and the retrieval runs in the background.
    pub fn run(&self, query: AnalyticsQuery) -> Result<DispatchTicket> {
        if let Err(err) = query.validate() {
            tracing::debug!(error = %err, "rejecting query before dispatch");
            return Err(err);
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| InsightError::Retrieval(format!("no async runtime available: {e}")))?;

        let signature = QuerySignature::of(&query);
        let cached = self.lock_cache().get(&query);

        let mut request_id = 0;
        self.state.send_modify(|state| {
            state.request_id += 1;
            request_id = state.request_id;
            state.status = RequestStatus::Loading;
            state.query = Some(query.clone());
            state.rows = None;
            state.error = None;
        });

        if let Some(rows) = cached {
            tracing::debug!(
                request_id,
                signature = %signature,
                rows = rows.len(),
                "serving query from result cache"
            );
            complete(&self.state, &self.cache, request_id, query, Ok(rows));
            return Ok(DispatchTicket {
                request_id,
                signature,
                task: None,
            });
        }

        tracing::debug!(request_id, signature = %signature, "dispatching query");
        let backend = self.backend.clone();
        let state = self.state.clone();
        let cache = self.cache.clone();
        let task = runtime.spawn(async move {
            let start = Instant::now();
            let outcome = backend
                .submit_query(&query)
                .await
                .map(Arc::new)
                .map_err(Arc::new);
            tracing::debug!(
                request_id,
                signature = %signature,
                ok = outcome.is_ok(),
                ms = start.elapsed().as_millis(),
                "retrieval finished"
            );
            complete(&state, &cache, request_id, query, outcome);
        });

        Ok(DispatchTicket {
            request_id,
            signature,
            task: Some(task),
        })
    }

    /// Forget cached results so the next run always reaches the backend.
    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, ResultCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Commit a response if it still belongs to the latest request.
fn complete(
    state: &watch::Sender<RequestState>,
    cache: &Mutex<ResultCache>,
    request_id: u64,
    query: AnalyticsQuery,
    outcome: std::result::Result<SharedRows, Arc<InsightError>>,
) {
    let mut latest = request_id;
    let committed = state.send_if_modified(|current| {
        if current.request_id != request_id {
            latest = current.request_id;
            return false;
        }
        match &outcome {
            Ok(rows) => {
                current.status = RequestStatus::Success;
                current.rows = Some(rows.clone());
                current.error = None;
            }
            Err(err) => {
                current.status = RequestStatus::Error;
                current.rows = None;
                current.error = Some(err.clone());
            }
        }
        true
    });

    if !committed {
        tracing::debug!(request_id, latest, "discarding superseded response");
        return;
    }

    match outcome {
        Ok(rows) => {
            cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(query, rows);
        }
        Err(err) => {
            tracing::warn!(request_id, error = %err, "query retrieval failed");
        }
    }
}

impl std::fmt::Debug for QueryDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryDispatcher")
            .field("state", &*self.state.borrow())
            .finish()
    }
}
