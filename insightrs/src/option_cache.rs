//! Session cache of remote filter option lists.
//!
//! One fetch per field is shared by every filter row that asks for it, whether
//! the rows ask while the fetch is pending or after it finished.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt, Shared};
use once_cell::sync::OnceCell;

use crate::backends::{QueryBackend, SelectOption};
use crate::config::FilterOptionsConfig;
use crate::error::InsightError;
use crate::models::DimensionField;

pub type OptionList = Arc<Vec<SelectOption>>;
pub type OptionsResult = std::result::Result<OptionList, Arc<InsightError>>;

type OptionsFetch = Shared<BoxFuture<'static, OptionsResult>>;

/// Where a field's option list currently stands.
#[derive(Debug, Clone)]
pub enum OptionStatus {
    Loading,
    Ready(OptionList),
    Failed(Arc<InsightError>),
}

/// Cache entry; its age counts from the moment the fetch settled.
struct CacheEntry {
    fetch: OptionsFetch,
    settled_at: Arc<OnceCell<Instant>>,
}

impl CacheEntry {
    /// A pending fetch is never stale. Failures expire sooner than lists.
    fn is_stale(&self, ttl: Duration, failure_ttl: Duration) -> bool {
        let window = match self.fetch.peek() {
            None => return false,
            Some(Ok(_)) => ttl,
            Some(Err(_)) => failure_ttl,
        };
        self.settled_at
            .get()
            .map_or(true, |settled| settled.elapsed() >= window)
    }
}

pub struct OptionCache {
    backend: Arc<dyn QueryBackend>,
    entries: Mutex<HashMap<DimensionField, CacheEntry>>,
    ttl: Duration,
    failure_ttl: Duration,
}

impl OptionCache {
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        Self::with_config(backend, &FilterOptionsConfig::default())
    }

    pub fn with_config(backend: Arc<dyn QueryBackend>, config: &FilterOptionsConfig) -> Self {
        Self {
            backend,
            entries: Mutex::new(HashMap::new()),
            ttl: config.ttl(),
            failure_ttl: config.failure_ttl(),
        }
    }

    /// Current status without waiting. Starts the fetch if none is live.
    ///
    /// Inside a tokio runtime the fetch is driven in the background, so a later
    /// call observes the result; outside one it only progresses through [`Self::options`].
    pub fn status(&self, field: DimensionField) -> OptionStatus {
        match self.fetch_for(field).peek() {
            None => OptionStatus::Loading,
            Some(Ok(options)) => OptionStatus::Ready(options.clone()),
            Some(Err(err)) => OptionStatus::Failed(err.clone()),
        }
    }

    /// Wait for the option list of `field`.
    pub async fn options(&self, field: DimensionField) -> OptionsResult {
        self.fetch_for(field).await
    }

    /// Drop the cached list so the next lookup fetches again.
    pub fn invalidate(&self, field: DimensionField) {
        self.lock().remove(&field);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<DimensionField, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fetch_for(&self, field: DimensionField) -> OptionsFetch {
        let mut entries = self.lock();
        if let Some(entry) = entries.get(&field) {
            if !entry.is_stale(self.ttl, self.failure_ttl) {
                return entry.fetch.clone();
            }
            tracing::debug!(field = %field, "option list is stale, refetching");
        }

        let settled_at = Arc::new(OnceCell::new());
        let fetch = self.start_fetch(field, settled_at.clone());
        entries.insert(
            field,
            CacheEntry {
                fetch: fetch.clone(),
                settled_at,
            },
        );
        fetch
    }

    fn start_fetch(
        &self,
        field: DimensionField,
        settled_at: Arc<OnceCell<Instant>>,
    ) -> OptionsFetch {
        let backend = self.backend.clone();
        let fetch = async move {
            let start = Instant::now();
            let outcome = backend.fetch_field_options(field).await;
            let _ = settled_at.set(Instant::now());
            match outcome {
                Ok(options) => {
                    tracing::debug!(
                        field = %field,
                        options = options.len(),
                        ms = start.elapsed().as_millis(),
                        "fetched filter options"
                    );
                    Ok(Arc::new(options))
                }
                Err(err) => {
                    tracing::warn!(field = %field, error = %err, "filter option fetch failed");
                    Err(Arc::new(err))
                }
            }
        }
        .boxed()
        .shared();

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(fetch.clone());
        }
        fetch
    }
}

impl std::fmt::Debug for OptionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionCache")
            .field("entries", &self.len())
            .field("ttl", &self.ttl)
            .field("failure_ttl", &self.failure_ttl)
            .finish()
    }
}
