//! Shared backends and fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use insight::{
    Aggregation, AnalyticsQuery, DimensionField, InsightError, MetricSpec, QueryBackend, ResultRow,
    SelectOption,
};
use serde_json::Value;
use tokio::sync::{oneshot, watch, Semaphore};

type Reply = insight::Result<Vec<ResultRow>>;

/// Backend whose query responses are released by the test, in any order.
pub struct ScriptedBackend {
    pending: Mutex<Vec<Option<oneshot::Sender<Reply>>>>,
    received: Mutex<Vec<AnalyticsQuery>>,
    arrivals: watch::Sender<usize>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        let (arrivals, _) = watch::channel(0);
        Arc::new(Self {
            pending: Mutex::new(Vec::new()),
            received: Mutex::new(Vec::new()),
            arrivals,
        })
    }

    /// Wait until `count` queries have reached the backend.
    pub async fn wait_for_requests(&self, count: usize) {
        let mut receiver = self.arrivals.subscribe();
        receiver
            .wait_for(|arrived| *arrived >= count)
            .await
            .expect("arrivals channel closed");
    }

    /// Answer the `index`-th query received (0-based).
    pub fn respond(&self, index: usize, reply: Reply) {
        let sender = self.pending.lock().unwrap()[index]
            .take()
            .expect("request already answered");
        let _ = sender.send(reply);
    }

    pub fn received(&self) -> Vec<AnalyticsQuery> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryBackend for ScriptedBackend {
    async fn submit_query(&self, query: &AnalyticsQuery) -> insight::Result<Vec<ResultRow>> {
        let (sender, receiver) = oneshot::channel();
        self.pending.lock().unwrap().push(Some(sender));
        self.received.lock().unwrap().push(query.clone());
        self.arrivals.send_modify(|arrived| *arrived += 1);
        receiver
            .await
            .map_err(|_| InsightError::Retrieval("request abandoned".to_string()))?
    }

    async fn fetch_field_options(&self, _field: DimensionField) -> insight::Result<Vec<SelectOption>> {
        Ok(Vec::new())
    }
}

/// Backend answering every query with the same rows immediately.
pub struct FixedBackend {
    rows: Vec<ResultRow>,
    fail: bool,
    submissions: AtomicUsize,
}

impl FixedBackend {
    pub fn new(rows: Vec<ResultRow>) -> Arc<Self> {
        Arc::new(Self {
            rows,
            fail: false,
            submissions: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            rows: Vec::new(),
            fail: true,
            submissions: AtomicUsize::new(0),
        })
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryBackend for FixedBackend {
    async fn submit_query(&self, _query: &AnalyticsQuery) -> insight::Result<Vec<ResultRow>> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(InsightError::Retrieval("service unavailable".to_string()));
        }
        Ok(self.rows.clone())
    }

    async fn fetch_field_options(&self, _field: DimensionField) -> insight::Result<Vec<SelectOption>> {
        Ok(Vec::new())
    }
}

/// Option-list backend that counts fetches and holds them until released.
pub struct OptionsBackend {
    options: HashMap<DimensionField, Vec<SelectOption>>,
    fetches: AtomicUsize,
    fail: AtomicBool,
    gate: Semaphore,
}

impl OptionsBackend {
    /// Fetches wait for [`Self::release`].
    pub fn gated() -> Arc<Self> {
        Arc::new(Self::with_permits(0))
    }

    pub fn open() -> Arc<Self> {
        Arc::new(Self::with_permits(Semaphore::MAX_PERMITS))
    }

    fn with_permits(permits: usize) -> Self {
        let mut options = HashMap::new();
        options.insert(
            DimensionField::ChannelName,
            vec![
                SelectOption::new("1", "iFood"),
                SelectOption::new("2", "Rappi"),
                SelectOption::new("3", "Presencial"),
            ],
        );
        options.insert(
            DimensionField::StoreName,
            vec![SelectOption::new("10", "Loja Centro")],
        );
        Self {
            options,
            fetches: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            gate: Semaphore::new(permits),
        }
    }

    pub fn fail_fetches(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn recover(&self) {
        self.fail.store(false, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryBackend for OptionsBackend {
    async fn submit_query(&self, _query: &AnalyticsQuery) -> insight::Result<Vec<ResultRow>> {
        Ok(Vec::new())
    }

    async fn fetch_field_options(&self, field: DimensionField) -> insight::Result<Vec<SelectOption>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| InsightError::Retrieval(e.to_string()))?;
        if self.fail.load(Ordering::SeqCst) {
            return Err(InsightError::Retrieval(format!("cannot list {field}")));
        }
        Ok(self.options.get(&field).cloned().unwrap_or_default())
    }
}

pub fn row(value: Value) -> ResultRow {
    value.as_object().cloned().expect("row fixture must be an object")
}

pub fn revenue_by_store() -> AnalyticsQuery {
    AnalyticsQuery {
        metrics: vec![MetricSpec::new("total_amount", Aggregation::Sum).with_alias("revenue")],
        dimensions: vec![DimensionField::StoreName],
        ..Default::default()
    }
}

pub fn orders_by_channel() -> AnalyticsQuery {
    AnalyticsQuery {
        metrics: vec![MetricSpec::new("sale_id", Aggregation::Count)],
        dimensions: vec![DimensionField::ChannelName],
        ..Default::default()
    }
}
