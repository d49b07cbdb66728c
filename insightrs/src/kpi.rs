//! Headline summary cards shown above the query builder.
//!
//! The cards come from one fixed, dimensionless query. Such a query is not
//! runnable through the dispatcher, so the board talks to the backend directly
//! and keeps its own short-lived cache.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::backends::QueryBackend;
use crate::config::{DispatcherConfig, KpiConfig};
use crate::format::{format_currency, format_number, numeric_value};
use crate::models::{Aggregation, AnalyticsQuery, MetricSpec, ResultRow};
use crate::result_cache::ResultCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardFormat {
    Currency,
    Number,
}

#[derive(Debug, Clone, Copy)]
struct CardDef {
    title: &'static str,
    key: &'static str,
    format: CardFormat,
}

const CARDS: [CardDef; 3] = [
    CardDef {
        title: "Faturamento Total",
        key: "faturamento_total",
        format: CardFormat::Currency,
    },
    CardDef {
        title: "Total de Pedidos",
        key: "total_pedidos",
        format: CardFormat::Number,
    },
    CardDef {
        title: "Ticket Médio",
        key: "ticket_medio",
        format: CardFormat::Currency,
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiCard {
    pub title: &'static str,
    pub key: &'static str,
    pub format: CardFormat,
    pub value: f64,
    /// Set while the figures are unavailable, including after a failed fetch.
    pub loading: bool,
}

impl KpiCard {
    pub fn display_value(&self) -> String {
        match self.format {
            CardFormat::Currency => format_currency(self.value),
            CardFormat::Number => format_number(self.value),
        }
    }
}

/// Total revenue, order count and average ticket over the whole dataset.
pub fn headline_query() -> AnalyticsQuery {
    AnalyticsQuery {
        metrics: vec![
            MetricSpec::new("total_amount", Aggregation::Sum).with_alias("faturamento_total"),
            MetricSpec::new("sale_id", Aggregation::Count).with_alias("total_pedidos"),
            MetricSpec::new("total_amount", Aggregation::Avg).with_alias("ticket_medio"),
        ],
        dimensions: Vec::new(),
        ..Default::default()
    }
}

/// Cards filled from the first row of the headline result; missing figures read as zero.
pub fn cards_from_row(row: Option<&ResultRow>) -> Vec<KpiCard> {
    CARDS
        .iter()
        .map(|card| KpiCard {
            title: card.title,
            key: card.key,
            format: card.format,
            value: row
                .and_then(|row| row.get(card.key))
                .and_then(numeric_value)
                .unwrap_or(0.0),
            loading: false,
        })
        .collect()
}

pub fn loading_cards() -> Vec<KpiCard> {
    cards_from_row(None)
        .into_iter()
        .map(|card| KpiCard {
            loading: true,
            ..card
        })
        .collect()
}

pub struct KpiBoard {
    backend: Arc<dyn QueryBackend>,
    cache: Mutex<ResultCache>,
}

impl KpiBoard {
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        Self::with_config(backend, &KpiConfig::default())
    }

    pub fn with_config(backend: Arc<dyn QueryBackend>, config: &KpiConfig) -> Self {
        let cache = ResultCache::with_config(&DispatcherConfig {
            result_cache_ttl_secs: config.ttl_secs,
            result_cache_max_size: 1,
        });
        Self {
            backend,
            cache: Mutex::new(cache),
        }
    }

    /// Current cards, refetching once the cached figures are stale.
    pub async fn cards(&self) -> Vec<KpiCard> {
        let query = headline_query();
        let cached = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&query);
        if let Some(rows) = cached {
            return cards_from_row(rows.first());
        }

        match self.backend.submit_query(&query).await {
            Ok(rows) => {
                let rows = Arc::new(rows);
                let cards = cards_from_row(rows.first());
                self.cache
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(query, rows);
                cards
            }
            Err(err) => {
                tracing::warn!(error = %err, "headline figures unavailable");
                loading_cards()
            }
        }
    }
}

impl std::fmt::Debug for KpiBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KpiBoard").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_headline_query_is_not_runnable() {
        let query = headline_query();
        assert!(!query.is_runnable());
        assert_eq!(query.metrics[2].alias, "ticket_medio");
    }

    #[test]
    fn test_cards_from_row() {
        let row = json!({"faturamento_total": "1234.5", "total_pedidos": 1811547, "ticket_medio": 358.32});
        let cards = cards_from_row(row.as_object());
        assert_eq!(cards[0].display_value(), "R$ 1.234,50");
        assert_eq!(cards[1].display_value(), "1.811.547");
        assert_eq!(cards[2].display_value(), "R$ 358,32");
        assert!(cards.iter().all(|card| !card.loading));
    }

    #[test]
    fn test_missing_figures_read_as_zero() {
        let cards = cards_from_row(None);
        assert!(cards.iter().all(|card| card.value == 0.0));
        assert!(loading_cards().iter().all(|card| card.loading));
    }
}
