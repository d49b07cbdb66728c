//! Folding UI selections into a composed query.
//!
//! Selections hold catalog option ids, never semantic fields; ids are
//! translated to metric specs and dimension fields here, once, when the query
//! is built.

use std::collections::HashSet;

use crate::catalog::{DimensionOption, FieldCatalog, MetricOption};
use crate::error::{InsightError, Result};
use crate::filter_values::check_value;
use crate::models::{AnalyticsQuery, DimensionField, FilterClause, MetricSpec, OrderSpec, TimeRange};

/// Everything the user has picked so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selections {
    pub metrics: Vec<String>,
    pub dimensions: Vec<String>,
    pub filters: Vec<FilterClause>,
    pub time_range: Option<TimeRange>,
    pub order_by: Option<OrderSpec>,
    pub limit: Option<u32>,
}

impl Selections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the metric if absent, remove it if present.
    pub fn toggle_metric(&mut self, option_id: &str) {
        toggle(&mut self.metrics, option_id);
    }

    pub fn toggle_dimension(&mut self, option_id: &str) {
        toggle(&mut self.dimensions, option_id);
    }

    /// Add a metric; selecting an already selected id is a no-op.
    pub fn add_metric(&mut self, option_id: &str) {
        add_unique(&mut self.metrics, option_id);
    }

    pub fn add_dimension(&mut self, option_id: &str) {
        add_unique(&mut self.dimensions, option_id);
    }

    pub fn remove_metric(&mut self, option_id: &str) {
        self.metrics.retain(|id| id != option_id);
    }

    pub fn remove_dimension(&mut self, option_id: &str) {
        self.dimensions.retain(|id| id != option_id);
    }

    /// Append a fresh filter row and return its index.
    pub fn add_filter(&mut self) -> usize {
        self.filters.push(FilterClause::default());
        self.filters.len() - 1
    }

    pub fn remove_filter(&mut self, index: usize) -> Option<FilterClause> {
        (index < self.filters.len()).then(|| self.filters.remove(index))
    }

    pub fn filter_mut(&mut self, index: usize) -> Option<&mut FilterClause> {
        self.filters.get_mut(index)
    }

    /// Clear `order_by` if it names a key the current selection no longer produces.
    ///
    /// Returns true when a stale order was dropped.
    pub fn prune_order(&mut self, catalog: &FieldCatalog) -> bool {
        let stale = match &self.order_by {
            Some(order) => !order_keys(catalog, self).contains(order.field.as_str()),
            None => false,
        };
        if stale {
            self.order_by = None;
        }
        stale
    }
}

fn toggle(items: &mut Vec<String>, option_id: &str) {
    if items.iter().any(|id| id == option_id) {
        items.retain(|id| id != option_id);
    } else {
        items.push(option_id.to_string());
    }
}

fn add_unique(items: &mut Vec<String>, option_id: &str) {
    if !items.iter().any(|id| id == option_id) {
        items.push(option_id.to_string());
    }
}

/// Result keys produced by the selection, skipping ids the catalog does not know.
fn order_keys<'a>(catalog: &'a FieldCatalog, selections: &Selections) -> HashSet<&'a str> {
    let dimensions = selections
        .dimensions
        .iter()
        .filter_map(|id| catalog.resolve_dimension(id))
        .map(|field| field.as_str());
    let metrics = selections.metrics.iter().filter_map(|id| {
        catalog
            .metric_options()
            .iter()
            .find(|option| option.id == id.as_str())
            .map(|option| option.id)
    });
    dimensions.chain(metrics).collect()
}

/// A candidate sort field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderOption {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    catalog: &'a FieldCatalog,
}

impl Default for QueryBuilder<'static> {
    fn default() -> Self {
        Self::new(FieldCatalog::global())
    }
}

impl<'a> QueryBuilder<'a> {
    pub fn new(catalog: &'a FieldCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'a FieldCatalog {
        self.catalog
    }

    /// Compose the query for the current selections.
    ///
    /// Incomplete filter rows are left out and a sort on a key the selection
    /// no longer produces is cleared. Whether the result may be dispatched is
    /// answered by [`is_runnable`].
    pub fn build(&self, selections: &Selections) -> Result<AnalyticsQuery> {
        let metrics = self.resolve_metrics(&selections.metrics)?;
        let dimensions = self.resolve_dimensions(&selections.dimensions)?;

        let mut filters = Vec::with_capacity(selections.filters.len());
        for clause in &selections.filters {
            if let Some(normalized) = clause.normalized() {
                check_value(&normalized)?;
                filters.push(normalized);
            }
        }

        let mut query = AnalyticsQuery {
            metrics,
            dimensions,
            filters,
            time_range: selections.time_range,
            order_by: None,
            limit: selections.limit.filter(|limit| *limit > 0),
        };

        if let Some(order) = &selections.order_by {
            if query.output_keys().any(|key| key == order.field) {
                query.order_by = Some(order.clone());
            } else {
                tracing::debug!(field = %order.field, "dropping sort on a field no longer selected");
            }
        }

        Ok(query)
    }

    /// Sort candidates: selected dimensions, then selected metrics.
    pub fn derive_order_options(&self, selections: &Selections) -> Vec<OrderOption> {
        let dimensions = selections
            .dimensions
            .iter()
            .filter_map(|id| self.catalog.resolve_dimension(id))
            .map(|field| field.as_str());
        let metrics = selections
            .metrics
            .iter()
            .filter_map(|id| self.metric_option(id))
            .map(|option| option.id);

        let mut seen = HashSet::new();
        dimensions
            .chain(metrics)
            .filter(|key| seen.insert(*key))
            .map(|key| OrderOption {
                id: key.to_string(),
                label: self.catalog.translate(key).to_string(),
            })
            .collect()
    }

    /// Metrics not yet selected, in catalog order.
    pub fn available_metrics(&self, selections: &Selections) -> Vec<&'a MetricOption> {
        self.catalog
            .metric_options()
            .iter()
            .filter(|option| !selections.metrics.iter().any(|id| id == option.id))
            .collect()
    }

    /// Dimensions not yet selected, in catalog order.
    pub fn available_dimensions(&self, selections: &Selections) -> Vec<&'a DimensionOption> {
        self.catalog
            .dimension_options()
            .iter()
            .filter(|option| !selections.dimensions.iter().any(|id| id == option.id))
            .collect()
    }

    fn metric_option(&self, id: &str) -> Option<&'a MetricOption> {
        self.catalog
            .metric_options()
            .iter()
            .find(|option| option.id == id)
    }

    fn resolve_metrics(&self, ids: &[String]) -> Result<Vec<MetricSpec>> {
        let mut seen = HashSet::new();
        let mut metrics = Vec::with_capacity(ids.len());
        for id in ids {
            let spec = self
                .catalog
                .resolve_metric(id)
                .ok_or_else(|| InsightError::UnknownOption(format!("metric {id}")))?;
            if seen.insert(spec.alias.clone()) {
                metrics.push(spec);
            }
        }
        Ok(metrics)
    }

    fn resolve_dimensions(&self, ids: &[String]) -> Result<Vec<DimensionField>> {
        let mut seen = HashSet::new();
        let mut dimensions = Vec::with_capacity(ids.len());
        for id in ids {
            let field = self
                .catalog
                .resolve_dimension(id)
                .ok_or_else(|| InsightError::UnknownOption(format!("dimension {id}")))?;
            if seen.insert(field) {
                dimensions.push(field);
            }
        }
        Ok(dimensions)
    }
}

/// True iff the query has at least one metric and one dimension.
pub fn is_runnable(query: &AnalyticsQuery) -> bool {
    query.is_runnable()
}
