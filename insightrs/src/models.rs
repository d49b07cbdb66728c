use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{InsightError, Result};

/// One row of a query result, keyed by dimension wire name or metric alias.
///
/// The key set is decided by the query that produced the row; every row of one
/// result shares the same keys in the same order.
pub type ResultRow = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Sum,
    Count,
    Avg,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Count => "count",
            Aggregation::Avg => "avg",
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An aggregated column. `alias` is the key the value is exposed under in each row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MetricSpec {
    pub field: String,
    #[serde(rename = "function")]
    pub aggregation: Aggregation,
    pub alias: String,
}

impl MetricSpec {
    /// Metric with the default alias `<function>_<field>`.
    pub fn new(field: impl Into<String>, aggregation: Aggregation) -> Self {
        let field = field.into();
        let alias = default_alias(aggregation, &field);
        Self {
            field,
            aggregation,
            alias,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }
}

fn default_alias(aggregation: Aggregation, field: &str) -> String {
    format!("{aggregation}_{field}")
}

impl<'de> Deserialize<'de> for MetricSpec {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Raw {
            field: String,
            function: Aggregation,
            #[serde(default)]
            alias: Option<String>,
        }

        let raw = Raw::deserialize(deserializer)?;
        let alias = match raw.alias {
            Some(alias) if !alias.is_empty() => alias,
            _ => default_alias(raw.function, &raw.field),
        };
        Ok(MetricSpec {
            field: raw.field,
            aggregation: raw.function,
            alias,
        })
    }
}

/// Groupable columns of the sales dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionField {
    StoreName,
    ChannelName,
    ProductName,
    PaymentType,
    SaleStatus,
    SaleDate,
    DayOfWeek,
    HourOfDay,
}

impl DimensionField {
    pub const ALL: [DimensionField; 8] = [
        DimensionField::StoreName,
        DimensionField::ChannelName,
        DimensionField::ProductName,
        DimensionField::PaymentType,
        DimensionField::SaleStatus,
        DimensionField::SaleDate,
        DimensionField::DayOfWeek,
        DimensionField::HourOfDay,
    ];

    /// Wire name; also the key the dimension appears under in result rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            DimensionField::StoreName => "store_name",
            DimensionField::ChannelName => "channel_name",
            DimensionField::ProductName => "product_name",
            DimensionField::PaymentType => "payment_type",
            DimensionField::SaleStatus => "sale_status",
            DimensionField::SaleDate => "sale_date",
            DimensionField::DayOfWeek => "day_of_week",
            DimensionField::HourOfDay => "hour_of_day",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == name)
    }
}

impl fmt::Display for DimensionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    In,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 5] = [
        FilterOperator::Equals,
        FilterOperator::NotEquals,
        FilterOperator::GreaterThan,
        FilterOperator::LessThan,
        FilterOperator::In,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FilterOperator::Equals => "é igual a",
            FilterOperator::NotEquals => "não é igual a",
            FilterOperator::GreaterThan => "maior que",
            FilterOperator::LessThan => "menor que",
            FilterOperator::In => "está em",
        }
    }

    /// Equality operators pick a single value from a list when one is available.
    pub fn is_equality(&self) -> bool {
        matches!(self, FilterOperator::Equals | FilterOperator::NotEquals)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Many(Vec<String>),
    Single(String),
}

impl Default for FilterValue {
    fn default() -> Self {
        FilterValue::Single(String::new())
    }
}

impl FilterValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::Single(text) => text.trim().is_empty(),
            FilterValue::Many(items) => items.iter().all(|item| item.trim().is_empty()),
        }
    }

    /// Splits comma-separated text into trimmed, non-empty items.
    pub fn split_list(&self) -> Vec<String> {
        match self {
            FilterValue::Single(text) => text
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
            FilterValue::Many(items) => items
                .iter()
                .map(|item| item.trim())
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Single(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Single(value)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(values: Vec<String>) -> Self {
        FilterValue::Many(values)
    }
}

/// A single filter row.
///
/// The value domain depends on the field, so the value is reset whenever the
/// field changes. Fields are private to keep that rule in one place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterClause {
    field: DimensionField,
    operator: FilterOperator,
    #[serde(default)]
    value: FilterValue,
}

impl Default for FilterClause {
    fn default() -> Self {
        Self::new(DimensionField::ChannelName, FilterOperator::Equals)
    }
}

impl FilterClause {
    pub fn new(field: DimensionField, operator: FilterOperator) -> Self {
        Self {
            field,
            operator,
            value: FilterValue::default(),
        }
    }

    pub fn with_value(mut self, value: impl Into<FilterValue>) -> Self {
        self.value = value.into();
        self
    }

    pub fn field(&self) -> DimensionField {
        self.field
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn value(&self) -> &FilterValue {
        &self.value
    }

    /// Switch the target field. Always clears the value, even when the field is unchanged.
    pub fn set_field(&mut self, field: DimensionField) {
        self.field = field;
        self.value = FilterValue::default();
    }

    pub fn set_operator(&mut self, operator: FilterOperator) {
        self.operator = operator;
    }

    pub fn set_value(&mut self, value: impl Into<FilterValue>) {
        self.value = value.into();
    }

    /// True when no usable value was entered. An `IN` list of only separators counts as empty.
    pub fn is_empty(&self) -> bool {
        match self.operator {
            FilterOperator::In => self.value.split_list().is_empty(),
            _ => self.value.is_empty(),
        }
    }

    /// The clause as it goes on the wire, or `None` when no value was entered.
    ///
    /// `IN` text is split on commas here; stored state keeps the raw text.
    pub fn normalized(&self) -> Option<FilterClause> {
        if self.is_empty() {
            return None;
        }
        let value = match self.operator {
            FilterOperator::In => FilterValue::Many(self.value.split_list()),
            _ => match &self.value {
                FilterValue::Single(text) => FilterValue::Single(text.trim().to_string()),
                many => many.clone(),
            },
        };
        Some(FilterClause {
            field: self.field,
            operator: self.operator,
            value,
        })
    }
}

/// Absolute UTC bounds of the analysed period, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(rename = "start_date")]
    pub start: DateTime<Utc>,
    #[serde(rename = "end_date")]
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderSpec {
    /// A metric alias or dimension wire name from the same query.
    pub field: String,
    pub direction: SortDirection,
}

impl OrderSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// A composed analytics query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct AnalyticsQuery {
    pub metrics: Vec<MetricSpec>,
    pub dimensions: Vec<DimensionField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterClause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl AnalyticsQuery {
    /// A query can be dispatched only with at least one metric and one dimension.
    pub fn is_runnable(&self) -> bool {
        !self.metrics.is_empty() && !self.dimensions.is_empty()
    }

    /// Keys every result row of this query carries: dimensions first, then metric aliases.
    pub fn output_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.dimensions
            .iter()
            .map(|d| d.as_str())
            .chain(self.metrics.iter().map(|m| m.alias.as_str()))
    }

    /// Check the query before dispatch.
    pub fn validate(&self) -> Result<()> {
        if !self.is_runnable() {
            return Err(InsightError::NotRunnable);
        }
        let mut aliases = HashSet::new();
        for metric in &self.metrics {
            if !aliases.insert(metric.alias.as_str()) {
                return Err(InsightError::Validation(format!(
                    "duplicate metric alias {}",
                    metric.alias
                )));
            }
        }
        if let Some(order) = &self.order_by {
            if !self.output_keys().any(|key| key == order.field) {
                return Err(InsightError::Validation(format!(
                    "order field {} is not part of the query",
                    order.field
                )));
            }
        }
        Ok(())
    }
}
