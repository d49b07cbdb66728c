//! Mapping result rows onto chart, table and export shapes.
//!
//! Every visible label goes through [`FieldCatalog::translate`], so one key
//! renders identically in headers, legends and tooltips. Exported records keep
//! the raw row keys.

use std::borrow::Cow;

use serde::Serialize;
use serde_json::Value;

use crate::catalog::FieldCatalog;
use crate::dispatcher::{RequestState, RequestStatus, SharedRows};
use crate::error::InsightError;
use crate::format::{format_cell, numeric_value};
use crate::models::{DimensionField, MetricSpec, ResultRow};

pub const INITIAL_MESSAGE: &str =
    "Selecione suas métricas e dimensões e clique em \"Analisar\".";
pub const LOADING_MESSAGE: &str = "Carregando dados...";
pub const EMPTY_MESSAGE: &str = "Nenhum resultado encontrado para esta consulta.";
pub const VALIDATION_MESSAGE: &str = "Por favor, selecione pelo menos uma métrica e uma dimensão.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub category: Value,
    /// `None` when the row holds no numeric value for the series.
    pub value: Option<f64>,
}

/// One series: the first selected dimension on the category axis, the first
/// selected metric as values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub category_key: String,
    pub category_label: String,
    pub series_key: String,
    pub series_label: String,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableColumn {
    pub key: String,
    pub label: String,
}

/// Rows handed to the CSV writer, with the file name to save them under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportBundle {
    pub filename: String,
    pub records: Vec<ResultRow>,
}

#[derive(Debug, Clone, Copy)]
pub struct ResultPresenter<'a> {
    catalog: &'a FieldCatalog,
}

impl Default for ResultPresenter<'static> {
    fn default() -> Self {
        Self::new(FieldCatalog::global())
    }
}

impl<'a> ResultPresenter<'a> {
    pub fn new(catalog: &'a FieldCatalog) -> Self {
        Self { catalog }
    }

    pub fn translate_label<'n>(&self, name: &'n str) -> &'n str
    where
        'a: 'n,
    {
        self.catalog.translate(name)
    }

    /// Chart data, or `None` when there is nothing to plot.
    ///
    /// Further metrics and dimensions stay in the table but do not drive the chart.
    pub fn to_chart_series(
        &self,
        rows: &[ResultRow],
        metrics: &[MetricSpec],
        dimensions: &[DimensionField],
    ) -> Option<ChartSeries> {
        let (metric, dimension) = (metrics.first()?, dimensions.first()?);
        if rows.is_empty() {
            return None;
        }
        let category_key = dimension.as_str();
        let series_key = metric.alias.as_str();
        let points = rows
            .iter()
            .map(|row| ChartPoint {
                category: row.get(category_key).cloned().unwrap_or(Value::Null),
                value: row.get(series_key).and_then(numeric_value),
            })
            .collect();

        Some(ChartSeries {
            category_key: category_key.to_string(),
            category_label: self.translate_label(category_key).to_string(),
            series_key: series_key.to_string(),
            series_label: self.translate_label(series_key).to_string(),
            points,
        })
    }

    /// Columns in the key order of the first row.
    ///
    /// All rows of one result share the same shape, so the first row speaks for all.
    pub fn to_table_columns(&self, rows: &[ResultRow]) -> Vec<TableColumn> {
        rows.first()
            .map(|row| {
                row.keys()
                    .map(|key| TableColumn {
                        key: key.clone(),
                        label: self.translate_label(key).to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Formatted cell text, one inner vector per row in column order.
    pub fn to_table_cells(&self, rows: &[ResultRow], columns: &[TableColumn]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| row.get(&column.key).map(format_cell).unwrap_or_default())
                    .collect()
            })
            .collect()
    }

    /// Tooltip text for a plotted value.
    pub fn tooltip(&self, value: &Value) -> String {
        format_cell(value)
    }

    /// Records for export: the rows unchanged, raw keys included.
    pub fn to_export_records(&self, rows: &[ResultRow]) -> Vec<ResultRow> {
        rows.to_vec()
    }

    /// `report_<dimensions>_by_<metrics>.csv` built from display names.
    pub fn export_filename(&self, metrics: &[MetricSpec], dimensions: &[DimensionField]) -> String {
        let dimension_names: Vec<Cow<'_, str>> = dimensions
            .iter()
            .map(|d| filename_part(self.translate_label(d.as_str())))
            .collect();
        let metric_names: Vec<Cow<'_, str>> = metrics
            .iter()
            .map(|m| filename_part(self.translate_label(&m.alias)))
            .collect();
        format!(
            "report_{}_by_{}.csv",
            dimension_names.join("_"),
            metric_names.join("_")
        )
    }

    pub fn export(
        &self,
        rows: &[ResultRow],
        metrics: &[MetricSpec],
        dimensions: &[DimensionField],
    ) -> ExportBundle {
        ExportBundle {
            filename: self.export_filename(metrics, dimensions),
            records: self.to_export_records(rows),
        }
    }
}

fn filename_part(name: &str) -> Cow<'_, str> {
    if name.contains(char::is_whitespace) {
        Cow::Owned(name.split_whitespace().collect::<Vec<_>>().join("_"))
    } else {
        Cow::Borrowed(name)
    }
}

// Messages the user sees carry no error-kind prefix.
fn user_message(err: &InsightError) -> String {
    match err {
        InsightError::Retrieval(message) | InsightError::Validation(message) => message.clone(),
        other => other.to_string(),
    }
}

/// What the results area shows, derived from the request state.
#[derive(Debug, Clone)]
pub enum ResultsView {
    NoQueryYet,
    Loading,
    /// Rows may be empty, which renders the "no results" message instead of data.
    Success { rows: SharedRows },
    Error { message: String },
}

impl ResultsView {
    pub fn from_state(state: &RequestState) -> Self {
        match state.status {
            RequestStatus::Idle => ResultsView::NoQueryYet,
            RequestStatus::Loading => ResultsView::Loading,
            RequestStatus::Success => ResultsView::Success {
                rows: state.rows.clone().unwrap_or_default(),
            },
            RequestStatus::Error => ResultsView::Error {
                message: state
                    .error
                    .as_deref()
                    .map(user_message)
                    .unwrap_or_else(|| "unknown error".to_string()),
            },
        }
    }

    /// Blocking message for a run the dispatcher refused.
    pub fn rejection_message(err: &InsightError) -> Cow<'static, str> {
        match err {
            InsightError::NotRunnable => Cow::Borrowed(VALIDATION_MESSAGE),
            other => Cow::Owned(user_message(other)),
        }
    }

    /// True when chart and table should be drawn.
    pub fn has_data(&self) -> bool {
        matches!(self, ResultsView::Success { rows } if !rows.is_empty())
    }

    /// Status line for the results area, `None` when data is shown.
    pub fn message(&self) -> Option<&str> {
        match self {
            ResultsView::NoQueryYet => Some(INITIAL_MESSAGE),
            ResultsView::Loading => Some(LOADING_MESSAGE),
            ResultsView::Success { rows } if rows.is_empty() => Some(EMPTY_MESSAGE),
            ResultsView::Success { .. } => None,
            ResultsView::Error { message } => Some(message.as_str()),
        }
    }
}
