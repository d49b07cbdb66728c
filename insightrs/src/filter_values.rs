//! Value editors for filter rows.
//!
//! Which editor applies is decided by the row's `(field, operator)` pair:
//! weekday and hour fields have fixed domains, the categorical fields offer a
//! remote option list for equality operators, and everything else is free text.

use std::sync::Arc;

use crate::backends::QueryBackend;
use crate::config::FilterOptionsConfig;
use crate::error::{InsightError, Result};
use crate::models::{DimensionField, FilterClause, FilterOperator, FilterValue};
use crate::option_cache::{OptionCache, OptionList, OptionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekdayOption {
    pub value: &'static str,
    pub label: &'static str,
}

/// ISO weekday numbers, Monday first.
pub const DAY_OF_WEEK_OPTIONS: [WeekdayOption; 7] = [
    WeekdayOption { value: "1", label: "Segunda-feira" },
    WeekdayOption { value: "2", label: "Terça-feira" },
    WeekdayOption { value: "3", label: "Quarta-feira" },
    WeekdayOption { value: "4", label: "Quinta-feira" },
    WeekdayOption { value: "5", label: "Sexta-feira" },
    WeekdayOption { value: "6", label: "Sábado" },
    WeekdayOption { value: "7", label: "Domingo" },
];

pub const HOUR_MIN: u8 = 0;
pub const HOUR_MAX: u8 = 23;

/// Fields offered in the filter panel, in display order.
pub const FILTERABLE_FIELDS: [(DimensionField, &str); 6] = [
    (DimensionField::ChannelName, "Canal"),
    (DimensionField::StoreName, "Loja"),
    (DimensionField::ProductName, "Produto"),
    (DimensionField::SaleStatus, "Status do Pedido"),
    (DimensionField::DayOfWeek, "Dia da Semana"),
    (DimensionField::HourOfDay, "Hora do Dia"),
];

const LIST_PLACEHOLDER: &str = "Valores separados por vírgula";
const TEXT_PLACEHOLDER: &str = "Digite um valor...";

#[derive(Debug, Clone)]
pub enum RemoteOptions {
    /// Fetch pending: the editor is disabled and shows a loading indicator.
    Loading,
    Ready(OptionList),
}

#[derive(Debug, Clone)]
pub enum ValueEditor {
    Weekday(&'static [WeekdayOption]),
    Hour { min: u8, max: u8 },
    Remote(RemoteOptions),
    FreeText {
        placeholder: &'static str,
        /// `IN` takes a comma-separated list, split when the query is built.
        comma_separated: bool,
    },
}

impl ValueEditor {
    pub fn is_disabled(&self) -> bool {
        matches!(self, ValueEditor::Remote(RemoteOptions::Loading))
    }

    fn free_text(operator: FilterOperator) -> Self {
        let comma_separated = operator == FilterOperator::In;
        ValueEditor::FreeText {
            placeholder: if comma_separated {
                LIST_PLACEHOLDER
            } else {
                TEXT_PLACEHOLDER
            },
            comma_separated,
        }
    }
}

/// Fields whose values come from a remote list.
pub fn has_remote_options(field: DimensionField) -> bool {
    matches!(
        field,
        DimensionField::ChannelName
            | DimensionField::SaleStatus
            | DimensionField::StoreName
            | DimensionField::ProductName
    )
}

fn uses_remote_options(clause: &FilterClause) -> bool {
    has_remote_options(clause.field()) && clause.operator().is_equality()
}

/// Check a clause's value against its field's fixed domain, if it has one.
pub fn check_value(clause: &FilterClause) -> Result<()> {
    let items = match (clause.operator(), clause.value()) {
        (FilterOperator::In, _) | (_, FilterValue::Many(_)) => clause.value().split_list(),
        (_, FilterValue::Single(text)) => vec![text.trim().to_string()],
    };
    match clause.field() {
        DimensionField::HourOfDay => {
            for item in &items {
                match item.parse::<u8>() {
                    Ok(hour) if (HOUR_MIN..=HOUR_MAX).contains(&hour) => {}
                    _ => {
                        return Err(InsightError::Validation(format!(
                            "hour of day must be between {HOUR_MIN} and {HOUR_MAX}, got {item:?}"
                        )))
                    }
                }
            }
        }
        DimensionField::DayOfWeek => {
            for item in &items {
                if !DAY_OF_WEEK_OPTIONS.iter().any(|day| day.value == item.as_str()) {
                    return Err(InsightError::Validation(format!(
                        "day of week must be 1 (Monday) to 7 (Sunday), got {item:?}"
                    )));
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// Decides the value editor of each filter row.
#[derive(Debug)]
pub struct FilterValueResolver {
    options: OptionCache,
}

impl FilterValueResolver {
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        Self::with_config(backend, &FilterOptionsConfig::default())
    }

    pub fn with_config(backend: Arc<dyn QueryBackend>, config: &FilterOptionsConfig) -> Self {
        Self {
            options: OptionCache::with_config(backend, config),
        }
    }

    pub fn option_cache(&self) -> &OptionCache {
        &self.options
    }

    /// Editor for `clause` as of now; a pending option fetch shows as loading.
    pub fn editor_for(&self, clause: &FilterClause) -> ValueEditor {
        if let Some(editor) = fixed_editor(clause.field()) {
            return editor;
        }
        if !uses_remote_options(clause) {
            return ValueEditor::free_text(clause.operator());
        }
        match self.options.status(clause.field()) {
            OptionStatus::Loading => ValueEditor::Remote(RemoteOptions::Loading),
            OptionStatus::Ready(options) => ValueEditor::Remote(RemoteOptions::Ready(options)),
            OptionStatus::Failed(_) => ValueEditor::free_text(clause.operator()),
        }
    }

    /// Editor for `clause` once any remote option list has arrived.
    pub async fn resolve(&self, clause: &FilterClause) -> ValueEditor {
        if let Some(editor) = fixed_editor(clause.field()) {
            return editor;
        }
        if !uses_remote_options(clause) {
            return ValueEditor::free_text(clause.operator());
        }
        match self.options.options(clause.field()).await {
            Ok(options) => ValueEditor::Remote(RemoteOptions::Ready(options)),
            Err(_) => ValueEditor::free_text(clause.operator()),
        }
    }
}

fn fixed_editor(field: DimensionField) -> Option<ValueEditor> {
    match field {
        DimensionField::DayOfWeek => Some(ValueEditor::Weekday(&DAY_OF_WEEK_OPTIONS)),
        DimensionField::HourOfDay => Some(ValueEditor::Hour {
            min: HOUR_MIN,
            max: HOUR_MAX,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hour_values_are_bounded() {
        let clause = FilterClause::new(DimensionField::HourOfDay, FilterOperator::GreaterThan);
        assert!(check_value(&clause.clone().with_value("23")).is_ok());
        assert!(check_value(&clause.clone().with_value("24")).is_err());
        assert!(check_value(&clause.with_value("noon")).is_err());
    }

    #[test]
    fn test_weekday_list_is_checked_item_by_item() {
        let clause = FilterClause::new(DimensionField::DayOfWeek, FilterOperator::In);
        assert!(check_value(&clause.clone().with_value("1, 6,7")).is_ok());
        assert!(check_value(&clause.with_value("1,8")).is_err());
    }

    #[test]
    fn test_open_domains_accept_any_text() {
        let clause = FilterClause::new(DimensionField::ChannelName, FilterOperator::Equals)
            .with_value("anything at all");
        assert!(check_value(&clause).is_ok());
    }

    #[test]
    fn test_filterable_fields_match_catalog_labels() {
        let catalog = crate::catalog::FieldCatalog::global();
        for (field, label) in FILTERABLE_FIELDS {
            assert_eq!(catalog.translate(field.as_str()), label);
        }
    }

    #[test]
    fn test_free_text_placeholder_follows_operator() {
        match ValueEditor::free_text(FilterOperator::In) {
            ValueEditor::FreeText {
                placeholder,
                comma_separated,
            } => {
                assert!(comma_separated);
                assert_eq!(placeholder, "Valores separados por vírgula");
            }
            other => panic!("expected free text, got {other:?}"),
        }
    }
}
