//! Static registry of selectable metrics and dimensions.
//!
//! The catalog is built once per process and never mutated. Lookups of an
//! identifier the catalog does not know return `None`; since the UI only offers
//! identifiers taken from this table, a miss is a programming error on the
//! caller's side.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::models::{Aggregation, DimensionField, MetricSpec};

/// A selectable metric. The option id doubles as the metric alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricOption {
    pub id: &'static str,
    pub name: &'static str,
    pub field: &'static str,
    pub aggregation: Aggregation,
}

impl MetricOption {
    pub fn to_spec(&self) -> MetricSpec {
        MetricSpec::new(self.field, self.aggregation).with_alias(self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionOption {
    pub id: &'static str,
    pub name: &'static str,
    pub field: DimensionField,
}

const METRICS: [MetricOption; 4] = [
    MetricOption {
        id: "sum_total_amount",
        name: "Faturamento",
        field: "total_amount",
        aggregation: Aggregation::Sum,
    },
    MetricOption {
        id: "count_sale_id",
        name: "Pedidos",
        field: "sale_id",
        aggregation: Aggregation::Count,
    },
    MetricOption {
        id: "avg_total_amount",
        name: "Ticket Médio",
        field: "total_amount",
        aggregation: Aggregation::Avg,
    },
    MetricOption {
        id: "sum_delivery_fee",
        name: "Taxa de Entrega",
        field: "delivery_fee",
        aggregation: Aggregation::Sum,
    },
];

const DIMENSIONS: [DimensionOption; 8] = [
    DimensionOption {
        id: "store_name",
        name: "Loja",
        field: DimensionField::StoreName,
    },
    DimensionOption {
        id: "channel_name",
        name: "Canal",
        field: DimensionField::ChannelName,
    },
    DimensionOption {
        id: "product_name",
        name: "Produto",
        field: DimensionField::ProductName,
    },
    DimensionOption {
        id: "payment_type",
        name: "Pagamento",
        field: DimensionField::PaymentType,
    },
    DimensionOption {
        id: "sale_date",
        name: "Data",
        field: DimensionField::SaleDate,
    },
    DimensionOption {
        id: "day_of_week",
        name: "Dia da Semana",
        field: DimensionField::DayOfWeek,
    },
    DimensionOption {
        id: "hour_of_day",
        name: "Hora do Dia",
        field: DimensionField::HourOfDay,
    },
    DimensionOption {
        id: "sale_status",
        name: "Status do Pedido",
        field: DimensionField::SaleStatus,
    },
];

// Result keys that are not selector options but still show up in rows.
const EXTRA_LABELS: [(&str, &str); 3] = [
    ("faturamento_total", "Faturamento Total"),
    ("total_pedidos", "Total de Pedidos"),
    ("ticket_medio", "Ticket Médio"),
];

static SALES_CATALOG: Lazy<FieldCatalog> = Lazy::new(FieldCatalog::sales);

#[derive(Debug, Clone)]
pub struct FieldCatalog {
    metrics: Vec<MetricOption>,
    dimensions: Vec<DimensionOption>,
    labels: HashMap<&'static str, &'static str>,
}

impl FieldCatalog {
    /// Process-wide catalog of the sales dataset.
    pub fn global() -> &'static FieldCatalog {
        &SALES_CATALOG
    }

    pub fn sales() -> Self {
        let mut labels = HashMap::new();
        for metric in &METRICS {
            labels.insert(metric.id, metric.name);
        }
        for dimension in &DIMENSIONS {
            labels.insert(dimension.id, dimension.name);
        }
        labels.extend(EXTRA_LABELS);
        Self {
            metrics: METRICS.to_vec(),
            dimensions: DIMENSIONS.to_vec(),
            labels,
        }
    }

    pub fn metric_options(&self) -> &[MetricOption] {
        &self.metrics
    }

    pub fn dimension_options(&self) -> &[DimensionOption] {
        &self.dimensions
    }

    pub fn resolve_metric(&self, option_id: &str) -> Option<MetricSpec> {
        self.metrics
            .iter()
            .find(|option| option.id == option_id)
            .map(MetricOption::to_spec)
    }

    pub fn resolve_dimension(&self, option_id: &str) -> Option<DimensionField> {
        self.dimensions
            .iter()
            .find(|option| option.id == option_id)
            .map(|option| option.field)
    }

    /// Friendly label for a result key, or the key itself when untranslated.
    pub fn translate<'a>(&'a self, name: &'a str) -> &'a str {
        self.labels.get(name).copied().unwrap_or(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_metric_uses_option_id_as_alias() {
        let catalog = FieldCatalog::global();
        let spec = catalog.resolve_metric("avg_total_amount").unwrap();
        assert_eq!(spec.field, "total_amount");
        assert_eq!(spec.aggregation, Aggregation::Avg);
        assert_eq!(spec.alias, "avg_total_amount");
        assert!(catalog.resolve_metric("median_total_amount").is_none());
    }

    #[test]
    fn test_resolve_dimension() {
        let catalog = FieldCatalog::global();
        assert_eq!(
            catalog.resolve_dimension("store_name"),
            Some(DimensionField::StoreName)
        );
        assert!(catalog.resolve_dimension("customer_name").is_none());
    }

    #[test]
    fn test_translate_falls_back_to_raw_name() {
        let catalog = FieldCatalog::global();
        assert_eq!(catalog.translate("store_name"), "Loja");
        assert_eq!(catalog.translate("avg_total_amount"), "Ticket Médio");
        assert_eq!(catalog.translate("ticket_medio"), "Ticket Médio");
        assert_eq!(catalog.translate("revenue"), "revenue");
    }

    #[test]
    fn test_every_dimension_field_is_selectable() {
        let catalog = FieldCatalog::global();
        for field in DimensionField::ALL {
            assert_eq!(catalog.resolve_dimension(field.as_str()), Some(field));
        }
    }
}
