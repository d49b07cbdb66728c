pub mod backends;
pub mod calendar;
pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod filter_values;
pub mod format;
pub mod kpi;
pub mod models;
pub mod option_cache;
pub mod presentation;
pub mod query_builder;
pub mod result_cache;
pub mod signature;
pub mod telemetry;

pub use backends::{QueryBackend, SelectOption};
pub use calendar::DateSelection;
pub use catalog::{DimensionOption, FieldCatalog, MetricOption};
pub use config::InsightConfig;
pub use dispatcher::{DispatchTicket, QueryDispatcher, RequestState, RequestStatus};
pub use error::{InsightError, Result};
pub use filter_values::{FilterValueResolver, RemoteOptions, ValueEditor};
pub use kpi::{KpiBoard, KpiCard};
pub use models::{
    Aggregation, AnalyticsQuery, DimensionField, FilterClause, FilterOperator, FilterValue,
    MetricSpec, OrderSpec, ResultRow, SortDirection, TimeRange,
};
pub use option_cache::{OptionCache, OptionStatus};
pub use presentation::{ResultPresenter, ResultsView};
pub use query_builder::{QueryBuilder, Selections};
pub use signature::QuerySignature;
