// Prometheus-backed chart data pipeline: batched range-query fetching,
// gap-filled resampling, and value formatting for time-series charts.
pub mod application;
pub mod domain;
pub mod infrastructure;

pub use crate::application::chart_handle::{ChartHandle, TooltipPosition};
pub use crate::application::fetcher::{
    BatchFetcher, ChartResult, DataSnapshot, ResultGroup, SeriesFuture,
};
pub use crate::application::metrics_source::{
    MATRIX_RESULT_TYPE, MetricsSource, QueryData, RangeQueryResponse, ResponseStatus,
};
pub use crate::application::registry::{QueryRegistry, RegistrationToken};
pub use crate::application::resample::{parse_sample_value, resample};
pub use crate::domain::point::{DataPoint, PointValue, TransformNullValue};
pub use crate::domain::query::{
    AxisPosition, ChartKind, DEFAULT_MIN_INTERVAL_SEC, Query, QueryGroup, ResolvedParams,
    TriggerParams, compute_step,
};
pub use crate::domain::series::{MatrixResult, Series, render_name};
pub use crate::domain::units::{
    ScaledFormatter, ValueScaler, format_timestamp, format_value,
};
pub use crate::infrastructure::config::{PromConfig, PromSettings, load_prom_config};
pub use crate::infrastructure::prom_client::{PromClientError, PromHttpSource};
