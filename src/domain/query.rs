// Query declarations shared between the declaring UI and the batch fetcher
use serde::Deserialize;

/// Smallest step the system will request. Also the floor when substituting
/// the rate-interval token into a query expression.
pub const DEFAULT_MIN_INTERVAL_SEC: i64 = 30;

const RATE_INTERVAL_TOKEN: &str = "$__rate_interval";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Column,
    Area,
    Scatter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisPosition {
    Left,
    Right,
}

/// One declared query: a PromQL expression plus how its series should render.
/// Immutable once declared.
#[derive(Debug, Clone, Deserialize)]
pub struct Query {
    pub expr: String,
    /// Display-name template; `{{label}}` tokens are resolved against each
    /// matched label set.
    pub name: String,
    pub kind: ChartKind,
    #[serde(default)]
    pub color: Option<String>,
}

impl Query {
    pub fn new(expr: impl Into<String>, name: impl Into<String>, kind: ChartKind) -> Self {
        Self {
            expr: expr.into(),
            name: name.into(),
            kind,
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Substitute the rate-interval token with `max(step, 4 * min_interval)`
    /// seconds before the expression is sent to the data source.
    pub fn resolve_expr(&self, params: &ResolvedParams) -> String {
        let interval = params.step.max(4 * DEFAULT_MIN_INTERVAL_SEC);
        self.expr
            .replace(RATE_INTERVAL_TOKEN, &format!("{interval}s"))
    }
}

/// A set of queries sharing a unit and axis position, tied to one chart.
/// One chart may declare several groups, each with its own unit.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryGroup {
    pub chart_id: String,
    pub queries: Vec<Query>,
    pub unit: String,
    #[serde(default)]
    pub position: Option<AxisPosition>,
}

impl QueryGroup {
    pub fn new(chart_id: impl Into<String>, queries: Vec<Query>, unit: impl Into<String>) -> Self {
        Self {
            chart_id: chart_id.into(),
            queries,
            unit: unit.into(),
            position: None,
        }
    }
}

/// The time window supplied with one trigger, shared by every query fanned
/// out under it. Times are unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerParams {
    pub start_time: i64,
    pub end_time: i64,
    pub step: Option<i64>,
}

impl TriggerParams {
    pub fn new(start_time: i64, end_time: i64) -> Self {
        Self {
            start_time,
            end_time,
            step: None,
        }
    }

    pub fn with_step(mut self, step: i64) -> Self {
        self.step = Some(step);
        self
    }

    /// Fill in the default step. Defaulting happens once, at trigger time;
    /// everything downstream works with a concrete step.
    pub fn resolve(self, default_step: i64) -> ResolvedParams {
        ResolvedParams {
            start_time: self.start_time,
            end_time: self.end_time,
            step: self.step.unwrap_or(default_step),
        }
    }
}

/// Trigger params with the step defaulted, as consumed by fetch and resample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedParams {
    pub start_time: i64,
    pub end_time: i64,
    pub step: i64,
}

/// Pick a step from the chart's pixel geometry so one point maps to roughly
/// `min_bin_width` pixels. The result is floored to a multiple of
/// `min_interval_sec` and never drops below it.
pub fn compute_step(
    range: (i64, i64),
    container_width: f64,
    legend_width: f64,
    min_bin_width: f64,
    min_interval_sec: i64,
) -> i64 {
    let max_data_points = (container_width - legend_width) / min_bin_width;
    if max_data_points <= 0.0 {
        return min_interval_sec;
    }
    let interval = (range.1 - range.0) as f64 / max_data_points;
    let rounded = (interval / min_interval_sec as f64).floor() as i64 * min_interval_sec;
    rounded.max(min_interval_sec)
}
