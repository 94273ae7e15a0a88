// Renderable series assembled from range-query results
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::point::{DataPoint, TransformNullValue};
use super::query::{ChartKind, Query};

/// One label set's slice of a range-query response: the label pairs plus the
/// ordered (unix seconds, raw string value) samples. Values stay strings on
/// the wire because the source encodes infinities as sentinel tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixResult {
    #[serde(default)]
    pub metric: HashMap<String, String>,
    #[serde(default)]
    pub values: Vec<(f64, String)>,
}

/// A fully processed series, ready for the rendering side.
#[derive(Debug, Clone)]
pub struct Series {
    pub name: String,
    pub kind: ChartKind,
    pub color: Option<String>,
    pub points: Vec<DataPoint>,
    /// The source record this series was built from, if any.
    pub raw: Option<MatrixResult>,
}

impl Series {
    pub fn from_result(query: &Query, raw: MatrixResult, points: Vec<DataPoint>) -> Self {
        Self {
            name: render_name(&query.name, &raw.metric),
            kind: query.kind,
            color: query.color.clone(),
            points,
            raw: Some(raw),
        }
    }

    /// Placeholder for a query that matched no label sets. Carries no points
    /// but lets the chart render its axes.
    pub fn placeholder(query: &Query) -> Self {
        Self {
            name: query.name.clone(),
            kind: query.kind,
            color: query.color.clone(),
            points: Vec::new(),
            raw: None,
        }
    }

    /// Apply the chart's null-value policy across every point.
    pub fn transform_null(&self, policy: TransformNullValue) -> Series {
        Series {
            points: self
                .points
                .iter()
                .map(|p| p.transform_null(policy))
                .collect(),
            raw: self.raw.clone(),
            name: self.name.clone(),
            kind: self.kind,
            color: self.color.clone(),
        }
    }
}

/// Resolve a display-name template against a label set. `{{label}}` tokens
/// are replaced with the label's value; unknown tokens are left intact so a
/// missing label stays visible in the legend.
pub fn render_name(template: &str, labels: &HashMap<String, String>) -> String {
    let mut name = template.to_string();
    for (key, value) in labels {
        let token = format!("{{{{{key}}}}}");
        name = name.replace(&token, value);
    }
    name
}
