// Plot point domain model

/// A parsed sample value. Distinguishes a real measurement from a gap-filled
/// slot and from an unparseable upstream sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointValue {
    Present(f64),
    /// No sample existed for this step slot.
    Missing,
    /// A sample existed but its value did not parse as a number.
    Invalid,
}

impl PointValue {
    /// True when the value cannot be plotted: missing, invalid, or non-finite.
    pub fn is_gap(&self) -> bool {
        !matches!(self, PointValue::Present(v) if v.is_finite())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PointValue::Present(v) => Some(*v),
            _ => None,
        }
    }
}

/// How a chart should render gap values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformNullValue {
    #[default]
    Null,
    AsZero,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataPoint {
    pub timestamp_ms: i64,
    pub value: PointValue,
}

impl DataPoint {
    pub fn new(timestamp_ms: i64, value: PointValue) -> Self {
        Self {
            timestamp_ms,
            value,
        }
    }

    /// An explicit gap at the given step slot.
    pub fn gap(timestamp_ms: i64) -> Self {
        Self::new(timestamp_ms, PointValue::Missing)
    }

    /// Apply the chart's null-value policy. A finite present value passes
    /// through unchanged (including a literal zero); gaps become either an
    /// explicit gap or a zero. Infinite values are treated as gaps under both
    /// policies since the rendering side cannot plot them.
    pub fn transform_null(self, policy: TransformNullValue) -> DataPoint {
        match self.value {
            PointValue::Present(v) if v.is_finite() => self,
            _ => {
                let value = match policy {
                    TransformNullValue::Null => PointValue::Missing,
                    TransformNullValue::AsZero => PointValue::Present(0.0),
                };
                DataPoint::new(self.timestamp_ms, value)
            }
        }
    }
}
