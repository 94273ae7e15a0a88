// Port to the range-query data source
use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::query::ResolvedParams;
use crate::domain::series::MatrixResult;

pub const MATRIX_RESULT_TYPE: &str = "matrix";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Envelope returned by one range query, mirroring the Prometheus HTTP API:
/// a status discriminator plus either a typed result payload or an error.
#[derive(Debug, Clone, Deserialize)]
pub struct RangeQueryResponse {
    pub status: ResponseStatus,
    #[serde(default)]
    pub data: Option<QueryData>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, rename = "errorType")]
    pub error_type: Option<String>,
}

/// The result payload. `result` stays untyped until the shape check passes;
/// only matrix-shaped payloads are decoded further.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryData {
    #[serde(rename = "resultType")]
    pub result_type: String,
    #[serde(default)]
    pub result: serde_json::Value,
}

impl RangeQueryResponse {
    /// Success envelope wrapping matrix results. Used by in-process sources
    /// and tests.
    pub fn matrix(result: Vec<MatrixResult>) -> Self {
        Self {
            status: ResponseStatus::Success,
            data: Some(QueryData {
                result_type: MATRIX_RESULT_TYPE.to_string(),
                result: serde_json::to_value(result).unwrap_or_default(),
            }),
            error: None,
            error_type: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            data: None,
            error: Some(message.into()),
            error_type: None,
        }
    }

    /// Extract the matrix payload. `None` when the envelope carries an error
    /// status, the payload is not matrix-shaped, or the rows do not decode.
    pub fn into_matrix(self) -> Option<Vec<MatrixResult>> {
        if self.status != ResponseStatus::Success {
            return None;
        }
        let data = self.data?;
        if data.result_type != MATRIX_RESULT_TYPE {
            return None;
        }
        serde_json::from_value(data.result).ok()
    }
}

/// The injected fetch collaborator. One call per query per trigger; the
/// fetcher treats an `Err` the same as an error-status envelope, degrading
/// that query to no data.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn query_range(
        &self,
        expr: &str,
        params: &ResolvedParams,
    ) -> anyhow::Result<RangeQueryResponse>;
}
