// Prometheus HTTP API adapter
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;

use crate::application::metrics_source::{MetricsSource, RangeQueryResponse};
use crate::domain::query::ResolvedParams;
use crate::infrastructure::config::PromSettings;

#[derive(Debug, thiserror::Error)]
pub enum PromClientError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("query endpoint returned status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("failed to decode query response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Range-query source backed by the Prometheus HTTP API.
#[derive(Debug, Clone)]
pub struct PromHttpSource {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl PromHttpSource {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_settings(settings: &PromSettings) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            client: builder.build().unwrap_or_default(),
        }
    }

    fn build_query_url(&self, expr: &str, params: &ResolvedParams) -> String {
        format!(
            "{}/api/v1/query_range?query={}&start={}&end={}&step={}",
            self.base_url,
            urlencoding::encode(expr),
            params.start_time,
            params.end_time,
            params.step
        )
    }

    async fn execute(&self, url: &str) -> Result<RangeQueryResponse, PromClientError> {
        let mut request = self.client.get(url).header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request.send().await.map_err(|source| PromClientError::Http {
            url: url.to_string(),
            source,
        })?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| PromClientError::Http {
                url: url.to_string(),
                source,
            })?;

        // Non-2xx responses still carry an error envelope when they come
        // from the query endpoint itself; pass those through as data.
        match serde_json::from_str(&body) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => Err(PromClientError::Status { status, body }),
            Err(source) => Err(PromClientError::Decode(source)),
        }
    }
}

#[async_trait]
impl MetricsSource for PromHttpSource {
    async fn query_range(
        &self,
        expr: &str,
        params: &ResolvedParams,
    ) -> anyhow::Result<RangeQueryResponse> {
        let url = self.build_query_url(expr, params);
        tracing::debug!(%url, "executing range query");
        Ok(self
            .execute(&url)
            .await
            .context("Prometheus range query failed")?)
    }
}
