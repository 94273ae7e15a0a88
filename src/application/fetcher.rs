// Batched range-query coordination keyed by a shared time window
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::watch;

use crate::application::metrics_source::{MetricsSource, RangeQueryResponse, ResponseStatus};
use crate::application::registry::QueryRegistry;
use crate::application::resample::resample;
use crate::domain::query::{
    DEFAULT_MIN_INTERVAL_SEC, Query, QueryGroup, ResolvedParams, TriggerParams,
};
use crate::domain::series::Series;

/// Output of one query's fetch. Shared so any number of consumers can await
/// it; resolves to `None` when the query degraded to no data.
pub type SeriesFuture = Shared<BoxFuture<'static, Option<Arc<Vec<Series>>>>>;

/// One query group's pending results for a chart. A chart with several
/// groups gets one entry per group, each carrying its own unit and axis.
#[derive(Clone)]
pub struct ChartResult {
    pub query_group: QueryGroup,
    pub series: Vec<SeriesFuture>,
}

/// Chart id to that chart's pending results, in registration order.
pub type ResultGroup = HashMap<String, Vec<ChartResult>>;

/// The atomically published outcome of one trigger. Rebuilt whole on every
/// trigger; consumers compare `generation` against
/// [`BatchFetcher::current_generation`] to discard superseded resolutions.
#[derive(Clone)]
pub struct DataSnapshot {
    pub generation: u64,
    pub params: ResolvedParams,
    pub results: ResultGroup,
}

impl DataSnapshot {
    /// Pending results for one chart, if any of its groups are registered.
    pub fn chart(&self, chart_id: &str) -> Option<&[ChartResult]> {
        self.results.get(chart_id).map(|r| r.as_slice())
    }
}

/// Coordinates one fetch batch per trigger: snapshots the registry, fans out
/// one fetch task per query, and publishes the grouped pending results as a
/// single snapshot. Fetch failures degrade the affected query to no data and
/// never fail the batch.
pub struct BatchFetcher {
    source: Arc<dyn MetricsSource>,
    registry: Arc<QueryRegistry>,
    generation: AtomicU64,
    snapshot_tx: watch::Sender<Option<Arc<DataSnapshot>>>,
}

impl BatchFetcher {
    pub fn new(source: Arc<dyn MetricsSource>) -> Self {
        let (snapshot_tx, _) = watch::channel(None);
        Self {
            source,
            registry: Arc::new(QueryRegistry::new()),
            generation: AtomicU64::new(0),
            snapshot_tx,
        }
    }

    /// The registry declaring parties add their query groups to.
    pub fn registry(&self) -> &Arc<QueryRegistry> {
        &self.registry
    }

    /// Latest published snapshot. `None` until the first trigger fires.
    pub fn latest(&self) -> Option<Arc<DataSnapshot>> {
        self.snapshot_tx.borrow().clone()
    }

    /// Watch for snapshot publications. The channel only keeps the latest
    /// value, matching the replace-in-full publication contract.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<DataSnapshot>>> {
        self.snapshot_tx.subscribe()
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Fan out one fetch per registered query for the given window and
    /// publish the batch as a new snapshot. Fire-and-forget: the fetches run
    /// as spawned tasks and consumers await the per-chart futures they care
    /// about. Must be called from within a tokio runtime.
    ///
    /// In-flight fetches from an earlier trigger are not cancelled; their
    /// snapshot simply stops being the latest one.
    pub fn trigger(&self, params: TriggerParams) {
        let params = params.resolve(DEFAULT_MIN_INTERVAL_SEC);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let groups = self.registry.snapshot();
        tracing::debug!(
            generation,
            groups = groups.len(),
            start = params.start_time,
            end = params.end_time,
            step = params.step,
            "triggering batch fetch"
        );

        let mut results: ResultGroup = HashMap::new();
        for group in groups {
            let series: Vec<SeriesFuture> = group
                .queries
                .iter()
                .map(|query| self.spawn_query(query.clone(), params))
                .collect();
            results
                .entry(group.chart_id.clone())
                .or_default()
                .push(ChartResult {
                    query_group: group,
                    series,
                });
        }

        self.snapshot_tx.send_replace(Some(Arc::new(DataSnapshot {
            generation,
            params,
            results,
        })));
    }

    fn spawn_query(&self, query: Query, params: ResolvedParams) -> SeriesFuture {
        let source = Arc::clone(&self.source);
        let expr = query.resolve_expr(&params);
        let handle = tokio::spawn(async move {
            match source.query_range(&expr, &params).await {
                Ok(response) => process_response(&query, response, &params),
                Err(err) => {
                    tracing::warn!(%expr, error = %err, "range query failed");
                    None
                }
            }
        });
        async move { handle.await.ok().flatten() }.boxed().shared()
    }
}

/// Normalize one response into renderable series. Anything other than a
/// successful matrix result degrades to no data for this query alone.
fn process_response(
    query: &Query,
    response: RangeQueryResponse,
    params: &ResolvedParams,
) -> Option<Arc<Vec<Series>>> {
    if response.status != ResponseStatus::Success {
        tracing::debug!(
            expr = %query.expr,
            error = response.error.as_deref().unwrap_or("unknown"),
            "query returned error status"
        );
        return None;
    }
    let results = match response.into_matrix() {
        Some(results) => results,
        None => {
            tracing::debug!(expr = %query.expr, "query returned non-matrix result");
            return None;
        }
    };

    if results.is_empty() {
        // a query that matched nothing still renders empty axes
        return Some(Arc::new(vec![Series::placeholder(query)]));
    }

    let series = results
        .into_iter()
        .map(|result| {
            let points = resample(&result.values, params);
            Series::from_result(query, result, points)
        })
        .collect();
    Some(Arc::new(series))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::point::PointValue;
    use crate::domain::query::ChartKind;
    use crate::domain::series::MatrixResult;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Canned responses keyed by the resolved query expression. Unknown
    /// expressions answer with an error envelope.
    #[derive(Default)]
    struct StubSource {
        responses: HashMap<String, RangeQueryResponse>,
        seen: Mutex<Vec<String>>,
    }

    impl StubSource {
        fn with(mut self, expr: &str, response: RangeQueryResponse) -> Self {
            self.responses.insert(expr.to_string(), response);
            self
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MetricsSource for StubSource {
        async fn query_range(
            &self,
            expr: &str,
            _params: &ResolvedParams,
        ) -> anyhow::Result<RangeQueryResponse> {
            self.seen.lock().unwrap().push(expr.to_string());
            Ok(self
                .responses
                .get(expr)
                .cloned()
                .unwrap_or_else(|| RangeQueryResponse::error("unknown query")))
        }
    }

    fn matrix_with(labels: &[(&str, &str)], values: &[(f64, &str)]) -> MatrixResult {
        MatrixResult {
            metric: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            values: values.iter().map(|(t, v)| (*t, v.to_string())).collect(),
        }
    }

    fn query(expr: &str, name: &str) -> Query {
        Query::new(expr, name, ChartKind::Line)
    }

    fn window() -> TriggerParams {
        TriggerParams::new(1000, 1300).with_step(100)
    }

    #[tokio::test]
    async fn test_single_failure_degrades_only_its_own_query() {
        let source = StubSource::default()
            .with(
                "a_ok",
                RangeQueryResponse::matrix(vec![matrix_with(&[], &[(1000.0, "1")])]),
            )
            .with(
                "b_ok",
                RangeQueryResponse::matrix(vec![matrix_with(&[], &[(1000.0, "2")])]),
            );
        let fetcher = BatchFetcher::new(Arc::new(source));
        let registry = fetcher.registry();
        registry.register(QueryGroup::new("A", vec![query("a_ok", "ok")], "short"));
        registry.register(QueryGroup::new("A", vec![query("a_bad", "bad")], "bytes"));
        registry.register(QueryGroup::new("B", vec![query("b_ok", "ok")], "none"));

        fetcher.trigger(window());
        let snapshot = fetcher.latest().unwrap();

        let chart_a = snapshot.chart("A").unwrap();
        assert_eq!(chart_a.len(), 2);
        assert!(chart_a[0].series[0].clone().await.is_some());
        assert!(chart_a[1].series[0].clone().await.is_none());

        let chart_b = snapshot.chart("B").unwrap();
        assert_eq!(chart_b.len(), 1);
        let series = chart_b[0].series[0].clone().await.unwrap();
        assert_eq!(series[0].points[0].value, PointValue::Present(2.0));
    }

    #[tokio::test]
    async fn test_series_are_named_and_resampled() {
        let source = StubSource::default().with(
            "up",
            RangeQueryResponse::matrix(vec![
                matrix_with(&[("instance", "tidb-0")], &[(1000.0, "1"), (1100.0, "+Inf")]),
                matrix_with(&[("instance", "tidb-1")], &[(1000.0, "0")]),
            ]),
        );
        let fetcher = BatchFetcher::new(Arc::new(source));
        fetcher
            .registry()
            .register(QueryGroup::new("A", vec![query("up", "{{instance}}")], "none"));

        fetcher.trigger(window());
        let snapshot = fetcher.latest().unwrap();
        let series = snapshot.chart("A").unwrap()[0].series[0]
            .clone()
            .await
            .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].name, "tidb-0");
        assert_eq!(series[1].name, "tidb-1");
        // dense over the window: 4 slots each
        assert_eq!(series[0].points.len(), 4);
        assert_eq!(series[0].points[1].value, PointValue::Present(f64::INFINITY));
        assert_eq!(series[1].points[0].value, PointValue::Present(0.0));
        assert_eq!(series[1].points[3].value, PointValue::Missing);
    }

    #[tokio::test]
    async fn test_empty_matrix_yields_a_placeholder_series() {
        let source = StubSource::default().with("up", RangeQueryResponse::matrix(vec![]));
        let fetcher = BatchFetcher::new(Arc::new(source));
        fetcher
            .registry()
            .register(QueryGroup::new("A", vec![query("up", "Up")], "none"));

        fetcher.trigger(window());
        let series = fetcher.latest().unwrap().chart("A").unwrap()[0].series[0]
            .clone()
            .await
            .unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].name, "Up");
        assert!(series[0].points.is_empty());
    }

    #[tokio::test]
    async fn test_rate_interval_is_resolved_before_fetching() {
        let source = Arc::new(StubSource::default());
        let fetcher = BatchFetcher::new(source.clone());
        fetcher.registry().register(QueryGroup::new(
            "A",
            vec![query("rate(m[$__rate_interval])", "m")],
            "none",
        ));

        fetcher.trigger(window());
        let snapshot = fetcher.latest().unwrap();
        // force the spawned task to run
        let _ = snapshot.chart("A").unwrap()[0].series[0].clone().await;
        assert_eq!(source.seen(), ["rate(m[120s])"]);
    }

    #[tokio::test]
    async fn test_step_defaults_to_the_minimum_interval() {
        let fetcher = BatchFetcher::new(Arc::new(StubSource::default()));
        fetcher.trigger(TriggerParams::new(1000, 1300));
        let snapshot = fetcher.latest().unwrap();
        assert_eq!(snapshot.params.step, DEFAULT_MIN_INTERVAL_SEC);
    }

    #[tokio::test]
    async fn test_retrigger_replaces_the_snapshot_and_bumps_generation() {
        let fetcher = BatchFetcher::new(Arc::new(StubSource::default()));
        let registry = fetcher.registry();
        let token = registry.register(QueryGroup::new("A", vec![query("up", "Up")], "none"));

        assert!(fetcher.latest().is_none());
        assert_eq!(fetcher.current_generation(), 0);

        fetcher.trigger(window());
        let first = fetcher.latest().unwrap();
        assert_eq!(first.generation, 1);
        assert_eq!(first.results.len(), 1);

        // registry changes only show up in the next batch
        registry.unregister(token);
        assert_eq!(first.results.len(), 1);

        fetcher.trigger(window());
        let second = fetcher.latest().unwrap();
        assert_eq!(second.generation, 2);
        assert!(second.results.is_empty());
        assert_eq!(fetcher.current_generation(), 2);
        // the superseded snapshot is detectable as stale
        assert!(first.generation < fetcher.current_generation());
    }

    #[tokio::test]
    async fn test_source_error_degrades_to_no_data() {
        struct FailingSource;

        #[async_trait]
        impl MetricsSource for FailingSource {
            async fn query_range(
                &self,
                _expr: &str,
                _params: &ResolvedParams,
            ) -> anyhow::Result<RangeQueryResponse> {
                anyhow::bail!("connection refused")
            }
        }

        let fetcher = BatchFetcher::new(Arc::new(FailingSource));
        fetcher
            .registry()
            .register(QueryGroup::new("A", vec![query("up", "Up")], "none"));

        fetcher.trigger(window());
        let snapshot = fetcher.latest().unwrap();
        assert!(snapshot.chart("A").unwrap()[0].series[0].clone().await.is_none());
    }

    #[tokio::test]
    async fn test_vector_response_degrades_to_no_data() {
        let vector: RangeQueryResponse = serde_json::from_str(
            r#"{"status":"success","data":{"resultType":"vector","result":[]}}"#,
        )
        .unwrap();
        let source = StubSource::default().with("up", vector);
        let fetcher = BatchFetcher::new(Arc::new(source));
        fetcher
            .registry()
            .register(QueryGroup::new("A", vec![query("up", "Up")], "none"));

        fetcher.trigger(window());
        let snapshot = fetcher.latest().unwrap();
        assert!(snapshot.chart("A").unwrap()[0].series[0].clone().await.is_none());
    }
}
