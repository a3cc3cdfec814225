//! Lightweight Prometheus-compatible metrics using atomic counters.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::FailureCode;

/// Process-wide request and query counters.
pub struct Metrics {
    batches_total: AtomicU64,
    batches_partial_total: AtomicU64,
    validation_errors_total: AtomicU64,
    connection_errors_total: AtomicU64,
    internal_errors_total: AtomicU64,
    queries_total: AtomicU64,
    model_errors_total: AtomicU64,
    client_errors_total: AtomicU64,
    /// Accumulated successful query duration, in microseconds.
    query_duration_us_sum: AtomicU64,
    query_duration_count: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            batches_total: AtomicU64::new(0),
            batches_partial_total: AtomicU64::new(0),
            validation_errors_total: AtomicU64::new(0),
            connection_errors_total: AtomicU64::new(0),
            internal_errors_total: AtomicU64::new(0),
            queries_total: AtomicU64::new(0),
            model_errors_total: AtomicU64::new(0),
            client_errors_total: AtomicU64::new(0),
            query_duration_us_sum: AtomicU64::new(0),
            query_duration_count: AtomicU64::new(0),
        }
    }

    /// Records a batch that reached the executor.
    pub fn record_batch(&self, all_succeeded: bool) {
        self.batches_total.fetch_add(1, Ordering::Relaxed);
        if !all_succeeded {
            self.batches_partial_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_validation_error(&self) {
        self.validation_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_error(&self) {
        self.connection_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_internal_error(&self) {
        self.internal_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a successful query.
    pub fn record_query(&self, duration_us: u64) {
        self.queries_total.fetch_add(1, Ordering::Relaxed);
        self.query_duration_us_sum
            .fetch_add(duration_us, Ordering::Relaxed);
        self.query_duration_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed query.
    pub fn record_query_error(&self, code: FailureCode) {
        self.queries_total.fetch_add(1, Ordering::Relaxed);
        let counter = match code {
            FailureCode::ModelQueryExecution => &self.model_errors_total,
            FailureCode::EngineClient => &self.client_errors_total,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn queries_total(&self) -> u64 {
        self.queries_total.load(Ordering::Relaxed)
    }

    /// Renders all metrics in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(1024);
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);

        counter(
            &mut out,
            "xmla_proxy_batches_total",
            "Query batches that reached the engine.",
            load(&self.batches_total),
        );
        counter(
            &mut out,
            "xmla_proxy_batches_partial_total",
            "Batches with at least one failed query.",
            load(&self.batches_partial_total),
        );
        counter(
            &mut out,
            "xmla_proxy_validation_errors_total",
            "Requests rejected by header or body validation.",
            load(&self.validation_errors_total),
        );
        counter(
            &mut out,
            "xmla_proxy_connection_errors_total",
            "Engine connections that failed to open.",
            load(&self.connection_errors_total),
        );
        counter(
            &mut out,
            "xmla_proxy_internal_errors_total",
            "Requests answered with an unhandled error.",
            load(&self.internal_errors_total),
        );
        counter(
            &mut out,
            "xmla_proxy_queries_total",
            "Queries executed.",
            load(&self.queries_total),
        );

        let _ = writeln!(
            out,
            "# HELP xmla_proxy_query_errors_total Failed queries by error code."
        );
        let _ = writeln!(out, "# TYPE xmla_proxy_query_errors_total counter");
        for (code, c) in [
            (FailureCode::ModelQueryExecution, &self.model_errors_total),
            (FailureCode::EngineClient, &self.client_errors_total),
        ] {
            let _ = writeln!(
                out,
                "xmla_proxy_query_errors_total{{code=\"{code}\"}} {}",
                load(c)
            );
        }

        let sum_secs = load(&self.query_duration_us_sum) as f64 / 1_000_000.0;
        let _ = writeln!(
            out,
            "# HELP xmla_proxy_query_duration_seconds Successful query duration."
        );
        let _ = writeln!(out, "# TYPE xmla_proxy_query_duration_seconds summary");
        let _ = writeln!(out, "xmla_proxy_query_duration_seconds_sum {sum_secs}");
        let _ = writeln!(
            out,
            "xmla_proxy_query_duration_seconds_count {}",
            load(&self.query_duration_count)
        );

        out
    }
}

fn counter(out: &mut String, name: &str, help: &str, value: u64) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} counter");
    let _ = writeln!(out, "{name} {value}");
}
