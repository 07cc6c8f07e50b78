//! Prometheus-backed metrics registry.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters and gauges relevant to the download pipeline.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    downloads_total: IntCounterVec,
    extraction_calls_total: IntCounterVec,
    active_workspaces: IntGauge,
    rate_limit_throttled_total: IntCounter,
}

fn collector<T>(
    name: &'static str,
    built: std::result::Result<T, prometheus::Error>,
) -> Result<T> {
    built.map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<T>(registry: &Registry, name: &'static str, metric: &T) -> Result<()>
where
    T: prometheus::core::Collector + Clone + 'static,
{
    registry
        .register(Box::new(metric.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = collector(
            "http_requests_total",
            IntCounterVec::new(
                Opts::new("http_requests_total", "Total HTTP requests received"),
                &["route", "code"],
            ),
        )?;
        let downloads_total = collector(
            "downloads_total",
            IntCounterVec::new(
                Opts::new("downloads_total", "Download requests by kind and outcome"),
                &["kind", "outcome"],
            ),
        )?;
        let extraction_calls_total = collector(
            "extraction_calls_total",
            IntCounterVec::new(
                Opts::new(
                    "extraction_calls_total",
                    "Offloaded extraction calls by operation and outcome",
                ),
                &["operation", "outcome"],
            ),
        )?;
        let active_workspaces = collector(
            "active_workspaces",
            IntGauge::with_opts(Opts::new(
                "active_workspaces",
                "Request workspaces currently on disk",
            )),
        )?;
        let rate_limit_throttled_total = collector(
            "api_rate_limit_throttled_total",
            IntCounter::with_opts(Opts::new(
                "api_rate_limit_throttled_total",
                "Requests rejected due to API rate limiting",
            )),
        )?;

        register(&registry, "http_requests_total", &http_requests_total)?;
        register(&registry, "downloads_total", &downloads_total)?;
        register(&registry, "extraction_calls_total", &extraction_calls_total)?;
        register(&registry, "active_workspaces", &active_workspaces)?;
        register(
            &registry,
            "api_rate_limit_throttled_total",
            &rate_limit_throttled_total,
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                downloads_total,
                extraction_calls_total,
                active_workspaces,
                rate_limit_throttled_total,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        let code = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[route, code.as_str()])
            .inc();
    }

    /// Record the outcome of a download request (`single`/`collection`).
    pub fn inc_download(&self, kind: &str, outcome: &str) {
        self.inner
            .downloads_total
            .with_label_values(&[kind, outcome])
            .inc();
    }

    /// Record the outcome of an offloaded extraction call (`peek`/`extract`).
    pub fn inc_extraction(&self, operation: &str, outcome: &str) {
        self.inner
            .extraction_calls_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    /// Set the active workspace gauge.
    pub fn set_active_workspaces(&self, count: usize) {
        self.inner
            .active_workspaces
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Increment the API rate limiter throttle counter.
    pub fn inc_rate_limit_throttled(&self) {
        self.inner.rate_limit_throttled_total.inc();
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn render_includes_recorded_series() -> std::result::Result<(), Box<dyn Error>> {
        let metrics = Metrics::new()?;
        metrics.inc_http_request("/download/single", 200);
        metrics.inc_download("single", "ok");
        metrics.inc_extraction("peek", "ok");
        metrics.inc_rate_limit_throttled();

        let rendered = metrics.render()?;
        assert!(rendered.contains("http_requests_total"));
        assert!(rendered.contains("downloads_total{kind=\"single\",outcome=\"ok\"} 1"));
        assert!(rendered.contains("extraction_calls_total"));
        assert!(rendered.contains("api_rate_limit_throttled_total 1"));
        Ok(())
    }

    #[test]
    fn active_workspaces_gauge_reports_latest_value() -> std::result::Result<(), Box<dyn Error>>
    {
        let metrics = Metrics::new()?;
        metrics.set_active_workspaces(3);
        metrics.set_active_workspaces(1);
        assert!(metrics.render()?.contains("active_workspaces 1"));
        Ok(())
    }
}
