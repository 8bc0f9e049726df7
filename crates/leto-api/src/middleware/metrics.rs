//! # Prometheus Metrics
//!
//! Request-level counters and latency histograms recorded by middleware,
//! plus domain gauges updated at scrape time from `AppState`. All metrics
//! live in a per-instance `Registry` — no global registry, so concurrent
//! test apps never interfere.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use axum::Extension;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};

/// Handle to the metric families, cheap to clone.
#[derive(Clone)]
pub struct ApiMetrics {
    registry: Registry,
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    entities_total: IntGaugeVec,
    orchestrations_total: IntGaugeVec,
    issued_tokens_total: IntGauge,
    revoked_tokens_total: IntGauge,
    validation_log_entries_total: IntGauge,
    signing_key_ephemeral: IntGauge,
}

impl ApiMetrics {
    /// Create the metric families in a fresh registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("leto_http_requests_total", "HTTP requests by method, path, and status"),
            &["method", "path", "status"],
        )
        .expect("metric definition");
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "leto_http_request_duration_seconds",
                "HTTP request latency by method and path",
            ),
            &["method", "path"],
        )
        .expect("metric definition");
        let entities_total = IntGaugeVec::new(
            Opts::new("leto_entities_total", "Registered entities by tier"),
            &["tier"],
        )
        .expect("metric definition");
        let orchestrations_total = IntGaugeVec::new(
            Opts::new("leto_orchestrations_total", "Orchestrations by status"),
            &["status"],
        )
        .expect("metric definition");
        let issued_tokens_total = IntGauge::new(
            "leto_issued_tokens_total",
            "Issuance records held by the token store",
        )
        .expect("metric definition");
        let revoked_tokens_total = IntGauge::new(
            "leto_revoked_tokens_total",
            "Issuance records with the revoked flag set",
        )
        .expect("metric definition");
        let validation_log_entries_total = IntGauge::new(
            "leto_validation_log_entries_total",
            "Entries in the validation audit log",
        )
        .expect("metric definition");
        let signing_key_ephemeral = IntGauge::new(
            "leto_signing_key_ephemeral",
            "1 when the signing key was generated at startup",
        )
        .expect("metric definition");

        for collector in [
            Box::new(http_requests_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(http_request_duration_seconds.clone()),
            Box::new(entities_total.clone()),
            Box::new(orchestrations_total.clone()),
            Box::new(issued_tokens_total.clone()),
            Box::new(revoked_tokens_total.clone()),
            Box::new(validation_log_entries_total.clone()),
            Box::new(signing_key_ephemeral.clone()),
        ] {
            registry.register(collector).expect("metric registration");
        }

        Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            entities_total,
            orchestrations_total,
            issued_tokens_total,
            revoked_tokens_total,
            validation_log_entries_total,
            signing_key_ephemeral,
        }
    }

    /// Record one completed HTTP request.
    pub fn observe_request(&self, method: &str, path: &str, status: u16, seconds: f64) {
        self.http_requests_total
            .with_label_values(&[method, path, &status.to_string()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(seconds);
    }

    /// Entities-by-tier gauge.
    pub fn entities_total(&self) -> &IntGaugeVec {
        &self.entities_total
    }

    /// Orchestrations-by-status gauge.
    pub fn orchestrations_total(&self) -> &IntGaugeVec {
        &self.orchestrations_total
    }

    /// Issuance record count gauge.
    pub fn issued_tokens_total(&self) -> &IntGauge {
        &self.issued_tokens_total
    }

    /// Revoked record count gauge.
    pub fn revoked_tokens_total(&self) -> &IntGauge {
        &self.revoked_tokens_total
    }

    /// Validation log size gauge.
    pub fn validation_log_entries_total(&self) -> &IntGauge {
        &self.validation_log_entries_total
    }

    /// Ephemeral-key flag gauge.
    pub fn signing_key_ephemeral(&self) -> &IntGauge {
        &self.signing_key_ephemeral
    }

    /// Gather all families and encode in Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .map_err(|e| e.to_string())?;
        String::from_utf8(buffer).map_err(|e| e.to_string())
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics").finish_non_exhaustive()
    }
}

/// Middleware recording request count and latency.
///
/// Uses the matched route pattern (not the raw URI) as the path label to
/// keep cardinality bounded.
pub async fn metrics_middleware(
    Extension(metrics): Extension<ApiMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<axum::extract::MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let started = Instant::now();
    let response = next.run(request).await;
    metrics.observe_request(
        &method,
        &path,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}
