//! # Prometheus Metrics
//!
//! Operational metrics for the authentication gateway, scraped at `/metrics`
//! on the metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] with
//! the `keyseal` prefix so they do not collide with any default global
//! registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::sync::Arc;

use keyseal_protocol::identity::RequestKind;

/// Holds all Prometheus metric handles for the node.
///
/// Clone-friendly (prometheus handles are `Arc`s internally) so it can be
/// shared across request handlers.
#[derive(Clone)]
pub struct AuthMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Successful registrations.
    pub registrations_total: IntCounter,
    /// Successful logins (validations).
    pub logins_total: IntCounter,
    /// Requests that came back with `ok: false`, for any reason.
    pub auth_failures_total: IntCounter,
    /// Wall time of `POST /auth`, in seconds.
    pub auth_latency_seconds: Histogram,
}

impl AuthMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("keyseal".into()), None)?;

        let registrations_total = IntCounter::new(
            "registrations_total",
            "Total number of identities successfully registered",
        )?;
        registry.register(Box::new(registrations_total.clone()))?;

        let logins_total = IntCounter::new(
            "logins_total",
            "Total number of successful keypair validations",
        )?;
        registry.register(Box::new(logins_total.clone()))?;

        let auth_failures_total = IntCounter::new(
            "auth_failures_total",
            "Total number of authentication requests that failed",
        )?;
        registry.register(Box::new(auth_failures_total.clone()))?;

        // Validation runs Argon2id, so the tail sits well above a plain
        // key/value round trip.
        let auth_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "auth_latency_seconds",
                "End-to-end authentication request latency in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
        )?;
        registry.register(Box::new(auth_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            registrations_total,
            logins_total,
            auth_failures_total,
            auth_latency_seconds,
        })
    }

    /// Count one finished request.
    pub fn record(&self, kind: Option<RequestKind>, ok: bool, elapsed_secs: f64) {
        self.auth_latency_seconds.observe(elapsed_secs);
        match (ok, kind) {
            (true, Some(RequestKind::Register)) => self.registrations_total.inc(),
            (true, Some(RequestKind::Login)) => self.logins_total.inc(),
            _ => self.auth_failures_total.inc(),
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<AuthMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails (should never happen in practice).
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_routes_to_the_right_counter() {
        let metrics = AuthMetrics::new().unwrap();
        metrics.record(Some(RequestKind::Register), true, 0.01);
        metrics.record(Some(RequestKind::Login), true, 0.2);
        metrics.record(Some(RequestKind::Login), false, 0.2);
        metrics.record(None, false, 0.0);

        assert_eq!(metrics.registrations_total.get(), 1);
        assert_eq!(metrics.logins_total.get(), 1);
        assert_eq!(metrics.auth_failures_total.get(), 2);
        assert_eq!(metrics.auth_latency_seconds.get_sample_count(), 4);
    }

    #[test]
    fn encode_uses_prefix() {
        let metrics = AuthMetrics::new().unwrap();
        metrics.logins_total.inc();
        let text = metrics.encode().unwrap();
        assert!(text.contains("keyseal_logins_total 1"));
        assert!(text.contains("keyseal_auth_latency_seconds"));
    }
}
