// src/metrics.rs - Prometheus metrics for feeds, acknowledgments and config saves

use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use tracing::debug;

use crate::error::{FleetError, Result};

#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,

    // Feed metrics
    pub feed_fetches_total: IntCounterVec,
    pub feed_failures_total: IntCounterVec,
    pub feed_retries_total: IntCounterVec,
    pub open_alerts: IntGaugeVec,

    // User action metrics
    pub acknowledgments_total: IntCounterVec,
    pub config_saves_total: IntCounterVec,
}

fn metric_error(e: prometheus::Error) -> FleetError {
    FleetError::Internal(format!("metrics registration failed: {}", e))
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let feed_fetches_total = IntCounterVec::new(
            Opts::new("fleetwatch_feed_fetches_total", "Successful feed fetches"),
            &["feed"],
        )
        .map_err(metric_error)?;
        let feed_failures_total = IntCounterVec::new(
            Opts::new(
                "fleetwatch_feed_failures_total",
                "Feed fetches that failed after exhausting retries",
            ),
            &["feed"],
        )
        .map_err(metric_error)?;
        let feed_retries_total = IntCounterVec::new(
            Opts::new("fleetwatch_feed_retries_total", "Feed fetch retry attempts"),
            &["feed"],
        )
        .map_err(metric_error)?;
        let open_alerts = IntGaugeVec::new(
            Opts::new("fleetwatch_open_alerts", "Unacknowledged alerts in the latest snapshot"),
            &["feed"],
        )
        .map_err(metric_error)?;
        let acknowledgments_total = IntCounterVec::new(
            Opts::new("fleetwatch_acknowledgments_total", "Acknowledge commands issued"),
            &["feed", "outcome"],
        )
        .map_err(metric_error)?;
        let config_saves_total = IntCounterVec::new(
            Opts::new("fleetwatch_config_saves_total", "Notification configuration saves"),
            &["document", "outcome"],
        )
        .map_err(metric_error)?;

        registry
            .register(Box::new(feed_fetches_total.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(feed_failures_total.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(feed_retries_total.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(open_alerts.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(acknowledgments_total.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(config_saves_total.clone()))
            .map_err(metric_error)?;

        debug!("📊 Metrics registry initialised");

        Ok(Self {
            registry: Arc::new(registry),
            feed_fetches_total,
            feed_failures_total,
            feed_retries_total,
            open_alerts,
            acknowledgments_total,
            config_saves_total,
        })
    }

    pub fn record_fetch(&self, feed: &str) {
        self.feed_fetches_total.with_label_values(&[feed]).inc();
    }

    pub fn record_fetch_failure(&self, feed: &str) {
        self.feed_failures_total.with_label_values(&[feed]).inc();
    }

    pub fn record_retry(&self, feed: &str) {
        self.feed_retries_total.with_label_values(&[feed]).inc();
    }

    pub fn set_open_alerts(&self, feed: &str, count: usize) {
        self.open_alerts
            .with_label_values(&[feed])
            .set(count as i64);
    }

    pub fn record_acknowledgment(&self, feed: &str, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.acknowledgments_total
            .with_label_values(&[feed, outcome])
            .inc();
    }

    pub fn record_config_save(&self, document: &str, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.config_saves_total
            .with_label_values(&[document, outcome])
            .inc();
    }

    /// Export metrics in the Prometheus text format
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metric_error)?;
        String::from_utf8(buffer).map_err(|e| FleetError::Internal(e.to_string()))
    }
}
