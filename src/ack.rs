// src/ack.rs - User-triggered acknowledgment of node and org alerts
//
// The controller never flips acknowledged_at locally. A successful write is
// followed by a refresh of the owning feed, and that snapshot is the truth.

use dashmap::DashMap;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::alert::{Alert, AlertRecord, NodeAlert, OrgAlert};
use crate::error::{FleetError, Result};
use crate::feed::Feed;
use crate::metrics::Metrics;
use crate::notify::Notifier;
use crate::scheduler::Scheduler;
use crate::source::AlertSource;

/// Which acknowledge endpoint (and which feed) an alert belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AlertFeed {
    Node,
    Org,
}

impl AlertFeed {
    pub fn name(&self) -> &'static str {
        match self {
            AlertFeed::Node => "node_alerts",
            AlertFeed::Org => "org_alerts",
        }
    }
}

impl fmt::Display for AlertFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AlertFeed {
    type Err = FleetError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "node" | "node_alerts" => Ok(AlertFeed::Node),
            "org" | "org_alerts" => Ok(AlertFeed::Org),
            other => Err(FleetError::Validation(format!("unknown alert feed '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AckStatus {
    Open,
    Pending,
    Acknowledged,
}

type PendingKey = (AlertFeed, String);

/// Removes the pending entry however the acknowledge call ends
struct PendingGuard<'a> {
    pending: &'a DashMap<PendingKey, ()>,
    key: PendingKey,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.key);
    }
}

#[derive(Clone)]
pub struct AckController {
    source: Arc<dyn AlertSource>,
    node_alerts: Feed<Vec<NodeAlert>>,
    org_alerts: Feed<Vec<OrgAlert>>,
    notifier: Notifier,
    metrics: Option<Metrics>,
    pending: Arc<DashMap<PendingKey, ()>>,
}

impl AckController {
    pub fn new(source: Arc<dyn AlertSource>, scheduler: &Scheduler, notifier: Notifier) -> Self {
        Self {
            source,
            node_alerts: scheduler.node_alerts().clone(),
            org_alerts: scheduler.org_alerts().clone(),
            notifier,
            metrics: None,
            pending: Arc::new(DashMap::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn is_pending(&self, feed: AlertFeed, alert_id: &str) -> bool {
        self.pending.contains_key(&(feed, alert_id.to_string()))
    }

    /// Current state of an alert as seen by this controller
    pub fn status(&self, alert: &Alert) -> AckStatus {
        let feed = match alert {
            Alert::Node(_) => AlertFeed::Node,
            Alert::Org(_) => AlertFeed::Org,
        };
        if self.is_pending(feed, alert.alert_id()) {
            AckStatus::Pending
        } else if alert.is_acknowledged() {
            AckStatus::Acknowledged
        } else {
            AckStatus::Open
        }
    }

    /// Acknowledge one alert. At most one write per alert is in flight;
    /// failures are reported and never retried.
    pub async fn acknowledge(&self, feed: AlertFeed, alert_id: &str) -> Result<()> {
        let key = (feed, alert_id.to_string());
        if self.pending.insert(key.clone(), ()).is_some() {
            debug!(feed = %feed, alert_id = %alert_id, "Acknowledgment already pending");
            return Err(FleetError::AcknowledgmentPending {
                alert_id: alert_id.to_string(),
            });
        }
        let _guard = PendingGuard {
            pending: &self.pending,
            key,
        };

        info!(feed = %feed, alert_id = %alert_id, "📝 Acknowledging alert");
        let result = match feed {
            AlertFeed::Node => self.source.acknowledge_node_alert(alert_id).await,
            AlertFeed::Org => self.source.acknowledge_org_alert(alert_id).await,
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_acknowledgment(feed.name(), result.is_ok());
        }

        match result {
            Ok(()) => {
                self.notifier.success("Alert acknowledged");
                match feed {
                    AlertFeed::Node => {
                        self.node_alerts.refresh().await;
                    }
                    AlertFeed::Org => {
                        self.org_alerts.refresh().await;
                    }
                }
                Ok(())
            }
            Err(e) => {
                error!(feed = %feed, alert_id = %alert_id, error = %e, "Acknowledgment failed");
                self.notifier
                    .error(format!("Failed to acknowledge alert {}: {}", alert_id, e));
                Err(e)
            }
        }
    }
}
