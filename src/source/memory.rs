// src/source/memory.rs - In-memory backend used for demos and tests

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use super::{endpoint, AlertSource};
use crate::alert::{AvsInfo, MachineRef, NodeAlert, NodeAlertKind, OrgAlert, OrgAlertKind};
use crate::error::{FleetError, Result};
use crate::settings::{AlertFlag, NotificationSettings};

const FAIL_ALWAYS: u32 = u32::MAX;

#[derive(Debug, Default)]
struct BackendState {
    node_alerts: Vec<NodeAlert>,
    org_alerts: Vec<OrgAlert>,
    machines: Vec<MachineRef>,
    node_types: Vec<String>,
    settings: NotificationSettings,
    enabled_kinds: Vec<String>,
}

/// Backend double with call counters, injectable failures and latency
#[derive(Clone, Default)]
pub struct MemoryAlertSource {
    state: Arc<RwLock<BackendState>>,
    calls: Arc<DashMap<&'static str, u64>>,
    failures: Arc<DashMap<&'static str, u32>>,
    delay_ms: Arc<AtomicU64>,
}

impl MemoryAlertSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small fleet with a mix of node and ecosystem alerts
    pub fn with_demo_data() -> Self {
        let now = Utc::now();
        let node = |id: &str, machine: &str, name: &str, minutes: i64, kind: NodeAlertKind| NodeAlert {
            alert_id: id.to_string(),
            created_at: now - ChronoDuration::minutes(minutes),
            acknowledged_at: None,
            organization_id: 1,
            machine_id: machine.to_string(),
            node_name: name.to_string(),
            alert_type: kind,
            telegram_send: false,
            sendgrid_send: true,
            pagerduty_send: false,
        };
        let avs = |name: &str, address: &str| AvsInfo {
            address: address.to_string(),
            name: name.to_string(),
            ..Default::default()
        };

        let state = BackendState {
            node_alerts: vec![
                node(
                    "demo-n1",
                    "machine-a",
                    "eigenda-holesky",
                    5,
                    NodeAlertKind::NeedsUpdate {
                        node_name: "eigenda-holesky".to_string(),
                        current_version: "0.8.0".to_string(),
                        recommended_version: "0.8.4".to_string(),
                    },
                ),
                node(
                    "demo-n2",
                    "machine-a",
                    "eigenda-holesky",
                    12,
                    NodeAlertKind::NoMetrics("eigenda-holesky".to_string()),
                ),
                node(
                    "demo-n3",
                    "machine-b",
                    "lagrange-worker",
                    40,
                    NodeAlertKind::HardwareResourceUsage {
                        resource: "disk".to_string(),
                        percent: 93,
                    },
                ),
            ],
            org_alerts: vec![
                OrgAlert {
                    alert_id: "demo-o1".to_string(),
                    created_at: now - ChronoDuration::hours(3),
                    acknowledged_at: None,
                    organization_id: 1,
                    alert_type: OrgAlertKind::NewEigenAvs(avs("Witness Chain", "0x1111")),
                },
                OrgAlert {
                    alert_id: "demo-o2".to_string(),
                    created_at: now - ChronoDuration::hours(1),
                    acknowledged_at: Some(now - ChronoDuration::minutes(30)),
                    organization_id: 1,
                    alert_type: OrgAlertKind::UpdatedEigenAvs(avs("Brevis", "0x2222")),
                },
            ],
            machines: vec![
                MachineRef {
                    machine_id: "machine-a".to_string(),
                    name: "rack-a-01".to_string(),
                },
                MachineRef {
                    machine_id: "machine-b".to_string(),
                    name: "rack-b-07".to_string(),
                },
            ],
            node_types: vec!["EigenDA".to_string(), "LagrangeStateCommittee".to_string()],
            settings: NotificationSettings::default(),
            enabled_kinds: vec!["NeedsUpdate".to_string(), "NoMetrics".to_string()],
        };

        Self {
            state: Arc::new(RwLock::new(state)),
            ..Default::default()
        }
    }

    pub async fn set_node_alerts(&self, alerts: Vec<NodeAlert>) {
        self.state.write().await.node_alerts = alerts;
    }

    pub async fn set_org_alerts(&self, alerts: Vec<OrgAlert>) {
        self.state.write().await.org_alerts = alerts;
    }

    pub async fn set_machines(&self, machines: Vec<MachineRef>) {
        self.state.write().await.machines = machines;
    }

    pub async fn set_node_types(&self, node_types: Vec<String>) {
        self.state.write().await.node_types = node_types;
    }

    pub async fn set_notification_settings(&self, settings: NotificationSettings) {
        self.state.write().await.settings = settings;
    }

    pub async fn set_enabled_kinds(&self, kinds: Vec<String>) {
        self.state.write().await.enabled_kinds = kinds;
    }

    pub async fn stored_notification_settings(&self) -> NotificationSettings {
        self.state.read().await.settings.clone()
    }

    pub async fn enabled_kinds(&self) -> Vec<String> {
        self.state.read().await.enabled_kinds.clone()
    }

    /// Make every call to `endpoint` fail until [`Self::clear_failures`]
    pub fn fail_always(&self, endpoint: &'static str) {
        self.failures.insert(endpoint, FAIL_ALWAYS);
    }

    /// Make the next `count` calls to `endpoint` fail
    pub fn fail_next(&self, endpoint: &'static str, count: u32) {
        self.failures.insert(endpoint, count);
    }

    pub fn clear_failures(&self) {
        self.failures.clear();
    }

    /// Latency added to every call
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn call_count(&self, endpoint: &str) -> u64 {
        self.calls.get(endpoint).map(|v| *v).unwrap_or(0)
    }

    pub fn reset_call_counts(&self) {
        self.calls.clear();
    }

    async fn enter(&self, endpoint: &'static str) -> Result<()> {
        *self.calls.entry(endpoint).or_insert(0) += 1;

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let should_fail = match self.failures.get_mut(endpoint) {
            Some(mut remaining) => {
                if *remaining == FAIL_ALWAYS {
                    true
                } else if *remaining > 0 {
                    *remaining -= 1;
                    true
                } else {
                    false
                }
            }
            None => false,
        };

        if should_fail {
            debug!(endpoint, "Injected memory source failure");
            return Err(FleetError::Backend {
                status: 503,
                body: format!("injected failure for {}", endpoint),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AlertSource for MemoryAlertSource {
    async fn node_alerts(&self) -> Result<Vec<NodeAlert>> {
        self.enter(endpoint::NODE_ALERTS).await?;
        Ok(self.state.read().await.node_alerts.clone())
    }

    async fn org_alerts(&self) -> Result<Vec<OrgAlert>> {
        self.enter(endpoint::ORG_ALERTS).await?;
        Ok(self.state.read().await.org_alerts.clone())
    }

    async fn machines(&self) -> Result<Vec<MachineRef>> {
        self.enter(endpoint::MACHINES).await?;
        Ok(self.state.read().await.machines.clone())
    }

    async fn node_types(&self) -> Result<Vec<String>> {
        self.enter(endpoint::NODE_TYPES).await?;
        Ok(self.state.read().await.node_types.clone())
    }

    async fn acknowledge_node_alert(&self, alert_id: &str) -> Result<()> {
        self.enter(endpoint::ACK_NODE_ALERT).await?;
        let mut state = self.state.write().await;
        match state.node_alerts.iter_mut().find(|a| a.alert_id == alert_id) {
            Some(alert) => {
                alert.acknowledged_at.get_or_insert_with(Utc::now);
                Ok(())
            }
            None => Err(FleetError::Backend {
                status: 404,
                body: format!("node alert {} not found", alert_id),
            }),
        }
    }

    async fn acknowledge_org_alert(&self, alert_id: &str) -> Result<()> {
        self.enter(endpoint::ACK_ORG_ALERT).await?;
        let mut state = self.state.write().await;
        match state.org_alerts.iter_mut().find(|a| a.alert_id == alert_id) {
            Some(alert) => {
                alert.acknowledged_at.get_or_insert_with(Utc::now);
                Ok(())
            }
            None => Err(FleetError::Backend {
                status: 404,
                body: format!("org alert {} not found", alert_id),
            }),
        }
    }

    async fn notification_settings(&self) -> Result<NotificationSettings> {
        self.enter(endpoint::GET_SETTINGS).await?;
        Ok(self.state.read().await.settings.clone())
    }

    async fn save_notification_settings(&self, settings: &NotificationSettings) -> Result<()> {
        self.enter(endpoint::SAVE_SETTINGS).await?;
        self.state.write().await.settings = settings.clone();
        Ok(())
    }

    async fn enabled_alert_kinds(&self) -> Result<Vec<String>> {
        self.enter(endpoint::ENABLED_KINDS).await?;
        Ok(self.state.read().await.enabled_kinds.clone())
    }

    async fn set_alert_flags(&self, flags: &[AlertFlag]) -> Result<()> {
        self.enter(endpoint::SET_ALERT_FLAGS).await?;
        self.state.write().await.enabled_kinds = flags
            .iter()
            .filter(|flag| flag.enabled)
            .map(|flag| flag.alert.to_string())
            .collect();
        Ok(())
    }
}
