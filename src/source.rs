// src/source.rs - Backend contracts consumed by the dashboard engine

use async_trait::async_trait;
use std::sync::Arc;

use crate::alert::{MachineRef, NodeAlert, OrgAlert};
use crate::config::Config;
use crate::error::{FleetError, Result};
use crate::settings::{AlertFlag, NotificationSettings};

pub mod http;
pub mod memory;

pub use http::HttpAlertSource;
pub use memory::MemoryAlertSource;

/// Stable names for every backend contract, used as metric labels,
/// log fields and memory-source call counters.
pub mod endpoint {
    pub const NODE_ALERTS: &str = "node_alerts";
    pub const ORG_ALERTS: &str = "org_alerts";
    pub const MACHINES: &str = "machines";
    pub const NODE_TYPES: &str = "node_types";
    pub const ACK_NODE_ALERT: &str = "acknowledge_node_alert";
    pub const ACK_ORG_ALERT: &str = "acknowledge_org_alert";
    pub const GET_SETTINGS: &str = "get_notification_settings";
    pub const SAVE_SETTINGS: &str = "save_notification_settings";
    pub const ENABLED_KINDS: &str = "enabled_alert_kinds";
    pub const SET_ALERT_FLAGS: &str = "set_alert_flags";
}

#[async_trait]
pub trait AlertSource: Send + Sync {
    async fn node_alerts(&self) -> Result<Vec<NodeAlert>>;
    async fn org_alerts(&self) -> Result<Vec<OrgAlert>>;
    async fn machines(&self) -> Result<Vec<MachineRef>>;
    async fn node_types(&self) -> Result<Vec<String>>;
    async fn acknowledge_node_alert(&self, alert_id: &str) -> Result<()>;
    async fn acknowledge_org_alert(&self, alert_id: &str) -> Result<()>;
    async fn notification_settings(&self) -> Result<NotificationSettings>;
    async fn save_notification_settings(&self, settings: &NotificationSettings) -> Result<()>;
    /// Names of the alert kinds currently enabled for notification
    async fn enabled_alert_kinds(&self) -> Result<Vec<String>>;
    async fn set_alert_flags(&self, flags: &[AlertFlag]) -> Result<()>;
}

/// Build the source selected by `backend.kind`
pub fn create_source(config: &Config) -> Result<Arc<dyn AlertSource>> {
    match config.backend.kind.as_str() {
        "http" => Ok(Arc::new(HttpAlertSource::new(&config.backend)?)),
        "memory" => Ok(Arc::new(MemoryAlertSource::with_demo_data())),
        kind => Err(FleetError::Configuration(format!(
            "Unsupported source backend: {}",
            kind
        ))),
    }
}
