// src/alert.rs - Alert data model shared by every stage of the dashboard engine

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::error::FleetError;

/// Display label for machine ids missing from the directory
pub const UNKNOWN_MACHINE: &str = "Unknown Machine";

/// Closed set of alert-kind identifiers known to the dashboard.
///
/// The identifier is what grouping, filtering and the notification flag
/// catalog key on; payloads live in [`NodeAlertKind`] and [`OrgAlertKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertKind {
    Custom,
    ActiveSetNoDeployment,
    UnregisteredFromActiveSet,
    MachineNotResponding,
    NodeNotRunning,
    NoChainInfo,
    NoMetrics,
    NoOperatorId,
    HardwareResourceUsage,
    LowPerformanceScore,
    NeedsUpdate,
    NewEigenAvs,
    UpdatedEigenAvs,
}

impl AlertKind {
    /// Every known kind, in catalog order
    pub const ALL: [AlertKind; 13] = [
        AlertKind::Custom,
        AlertKind::ActiveSetNoDeployment,
        AlertKind::UnregisteredFromActiveSet,
        AlertKind::MachineNotResponding,
        AlertKind::NodeNotRunning,
        AlertKind::NoChainInfo,
        AlertKind::NoMetrics,
        AlertKind::NoOperatorId,
        AlertKind::HardwareResourceUsage,
        AlertKind::LowPerformanceScore,
        AlertKind::NeedsUpdate,
        AlertKind::NewEigenAvs,
        AlertKind::UpdatedEigenAvs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Custom => "Custom",
            AlertKind::ActiveSetNoDeployment => "ActiveSetNoDeployment",
            AlertKind::UnregisteredFromActiveSet => "UnregisteredFromActiveSet",
            AlertKind::MachineNotResponding => "MachineNotResponding",
            AlertKind::NodeNotRunning => "NodeNotRunning",
            AlertKind::NoChainInfo => "NoChainInfo",
            AlertKind::NoMetrics => "NoMetrics",
            AlertKind::NoOperatorId => "NoOperatorId",
            AlertKind::HardwareResourceUsage => "HardwareResourceUsage",
            AlertKind::LowPerformanceScore => "LowPerformanceScore",
            AlertKind::NeedsUpdate => "NeedsUpdate",
            AlertKind::NewEigenAvs => "NewEigenAvs",
            AlertKind::UpdatedEigenAvs => "UpdatedEigenAvs",
        }
    }

    /// Org-level kinds are ecosystem-wide and never tied to a machine
    pub fn is_org_kind(&self) -> bool {
        matches!(self, AlertKind::NewEigenAvs | AlertKind::UpdatedEigenAvs)
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertKind {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlertKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| FleetError::Validation(format!("unknown alert kind: {}", s)))
    }
}

/// Payload of a node-scoped alert, one variant per kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeAlertKind {
    Custom {
        node_name: String,
        node_type: String,
        #[serde(default)]
        extra_data: serde_json::Value,
    },
    ActiveSetNoDeployment {
        node_name: String,
        node_type: String,
        operator: String,
    },
    UnregisteredFromActiveSet {
        node_name: String,
        node_type: String,
        operator: String,
    },
    MachineNotResponding,
    NodeNotRunning(String),
    NoChainInfo(String),
    NoMetrics(String),
    NoOperatorId(String),
    HardwareResourceUsage {
        resource: String,
        percent: u16,
    },
    LowPerformanceScore {
        node_name: String,
        performance: u16,
    },
    NeedsUpdate {
        node_name: String,
        current_version: String,
        recommended_version: String,
    },
}

impl NodeAlertKind {
    pub fn kind(&self) -> AlertKind {
        match self {
            NodeAlertKind::Custom { .. } => AlertKind::Custom,
            NodeAlertKind::ActiveSetNoDeployment { .. } => AlertKind::ActiveSetNoDeployment,
            NodeAlertKind::UnregisteredFromActiveSet { .. } => AlertKind::UnregisteredFromActiveSet,
            NodeAlertKind::MachineNotResponding => AlertKind::MachineNotResponding,
            NodeAlertKind::NodeNotRunning(_) => AlertKind::NodeNotRunning,
            NodeAlertKind::NoChainInfo(_) => AlertKind::NoChainInfo,
            NodeAlertKind::NoMetrics(_) => AlertKind::NoMetrics,
            NodeAlertKind::NoOperatorId(_) => AlertKind::NoOperatorId,
            NodeAlertKind::HardwareResourceUsage { .. } => AlertKind::HardwareResourceUsage,
            NodeAlertKind::LowPerformanceScore { .. } => AlertKind::LowPerformanceScore,
            NodeAlertKind::NeedsUpdate { .. } => AlertKind::NeedsUpdate,
        }
    }
}

/// AVS details carried by ecosystem-level alerts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvsInfo {
    pub address: String,
    pub block_number: u64,
    pub log_index: u64,
    pub name: String,
    pub metadata_uri: String,
    pub description: String,
    pub website: String,
    pub logo: String,
    pub twitter: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrgAlertKind {
    NewEigenAvs(AvsInfo),
    UpdatedEigenAvs(AvsInfo),
}

impl OrgAlertKind {
    pub fn kind(&self) -> AlertKind {
        match self {
            OrgAlertKind::NewEigenAvs(_) => AlertKind::NewEigenAvs,
            OrgAlertKind::UpdatedEigenAvs(_) => AlertKind::UpdatedEigenAvs,
        }
    }

    pub fn avs(&self) -> &AvsInfo {
        match self {
            OrgAlertKind::NewEigenAvs(info) | OrgAlertKind::UpdatedEigenAvs(info) => info,
        }
    }
}

/// Alert scoped to one node instance on one machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAlert {
    pub alert_id: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub organization_id: i64,
    pub machine_id: String,
    pub node_name: String,
    pub alert_type: NodeAlertKind,
    #[serde(default)]
    pub telegram_send: bool,
    #[serde(default)]
    pub sendgrid_send: bool,
    #[serde(default)]
    pub pagerduty_send: bool,
}

/// Alert scoped to the organization's view of the ecosystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgAlert {
    pub alert_id: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub organization_id: i64,
    pub alert_type: OrgAlertKind,
}

/// Envelope fields every alert variant shares
pub trait AlertRecord {
    fn alert_id(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
    fn acknowledged_at(&self) -> Option<DateTime<Utc>>;
    fn kind(&self) -> AlertKind;

    fn is_acknowledged(&self) -> bool {
        self.acknowledged_at().is_some()
    }
}

impl AlertRecord for NodeAlert {
    fn alert_id(&self) -> &str {
        &self.alert_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn acknowledged_at(&self) -> Option<DateTime<Utc>> {
        self.acknowledged_at
    }

    fn kind(&self) -> AlertKind {
        self.alert_type.kind()
    }
}

impl AlertRecord for OrgAlert {
    fn alert_id(&self) -> &str {
        &self.alert_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn acknowledged_at(&self) -> Option<DateTime<Utc>> {
        self.acknowledged_at
    }

    fn kind(&self) -> AlertKind {
        self.alert_type.kind()
    }
}

/// Either alert variant, for consumers that handle both feeds uniformly
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    Node(NodeAlert),
    Org(OrgAlert),
}

impl AlertRecord for Alert {
    fn alert_id(&self) -> &str {
        match self {
            Alert::Node(a) => a.alert_id(),
            Alert::Org(a) => a.alert_id(),
        }
    }

    fn created_at(&self) -> DateTime<Utc> {
        match self {
            Alert::Node(a) => a.created_at,
            Alert::Org(a) => a.created_at,
        }
    }

    fn acknowledged_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Alert::Node(a) => a.acknowledged_at,
            Alert::Org(a) => a.acknowledged_at,
        }
    }

    fn kind(&self) -> AlertKind {
        match self {
            Alert::Node(a) => a.kind(),
            Alert::Org(a) => a.kind(),
        }
    }
}

/// Entry of the machine directory feed. Extra backend fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineRef {
    pub machine_id: String,
    #[serde(default)]
    pub name: String,
}

/// Read-only machine id to display-name lookup
#[derive(Debug, Clone, Default)]
pub struct MachineDirectory {
    names: HashMap<String, String>,
}

impl MachineDirectory {
    pub fn new(machines: &[MachineRef]) -> Self {
        let names = machines
            .iter()
            .map(|m| (m.machine_id.clone(), m.name.clone()))
            .collect();
        Self { names }
    }

    pub fn resolve(&self, machine_id: &str) -> &str {
        self.names
            .get(machine_id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_MACHINE)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Decode a feed element by element, dropping entries that fail to parse.
///
/// One alert with an unrecognised kind must not blank the whole feed.
pub fn decode_feed<T: DeserializeOwned>(feed: &str, values: Vec<serde_json::Value>) -> Vec<T> {
    let total = values.len();
    let decoded: Vec<T> = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<T>(value) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(feed = %feed, index = index, error = %e, "Skipping undecodable feed entry");
                None
            }
        })
        .collect();

    if decoded.len() != total {
        warn!(
            feed = %feed,
            kept = decoded.len(),
            dropped = total - decoded.len(),
            "Feed contained entries that could not be decoded"
        );
    }
    decoded
}

/// Timestamps arrive either as RFC 3339 or as naive UTC date-times
pub(crate) mod timestamp {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Ok(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .map(|naive| naive.and_utc())
            .map_err(|e| format!("invalid timestamp '{}': {}", raw, e))
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            ts: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => serializer.serialize_some(&ts.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            raw.map(|r| parse(&r).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
