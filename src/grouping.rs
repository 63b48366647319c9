// src/grouping.rs - Partition alert snapshots into display groups

use std::collections::HashMap;

use crate::alert::{AlertKind, AlertRecord, NodeAlert, OrgAlert};

/// Alerts sharing one grouping key, in feed order
#[derive(Debug, Clone, PartialEq)]
pub struct AlertGroup<A> {
    pub key: String,
    pub alerts: Vec<A>,
}

impl<A: AlertRecord> AlertGroup<A> {
    /// The member whose timestamp orders the group
    pub fn first(&self) -> Option<&A> {
        self.alerts.first()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn open_count(&self) -> usize {
        self.alerts.iter().filter(|a| !a.is_acknowledged()).count()
    }
}

/// Grouping key for node alerts: `node_name-machine_id`
pub fn node_group_key(alert: &NodeAlert) -> String {
    format!("{}-{}", alert.node_name, alert.machine_id)
}

/// Grouping key for org alerts: the alert kind name
pub fn org_group_key(alert: &OrgAlert) -> String {
    alert.kind().as_str().to_string()
}

/// Stable partition by key. Groups appear in order of first occurrence.
pub fn group_by<A, F>(alerts: &[A], key_fn: F) -> Vec<AlertGroup<A>>
where
    A: Clone,
    F: Fn(&A) -> String,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<AlertGroup<A>> = Vec::new();

    for alert in alerts {
        let key = key_fn(alert);
        match index.get(&key) {
            Some(&slot) => groups[slot].alerts.push(alert.clone()),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(AlertGroup {
                    key,
                    alerts: vec![alert.clone()],
                });
            }
        }
    }

    groups
}

/// A node instance may raise several kinds; they display together
pub fn group_node_alerts(alerts: &[NodeAlert]) -> Vec<AlertGroup<NodeAlert>> {
    group_by(alerts, node_group_key)
}

/// Org alerts are ecosystem-wide, so they group across organizations by kind
pub fn group_org_alerts(alerts: &[OrgAlert]) -> Vec<AlertGroup<OrgAlert>> {
    group_by(alerts, org_group_key)
}

impl AlertGroup<NodeAlert> {
    pub fn node_name(&self) -> &str {
        self.first().map(|a| a.node_name.as_str()).unwrap_or_default()
    }

    pub fn machine_id(&self) -> &str {
        self.first().map(|a| a.machine_id.as_str()).unwrap_or_default()
    }
}

impl AlertGroup<OrgAlert> {
    pub fn kind(&self) -> Option<AlertKind> {
        self.key.parse().ok()
    }
}
