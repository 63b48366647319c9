// tests/helpers/test_data.rs - Backend payload builders

use serde_json::{json, Value};
use uuid::Uuid;

/// Node alert as the backend serialises it
pub fn node_alert_json(alert_id: &str, node_name: &str, machine_id: &str, alert_type: Value) -> Value {
    json!({
        "alert_id": alert_id,
        "created_at": "2024-05-01T10:00:00",
        "acknowledged_at": null,
        "organization_id": 1,
        "machine_id": machine_id,
        "node_name": node_name,
        "alert_type": alert_type,
        "telegram_send": false,
        "sendgrid_send": true,
        "pagerduty_send": false
    })
}

/// Same as [`node_alert_json`] with a generated id
pub fn random_node_alert(node_name: &str, machine_id: &str, alert_type: Value) -> Value {
    node_alert_json(&Uuid::new_v4().to_string(), node_name, machine_id, alert_type)
}

pub fn with_created_at(mut alert: Value, created_at: &str) -> Value {
    alert["created_at"] = json!(created_at);
    alert
}

pub fn acknowledged(mut alert: Value) -> Value {
    alert["acknowledged_at"] = json!("2024-05-02T08:00:00Z");
    alert
}

pub fn needs_update(node_name: &str) -> Value {
    json!({
        "NeedsUpdate": {
            "node_name": node_name,
            "current_version": "0.8.0",
            "recommended_version": "0.8.4"
        }
    })
}

pub fn no_metrics(node_name: &str) -> Value {
    json!({ "NoMetrics": node_name })
}

pub fn avs(name: &str, address: &str) -> Value {
    json!({
        "address": address,
        "block_number": 19_000_000u64,
        "log_index": 3,
        "name": name,
        "metadata_uri": "",
        "description": "",
        "website": "",
        "logo": "",
        "twitter": ""
    })
}

/// Org alert of kind `NewEigenAvs` or `UpdatedEigenAvs`
pub fn org_alert_json(alert_id: &str, kind: &str, avs_name: &str, address: &str) -> Value {
    json!({
        "alert_id": alert_id,
        "created_at": "2024-05-01T09:00:00Z",
        "acknowledged_at": null,
        "organization_id": 1,
        "alert_type": { kind: avs(avs_name, address) }
    })
}

pub fn machine_json(machine_id: &str, name: &str) -> Value {
    json!({
        "machine_id": machine_id,
        "name": name,
        "ip": "10.0.0.1",
        "os": "linux"
    })
}

/// The two-node scenario: N1 on M1 with two kinds, N2 on M2 with one
pub fn two_node_scenario() -> Vec<Value> {
    vec![
        node_alert_json("abc", "N1", "M1", needs_update("N1")),
        node_alert_json("def", "N1", "M1", no_metrics("N1")),
        node_alert_json("ghi", "N2", "M2", needs_update("N2")),
    ]
}

/// Three `NewEigenAvs` alerts and one `UpdatedEigenAvs`
pub fn ecosystem_scenario() -> Vec<Value> {
    vec![
        org_alert_json("o-1", "UpdatedEigenAvs", "Brevis", "0xb1"),
        org_alert_json("o-2", "NewEigenAvs", "Lagrange", "0xa1"),
        org_alert_json("o-3", "NewEigenAvs", "Witness Chain", "0xa2"),
        org_alert_json("o-4", "NewEigenAvs", "eOracle", "0xa3"),
    ]
}
