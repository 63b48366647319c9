// tests/integration/http_source.rs - HTTP source against the mock backend

use fleetwatch::{
    AlertFlagCatalog, AlertKind, AlertRecord, AlertSource, FleetError, HttpAlertSource,
    NotificationSettings,
};
use pretty_assertions::assert_eq;
use serde_json::json;

use super::TestHarness;
use crate::helpers::test_data::*;
use crate::helpers::test_config;

#[tokio::test]
async fn test_node_alert_feed_decodes_and_skips_unknown_kinds() {
    let harness = TestHarness::new().await;
    let mut alerts = two_node_scenario();
    alerts.push(node_alert_json("zzz", "N3", "M3", json!({ "BrandNewKind": {} })));
    harness.backend.set_node_alerts(alerts).await;

    let alerts = harness.source.node_alerts().await.unwrap();
    let ids: Vec<&str> = alerts.iter().map(|a| a.alert_id()).collect();
    assert_eq!(ids, vec!["abc", "def", "ghi"]);
    assert_eq!(alerts[1].kind(), AlertKind::NoMetrics);
    assert_eq!(alerts[0].created_at.to_rfc3339(), "2024-05-01T10:00:00+00:00");
}

#[tokio::test]
async fn test_org_alerts_and_machine_directory() {
    let harness = TestHarness::new().await;
    harness.backend.set_org_alerts(ecosystem_scenario()).await;
    harness
        .backend
        .set_machines(vec![machine_json("M1", "rack-01"), machine_json("M2", "rack-02")])
        .await;

    let org = harness.source.org_alerts().await.unwrap();
    assert_eq!(org.len(), 4);
    assert_eq!(org[1].alert_type.avs().name, "Lagrange");

    let machines = harness.source.machines().await.unwrap();
    assert_eq!(machines[1].machine_id, "M2");
    assert_eq!(machines[1].name, "rack-02");
}

#[tokio::test]
async fn test_acknowledge_posts_alert_id() {
    let harness = TestHarness::new().await;
    harness.backend.set_node_alerts(two_node_scenario()).await;

    harness.source.acknowledge_node_alert("def").await.unwrap();

    let calls = harness.backend.calls_to("alerts/node/acknowledge").await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, "POST");
    assert_eq!(calls[0].query.get("alert_id").map(String::as_str), Some("def"));
    assert!(harness.backend.calls_to("alerts/org/acknowledge").await.is_empty());
}

#[tokio::test]
async fn test_backend_errors_keep_status() {
    let harness = TestHarness::new().await;
    harness.backend.fail_path("alerts/org/active").await;

    let err = harness.source.org_alerts().await.unwrap_err();
    assert!(matches!(err, FleetError::Backend { status: 500, .. }));
    assert!(err.is_transient());

    let err = harness.source.acknowledge_org_alert("missing").await.unwrap_err();
    assert!(matches!(err, FleetError::Backend { status: 404, .. }));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let source = HttpAlertSource::new(&test_config("http://127.0.0.1:1/").backend).unwrap();
    let err = source.node_alerts().await.unwrap_err();
    assert!(matches!(err, FleetError::Network(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_settings_round_trip_sends_null_pagerduty_key() {
    let harness = TestHarness::new().await;

    let mut settings = harness.source.notification_settings().await.unwrap();
    assert_eq!(settings, NotificationSettings::default());

    settings.email.enabled = true;
    settings.email.emails.push("ops@example.com".to_string());
    settings.set_pagerduty_key("   ");
    harness
        .source
        .save_notification_settings(&settings.normalized())
        .await
        .unwrap();

    let stored = harness.backend.settings().await;
    assert_eq!(stored["email"]["emails"], json!(["ops@example.com"]));
    assert!(stored["pagerduty"]["integration_key"].is_null());
}

#[tokio::test]
async fn test_alert_flags_wire_format() {
    let harness = TestHarness::new().await;
    harness.backend.set_enabled_kinds(&["NeedsUpdate"]).await;

    let enabled = harness.source.enabled_alert_kinds().await.unwrap();
    let mut catalog = AlertFlagCatalog::from_enabled(&enabled);
    catalog.toggle(AlertKind::NewEigenAvs);
    harness.source.set_alert_flags(catalog.flags()).await.unwrap();

    let call = harness
        .backend
        .calls_to("organization/notifications/alerts/set")
        .await
        .pop()
        .unwrap();
    let body = call.body.unwrap();
    assert_eq!(body.as_array().unwrap().len(), AlertKind::ALL.len());
    assert!(body
        .as_array()
        .unwrap()
        .contains(&json!({"alert": "NewEigenAvs", "enabled": true})));

    let mut stored = harness.backend.enabled_kinds().await;
    stored.sort();
    assert_eq!(stored, vec!["NeedsUpdate", "NewEigenAvs"]);
}

#[tokio::test]
async fn test_node_types() {
    let harness = TestHarness::new().await;
    harness
        .backend
        .set_node_types(vec!["EigenDA".to_string(), "Brevis".to_string()])
        .await;
    assert_eq!(harness.source.node_types().await.unwrap(), vec!["EigenDA", "Brevis"]);
}
