// tests/integration/settings.rs - Notification configuration over HTTP

use fleetwatch::{AlertKind, Channel, NoticeLevel, SaveOutcome};
use serde_json::json;

use super::TestHarness;

#[tokio::test]
async fn test_load_builds_flag_catalog_from_enabled_kinds() {
    let harness = TestHarness::new().await;
    harness.backend.set_enabled_kinds(&["NeedsUpdate"]).await;

    let dashboard = harness.dashboard();
    let report = dashboard.settings().load().await;
    assert!(report.settings_loaded && report.flags_loaded);

    let catalog = dashboard.settings().alert_flags().await;
    assert_eq!(catalog.enabled_kinds(), vec![AlertKind::NeedsUpdate]);
    assert_eq!(catalog.flags().len(), AlertKind::ALL.len());
}

#[tokio::test]
async fn test_one_document_failing_does_not_block_the_other() {
    let harness = TestHarness::new().await;
    harness.backend.set_enabled_kinds(&["NoMetrics", "NewEigenAvs"]).await;
    harness
        .backend
        .fail_path("organization/notifications/settings")
        .await;

    let dashboard = harness.dashboard();
    let mut notices = dashboard.notifier().subscribe();
    let report = dashboard.settings().load().await;

    assert!(!report.settings_loaded);
    assert!(report.flags_loaded);
    assert_eq!(dashboard.settings().alert_flags().await.enabled_kinds().len(), 2);
    assert!(!dashboard.settings().settings().await.is_enabled(Channel::Email));
    assert_eq!(notices.recv().await.unwrap().level, NoticeLevel::Error);
}

#[tokio::test]
async fn test_saves_are_independent_and_only_when_dirty() {
    let harness = TestHarness::new().await;
    let dashboard = harness.dashboard();
    let manager = dashboard.settings();
    manager.load().await;

    assert_eq!(manager.save_settings().await.unwrap(), SaveOutcome::Skipped);
    assert_eq!(manager.save_alert_flags().await.unwrap(), SaveOutcome::Skipped);
    assert!(harness.backend.calls().await.iter().all(|c| c.method == "GET"));

    manager.type_email_input("o").await;
    assert!(manager.settings_modified().await);
    manager.type_email_input("oncall@example.com").await;
    manager.submit_email_draft().await.unwrap();
    manager.set_pagerduty_key("").await;

    assert_eq!(manager.save_settings().await.unwrap(), SaveOutcome::Saved);
    assert!(!manager.settings_modified().await);
    assert!(!manager.alert_flags_modified().await);
    assert!(harness
        .backend
        .calls_to("organization/notifications/alerts/set")
        .await
        .is_empty());

    let stored = harness.backend.settings().await;
    assert_eq!(stored["email"]["enabled"], json!(true));
    assert_eq!(stored["email"]["emails"], json!(["oncall@example.com"]));
    assert!(stored["pagerduty"]["integration_key"].is_null());

    manager.toggle_all_alert_flags(true).await;
    assert_eq!(manager.save_alert_flags().await.unwrap(), SaveOutcome::Saved);
    assert_eq!(harness.backend.enabled_kinds().await.len(), AlertKind::ALL.len());
}

#[tokio::test]
async fn test_failed_save_keeps_dirty_flag() {
    let harness = TestHarness::new().await;
    let dashboard = harness.dashboard();
    let manager = dashboard.settings();
    manager.load().await;

    manager.toggle_channel(Channel::Telegram).await;
    harness
        .backend
        .fail_path("organization/notifications/settings")
        .await;

    assert!(manager.save_settings().await.is_err());
    assert!(manager.settings_modified().await);
    assert!(manager.can_save_settings().await);

    harness.backend.recover().await;
    assert_eq!(manager.save_settings().await.unwrap(), SaveOutcome::Saved);
    assert_eq!(harness.backend.settings().await["telegram"]["enabled"], json!(true));
}

#[tokio::test]
async fn test_unloaded_settings_are_never_saved_over_backend() {
    let harness = TestHarness::new().await;
    let stored = json!({
        "telegram": { "enabled": true, "chats": ["chat-1"] },
        "email": { "enabled": true, "emails": ["oncall@corp.com"] },
        "pagerduty": { "enabled": true, "integration_key": "PDKEY" }
    });
    harness.backend.set_settings(stored.clone()).await;
    harness
        .backend
        .fail_path("organization/notifications/settings")
        .await;

    let dashboard = harness.dashboard();
    let report = dashboard.settings().load().await;
    assert!(report.require_settings().is_err());
    assert!(report.require_alert_flags().is_ok());

    harness.backend.recover().await;
    assert_eq!(harness.backend.settings().await, stored);
    assert!(harness.backend.calls().await.iter().all(|c| c.method == "GET"));
}
