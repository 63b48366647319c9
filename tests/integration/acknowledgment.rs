// tests/integration/acknowledgment.rs - Acknowledge then refetch, end to end

use fleetwatch::{AckStatus, Alert, AlertFeed, FleetError, NoticeLevel};

use super::TestHarness;
use crate::helpers::assertions::assert_acknowledged_ids;
use crate::helpers::test_data::*;

async fn loaded(harness: &TestHarness) -> fleetwatch::Dashboard {
    let mut node_alerts = two_node_scenario();
    node_alerts[2] = acknowledged(node_alerts[2].clone());
    harness.backend.set_node_alerts(node_alerts).await;
    harness.backend.set_org_alerts(ecosystem_scenario()).await;

    let dashboard = harness.dashboard();
    dashboard.scheduler().refresh_all().await;
    harness.backend.clear_calls().await;
    dashboard
}

#[tokio::test]
async fn test_acknowledge_refetches_only_the_owning_feed() {
    let harness = TestHarness::new().await;
    let dashboard = loaded(&harness).await;
    let mut notices = dashboard.notifier().subscribe();

    dashboard.acknowledge(AlertFeed::Node, "abc").await.unwrap();

    assert_eq!(harness.backend.calls_to("alerts/node/acknowledge").await.len(), 1);
    assert_eq!(harness.backend.calls_to("alerts/node/active").await.len(), 1);
    assert_eq!(harness.backend.calls_to("alerts/org/active").await.len(), 0);
    assert_eq!(notices.recv().await.unwrap().level, NoticeLevel::Success);

    let snapshot = dashboard.scheduler().node_alerts().snapshot();
    assert_acknowledged_ids(snapshot.data.as_deref().unwrap(), &["abc", "ghi"]);
}

#[tokio::test]
async fn test_org_acknowledge_leaves_other_alerts_untouched() {
    let harness = TestHarness::new().await;
    let dashboard = loaded(&harness).await;

    let before = dashboard.scheduler().org_alerts().snapshot().data.unwrap();
    dashboard.acknowledge(AlertFeed::Org, "o-3").await.unwrap();
    let after = dashboard.scheduler().org_alerts().snapshot().data.unwrap();

    assert_acknowledged_ids(after.as_slice(), &["o-3"]);
    for (old, new) in before.iter().zip(after.iter()) {
        if new.alert_id != "o-3" {
            assert_eq!(old.acknowledged_at, new.acknowledged_at);
        }
    }
    assert_eq!(harness.backend.calls_to("alerts/node/active").await.len(), 0);
}

#[tokio::test]
async fn test_failed_acknowledge_reports_and_stays_open() {
    let harness = TestHarness::new().await;
    let dashboard = loaded(&harness).await;
    let mut notices = dashboard.notifier().subscribe();
    harness.backend.fail_path("alerts/node/acknowledge").await;

    let err = dashboard.acknowledge(AlertFeed::Node, "def").await.unwrap_err();
    assert!(matches!(err, FleetError::Backend { status: 500, .. }));

    // Not retried, and no refetch after a failed write
    assert_eq!(harness.backend.calls_to("alerts/node/acknowledge").await.len(), 1);
    assert_eq!(harness.backend.calls_to("alerts/node/active").await.len(), 0);
    assert_eq!(notices.recv().await.unwrap().level, NoticeLevel::Error);

    let alerts = dashboard.scheduler().node_alerts().snapshot().data.unwrap();
    let def = alerts.iter().find(|a| a.alert_id == "def").unwrap().clone();
    assert_eq!(dashboard.acknowledgments().status(&Alert::Node(def)), AckStatus::Open);

    // The user can try again once the backend recovers
    harness.backend.recover().await;
    dashboard.acknowledge(AlertFeed::Node, "def").await.unwrap();
    let alerts = dashboard.scheduler().node_alerts().snapshot().data.unwrap();
    assert_acknowledged_ids(alerts.as_slice(), &["def", "ghi"]);
}
