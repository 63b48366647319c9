// tests/integration/scheduler.rs - Feeds, grouping and views over HTTP

use fleetwatch::{FeedKind, FilterCriteria, SortOrder};
use std::time::Duration;

use super::TestHarness;
use crate::helpers::assertions::{assert_feed_failed, assert_feed_ready, assert_groups};
use crate::helpers::test_data::*;
use crate::helpers::wait_until;

#[tokio::test]
async fn test_dashboard_groups_both_feeds() {
    let harness = TestHarness::new().await;
    harness.backend.set_node_alerts(two_node_scenario()).await;
    harness.backend.set_org_alerts(ecosystem_scenario()).await;
    harness
        .backend
        .set_machines(vec![machine_json("M1", "rack-01")])
        .await;

    let dashboard = harness.dashboard();
    dashboard.scheduler().refresh_all().await;

    let view = dashboard.view(&FilterCriteria {
        sort: SortOrder::Name,
        ..Default::default()
    });
    assert_groups(&view.node_groups, &[("N1-M1", 2), ("N2-M2", 1)]);
    assert_groups(&view.org_groups, &[("NewEigenAvs", 3), ("UpdatedEigenAvs", 1)]);
    assert_eq!(view.machine_names[0].1, "rack-01");
    assert_eq!(view.machine_names[1].1, "Unknown Machine");
    assert_eq!(view.facets.all.total, 7);
}

#[tokio::test]
async fn test_failing_feed_does_not_poison_others() {
    let harness = TestHarness::new().await;
    harness.backend.set_org_alerts(ecosystem_scenario()).await;
    harness.backend.fail_path("alerts/node/active").await;

    let dashboard = harness.dashboard();
    dashboard.start().await;

    let scheduler = dashboard.scheduler();
    let settled = wait_until(Duration::from_secs(5), || {
        scheduler.node_alerts().snapshot().has_error()
            && scheduler.org_alerts().snapshot().data.is_some()
            && scheduler.machines().snapshot().data.is_some()
    })
    .await;
    assert!(settled, "feeds did not settle");

    assert_feed_failed(&scheduler.node_alerts().snapshot());
    assert_feed_ready(&scheduler.org_alerts().snapshot());
    assert_feed_ready(&scheduler.machines().snapshot());

    let attempts = harness.backend.calls_to("alerts/node/active").await.len();
    assert_eq!(attempts, harness.config.polling.max_retries as usize);

    // Manual retry recovers the failed feed
    harness.backend.recover().await;
    harness.backend.set_node_alerts(two_node_scenario()).await;
    dashboard.refresh(FeedKind::NodeAlerts).await;
    assert_feed_ready(&scheduler.node_alerts().snapshot());

    dashboard.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_refreshes_share_one_request() {
    let harness = TestHarness::new().await;
    harness.backend.set_node_alerts(two_node_scenario()).await;
    harness.backend.set_delay(200).await;

    let dashboard = harness.dashboard();
    let scheduler = dashboard.scheduler();
    tokio::join!(
        scheduler.refresh(FeedKind::NodeAlerts),
        scheduler.refresh(FeedKind::NodeAlerts),
        scheduler.refresh(FeedKind::NodeAlerts),
    );

    assert_eq!(harness.backend.calls_to("alerts/node/active").await.len(), 1);
    assert_eq!(
        scheduler.node_alerts().snapshot().data.map(|d| d.len()),
        Some(3)
    );
}

#[tokio::test]
async fn test_shutdown_stops_polling() {
    let harness = TestHarness::new().await;
    let mut config = harness.config.clone();
    config.polling.alert_interval_seconds = 1;
    let dashboard = fleetwatch::Dashboard::new(harness.source.clone(), &config).unwrap();

    dashboard.start().await;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    dashboard.shutdown().await;

    let polls = harness.backend.calls_to("alerts/org/active").await.len();
    assert!(polls >= 2, "expected at least two polls, saw {}", polls);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(harness.backend.calls_to("alerts/org/active").await.len(), polls);
    assert_eq!(harness.backend.calls_to("machine").await.len(), 1);
}
