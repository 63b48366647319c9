// tests/helpers/assertions.rs - Custom test assertions

use fleetwatch::{AlertGroup, AlertRecord, FeedSnapshot};
use std::collections::HashSet;

/// Assert group keys and sizes, in order
pub fn assert_groups<A: AlertRecord>(groups: &[AlertGroup<A>], expected: &[(&str, usize)]) {
    let actual: Vec<(&str, usize)> = groups.iter().map(|g| (g.key.as_str(), g.len())).collect();
    assert_eq!(actual, expected, "Unexpected grouping");
}

/// Assert that exactly `expected` ids are acknowledged
pub fn assert_acknowledged_ids<A: AlertRecord>(alerts: &[A], expected: &[&str]) {
    let acked: HashSet<&str> = alerts
        .iter()
        .filter(|a| a.is_acknowledged())
        .map(|a| a.alert_id())
        .collect();
    let expected: HashSet<&str> = expected.iter().copied().collect();
    assert_eq!(acked, expected, "Acknowledged set differs");
}

/// Assert a feed finished loading with data and no error
pub fn assert_feed_ready<T>(snapshot: &FeedSnapshot<T>) {
    assert!(snapshot.data.is_some(), "Feed should have data");
    assert!(
        snapshot.error.is_none(),
        "Feed should not report an error, got {:?}",
        snapshot.error
    );
}

/// Assert a feed reached its terminal error state
pub fn assert_feed_failed<T>(snapshot: &FeedSnapshot<T>) {
    assert!(snapshot.error.is_some(), "Feed should report an error");
    assert!(!snapshot.is_loading(), "A failed feed is not loading");
}
