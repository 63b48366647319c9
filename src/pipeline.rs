// src/pipeline.rs - Filter and sort stages applied to grouped alerts
//
// Stages run in a fixed order: view, search, alert type, acknowledgment,
// then sort. Every stage is pure and returns a subset of its input.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::alert::{AlertKind, AlertRecord, MachineDirectory, NodeAlert, OrgAlert};
use crate::error::FleetError;
use crate::grouping::AlertGroup;

/// Which feed(s) the dashboard is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlertView {
    Node,
    Org,
    #[default]
    All,
}

impl AlertView {
    pub fn shows_node(&self) -> bool {
        matches!(self, AlertView::Node | AlertView::All)
    }

    pub fn shows_org(&self) -> bool {
        matches!(self, AlertView::Org | AlertView::All)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AckFilter {
    #[default]
    All,
    Acknowledged,
    Unacknowledged,
}

impl AckFilter {
    pub fn matches<A: AlertRecord>(&self, alert: &A) -> bool {
        match self {
            AckFilter::All => true,
            AckFilter::Acknowledged => alert.is_acknowledged(),
            AckFilter::Unacknowledged => !alert.is_acknowledged(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    /// Node name for node groups, group key for org groups
    Name,
}

macro_rules! impl_choice_parsing {
    ($ty:ty, $( $name:literal => $variant:expr ),+ $(,)?) => {
        impl FromStr for $ty {
            type Err = FleetError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $( $name => Ok($variant), )+
                    other => Err(FleetError::Validation(format!(
                        "unknown {} '{}'",
                        stringify!($ty),
                        other
                    ))),
                }
            }
        }
    };
}

impl_choice_parsing!(AlertView, "node" => AlertView::Node, "org" => AlertView::Org, "all" => AlertView::All);
impl_choice_parsing!(
    AckFilter,
    "all" => AckFilter::All,
    "acknowledged" => AckFilter::Acknowledged,
    "unacknowledged" => AckFilter::Unacknowledged,
);
impl_choice_parsing!(
    SortOrder,
    "newest" => SortOrder::Newest,
    "oldest" => SortOrder::Oldest,
    "name" => SortOrder::Name,
    "node" => SortOrder::Name,
);

impl fmt::Display for AlertView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertView::Node => f.write_str("node"),
            AlertView::Org => f.write_str("org"),
            AlertView::All => f.write_str("all"),
        }
    }
}

/// Current filter selections. An empty `kinds` set means every kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub view: AlertView,
    pub search: String,
    pub kinds: BTreeSet<AlertKind>,
    pub ack: AckFilter,
    pub sort: SortOrder,
}

impl FilterCriteria {
    fn search_needle(&self) -> Option<String> {
        if self.search.is_empty() {
            None
        } else {
            Some(self.search.to_lowercase())
        }
    }

    fn kind_selected(&self, kind: AlertKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }
}

/// Badge counts over the raw, unfiltered snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FacetCounts {
    pub total: usize,
    pub acknowledged: usize,
    pub unacknowledged: usize,
}

impl FacetCounts {
    pub fn from_alerts<A: AlertRecord>(alerts: &[A]) -> Self {
        let acknowledged = alerts.iter().filter(|a| a.is_acknowledged()).count();
        Self {
            total: alerts.len(),
            acknowledged,
            unacknowledged: alerts.len() - acknowledged,
        }
    }

    fn merge(self, other: FacetCounts) -> Self {
        Self {
            total: self.total + other.total,
            acknowledged: self.acknowledged + other.acknowledged,
            unacknowledged: self.unacknowledged + other.unacknowledged,
        }
    }
}

/// Facet counts for each view, computed from the ungrouped snapshots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlertFacets {
    pub node: FacetCounts,
    pub org: FacetCounts,
    pub all: FacetCounts,
}

impl AlertFacets {
    pub fn compute(node_alerts: &[NodeAlert], org_alerts: &[OrgAlert]) -> Self {
        let node = FacetCounts::from_alerts(node_alerts);
        let org = FacetCounts::from_alerts(org_alerts);
        Self {
            node,
            org,
            all: node.merge(org),
        }
    }

    pub fn for_view(&self, view: AlertView) -> FacetCounts {
        match view {
            AlertView::Node => self.node,
            AlertView::Org => self.org,
            AlertView::All => self.all,
        }
    }
}

/// Keep members matching `predicate`, dropping groups left empty
fn retain_members<A, P>(groups: Vec<AlertGroup<A>>, predicate: P) -> Vec<AlertGroup<A>>
where
    P: Fn(&A) -> bool,
{
    groups
        .into_iter()
        .filter_map(|mut group| {
            group.alerts.retain(|a| predicate(a));
            if group.alerts.is_empty() {
                None
            } else {
                Some(group)
            }
        })
        .collect()
}

fn compare_by_first<A: AlertRecord>(a: &AlertGroup<A>, b: &AlertGroup<A>) -> Ordering {
    let a = a.first().map(|alert| alert.created_at());
    let b = b.first().map(|alert| alert.created_at());
    a.cmp(&b)
}

/// Stable sort; groups that compare equal keep their incoming order
fn sort_groups<A, N>(groups: &mut [AlertGroup<A>], order: SortOrder, name: N)
where
    A: AlertRecord,
    N: Fn(&AlertGroup<A>) -> String,
{
    match order {
        SortOrder::Newest => groups.sort_by(|a, b| compare_by_first(b, a)),
        SortOrder::Oldest => groups.sort_by(compare_by_first),
        SortOrder::Name => groups.sort_by_cached_key(|g| name(g)),
    }
}

/// Run every stage over the node groups
pub fn filter_node_groups(
    groups: &[AlertGroup<NodeAlert>],
    criteria: &FilterCriteria,
    machines: &MachineDirectory,
) -> Vec<AlertGroup<NodeAlert>> {
    if !criteria.view.shows_node() {
        return Vec::new();
    }

    let mut result: Vec<AlertGroup<NodeAlert>> = match criteria.search_needle() {
        Some(needle) => groups
            .iter()
            .filter(|group| {
                group.node_name().to_lowercase().contains(&needle)
                    || machines
                        .resolve(group.machine_id())
                        .to_lowercase()
                        .contains(&needle)
            })
            .cloned()
            .collect(),
        None => groups.to_vec(),
    };

    if !criteria.kinds.is_empty() {
        result = retain_members(result, |alert| criteria.kind_selected(alert.kind()));
    }
    if criteria.ack != AckFilter::All {
        result = retain_members(result, |alert| criteria.ack.matches(alert));
    }

    sort_groups(&mut result, criteria.sort, |g| g.node_name().to_string());
    result
}

/// Run every stage over the org groups
pub fn filter_org_groups(
    groups: &[AlertGroup<OrgAlert>],
    criteria: &FilterCriteria,
) -> Vec<AlertGroup<OrgAlert>> {
    if !criteria.view.shows_org() {
        return Vec::new();
    }

    let mut result = groups.to_vec();

    if let Some(needle) = criteria.search_needle() {
        result = retain_members(result, |alert| {
            let avs = alert.alert_type.avs();
            avs.name.to_lowercase().contains(&needle)
                || avs.address.to_lowercase().contains(&needle)
        });
    }

    // The org type filter tests the group key, not individual members
    if !criteria.kinds.is_empty() {
        result.retain(|group| group.kind().is_some_and(|kind| criteria.kind_selected(kind)));
    }
    if criteria.ack != AckFilter::All {
        result = retain_members(result, |alert| criteria.ack.matches(alert));
    }

    sort_groups(&mut result, criteria.sort, |g| g.key.clone());
    result
}
