// src/dashboard.rs - Facade wiring source, scheduler, controllers and views

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::ack::{AckController, AlertFeed};
use crate::alert::{NodeAlert, OrgAlert};
use crate::config::Config;
use crate::error::Result;
use crate::feed::{Feed, FeedSnapshot};
use crate::grouping::{group_node_alerts, group_org_alerts, AlertGroup};
use crate::metrics::Metrics;
use crate::node_types::NodeTypes;
use crate::notify::Notifier;
use crate::pipeline::{filter_node_groups, filter_org_groups, AlertFacets, FilterCriteria};
use crate::scheduler::{FeedKind, Scheduler};
use crate::settings::NotificationConfigManager;
use crate::source::{create_source, AlertSource};

/// What the presentation layer needs to render one feed's status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedStatus {
    pub loading: bool,
    pub error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> From<&FeedSnapshot<T>> for FeedStatus {
    fn from(snapshot: &FeedSnapshot<T>) -> Self {
        Self {
            loading: snapshot.is_loading(),
            error: snapshot.error.clone(),
            updated_at: snapshot.updated_at,
        }
    }
}

/// Immutable result of running the current snapshots through grouping,
/// filtering and sorting
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub criteria: FilterCriteria,
    pub node_groups: Vec<AlertGroup<NodeAlert>>,
    pub org_groups: Vec<AlertGroup<OrgAlert>>,
    /// Computed from the unfiltered snapshots
    pub facets: AlertFacets,
    pub node_status: FeedStatus,
    pub org_status: FeedStatus,
    pub machine_status: FeedStatus,
    /// Resolved machine names, keyed by node group key
    pub machine_names: Vec<(String, String)>,
}

impl DashboardView {
    pub fn is_empty(&self) -> bool {
        self.node_groups.is_empty() && self.org_groups.is_empty()
    }
}

fn snapshot_items<T>(feed: &Feed<Vec<T>>) -> (FeedStatus, Vec<T>)
where
    T: Clone + Send + Sync + 'static,
{
    let snapshot = feed.snapshot();
    let status = FeedStatus::from(&snapshot);
    let items = snapshot.data.map(|d| d.to_vec()).unwrap_or_default();
    (status, items)
}

pub struct Dashboard {
    source: Arc<dyn AlertSource>,
    scheduler: Scheduler,
    acks: AckController,
    settings: NotificationConfigManager,
    notifier: Notifier,
    metrics: Option<Metrics>,
}

impl Dashboard {
    /// Build against the backend named by `config.backend.kind`
    pub fn from_config(config: &Config) -> Result<Self> {
        let source = create_source(config)?;
        Self::new(source, config)
    }

    pub fn new(source: Arc<dyn AlertSource>, config: &Config) -> Result<Self> {
        let metrics = if config.metrics.enabled {
            Some(Metrics::new()?)
        } else {
            None
        };
        let notifier = Notifier::new();
        let scheduler = Scheduler::new(source.clone(), config, metrics.clone());

        let mut acks = AckController::new(source.clone(), &scheduler, notifier.clone());
        let mut settings = NotificationConfigManager::new(source.clone(), notifier.clone());
        if let Some(metrics) = &metrics {
            acks = acks.with_metrics(metrics.clone());
            settings = settings.with_metrics(metrics.clone());
        }

        info!(
            backend = %config.backend.kind,
            metrics = metrics.is_some(),
            "📊 Dashboard engine ready"
        );

        Ok(Self {
            source,
            scheduler,
            acks,
            settings,
            notifier,
            metrics,
        })
    }

    pub fn source(&self) -> &Arc<dyn AlertSource> {
        &self.source
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn acknowledgments(&self) -> &AckController {
        &self.acks
    }

    pub fn settings(&self) -> &NotificationConfigManager {
        &self.settings
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    pub async fn start(&self) {
        self.scheduler.start().await;
    }

    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }

    pub async fn refresh(&self, kind: FeedKind) {
        self.scheduler.refresh(kind).await;
    }

    pub async fn acknowledge(&self, feed: AlertFeed, alert_id: &str) -> Result<()> {
        self.acks.acknowledge(feed, alert_id).await
    }

    /// Known node types, fetched once and shared with every caller
    pub async fn node_types(&self) -> NodeTypes {
        self.scheduler.node_types().get().await
    }

    /// Snapshot, group, filter, sort and count in one pass
    pub fn view(&self, criteria: &FilterCriteria) -> DashboardView {
        let (node_status, node_alerts) = snapshot_items(self.scheduler.node_alerts());
        let (org_status, org_alerts) = snapshot_items(self.scheduler.org_alerts());
        let machine_status = FeedStatus::from(&self.scheduler.machines().snapshot());
        let machines = self.scheduler.machine_directory();

        let facets = AlertFacets::compute(&node_alerts, &org_alerts);
        let node_groups = filter_node_groups(&group_node_alerts(&node_alerts), criteria, &machines);
        let org_groups = filter_org_groups(&group_org_alerts(&org_alerts), criteria);
        let machine_names = node_groups
            .iter()
            .map(|g| (g.key.clone(), machines.resolve(g.machine_id()).to_string()))
            .collect();

        DashboardView {
            criteria: criteria.clone(),
            node_groups,
            org_groups,
            facets,
            node_status,
            org_status,
            machine_status,
            machine_names,
        }
    }
}
