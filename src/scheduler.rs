// src/scheduler.rs - Polling and revalidation of the three dashboard feeds

use futures::future::{join_all, BoxFuture, FutureExt};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::alert::{AlertRecord, MachineDirectory, MachineRef, NodeAlert, OrgAlert};
use crate::config::Config;
use crate::error::Result;
use crate::feed::{Feed, FetchFn, RetryPolicy};
use crate::metrics::Metrics;
use crate::node_types::NodeTypeCache;
use crate::source::AlertSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    NodeAlerts,
    OrgAlerts,
    Machines,
}

impl FeedKind {
    pub const ALL: [FeedKind; 3] = [FeedKind::NodeAlerts, FeedKind::OrgAlerts, FeedKind::Machines];

    pub fn name(&self) -> &'static str {
        match self {
            FeedKind::NodeAlerts => "node_alerts",
            FeedKind::OrgAlerts => "org_alerts",
            FeedKind::Machines => "machines",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fetch closure for an alert feed that also publishes the open-alert gauge
fn alert_fetch<T, F>(
    source: Arc<dyn AlertSource>,
    metrics: Option<Metrics>,
    feed: FeedKind,
    call: F,
) -> FetchFn<Vec<T>>
where
    T: AlertRecord + Send + 'static,
    F: Fn(Arc<dyn AlertSource>) -> BoxFuture<'static, Result<Vec<T>>> + Send + Sync + 'static,
{
    Arc::new(move || -> BoxFuture<'static, Result<Vec<T>>> {
        let request = call(source.clone());
        let metrics = metrics.clone();
        async move {
            let alerts = request.await?;
            if let Some(metrics) = &metrics {
                let open = alerts.iter().filter(|a| !a.is_acknowledged()).count();
                metrics.set_open_alerts(feed.name(), open);
            }
            Ok(alerts)
        }
        .boxed()
    })
}

fn build_feed<T: Send + Sync + 'static>(
    kind: FeedKind,
    fetch: FetchFn<T>,
    retry: RetryPolicy,
    metrics: &Option<Metrics>,
) -> Feed<T> {
    match metrics {
        Some(metrics) => Feed::with_metrics(kind.name(), fetch, retry, metrics.clone()),
        None => Feed::new(kind.name(), fetch, retry),
    }
}

/// Owns the node-alert, org-alert and machine directory feeds.
///
/// Alert feeds poll on a fixed interval once started; the machine directory
/// is loaded once. Nothing re-polls on focus or reconnect.
pub struct Scheduler {
    node_alerts: Feed<Vec<NodeAlert>>,
    org_alerts: Feed<Vec<OrgAlert>>,
    machines: Feed<Vec<MachineRef>>,
    node_types: NodeTypeCache,
    poll_interval: Duration,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(source: Arc<dyn AlertSource>, config: &Config, metrics: Option<Metrics>) -> Self {
        let retry = RetryPolicy::new(config.polling.max_retries, config.retry_delay());

        let node_fetch = alert_fetch(
            source.clone(),
            metrics.clone(),
            FeedKind::NodeAlerts,
            |source| async move { source.node_alerts().await }.boxed(),
        );
        let org_fetch = alert_fetch(
            source.clone(),
            metrics.clone(),
            FeedKind::OrgAlerts,
            |source| async move { source.org_alerts().await }.boxed(),
        );
        let machine_source = source.clone();
        let machine_fetch: FetchFn<Vec<MachineRef>> =
            Arc::new(move || -> BoxFuture<'static, Result<Vec<MachineRef>>> {
                let source = machine_source.clone();
                async move { source.machines().await }.boxed()
            });

        let (shutdown_tx, _) = watch::channel(false);

        Self {
            node_alerts: build_feed(FeedKind::NodeAlerts, node_fetch, retry, &metrics),
            org_alerts: build_feed(FeedKind::OrgAlerts, org_fetch, retry, &metrics),
            machines: build_feed(FeedKind::Machines, machine_fetch, retry, &metrics),
            node_types: NodeTypeCache::new(source),
            poll_interval: config.alert_poll_interval(),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn node_alerts(&self) -> &Feed<Vec<NodeAlert>> {
        &self.node_alerts
    }

    pub fn org_alerts(&self) -> &Feed<Vec<OrgAlert>> {
        &self.org_alerts
    }

    pub fn machines(&self) -> &Feed<Vec<MachineRef>> {
        &self.machines
    }

    pub fn node_types(&self) -> &NodeTypeCache {
        &self.node_types
    }

    /// Directory built from the latest machine snapshot; empty until loaded
    pub fn machine_directory(&self) -> MachineDirectory {
        let snapshot = self.machines.snapshot();
        let machines = snapshot.data.as_deref().map(Vec::as_slice).unwrap_or_default();
        MachineDirectory::new(machines)
    }

    /// Spawn the polling loops and the one-time machine directory load
    pub async fn start(&self) {
        let mut tasks = self.tasks.lock().await;
        if !tasks.is_empty() {
            warn!("Scheduler already started");
            return;
        }

        info!(
            interval_seconds = self.poll_interval.as_secs(),
            "🚀 Starting feed scheduler"
        );

        let machines = self.machines.clone();
        tasks.push(tokio::spawn(async move {
            let snapshot = machines.refresh().await;
            match &snapshot.error {
                Some(e) => warn!(feed = machines.name(), error = %e, "Machine directory unavailable"),
                None => debug!(
                    feed = machines.name(),
                    count = snapshot.data.as_ref().map(|d| d.len()).unwrap_or(0),
                    "Machine directory loaded"
                ),
            }
        }));

        tasks.push(spawn_poll_loop(
            self.node_alerts.clone(),
            self.poll_interval,
            self.shutdown_tx.subscribe(),
        ));
        tasks.push(spawn_poll_loop(
            self.org_alerts.clone(),
            self.poll_interval,
            self.shutdown_tx.subscribe(),
        ));
    }

    /// Stop future polls. Fetches already running are allowed to finish.
    pub async fn shutdown(&self) {
        info!("🛑 Stopping feed scheduler");
        self.shutdown_tx.send_replace(true);

        let handles: Vec<JoinHandle<()>> = self.tasks.lock().await.drain(..).collect();
        for result in join_all(handles).await {
            if let Err(e) = result {
                error!(error = %e, "Scheduler task ended abnormally");
            }
        }
        info!("✅ Feed scheduler stopped");
    }

    /// Immediate re-fetch of one feed, coalesced with any fetch in flight
    pub async fn refresh(&self, kind: FeedKind) {
        debug!(feed = %kind, "Manual refresh");
        match kind {
            FeedKind::NodeAlerts => {
                self.node_alerts.refresh().await;
            }
            FeedKind::OrgAlerts => {
                self.org_alerts.refresh().await;
            }
            FeedKind::Machines => {
                self.machines.refresh().await;
            }
        }
    }

    pub async fn refresh_all(&self) {
        tokio::join!(
            self.refresh(FeedKind::NodeAlerts),
            self.refresh(FeedKind::OrgAlerts),
            self.refresh(FeedKind::Machines),
        );
    }
}

fn spawn_poll_loop<T: Send + Sync + 'static>(
    feed: Feed<T>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(feed = feed.name(), interval_seconds = period.as_secs(), "🔄 Feed polling started");

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(snapshot) = feed.poll().await {
                        debug!(
                            feed = feed.name(),
                            cycles = snapshot.cycles,
                            failed = snapshot.has_error(),
                            "Poll cycle finished"
                        );
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(feed = feed.name(), "Feed polling stopped");
    })
}
