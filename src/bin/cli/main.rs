// src/bin/cli/main.rs - Fleetwatch CLI

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use fleetwatch::{
    AckFilter, AlertFeed, AlertKind, AlertRecord, AlertView, Channel, Config, Dashboard,
    DashboardView, FeedKind, FeedStatus, FilterCriteria, NodeTypeOrigin, NoticeLevel, SaveOutcome,
    SortOrder,
};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "fleetwatch")]
#[command(about = "Inspect, acknowledge and configure alerts for a monitored node fleet")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Use the in-memory backend with seeded demo data
    #[arg(long)]
    demo: bool,

    /// Backend base URL (overrides FLEETWATCH_BASE_URL)
    #[arg(long, env = "FLEETWATCH_BASE_URL")]
    base_url: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List grouped alerts
    Alerts {
        #[arg(long, value_enum, default_value = "all")]
        view: CliView,

        /// Case-insensitive match on node, machine or AVS name
        #[arg(long, default_value = "")]
        search: String,

        /// Only show these alert kinds (repeatable)
        #[arg(long = "kind", value_parser = parse_kind)]
        kinds: Vec<AlertKind>,

        #[arg(long, value_enum, default_value = "all")]
        ack: CliAckFilter,

        #[arg(long, value_enum, default_value = "newest")]
        sort: CliSortOrder,
    },
    /// Show total/acknowledged/unacknowledged counts per view
    Counts,
    /// List the node types the backend knows about
    NodeTypes,
    /// Acknowledge an alert
    Ack {
        #[arg(value_enum)]
        feed: CliFeed,

        /// Alert ID
        alert_id: String,
    },
    /// Poll the alert feeds until Ctrl+C
    Watch,
    /// Notification channel settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
    /// Per-kind alert notification flags
    Flags {
        #[command(subcommand)]
        action: Option<FlagsAction>,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Enable or disable a channel
    Toggle {
        #[arg(value_enum)]
        channel: CliChannel,
    },
    /// Add an email recipient
    AddEmail { email: String },
    /// Remove an email recipient
    RemoveEmail { email: String },
    /// Remove a linked Telegram chat
    RemoveChat { chat: String },
    /// Set the PagerDuty integration key (empty clears it)
    PagerdutyKey { key: String },
}

#[derive(Subcommand)]
enum FlagsAction {
    /// Flip notifications for one alert kind
    Toggle {
        #[arg(value_parser = parse_kind)]
        kind: AlertKind,
    },
    /// Enable every alert kind
    EnableAll,
    /// Disable every alert kind
    DisableAll,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliView {
    Node,
    Org,
    All,
}

impl From<CliView> for AlertView {
    fn from(view: CliView) -> Self {
        match view {
            CliView::Node => AlertView::Node,
            CliView::Org => AlertView::Org,
            CliView::All => AlertView::All,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliAckFilter {
    All,
    Acknowledged,
    Unacknowledged,
}

impl From<CliAckFilter> for AckFilter {
    fn from(filter: CliAckFilter) -> Self {
        match filter {
            CliAckFilter::All => AckFilter::All,
            CliAckFilter::Acknowledged => AckFilter::Acknowledged,
            CliAckFilter::Unacknowledged => AckFilter::Unacknowledged,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliSortOrder {
    Newest,
    Oldest,
    Name,
}

impl From<CliSortOrder> for SortOrder {
    fn from(order: CliSortOrder) -> Self {
        match order {
            CliSortOrder::Newest => SortOrder::Newest,
            CliSortOrder::Oldest => SortOrder::Oldest,
            CliSortOrder::Name => SortOrder::Name,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliFeed {
    Node,
    Org,
}

impl From<CliFeed> for AlertFeed {
    fn from(feed: CliFeed) -> Self {
        match feed {
            CliFeed::Node => AlertFeed::Node,
            CliFeed::Org => AlertFeed::Org,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliChannel {
    Telegram,
    Email,
    Pagerduty,
}

impl From<CliChannel> for Channel {
    fn from(channel: CliChannel) -> Self {
        match channel {
            CliChannel::Telegram => Channel::Telegram,
            CliChannel::Email => Channel::Email,
            CliChannel::Pagerduty => Channel::PagerDuty,
        }
    }
}

fn parse_kind(s: &str) -> Result<AlertKind> {
    Ok(s.parse::<AlertKind>()?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "fleetwatch=debug"
    } else {
        "fleetwatch=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env()?;
    if cli.demo {
        config.backend.kind = "memory".to_string();
    }
    if let Some(base_url) = cli.base_url {
        config.backend.base_url = base_url;
    }
    config.validate()?;

    let dashboard = Dashboard::from_config(&config)?;

    let result = match cli.command {
        Commands::Alerts {
            view,
            search,
            kinds,
            ack,
            sort,
        } => {
            let criteria = FilterCriteria {
                view: view.into(),
                search,
                kinds: kinds.into_iter().collect(),
                ack: ack.into(),
                sort: sort.into(),
            };
            handle_alerts(&dashboard, &criteria).await
        }
        Commands::Counts => handle_counts(&dashboard).await,
        Commands::NodeTypes => handle_node_types(&dashboard).await,
        Commands::Ack { feed, alert_id } => handle_ack(&dashboard, feed.into(), &alert_id).await,
        Commands::Watch => handle_watch(&dashboard).await,
        Commands::Settings { action } => handle_settings(&dashboard, action).await,
        Commands::Flags { action } => handle_flags(&dashboard, action).await,
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn print_feed_error(name: &str, status: &FeedStatus) {
    if let Some(e) = &status.error {
        println!("⚠️  Error loading {}: {}", name, e);
    }
}

fn print_view(view: &DashboardView) {
    print_feed_error("node alerts", &view.node_status);
    print_feed_error("org alerts", &view.org_status);
    print_feed_error("machines", &view.machine_status);

    if view.is_empty() {
        println!("📭 No alerts match the current filters");
        return;
    }

    for (group, (_, machine)) in view.node_groups.iter().zip(&view.machine_names) {
        println!(
            "🖥️  {} on {} ({} alert(s), {} open)",
            group.node_name(),
            machine,
            group.len(),
            group.open_count()
        );
        for alert in &group.alerts {
            println!(
                "   {} {:<24} {}  {}",
                if alert.is_acknowledged() { "✅" } else { "🔔" },
                alert.kind().as_str(),
                alert.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                alert.alert_id
            );
        }
    }

    for group in &view.org_groups {
        println!("🌐 {} ({} alert(s), {} open)", group.key, group.len(), group.open_count());
        for alert in &group.alerts {
            let avs = alert.alert_type.avs();
            println!(
                "   {} {:<24} {}  {}  {}",
                if alert.is_acknowledged() { "✅" } else { "🔔" },
                avs.name,
                avs.address,
                alert.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                alert.alert_id
            );
        }
    }
}

async fn handle_alerts(dashboard: &Dashboard, criteria: &FilterCriteria) -> Result<()> {
    info!("📋 Loading alerts...");
    dashboard.scheduler().refresh_all().await;
    print_view(&dashboard.view(criteria));
    Ok(())
}

async fn handle_counts(dashboard: &Dashboard) -> Result<()> {
    dashboard.scheduler().refresh_all().await;
    let facets = dashboard.view(&FilterCriteria::default()).facets;

    println!("📊 Alert Counts");
    println!("═══════════════════════════════════════════");
    println!("{:<8} {:>8} {:>14} {:>16}", "View", "Total", "Acknowledged", "Unacknowledged");
    for view in [AlertView::Node, AlertView::Org, AlertView::All] {
        let counts = facets.for_view(view);
        println!(
            "{:<8} {:>8} {:>14} {:>16}",
            view.to_string(),
            counts.total,
            counts.acknowledged,
            counts.unacknowledged
        );
    }

    let node_types = dashboard.node_types().await;
    println!(
        "Known node types: {}{}",
        node_types.names.len(),
        if node_types.is_fallback() { " (fallback list)" } else { "" }
    );
    Ok(())
}

async fn handle_node_types(dashboard: &Dashboard) -> Result<()> {
    let node_types = dashboard.node_types().await;
    println!("🧩 Node Types");
    println!("═══════════════════════════════════════════");
    for name in node_types.names.iter() {
        println!("  {}", name);
    }
    if let NodeTypeOrigin::Fallback { version } = node_types.origin {
        println!("⚠️  Backend unreachable; showing built-in list from {}", version);
    }
    Ok(())
}

async fn handle_ack(dashboard: &Dashboard, feed: AlertFeed, alert_id: &str) -> Result<()> {
    dashboard.acknowledge(feed, alert_id).await?;
    println!("✅ Alert '{}' acknowledged", alert_id);
    Ok(())
}

async fn handle_watch(dashboard: &Dashboard) -> Result<()> {
    let mut node_updates = dashboard.scheduler().node_alerts().subscribe();
    let mut org_updates = dashboard.scheduler().org_alerts().subscribe();
    let mut notices = dashboard.notifier().subscribe();

    dashboard.start().await;
    println!("👀 Watching alert feeds (Ctrl+C to stop)");

    loop {
        tokio::select! {
            changed = node_updates.changed() => {
                if changed.is_err() {
                    break;
                }
                print_summary(dashboard, FeedKind::NodeAlerts);
            }
            changed = org_updates.changed() => {
                if changed.is_err() {
                    break;
                }
                print_summary(dashboard, FeedKind::OrgAlerts);
            }
            notice = notices.recv() => {
                if let Ok(notice) = notice {
                    if notice.level == NoticeLevel::Error {
                        println!("❌ {}", notice.message);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("🛑 Stopping");
                break;
            }
        }
    }

    dashboard.shutdown().await;

    if let Some(metrics) = dashboard.metrics() {
        info!("\n{}", metrics.render()?);
    }
    Ok(())
}

fn print_summary(dashboard: &Dashboard, kind: FeedKind) {
    let view = dashboard.view(&FilterCriteria::default());
    let (status, counts) = match kind {
        FeedKind::NodeAlerts => (&view.node_status, view.facets.node),
        _ => (&view.org_status, view.facets.org),
    };
    if status.loading {
        return;
    }
    match &status.error {
        Some(e) => println!("⚠️  {} failed: {} (run `fleetwatch alerts` to retry)", kind, e),
        None => println!(
            "🔄 {}: {} total, {} unacknowledged",
            kind, counts.total, counts.unacknowledged
        ),
    }
}

async fn handle_settings(dashboard: &Dashboard, action: Option<SettingsAction>) -> Result<()> {
    let manager = dashboard.settings();
    let report = manager.load().await;
    if action.is_some() {
        report.require_settings()?;
    } else if !report.settings_loaded {
        println!("⚠️  Showing defaults; notification settings failed to load");
    }

    match action {
        None => {}
        Some(SettingsAction::Toggle { channel }) => {
            let channel: Channel = channel.into();
            let enabled = manager.toggle_channel(channel).await;
            println!("{} {}", channel, if enabled { "enabled" } else { "disabled" });
        }
        Some(SettingsAction::AddEmail { email }) => {
            manager.type_email_input(&email).await;
            manager.submit_email_draft().await?;
        }
        Some(SettingsAction::RemoveEmail { email }) => {
            if !manager.remove_email(&email).await {
                println!("⚠️  {} is not in the list", email);
            }
        }
        Some(SettingsAction::RemoveChat { chat }) => {
            if !manager.remove_telegram_chat(&chat).await {
                println!("⚠️  Telegram chat {} is not linked", chat);
            }
        }
        Some(SettingsAction::PagerdutyKey { key }) => {
            manager.set_pagerduty_key(&key).await;
        }
    }

    if manager.save_settings().await? == SaveOutcome::Saved {
        println!("💾 Notification settings saved");
    }

    let settings = manager.settings().await;
    println!("🔔 Notification Channels");
    println!("═══════════════════════════════════════════");
    for channel in Channel::ALL {
        println!(
            "{:<10} {}",
            channel.to_string(),
            if settings.is_enabled(channel) { "✅ enabled" } else { "❌ disabled" }
        );
    }
    println!("Telegram chats: {}", settings.telegram.chats.join(", "));
    println!("Emails:         {}", settings.email.emails.join(", "));
    println!(
        "PagerDuty key:  {}",
        if settings.pagerduty.integration_key.is_some() { "configured" } else { "not set" }
    );
    Ok(())
}

async fn handle_flags(dashboard: &Dashboard, action: Option<FlagsAction>) -> Result<()> {
    let manager = dashboard.settings();
    let report = manager.load().await;
    if action.is_some() {
        report.require_alert_flags()?;
    } else if !report.flags_loaded {
        println!("⚠️  Showing defaults; alert preferences failed to load");
    }

    match action {
        None => {}
        Some(FlagsAction::Toggle { kind }) => {
            manager.toggle_alert_flag(kind).await;
        }
        Some(FlagsAction::EnableAll) => manager.toggle_all_alert_flags(true).await,
        Some(FlagsAction::DisableAll) => manager.toggle_all_alert_flags(false).await,
    }

    if manager.save_alert_flags().await? == SaveOutcome::Saved {
        println!("💾 Alert preferences saved");
    }

    let catalog = manager.alert_flags().await;
    println!("🚩 Alert Notifications");
    println!("═══════════════════════════════════════════");
    for flag in catalog.flags() {
        println!(
            "{:<28} {}",
            flag.alert.as_str(),
            if flag.enabled { "✅" } else { "❌" }
        );
    }
    Ok(())
}
