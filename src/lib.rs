// src/lib.rs - Alert dashboard engine for monitored node fleets

pub mod ack;
pub mod alert;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod feed;
pub mod grouping;
pub mod metrics;
pub mod node_types;
pub mod notify;
pub mod pipeline;
pub mod scheduler;
pub mod settings;
pub mod source;

// Re-export commonly used items for convenience
pub use ack::{AckController, AckStatus, AlertFeed};
pub use alert::{
    Alert, AlertKind, AlertRecord, AvsInfo, MachineDirectory, MachineRef, NodeAlert,
    NodeAlertKind, OrgAlert, OrgAlertKind,
};
pub use config::Config;
pub use dashboard::{Dashboard, DashboardView, FeedStatus};
pub use error::{FleetError, Result};
pub use feed::{Feed, FeedSnapshot, RetryPolicy};
pub use grouping::AlertGroup;
pub use metrics::Metrics;
pub use node_types::{NodeTypeCache, NodeTypeOrigin, NodeTypes};
pub use notify::{Notice, NoticeLevel, Notifier};
pub use pipeline::{AckFilter, AlertFacets, AlertView, FacetCounts, FilterCriteria, SortOrder};
pub use scheduler::{FeedKind, Scheduler};
pub use settings::{
    AlertFlag, AlertFlagCatalog, Channel, NotificationConfigManager, NotificationSettings,
    SaveOutcome,
};
pub use source::{create_source, AlertSource, HttpAlertSource, MemoryAlertSource};

/// Fleetwatch version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    pub use crate::{
        AlertFeed, AlertKind, AlertRecord, AlertSource, Config, Dashboard, FilterCriteria,
        FleetError, NodeAlert, OrgAlert, Result,
    };
}
