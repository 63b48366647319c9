// src/settings/flags.rs - Per-alert-kind notification enablement

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::alert::AlertKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertFlag {
    pub alert: AlertKind,
    pub enabled: bool,
}

/// Ordered enable flags covering every known [`AlertKind`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertFlagCatalog {
    flags: Vec<AlertFlag>,
}

impl AlertFlagCatalog {
    /// Fallback used when the enabled-kinds list cannot be loaded
    pub fn all_disabled() -> Self {
        Self {
            flags: AlertKind::ALL
                .iter()
                .map(|&alert| AlertFlag {
                    alert,
                    enabled: false,
                })
                .collect(),
        }
    }

    /// Build the catalog from the backend's list of currently enabled kind names
    pub fn from_enabled<S: AsRef<str>>(enabled: &[S]) -> Self {
        let enabled: HashSet<&str> = enabled.iter().map(|name| name.as_ref()).collect();
        for name in &enabled {
            if name.parse::<AlertKind>().is_err() {
                debug!(kind = %name, "Ignoring unknown enabled alert kind");
            }
        }

        Self {
            flags: AlertKind::ALL
                .iter()
                .map(|&alert| AlertFlag {
                    alert,
                    enabled: enabled.contains(alert.as_str()),
                })
                .collect(),
        }
    }

    pub fn flags(&self) -> &[AlertFlag] {
        &self.flags
    }

    pub fn is_enabled(&self, kind: AlertKind) -> bool {
        self.flags
            .iter()
            .any(|flag| flag.alert == kind && flag.enabled)
    }

    pub fn enabled_kinds(&self) -> Vec<AlertKind> {
        self.flags
            .iter()
            .filter(|flag| flag.enabled)
            .map(|flag| flag.alert)
            .collect()
    }

    pub fn all_enabled(&self) -> bool {
        self.flags.iter().all(|flag| flag.enabled)
    }

    /// Flip one kind and return its new state
    pub fn toggle(&mut self, kind: AlertKind) -> bool {
        match self.flags.iter_mut().find(|flag| flag.alert == kind) {
            Some(flag) => {
                flag.enabled = !flag.enabled;
                flag.enabled
            }
            None => false,
        }
    }

    pub fn set_all(&mut self, enabled: bool) {
        for flag in &mut self.flags {
            flag.enabled = enabled;
        }
    }
}

impl Default for AlertFlagCatalog {
    fn default() -> Self {
        Self::all_disabled()
    }
}
