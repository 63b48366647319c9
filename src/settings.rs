// src/settings.rs - Notification configuration manager
//
// Two documents live here: delivery channel settings and the alert flag
// catalog. Each is loaded, edited, dirty-tracked and saved on its own.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::alert::AlertKind;
use crate::error::{FleetError, Result};
use crate::metrics::Metrics;
use crate::notify::Notifier;
use crate::source::AlertSource;

pub mod channels;
pub mod flags;

pub use channels::{
    Channel, EmailRejection, EmailSettings, NotificationSettings, PagerDutySettings,
    TelegramSettings,
};
pub use flags::{AlertFlag, AlertFlagCatalog};

const SETTINGS_DOCUMENT: &str = "channel_settings";
const FLAGS_DOCUMENT: &str = "alert_flags";

/// A locally edited copy of a backend document
#[derive(Debug, Clone)]
struct Tracked<T> {
    value: T,
    modified: bool,
    saving: bool,
    /// Bumped on every local edit so a save only clears edits it actually sent
    revision: u64,
}

impl<T> Tracked<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            modified: false,
            saving: false,
            revision: 0,
        }
    }

    fn replace(&mut self, value: T) {
        self.value = value;
        self.modified = false;
        self.revision += 1;
    }

    fn touch(&mut self) {
        self.modified = true;
        self.revision += 1;
    }

    fn can_save(&self) -> bool {
        self.modified && !self.saving
    }
}

/// Result of a save request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Nothing to save or a save already in flight; no request was made
    Skipped,
}

/// Which documents loaded from the backend (the rest fell back to defaults)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub settings_loaded: bool,
    pub flags_loaded: bool,
}

impl LoadReport {
    /// Fails when the settings shown are fallback defaults, which must not be
    /// edited and saved over the backend copy
    pub fn require_settings(&self) -> Result<()> {
        if self.settings_loaded {
            Ok(())
        } else {
            Err(FleetError::Validation(
                "notification settings failed to load; refusing to save defaults over them"
                    .to_string(),
            ))
        }
    }

    pub fn require_alert_flags(&self) -> Result<()> {
        if self.flags_loaded {
            Ok(())
        } else {
            Err(FleetError::Validation(
                "alert preferences failed to load; refusing to save defaults over them"
                    .to_string(),
            ))
        }
    }
}

pub struct NotificationConfigManager {
    source: Arc<dyn AlertSource>,
    notifier: Notifier,
    metrics: Option<Metrics>,
    settings: Mutex<Tracked<NotificationSettings>>,
    flags: Mutex<Tracked<AlertFlagCatalog>>,
    email_draft: Mutex<String>,
}

impl NotificationConfigManager {
    pub fn new(source: Arc<dyn AlertSource>, notifier: Notifier) -> Self {
        Self {
            source,
            notifier,
            metrics: None,
            settings: Mutex::new(Tracked::new(NotificationSettings::default())),
            flags: Mutex::new(Tracked::new(AlertFlagCatalog::all_disabled())),
            email_draft: Mutex::new(String::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Fetch both documents. A failure in one never blocks the other.
    pub async fn load(&self) -> LoadReport {
        let (settings, enabled_kinds) = tokio::join!(
            self.source.notification_settings(),
            self.source.enabled_alert_kinds()
        );

        let settings_loaded = match settings {
            Ok(settings) => {
                self.settings.lock().await.replace(settings);
                true
            }
            Err(e) => {
                warn!(error = %e, "Falling back to default notification settings");
                self.settings
                    .lock()
                    .await
                    .replace(NotificationSettings::default());
                self.notifier
                    .error(format!("Failed to load notification settings: {}", e));
                false
            }
        };

        let flags_loaded = match enabled_kinds {
            Ok(kinds) => {
                self.flags
                    .lock()
                    .await
                    .replace(AlertFlagCatalog::from_enabled(&kinds));
                true
            }
            Err(e) => {
                warn!(error = %e, "Falling back to all-disabled alert flags");
                self.flags
                    .lock()
                    .await
                    .replace(AlertFlagCatalog::all_disabled());
                self.notifier
                    .error(format!("Failed to load alert preferences: {}", e));
                false
            }
        };

        info!(settings_loaded, flags_loaded, "Notification configuration loaded");
        LoadReport {
            settings_loaded,
            flags_loaded,
        }
    }

    pub async fn settings(&self) -> NotificationSettings {
        self.settings.lock().await.value.clone()
    }

    pub async fn alert_flags(&self) -> AlertFlagCatalog {
        self.flags.lock().await.value.clone()
    }

    pub async fn settings_modified(&self) -> bool {
        self.settings.lock().await.modified
    }

    pub async fn alert_flags_modified(&self) -> bool {
        self.flags.lock().await.modified
    }

    /// Save button state for the channel settings document
    pub async fn can_save_settings(&self) -> bool {
        self.settings.lock().await.can_save()
    }

    /// Save button state for the alert flag document
    pub async fn can_save_alert_flags(&self) -> bool {
        self.flags.lock().await.can_save()
    }

    pub async fn email_draft(&self) -> String {
        self.email_draft.lock().await.clone()
    }

    pub async fn toggle_channel(&self, channel: Channel) -> bool {
        let mut settings = self.settings.lock().await;
        let enabled = settings.value.toggle(channel);
        settings.touch();
        debug!(channel = %channel, enabled, "Toggled notification channel");
        enabled
    }

    /// Keystroke in the email-add field.
    ///
    /// A non-empty value typed while the email channel is disabled enables
    /// the channel and marks the settings modified. Clearing the field, or
    /// typing while the channel is already enabled, only updates the draft.
    pub async fn type_email_input(&self, text: &str) {
        *self.email_draft.lock().await = text.to_string();

        if text.is_empty() {
            return;
        }
        let mut settings = self.settings.lock().await;
        if !settings.value.email.enabled {
            settings.value.email.enabled = true;
            settings.touch();
            debug!("Email channel enabled by input");
        }
    }

    /// Validate and append an address, warning instead of mutating on rejection
    pub async fn add_email(&self, email: &str) -> Result<()> {
        let mut settings = self.settings.lock().await;
        match settings.value.add_email(email) {
            Ok(added) => {
                settings.touch();
                debug!(email = %added, "Added notification email");
                Ok(())
            }
            Err(rejection) => {
                self.notifier.warning(rejection.to_string());
                Err(FleetError::Validation(rejection.to_string()))
            }
        }
    }

    /// Add the current draft; the draft is cleared only when it was accepted
    pub async fn submit_email_draft(&self) -> Result<()> {
        let draft = self.email_draft().await;
        self.add_email(&draft).await?;
        self.email_draft.lock().await.clear();
        Ok(())
    }

    pub async fn remove_email(&self, email: &str) -> bool {
        let mut settings = self.settings.lock().await;
        let removed = settings.value.remove_email(email);
        if removed {
            settings.touch();
        }
        removed
    }

    pub async fn remove_telegram_chat(&self, chat: &str) -> bool {
        let mut settings = self.settings.lock().await;
        let removed = settings.value.remove_telegram_chat(chat);
        if removed {
            settings.touch();
        }
        removed
    }

    /// Keystroke in the PagerDuty key field.
    ///
    /// Same auto-enable rule as the email field: a non-empty key typed while
    /// PagerDuty is disabled enables the channel.
    pub async fn set_pagerduty_key(&self, key: &str) {
        let mut settings = self.settings.lock().await;
        let mut changed = settings.value.set_pagerduty_key(key);
        if !key.is_empty() && !settings.value.pagerduty.enabled {
            settings.value.pagerduty.enabled = true;
            changed = true;
            debug!("PagerDuty channel enabled by input");
        }
        if changed {
            settings.touch();
        }
    }

    pub async fn toggle_alert_flag(&self, kind: AlertKind) -> bool {
        let mut flags = self.flags.lock().await;
        let enabled = flags.value.toggle(kind);
        flags.touch();
        enabled
    }

    pub async fn toggle_all_alert_flags(&self, enable_all: bool) {
        let mut flags = self.flags.lock().await;
        flags.value.set_all(enable_all);
        flags.touch();
    }

    /// Persist the channel settings. Disabled (no request) when unmodified
    /// or while a previous save is still in flight.
    pub async fn save_settings(&self) -> Result<SaveOutcome> {
        let (payload, revision) = {
            let mut settings = self.settings.lock().await;
            if !settings.can_save() {
                return Ok(SaveOutcome::Skipped);
            }
            settings.saving = true;
            (settings.value.normalized(), settings.revision)
        };

        let result = self.source.save_notification_settings(&payload).await;

        let mut settings = self.settings.lock().await;
        settings.saving = false;
        self.record_save(SETTINGS_DOCUMENT, result.is_ok());
        match result {
            Ok(()) => {
                if settings.revision == revision {
                    settings.value = payload;
                    settings.modified = false;
                }
                self.notifier.success("Notification settings saved");
                Ok(SaveOutcome::Saved)
            }
            Err(e) => {
                self.notifier
                    .error(format!("Failed to save notification settings: {}", e));
                Err(e)
            }
        }
    }

    /// Persist the alert flag catalog, with the same gating as [`Self::save_settings`]
    pub async fn save_alert_flags(&self) -> Result<SaveOutcome> {
        let (payload, revision) = {
            let mut flags = self.flags.lock().await;
            if !flags.can_save() {
                return Ok(SaveOutcome::Skipped);
            }
            flags.saving = true;
            (flags.value.flags().to_vec(), flags.revision)
        };

        let result = self.source.set_alert_flags(&payload).await;

        let mut flags = self.flags.lock().await;
        flags.saving = false;
        self.record_save(FLAGS_DOCUMENT, result.is_ok());
        match result {
            Ok(()) => {
                if flags.revision == revision {
                    flags.modified = false;
                }
                self.notifier.success("Alert preferences saved");
                Ok(SaveOutcome::Saved)
            }
            Err(e) => {
                self.notifier
                    .error(format!("Failed to save alert preferences: {}", e));
                Err(e)
            }
        }
    }

    fn record_save(&self, document: &str, success: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.record_config_save(document, success);
        }
    }
}
