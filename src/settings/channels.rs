// src/settings/channels.rs - Notification delivery channel settings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FleetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Telegram,
    Email,
    PagerDuty,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Telegram, Channel::Email, Channel::PagerDuty];
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Telegram => f.write_str("telegram"),
            Channel::Email => f.write_str("email"),
            Channel::PagerDuty => f.write_str("pagerduty"),
        }
    }
}

impl FromStr for Channel {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "telegram" => Ok(Channel::Telegram),
            "email" => Ok(Channel::Email),
            "pagerduty" => Ok(Channel::PagerDuty),
            other => Err(FleetError::Validation(format!("unknown channel: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    pub enabled: bool,
    pub chats: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
    pub enabled: bool,
    pub emails: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagerDutySettings {
    pub enabled: bool,
    /// Persisted as `null` when unset, never as an empty string
    pub integration_key: Option<String>,
}

/// Backend-owned delivery channel configuration.
///
/// The default value doubles as the structural fallback used when the
/// backend cannot be reached: every channel disabled and empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub telegram: TelegramSettings,
    pub email: EmailSettings,
    pub pagerduty: PagerDutySettings,
}

/// Why an email address was not added
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailRejection {
    Empty,
    Malformed(String),
    Duplicate(String),
}

impl fmt::Display for EmailRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmailRejection::Empty => f.write_str("Please enter an email address"),
            EmailRejection::Malformed(email) => write!(f, "'{}' is not a valid email address", email),
            EmailRejection::Duplicate(email) => write!(f, "{} is already in the list", email),
        }
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

impl NotificationSettings {
    pub fn is_enabled(&self, channel: Channel) -> bool {
        match channel {
            Channel::Telegram => self.telegram.enabled,
            Channel::Email => self.email.enabled,
            Channel::PagerDuty => self.pagerduty.enabled,
        }
    }

    pub fn set_enabled(&mut self, channel: Channel, enabled: bool) {
        match channel {
            Channel::Telegram => self.telegram.enabled = enabled,
            Channel::Email => self.email.enabled = enabled,
            Channel::PagerDuty => self.pagerduty.enabled = enabled,
        }
    }

    /// Flip a channel and return its new state
    pub fn toggle(&mut self, channel: Channel) -> bool {
        let enabled = !self.is_enabled(channel);
        self.set_enabled(channel, enabled);
        enabled
    }

    /// Validate and append an address. Leaves the list untouched on rejection.
    pub fn add_email(&mut self, raw: &str) -> Result<String, EmailRejection> {
        let email = raw.trim();
        if email.is_empty() {
            return Err(EmailRejection::Empty);
        }
        if !looks_like_email(email) {
            return Err(EmailRejection::Malformed(email.to_string()));
        }
        if self
            .email
            .emails
            .iter()
            .any(|existing| existing.to_lowercase() == email.to_lowercase())
        {
            return Err(EmailRejection::Duplicate(email.to_string()));
        }

        self.email.emails.push(email.to_string());
        Ok(email.to_string())
    }

    pub fn remove_email(&mut self, email: &str) -> bool {
        let before = self.email.emails.len();
        self.email.emails.retain(|existing| existing != email);
        self.email.emails.len() != before
    }

    pub fn remove_telegram_chat(&mut self, chat: &str) -> bool {
        let before = self.telegram.chats.len();
        self.telegram.chats.retain(|existing| existing != chat);
        self.telegram.chats.len() != before
    }

    /// Returns whether the stored key changed. An empty field is stored as `None`.
    pub fn set_pagerduty_key(&mut self, key: &str) -> bool {
        let next = (!key.is_empty()).then(|| key.to_string());
        if self.pagerduty.integration_key == next {
            return false;
        }
        self.pagerduty.integration_key = next;
        true
    }

    /// Copy suitable for persisting: blank PagerDuty keys become `None`
    pub fn normalized(&self) -> Self {
        let mut normalized = self.clone();
        normalized.pagerduty.integration_key = self
            .pagerduty
            .integration_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string);
        normalized
    }
}
