// src/config.rs - Environment-driven configuration for the dashboard engine

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    pub polling: PollingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Source backend type: "http", "memory"
    pub kind: String,
    /// Base URL the endpoint paths are joined onto
    pub base_url: String,
    /// Per-request timeout (in seconds)
    pub request_timeout_seconds: u64,
    pub endpoints: EndpointPaths,
}

/// Relative paths of every backend contract the engine consumes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointPaths {
    pub node_alerts: String,
    pub org_alerts: String,
    pub machines: String,
    pub node_types: String,
    pub acknowledge_node_alert: String,
    pub acknowledge_org_alert: String,
    pub notification_settings: String,
    pub enabled_alert_kinds: String,
    pub set_alert_flags: String,
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            node_alerts: "alerts/node/active".to_string(),
            org_alerts: "alerts/org/active".to_string(),
            machines: "machine".to_string(),
            node_types: "info/nodetypes".to_string(),
            acknowledge_node_alert: "alerts/node/acknowledge".to_string(),
            acknowledge_org_alert: "alerts/org/acknowledge".to_string(),
            notification_settings: "organization/notifications/settings".to_string(),
            enabled_alert_kinds: "organization/notifications/alerts".to_string(),
            set_alert_flags: "organization/notifications/alerts/set".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// How often the alert feeds are re-fetched (in seconds)
    pub alert_interval_seconds: u64,
    /// Attempts per fetch before a feed reports an error
    pub max_retries: u32,
    /// Base delay between attempts (in milliseconds), jittered
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether to collect Prometheus metrics
    pub enabled: bool,
}

/// Detailed validation result with specific error information
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub success: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub error_type: String,
    pub message: String,
    pub suggested_fix: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub recommendation: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig {
                kind: "http".to_string(),
                base_url: "http://localhost:8080/".to_string(),
                request_timeout_seconds: 30,
                endpoints: EndpointPaths::default(),
            },
            polling: PollingConfig {
                alert_interval_seconds: 30,
                max_retries: 3,
                retry_delay_ms: 1000,
            },
            metrics: MetricsConfig { enabled: true },
        }
    }
}

/// Parse an optional environment variable, recording a readable error on failure
fn parse_env<T>(name: &str, target: &mut T, parse_errors: &mut Vec<String>)
where
    T: FromStr + std::fmt::Debug,
    T::Err: std::fmt::Display,
{
    if let Ok(raw) = std::env::var(name) {
        match raw.parse::<T>() {
            Ok(value) => {
                debug!("Found {}: {:?}", name, value);
                *target = value;
            }
            Err(e) => parse_errors.push(format!("Invalid {} '{}': {}", name, raw, e)),
        }
    }
}

impl Config {
    /// Load configuration from `FLEETWATCH_*` environment variables
    pub fn from_env() -> Result<Self> {
        let start_time = std::time::Instant::now();
        let mut config = Config::default();
        let mut parse_errors = Vec::new();

        debug!("🔧 Loading configuration from environment variables");

        if let Ok(kind) = std::env::var("FLEETWATCH_BACKEND") {
            debug!("Found FLEETWATCH_BACKEND: {}", kind);
            config.backend.kind = kind;
        }

        if let Ok(base_url) = std::env::var("FLEETWATCH_BASE_URL") {
            debug!("Found FLEETWATCH_BASE_URL: {}", base_url);
            config.backend.base_url = base_url;
        }

        parse_env(
            "FLEETWATCH_REQUEST_TIMEOUT",
            &mut config.backend.request_timeout_seconds,
            &mut parse_errors,
        );
        parse_env(
            "FLEETWATCH_POLL_INTERVAL",
            &mut config.polling.alert_interval_seconds,
            &mut parse_errors,
        );
        parse_env(
            "FLEETWATCH_MAX_RETRIES",
            &mut config.polling.max_retries,
            &mut parse_errors,
        );
        parse_env(
            "FLEETWATCH_RETRY_DELAY_MS",
            &mut config.polling.retry_delay_ms,
            &mut parse_errors,
        );
        parse_env(
            "FLEETWATCH_METRICS_ENABLED",
            &mut config.metrics.enabled,
            &mut parse_errors,
        );

        let load_duration = start_time.elapsed();

        if !parse_errors.is_empty() {
            let error_msg = format!(
                "Configuration parsing failed after {:.3}s with {} errors: {}",
                load_duration.as_secs_f64(),
                parse_errors.len(),
                parse_errors.join(", ")
            );
            return Err(anyhow::anyhow!(error_msg));
        }

        info!(
            "✅ Configuration loaded from environment in {:.3}s (backend: {}, poll interval: {}s, retries: {})",
            load_duration.as_secs_f64(),
            config.backend.kind,
            config.polling.alert_interval_seconds,
            config.polling.max_retries
        );

        Ok(config)
    }

    /// Validate configuration, logging warnings and failing on errors
    pub fn validate(&self) -> Result<()> {
        let validation_result = self.validate_detailed();

        if !validation_result.success {
            let error_messages: Vec<String> = validation_result
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();

            return Err(anyhow::anyhow!(
                "Configuration validation failed: {}",
                error_messages.join(", ")
            ));
        }

        for warning in &validation_result.warnings {
            warn!(
                "Configuration warning for {}: {}{}",
                warning.field,
                warning.message,
                warning
                    .recommendation
                    .as_ref()
                    .map(|r| format!(" (Recommendation: {})", r))
                    .unwrap_or_default()
            );
        }

        Ok(())
    }

    pub fn validate_detailed(&self) -> ValidationResult {
        let start_time = std::time::Instant::now();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        match self.backend.kind.as_str() {
            "http" => {
                if let Err(e) = url::Url::parse(&self.backend.base_url) {
                    errors.push(ValidationError {
                        field: "backend.base_url".to_string(),
                        error_type: "invalid_url".to_string(),
                        message: format!("Base URL '{}' is not valid: {}", self.backend.base_url, e),
                        suggested_fix: Some("Use an absolute URL such as http://host:port/".to_string()),
                    });
                } else if !self.backend.base_url.ends_with('/') {
                    warnings.push(ValidationWarning {
                        field: "backend.base_url".to_string(),
                        message: "Base URL has no trailing slash; the last path segment will be replaced when joining endpoints".to_string(),
                        recommendation: Some("Append '/' to the base URL".to_string()),
                    });
                }
            }
            "memory" => {
                warnings.push(ValidationWarning {
                    field: "backend.kind".to_string(),
                    message: "Memory backend serves local demo data only".to_string(),
                    recommendation: None,
                });
            }
            kind => {
                errors.push(ValidationError {
                    field: "backend.kind".to_string(),
                    error_type: "unsupported_backend".to_string(),
                    message: format!("Unsupported source backend: {}", kind),
                    suggested_fix: Some("Use 'http' or 'memory'".to_string()),
                });
            }
        }

        if self.polling.alert_interval_seconds == 0 {
            errors.push(ValidationError {
                field: "polling.alert_interval_seconds".to_string(),
                error_type: "invalid_range".to_string(),
                message: "Poll interval must be greater than zero".to_string(),
                suggested_fix: Some("Set FLEETWATCH_POLL_INTERVAL to 30".to_string()),
            });
        } else if self.polling.alert_interval_seconds < 5 {
            warnings.push(ValidationWarning {
                field: "polling.alert_interval_seconds".to_string(),
                message: "Very short poll intervals put load on the backend".to_string(),
                recommendation: Some("Consider at least 30 seconds".to_string()),
            });
        }

        if self.polling.max_retries == 0 {
            errors.push(ValidationError {
                field: "polling.max_retries".to_string(),
                error_type: "invalid_range".to_string(),
                message: "At least one fetch attempt is required".to_string(),
                suggested_fix: Some("Set FLEETWATCH_MAX_RETRIES to 3".to_string()),
            });
        } else if self.polling.max_retries > 10 {
            warnings.push(ValidationWarning {
                field: "polling.max_retries".to_string(),
                message: "Large retry counts delay error reporting".to_string(),
                recommendation: Some("Keep retries small, e.g. 3".to_string()),
            });
        }

        let retry_budget = Duration::from_millis(
            self.polling.retry_delay_ms * u64::from(self.polling.max_retries.saturating_sub(1)),
        );
        if retry_budget >= self.alert_poll_interval() && self.polling.alert_interval_seconds > 0 {
            warnings.push(ValidationWarning {
                field: "polling.retry_delay_ms".to_string(),
                message: "Retry window is longer than the poll interval".to_string(),
                recommendation: Some("Lower the retry delay or raise the poll interval".to_string()),
            });
        }

        if self.backend.request_timeout_seconds == 0 {
            errors.push(ValidationError {
                field: "backend.request_timeout_seconds".to_string(),
                error_type: "invalid_range".to_string(),
                message: "Request timeout must be greater than zero".to_string(),
                suggested_fix: Some("Set FLEETWATCH_REQUEST_TIMEOUT to 30".to_string()),
            });
        }

        ValidationResult {
            success: errors.is_empty(),
            errors,
            warnings,
            duration: start_time.elapsed(),
        }
    }

    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            backend: self.backend.kind.clone(),
            base_url: self.backend.base_url.clone(),
            alert_interval_seconds: self.polling.alert_interval_seconds,
            max_retries: self.polling.max_retries,
            metrics_enabled: self.metrics.enabled,
        }
    }

    pub fn alert_poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.alert_interval_seconds)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.polling.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.request_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub backend: String,
    pub base_url: String,
    pub alert_interval_seconds: u64,
    pub max_retries: u32,
    pub metrics_enabled: bool,
}
