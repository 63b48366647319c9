// src/source/http.rs - reqwest-backed implementation of the backend contracts

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{endpoint, AlertSource};
use crate::alert::{decode_feed, MachineRef, NodeAlert, OrgAlert};
use crate::config::{BackendConfig, EndpointPaths};
use crate::error::{FleetError, Result};
use crate::settings::{AlertFlag, NotificationSettings};

#[derive(Debug, Clone)]
pub struct HttpAlertSource {
    client: reqwest::Client,
    base_url: Url,
    paths: EndpointPaths,
    timeout: Duration,
}

impl HttpAlertSource {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_seconds);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FleetError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = Url::parse(&config.base_url).map_err(|e| {
            FleetError::Configuration(format!("Invalid base URL '{}': {}", config.base_url, e))
        })?;

        Ok(Self {
            client,
            base_url,
            paths: config.endpoints.clone(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| FleetError::Configuration(format!("Invalid endpoint path '{}': {}", path, e)))
    }

    fn transport_error(&self, e: reqwest::Error) -> FleetError {
        if e.is_timeout() {
            FleetError::Timeout {
                timeout_seconds: self.timeout.as_secs(),
            }
        } else {
            FleetError::Network(e.to_string())
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read response body".to_string());
        Err(FleetError::Backend {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, name: &str, path: &str) -> Result<T> {
        let url = self.url(path)?;
        debug!(endpoint = name, url = %url, "GET");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = Self::check_status(response).await?;
        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_feed<T: DeserializeOwned>(&self, name: &str, path: &str) -> Result<Vec<T>> {
        let values: Vec<serde_json::Value> = self.get_json(name, path).await?;
        Ok(decode_feed(name, values))
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        name: &str,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<()> {
        let url = self.url(path)?;
        debug!(endpoint = name, url = %url, "POST");

        let mut request = self.client.post(url).query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        Self::check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl AlertSource for HttpAlertSource {
    async fn node_alerts(&self) -> Result<Vec<NodeAlert>> {
        self.get_feed(endpoint::NODE_ALERTS, &self.paths.node_alerts)
            .await
    }

    async fn org_alerts(&self) -> Result<Vec<OrgAlert>> {
        self.get_feed(endpoint::ORG_ALERTS, &self.paths.org_alerts)
            .await
    }

    async fn machines(&self) -> Result<Vec<MachineRef>> {
        self.get_feed(endpoint::MACHINES, &self.paths.machines).await
    }

    async fn node_types(&self) -> Result<Vec<String>> {
        self.get_json(endpoint::NODE_TYPES, &self.paths.node_types)
            .await
    }

    async fn acknowledge_node_alert(&self, alert_id: &str) -> Result<()> {
        self.post::<()>(
            endpoint::ACK_NODE_ALERT,
            &self.paths.acknowledge_node_alert,
            &[("alert_id", alert_id)],
            None,
        )
        .await
    }

    async fn acknowledge_org_alert(&self, alert_id: &str) -> Result<()> {
        self.post::<()>(
            endpoint::ACK_ORG_ALERT,
            &self.paths.acknowledge_org_alert,
            &[("alert_id", alert_id)],
            None,
        )
        .await
    }

    async fn notification_settings(&self) -> Result<NotificationSettings> {
        self.get_json(endpoint::GET_SETTINGS, &self.paths.notification_settings)
            .await
    }

    async fn save_notification_settings(&self, settings: &NotificationSettings) -> Result<()> {
        self.post(
            endpoint::SAVE_SETTINGS,
            &self.paths.notification_settings,
            &[],
            Some(settings),
        )
        .await
    }

    async fn enabled_alert_kinds(&self) -> Result<Vec<String>> {
        self.get_json(endpoint::ENABLED_KINDS, &self.paths.enabled_alert_kinds)
            .await
    }

    async fn set_alert_flags(&self, flags: &[AlertFlag]) -> Result<()> {
        self.post(
            endpoint::SET_ALERT_FLAGS,
            &self.paths.set_alert_flags,
            &[],
            Some(flags),
        )
        .await
    }
}
