// tests/helpers/mock_backend.rs - Mock fleet backend for HTTP-level tests

use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use warp::http::{Method, StatusCode};
use warp::hyper::body::Bytes;
use warp::path::FullPath;
use warp::Filter;

/// One request as the backend saw it
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: Option<Value>,
}

#[derive(Debug)]
struct BackendData {
    node_alerts: Vec<Value>,
    org_alerts: Vec<Value>,
    machines: Vec<Value>,
    node_types: Vec<String>,
    settings: Value,
    enabled_kinds: Vec<String>,
}

impl Default for BackendData {
    fn default() -> Self {
        Self {
            node_alerts: Vec::new(),
            org_alerts: Vec::new(),
            machines: Vec::new(),
            node_types: Vec::new(),
            settings: json!({
                "telegram": {"enabled": false, "chats": []},
                "email": {"enabled": false, "emails": []},
                "pagerduty": {"enabled": false, "integration_key": null}
            }),
            enabled_kinds: Vec::new(),
        }
    }
}

/// Mock backend serving every endpoint under the default paths
#[derive(Clone, Default)]
pub struct MockBackend {
    data: Arc<Mutex<BackendData>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    delay_ms: Arc<Mutex<u64>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_node_alerts(&self, alerts: Vec<Value>) {
        self.data.lock().await.node_alerts = alerts;
    }

    pub async fn set_org_alerts(&self, alerts: Vec<Value>) {
        self.data.lock().await.org_alerts = alerts;
    }

    pub async fn set_machines(&self, machines: Vec<Value>) {
        self.data.lock().await.machines = machines;
    }

    pub async fn set_node_types(&self, node_types: Vec<String>) {
        self.data.lock().await.node_types = node_types;
    }

    pub async fn set_settings(&self, settings: Value) {
        self.data.lock().await.settings = settings;
    }

    pub async fn set_enabled_kinds(&self, kinds: &[&str]) {
        self.data.lock().await.enabled_kinds = kinds.iter().map(|k| k.to_string()).collect();
    }

    pub async fn settings(&self) -> Value {
        self.data.lock().await.settings.clone()
    }

    pub async fn enabled_kinds(&self) -> Vec<String> {
        self.data.lock().await.enabled_kinds.clone()
    }

    /// Answer 500 on `path` until [`Self::recover`]
    pub async fn fail_path(&self, path: &str) {
        self.failing.lock().await.insert(path.to_string());
    }

    pub async fn recover(&self) {
        self.failing.lock().await.clear();
    }

    pub async fn set_delay(&self, delay_ms: u64) {
        *self.delay_ms.lock().await = delay_ms;
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    pub async fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.path == path)
            .cloned()
            .collect()
    }

    pub async fn clear_calls(&self) {
        self.calls.lock().await.clear();
    }

    /// Start serving on an ephemeral port and return its base URL
    pub fn start(&self) -> (String, tokio::task::JoinHandle<()>) {
        let backend = self.clone();
        let routes = warp::any()
            .and(warp::method())
            .and(warp::path::full())
            .and(warp::query::<HashMap<String, String>>())
            .and(warp::body::bytes())
            .and(warp::any().map(move || backend.clone()))
            .and_then(handle_request);

        let (addr, server): (SocketAddr, _) =
            warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
        let handle = tokio::spawn(server);
        (format!("http://{}/", addr), handle)
    }

    async fn dispatch(
        &self,
        method: &Method,
        path: &str,
        query: &HashMap<String, String>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut data = self.data.lock().await;
        match (method.as_str(), path) {
            ("GET", "alerts/node/active") => (StatusCode::OK, Value::from(data.node_alerts.clone())),
            ("GET", "alerts/org/active") => (StatusCode::OK, Value::from(data.org_alerts.clone())),
            ("GET", "machine") => (StatusCode::OK, Value::from(data.machines.clone())),
            ("GET", "info/nodetypes") => (StatusCode::OK, json!(data.node_types)),
            ("POST", "alerts/node/acknowledge") => acknowledge(&mut data.node_alerts, query),
            ("POST", "alerts/org/acknowledge") => acknowledge(&mut data.org_alerts, query),
            ("GET", "organization/notifications/settings") => (StatusCode::OK, data.settings.clone()),
            ("POST", "organization/notifications/settings") => {
                data.settings = body.unwrap_or(Value::Null);
                (StatusCode::OK, json!({}))
            }
            ("GET", "organization/notifications/alerts") => (StatusCode::OK, json!(data.enabled_kinds)),
            ("POST", "organization/notifications/alerts/set") => {
                let flags = body.unwrap_or(Value::Null);
                let enabled = flags
                    .as_array()
                    .map(|flags| {
                        flags
                            .iter()
                            .filter(|f| f["enabled"].as_bool() == Some(true))
                            .filter_map(|f| f["alert"].as_str().map(String::from))
                            .collect()
                    })
                    .unwrap_or_default();
                data.enabled_kinds = enabled;
                (StatusCode::OK, json!({}))
            }
            _ => (StatusCode::NOT_FOUND, json!({"error": "no such route"})),
        }
    }
}

fn acknowledge(alerts: &mut [Value], query: &HashMap<String, String>) -> (StatusCode, Value) {
    let Some(alert_id) = query.get("alert_id") else {
        return (StatusCode::BAD_REQUEST, json!({"error": "missing alert_id"}));
    };
    match alerts.iter_mut().find(|a| a["alert_id"] == json!(alert_id)) {
        Some(alert) => {
            if alert["acknowledged_at"].is_null() {
                alert["acknowledged_at"] = json!("2024-06-01T00:00:00Z");
            }
            (StatusCode::OK, json!({}))
        }
        None => (StatusCode::NOT_FOUND, json!({"error": "alert not found"})),
    }
}

async fn handle_request(
    method: Method,
    path: FullPath,
    query: HashMap<String, String>,
    body: Bytes,
    backend: MockBackend,
) -> Result<impl warp::Reply, warp::Rejection> {
    let delay = *backend.delay_ms.lock().await;
    if delay > 0 {
        sleep(Duration::from_millis(delay)).await;
    }

    let path = path.as_str().trim_start_matches('/').to_string();
    let body: Option<Value> = serde_json::from_slice(&body).ok();

    backend.calls.lock().await.push(RecordedCall {
        method: method.to_string(),
        path: path.clone(),
        query: query.clone(),
        body: body.clone(),
    });

    let (status, reply) = if backend.failing.lock().await.contains(&path) {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"error": "Mock backend failure"}),
        )
    } else {
        backend.dispatch(&method, &path, &query, body).await
    };

    Ok(warp::reply::with_status(warp::reply::json(&reply), status))
}
