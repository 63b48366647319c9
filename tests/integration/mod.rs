// tests/integration/mod.rs - Integration test harness

use fleetwatch::{AlertSource, Config, Dashboard, HttpAlertSource};
use std::sync::Arc;

use crate::helpers::mock_backend::MockBackend;
use crate::helpers::test_config;

pub mod acknowledgment;
pub mod http_source;
pub mod scheduler;
pub mod settings;

/// Mock backend plus a source and config pointed at it
pub struct TestHarness {
    pub backend: MockBackend,
    pub config: Config,
    pub source: Arc<dyn AlertSource>,
    _server_handle: tokio::task::JoinHandle<()>,
}

impl TestHarness {
    pub async fn new() -> Self {
        let backend = MockBackend::new();
        let (base_url, server_handle) = backend.start();
        let config = test_config(&base_url);
        let source: Arc<dyn AlertSource> =
            Arc::new(HttpAlertSource::new(&config.backend).expect("valid backend config"));

        Self {
            backend,
            config,
            source,
            _server_handle: server_handle,
        }
    }

    pub fn dashboard(&self) -> Dashboard {
        Dashboard::new(self.source.clone(), &self.config).expect("dashboard")
    }
}
