// tests/helpers/mod.rs - Common test utilities

pub mod assertions;
pub mod mock_backend;
pub mod test_data;

use fleetwatch::Config;
use std::time::Duration;

/// Config pointed at a mock backend, with short retry delays
pub fn test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.backend.base_url = base_url.to_string();
    config.backend.request_timeout_seconds = 5;
    config.polling.retry_delay_ms = 10;
    config
}

/// Poll `condition` until it holds or `timeout` passes
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let check_interval = Duration::from_millis(20);
    let start = std::time::Instant::now();

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        tokio::time::sleep(check_interval).await;
    }

    condition()
}
