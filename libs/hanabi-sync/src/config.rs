use std::time::Duration;

/// Sync-core configuration, loaded from environment variables.
///
/// Every value has a local-development default, so `from_env()` never
/// fails; deployments override via `HANABI_*` variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the backend REST API (e.g. `http://localhost:4000/api`).
    pub api_base_url: String,
    /// URL of the socket endpoint (e.g. `ws://localhost:4000/socket`).
    pub socket_url: String,
    /// URL probed by the backend health monitor.
    pub health_check_url: String,
    /// Interval between health probes.
    pub health_interval: Duration,
}

/// Default interval between health probes (seconds).
const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 30;

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            api_base_url: var_or("HANABI_API_URL", "http://localhost:4000/api"),
            socket_url: var_or("HANABI_SOCKET_URL", "ws://localhost:4000/socket"),
            health_check_url: var_or("HANABI_HEALTH_URL", "http://localhost:4000/health-check"),
            health_interval: Duration::from_secs(
                std::env::var("HANABI_HEALTH_INTERVAL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_HEALTH_INTERVAL_SECS),
            ),
        }
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_or_falls_back_to_default() {
        assert_eq!(var_or("HANABI_TEST_UNSET_VAR", "fallback"), "fallback");
    }

    #[test]
    fn var_or_ignores_empty_values() {
        std::env::set_var("HANABI_TEST_EMPTY_VAR", "");
        assert_eq!(var_or("HANABI_TEST_EMPTY_VAR", "fallback"), "fallback");
    }
}
