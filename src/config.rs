use std::time::Duration;

use crate::error::AurionError;
use crate::protocol::DEFAULT_BASE_URL;
use crate::retry::RetryPolicy;

/// Idle time after which `Session::refresh` pings the portal.
const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub proxies: Vec<String>,
    /// Shuffle the proxy list once before use.
    pub shuffle_proxies: bool,
    pub retry: RetryPolicy,
    pub timeout: Duration,
    pub idle_threshold: Duration,
    /// URL fetched through each proxy by `Session::test_all_proxies`.
    pub probe_url: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username: String::new(),
            password: String::new(),
            proxies: Vec::new(),
            shuffle_proxies: true,
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(30),
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
            probe_url: "https://httpbin.org/ip".to_string(),
        }
    }
}

impl PortalConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// Build a config from `AURION_USERNAME`, `AURION_PASSWORD`, and the
    /// optional `AURION_BASE_URL` / `AURION_PROXIES` (comma-separated).
    pub fn from_env() -> Result<Self, AurionError> {
        let username = std::env::var("AURION_USERNAME")
            .map_err(|_| AurionError::Config("AURION_USERNAME not set".into()))?;
        let password = std::env::var("AURION_PASSWORD")
            .map_err(|_| AurionError::Config("AURION_PASSWORD not set".into()))?;

        let mut config = Self::new(username, password);
        if let Ok(base_url) = std::env::var("AURION_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        if let Ok(proxies) = std::env::var("AURION_PROXIES") {
            config = config.with_proxies(parse_proxy_list(&proxies));
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_proxies(mut self, proxies: Vec<String>) -> Self {
        self.proxies = proxies;
        self
    }

    pub fn with_shuffle_proxies(mut self, shuffle: bool) -> Self {
        self.shuffle_proxies = shuffle;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_idle_threshold(mut self, idle_threshold: Duration) -> Self {
        self.idle_threshold = idle_threshold;
        self
    }

    pub fn with_probe_url(mut self, probe_url: impl Into<String>) -> Self {
        self.probe_url = probe_url.into();
        self
    }
}

fn parse_proxy_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = PortalConfig::new("user", "pass")
            .with_base_url("https://portal.example/")
            .with_timeout(Duration::from_secs(5))
            .with_retry(RetryPolicy::new(5, Duration::from_millis(10)))
            .with_proxies(vec!["http://p1:8080".into()]);

        assert_eq!(config.username, "user");
        assert_eq!(config.password, "pass");
        assert_eq!(config.base_url, "https://portal.example");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.retry.max_attempts(), 5);
        assert_eq!(config.proxies.len(), 1);
    }

    #[test]
    fn test_defaults() {
        let config = PortalConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.retry.max_attempts(), 3);
        assert_eq!(config.idle_threshold, Duration::from_secs(1800));
        assert!(config.shuffle_proxies);
    }

    #[test]
    fn test_parse_proxy_list() {
        let proxies = parse_proxy_list(" http://a:1 , ,http://b:2,");
        assert_eq!(proxies, vec!["http://a:1", "http://b:2"]);
    }
}
