//! Client configuration with environment overrides.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Scheme + host (+ optional path prefix) every endpoint is appended to.
    pub base_url: String,
    /// Per-request timeout handed to the transport.
    pub timeout: Duration,
    /// Retries allowed per retry key before the error surfaces.
    pub max_attempts: u32,
    /// First backoff delay; doubles on every scheduled retry.
    pub base_delay: Duration,
    /// Endpoint exchanging a refresh token for a new pair.
    pub refresh_path: String,
    /// Let concurrent 401s share one refresh exchange.
    pub single_flight_refresh: bool,
    /// Sent as `X-Client-Version`.
    pub client_version: String,
    /// Sent as `X-Platform`.
    pub platform: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            refresh_path: "/auth/refresh".to_string(),
            single_flight_refresh: true,
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            platform: env::consts::OS.to_string(),
        }
    }
}

fn env_u64(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, then `API_*` environment variables on top.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(url) = env_string("API_BASE_URL") {
            cfg.base_url = url;
        }
        if let Some(ms) = env_u64("API_TIMEOUT_MS").filter(|ms| *ms > 0) {
            cfg.timeout = Duration::from_millis(ms);
        }
        if let Some(n) = env_u64("API_MAX_RETRY_ATTEMPTS") {
            cfg.max_attempts = n.min(u32::MAX as u64) as u32;
        }
        if let Some(ms) = env_u64("API_RETRY_BASE_DELAY_MS") {
            cfg.base_delay = Duration::from_millis(ms);
        }
        if let Some(v) = env_string("API_CLIENT_VERSION") {
            cfg.client_version = v;
        }
        if let Some(p) = env_string("API_PLATFORM") {
            cfg.platform = p;
        }
        cfg
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    pub fn with_single_flight_refresh(mut self, enabled: bool) -> Self {
        self.single_flight_refresh = enabled;
        self
    }

    pub fn with_client_version(mut self, version: impl Into<String>) -> Self {
        self.client_version = version.into();
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }
}
