use super::auth::{AuthRefreshCoordinator, AuthState};
use super::core::ApiClient;
use super::retry::RetryScheduler;
use super::tracer::RequestTracer;
use crate::config::ClientConfig;
use crate::credentials::{CredentialStore, KeyValueStore, MemoryKeyValueStore};
use crate::transport::{HttpTransport, Transport};
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`ApiClient`].
///
/// Starts from [`ClientConfig::from_env`]; explicit setters win over the environment.
pub struct ApiClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    credential_backend: Option<Arc<dyn KeyValueStore>>,
}

impl ApiClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::from_env(),
            transport: None,
            credential_backend: None,
        }
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.config.base_delay = delay;
        self
    }

    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.config.refresh_path = path.into();
        self
    }

    pub fn single_flight_refresh(mut self, enabled: bool) -> Self {
        self.config.single_flight_refresh = enabled;
        self
    }

    pub fn client_version(mut self, version: impl Into<String>) -> Self {
        self.config.client_version = version.into();
        self
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.config.platform = platform.into();
        self
    }

    /// Defaults to [`HttpTransport`].
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Defaults to an in-memory store (nothing persists across restarts).
    pub fn credential_backend(mut self, backend: Arc<dyn KeyValueStore>) -> Self {
        self.credential_backend = Some(backend);
        self
    }

    /// Build the client and restore any persisted session.
    pub async fn build(self) -> Result<ApiClient> {
        let config = self.config;
        url::Url::parse(&config.base_url).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid base URL '{}': {}", config.base_url, e),
                ErrorContext::new().with_source("client_builder"),
            )
        })?;

        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new()?),
        };
        let backend = self
            .credential_backend
            .unwrap_or_else(|| Arc::new(MemoryKeyValueStore::new()));

        let credentials = Arc::new(CredentialStore::new(backend));
        let initial = match credentials.load().await {
            Some(_) => AuthState::Authenticated,
            None => AuthState::Unauthenticated,
        };

        Ok(ApiClient {
            tracer: RequestTracer::new(&config),
            retry: RetryScheduler::new(config.max_attempts, config.base_delay),
            auth: AuthRefreshCoordinator::new(&config, initial),
            credentials,
            transport,
            config,
        })
    }
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
