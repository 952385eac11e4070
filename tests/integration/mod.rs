//! Integration tests: the full client pipeline against scripted and real HTTP transports.

pub mod auth_refresh;
pub mod retry;

use api_client_core::credentials::MemoryKeyValueStore;
use api_client_core::transport::MockTransport;
use api_client_core::{ApiClient, ApiClientBuilder};
use std::sync::Arc;
use std::time::Duration;

pub const BASE_URL: &str = "https://api.test";
pub const BASE_DELAY: Duration = Duration::from_millis(20);

pub fn builder(mock: Arc<MockTransport>) -> ApiClientBuilder {
    ApiClient::builder()
        .base_url(BASE_URL)
        .max_attempts(3)
        .base_delay(BASE_DELAY)
        .client_version("9.9.9")
        .platform("test")
        .transport(mock)
}

pub async fn test_client(mock: Arc<MockTransport>) -> ApiClient {
    builder(mock)
        .credential_backend(Arc::new(MemoryKeyValueStore::new()))
        .build()
        .await
        .expect("client builds")
}
