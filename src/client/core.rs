use super::auth::{AuthRefreshCoordinator, AuthState};
use super::builder::ApiClientBuilder;
use super::retry::RetryScheduler;
use super::tracer::RequestTracer;
use crate::config::ClientConfig;
use crate::credentials::{CredentialPair, CredentialStore};
use crate::transport::Transport;
use crate::types::{Envelope, Method, QueryParams, RequestDescriptor, RequestOptions};
use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Auth-aware API client shared by every service of the app.
///
/// Cheap to share behind an `Arc`; all mutable state (credentials, retry
/// counters, auth state) is internally synchronized.
pub struct ApiClient {
    pub(crate) config: ClientConfig,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) credentials: Arc<CredentialStore>,
    pub(crate) tracer: RequestTracer,
    pub(crate) retry: RetryScheduler,
    pub(crate) auth: AuthRefreshCoordinator,
}

impl ApiClient {
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Option<&QueryParams>,
        options: Option<RequestOptions>,
    ) -> Result<Envelope<T>> {
        let desc = RequestDescriptor::new(Method::Get, endpoint, options.unwrap_or_default())
            .with_params(params.cloned());
        self.request(desc).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Option<serde_json::Value>,
        options: Option<RequestOptions>,
    ) -> Result<Envelope<T>> {
        let desc = RequestDescriptor::new(Method::Post, endpoint, options.unwrap_or_default())
            .with_body(body);
        self.request(desc).await
    }

    /// `post` with a typed body.
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
        options: Option<RequestOptions>,
    ) -> Result<Envelope<T>> {
        let body = serde_json::to_value(body)?;
        self.post(endpoint, Some(body), options).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Option<serde_json::Value>,
        options: Option<RequestOptions>,
    ) -> Result<Envelope<T>> {
        let desc = RequestDescriptor::new(Method::Put, endpoint, options.unwrap_or_default())
            .with_body(body);
        self.request(desc).await
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Option<serde_json::Value>,
        options: Option<RequestOptions>,
    ) -> Result<Envelope<T>> {
        let desc = RequestDescriptor::new(Method::Patch, endpoint, options.unwrap_or_default())
            .with_body(body);
        self.request(desc).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: Option<RequestOptions>,
    ) -> Result<Envelope<T>> {
        let desc = RequestDescriptor::new(Method::Delete, endpoint, options.unwrap_or_default());
        self.request(desc).await
    }

    /// Run a prepared descriptor through the full pipeline.
    pub async fn request<T: DeserializeOwned>(&self, desc: RequestDescriptor) -> Result<Envelope<T>> {
        self.execute(desc).await?.decode()
    }

    /// Store the pair issued by a login endpoint.
    pub async fn login(
        &self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> CredentialPair {
        let pair = self.credentials.save(access_token, refresh_token).await;
        self.auth.set_state(AuthState::Authenticated);
        info!("session started");
        pair
    }

    pub async fn logout(&self) {
        self.credentials.clear().await;
        self.auth.set_state(AuthState::Unauthenticated);
        info!("session cleared");
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.access_token().is_some()
    }

    pub fn auth_state(&self) -> AuthState {
        self.auth.state()
    }

    pub fn credentials(&self) -> Option<CredentialPair> {
        self.credentials.current()
    }

    pub fn credential_store(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    /// Retries currently consumed under `retry_key`.
    pub fn retry_attempts(&self, retry_key: &str) -> u32 {
        self.retry.attempts(retry_key)
    }
}
