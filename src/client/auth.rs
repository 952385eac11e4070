//! 401 recovery: exchange the refresh token, then replay the failed request once.

use super::core::ApiClient;
use super::error_classification::error_from_response;
use crate::config::ClientConfig;
use crate::credentials::CredentialPair;
use crate::types::{Envelope, Method, RequestDescriptor, RequestOptions};
use crate::{Error, ErrorContext, Result};
use serde::Deserialize;
use std::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Authenticated,
    Refreshing,
    Unauthenticated,
}

/// Refresh state machine shared by every request chain of one client.
///
/// With single-flight enabled, chains that hit a 401 while another chain is
/// refreshing wait for it and reuse its result instead of exchanging again.
pub struct AuthRefreshCoordinator {
    state: Mutex<AuthState>,
    gate: tokio::sync::Mutex<()>,
    refresh_path: String,
    single_flight: bool,
}

impl AuthRefreshCoordinator {
    pub fn new(config: &ClientConfig, initial: AuthState) -> Self {
        Self {
            state: Mutex::new(initial),
            gate: tokio::sync::Mutex::new(()),
            refresh_path: config.refresh_path.clone(),
            single_flight: config.single_flight_refresh,
        }
    }

    pub fn state(&self) -> AuthState {
        *self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub(crate) fn set_state(&self, next: AuthState) {
        let mut st = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if *st != next {
            debug!(from = ?*st, to = ?next, "auth state transition");
            *st = next;
        }
    }

    pub fn refresh_path(&self) -> &str {
        &self.refresh_path
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshGrant {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl ApiClient {
    /// Obtain a fresh pair after a 401 seen with `stale_access`.
    ///
    /// On failure every stored credential is cleared and an [`Error::Auth`] is
    /// returned for the caller to route into its logout flow.
    pub(crate) async fn refresh_session(&self, stale_access: Option<&str>) -> Result<CredentialPair> {
        let _gate = if self.auth.single_flight {
            Some(self.auth.gate.lock().await)
        } else {
            None
        };

        if self.auth.single_flight {
            if let Some(current) = self.credentials.current() {
                if Some(current.access_token.as_str()) != stale_access {
                    debug!("token already refreshed by a concurrent request");
                    return Ok(current);
                }
            }
        }

        let refresh_token = match self.credentials.refresh_token() {
            Some(t) => t,
            None => {
                self.auth.set_state(AuthState::Unauthenticated);
                return Err(Error::auth_with_context(
                    "Session expired: no refresh token available",
                    ErrorContext::new()
                        .with_status_code(401)
                        .with_source("auth_refresh"),
                ));
            }
        };

        self.auth.set_state(AuthState::Refreshing);
        match self.exchange_refresh_token(&refresh_token).await {
            Ok(grant) => {
                let next_refresh = grant
                    .refresh_token
                    .filter(|t| !t.is_empty())
                    .unwrap_or(refresh_token);
                let pair = self.credentials.save(grant.access_token, next_refresh).await;
                self.auth.set_state(AuthState::Authenticated);
                info!("access token refreshed");
                Ok(pair)
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed; clearing credentials");
                self.credentials.clear().await;
                self.auth.set_state(AuthState::Unauthenticated);
                Err(Error::auth_with_context(
                    format!("Session expired: {}", e.message()),
                    ErrorContext::new()
                        .with_status_code(e.status().unwrap_or(401))
                        .with_endpoint(self.auth.refresh_path.clone())
                        .with_source("auth_refresh"),
                ))
            }
        }
    }

    /// Single dispatch: no auth header, no retries, no nested refresh.
    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<RefreshGrant> {
        let desc = RequestDescriptor::new(
            Method::Post,
            self.auth.refresh_path.clone(),
            RequestOptions::new().skip_auth().skip_retry(),
        )
        .with_body(Some(serde_json::json!({ "refreshToken": refresh_token })));

        let dispatched = self.dispatch_once(&desc).await?;
        if !dispatched.response.is_success() {
            return Err(error_from_response(
                &dispatched.response,
                ErrorContext::new()
                    .with_endpoint(desc.path.clone())
                    .with_request_id(dispatched.request_id)
                    .with_source("auth_refresh"),
            ));
        }

        let envelope = Envelope::from_body(&dispatched.response.body);
        let grant: RefreshGrant = serde_json::from_value(envelope.data)?;
        if grant.access_token.is_empty() {
            return Err(Error::auth_with_context(
                "refresh response carried an empty access token",
                ErrorContext::new().with_source("auth_refresh"),
            ));
        }
        Ok(grant)
    }
}
