//! Request chain execution: dispatch, classify, then retry or refresh-and-replay.

use super::core::ApiClient;
use super::error_classification::error_from_response;
use super::retry::Decision;
use crate::transport::{TransportRequest, TransportResponse};
use crate::types::{Envelope, QueryParams, RequestDescriptor};
use crate::{Error, ErrorContext, Result};
use bytes::Bytes;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Outcome of one transport round-trip.
pub(crate) struct Dispatched {
    pub response: TransportResponse,
    pub request_id: String,
    /// Access token the request was sent with, if any.
    pub access_token: Option<String>,
}

impl ApiClient {
    pub(crate) fn endpoint_url(&self, path: &str, params: Option<&QueryParams>) -> Result<url::Url> {
        let raw = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
        } else {
            format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
        };

        let mut url = url::Url::parse(&raw).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid request URL '{}': {}", raw, e),
                ErrorContext::new().with_endpoint(path).with_source("endpoint_url"),
            )
        })?;
        if let Some(params) = params.filter(|p| !p.is_empty()) {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Decorate and send once. Only a missing response is an error here.
    pub(crate) async fn dispatch_once(&self, desc: &RequestDescriptor) -> Result<Dispatched> {
        let access_token = if desc.options.skip_auth {
            None
        } else {
            self.credentials.access_token()
        };
        let traced = self.tracer.decorate(desc, access_token.as_deref());
        let url = self.endpoint_url(&desc.path, desc.params.as_ref())?;
        let body = match &desc.body {
            Some(v) => Some(Bytes::from(serde_json::to_vec(v)?)),
            None => None,
        };

        let request = TransportRequest {
            method: desc.method,
            url,
            headers: traced.headers,
            body,
            timeout: desc.options.timeout.unwrap_or(self.config.timeout),
        };

        let start = Instant::now();
        let response = self.transport.send(request).await.map_err(|e| {
            debug!(
                method = desc.method.as_str(),
                endpoint = desc.path.as_str(),
                request_id = traced.request_id.as_str(),
                duration_ms = start.elapsed().as_millis() as u64,
                error = %e,
                "dispatch failed without response"
            );
            Error::Transport(e)
        })?;

        debug!(
            method = desc.method.as_str(),
            endpoint = desc.path.as_str(),
            request_id = traced.request_id.as_str(),
            http_status = response.status,
            duration_ms = start.elapsed().as_millis() as u64,
            "dispatch completed"
        );

        Ok(Dispatched {
            response,
            request_id: traced.request_id,
            access_token,
        })
    }

    fn can_refresh(&self, desc: &RequestDescriptor, replayed: bool) -> bool {
        !desc.options.skip_auth && !replayed && self.credentials.refresh_token().is_some()
    }

    /// Run one request chain to completion.
    ///
    /// Strict order within the chain: a 401 triggers at most one refresh and one
    /// replay; transient failures are retried until the key's budget is spent.
    pub(crate) async fn execute(&self, desc: RequestDescriptor) -> Result<Envelope<serde_json::Value>> {
        let start = Instant::now();
        let mut replayed = false;
        let chain = self.retry.begin_chain(&desc.retry_key);

        let result = loop {
            let err = match self.dispatch_once(&desc).await {
                Ok(d) if d.response.is_success() => {
                    break Ok((Envelope::from_body(&d.response.body), d.response.status));
                }
                Ok(d) if d.response.status == 401 && self.can_refresh(&desc, replayed) => {
                    match self.refresh_session(d.access_token.as_deref()).await {
                        Ok(_) => {
                            replayed = true;
                            debug!(endpoint = desc.path.as_str(), "replaying request with refreshed token");
                            continue;
                        }
                        Err(e) => break Err(e),
                    }
                }
                Ok(d) => error_from_response(
                    &d.response,
                    ErrorContext::new()
                        .with_endpoint(desc.path.clone())
                        .with_request_id(d.request_id)
                        .with_source("execution"),
                ),
                Err(e) => e,
            };

            match self.retry.decide(&err, &desc.retry_key, desc.options.skip_retry) {
                Decision::Retry { delay, attempt } => {
                    debug!(
                        endpoint = desc.path.as_str(),
                        retry_key = desc.retry_key.as_str(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "scheduling retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                Decision::Fail => break Err(err),
            }
        };

        let attempts = self.retry.attempts(&desc.retry_key);
        drop(chain);

        match result {
            Ok((envelope, status)) => {
                info!(
                    method = desc.method.as_str(),
                    endpoint = desc.path.as_str(),
                    http_status = status,
                    retry_count = attempts,
                    replayed,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "request completed"
                );
                Ok(envelope)
            }
            Err(e) => {
                if desc.options.silent {
                    debug!(
                        method = desc.method.as_str(),
                        endpoint = desc.path.as_str(),
                        retry_count = attempts,
                        error = %e,
                        "request failed"
                    );
                } else {
                    warn!(
                        method = desc.method.as_str(),
                        endpoint = desc.path.as_str(),
                        http_status = e.status(),
                        retry_count = attempts,
                        duration_ms = start.elapsed().as_millis() as u64,
                        error = %e,
                        "request failed"
                    );
                }
                Err(e)
            }
        }
    }
}
