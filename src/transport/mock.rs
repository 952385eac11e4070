//! Scripted transport for tests and offline development.

use super::{Transport, TransportError, TransportRequest, TransportResponse};
use crate::types::Method;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

enum Reply {
    Response(TransportResponse),
    NetworkError(String),
}

/// A request as observed by [`MockTransport`], with the instant it was sent.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub request: TransportRequest,
    pub sent_at: Instant,
}

impl RecordedRequest {
    pub fn path(&self) -> &str {
        self.request.url.path()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.header(name)
    }

    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.request
            .body
            .as_ref()
            .and_then(|b| serde_json::from_slice(b).ok())
    }
}

/// Replies are queued per `(method, path)` and consumed in order.
///
/// An unscripted route answers `404`.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    latency: Option<Duration>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every reply, to keep concurrent requests overlapping.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn push_json(&self, method: Method, path: &str, status: u16, body: serde_json::Value) -> &Self {
        self.push(method, path, Reply::Response(TransportResponse::json(status, &body)))
    }

    pub fn push_response(&self, method: Method, path: &str, response: TransportResponse) -> &Self {
        self.push(method, path, Reply::Response(response))
    }

    pub fn push_network_error(&self, method: Method, path: &str, message: &str) -> &Self {
        self.push(method, path, Reply::NetworkError(message.to_string()))
    }

    fn push(&self, method: Method, path: &str, reply: Reply) -> &Self {
        lock(&self.routes)
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        lock(&self.requests)
            .iter()
            .filter(|r| r.path() == path)
            .cloned()
            .collect()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Scripted replies not yet consumed, across all routes.
    pub fn pending(&self) -> usize {
        lock(&self.routes).values().map(VecDeque::len).sum()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let key = (request.method, request.url.path().to_string());
        lock(&self.requests).push(RecordedRequest {
            request,
            sent_at: Instant::now(),
        });

        let reply = lock(&self.routes).get_mut(&key).and_then(VecDeque::pop_front);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match reply {
            Some(Reply::Response(resp)) => Ok(resp),
            Some(Reply::NetworkError(msg)) => Err(TransportError::Network(msg)),
            None => Ok(TransportResponse::json(
                404,
                &serde_json::json!({ "message": format!("no mock reply for {} {}", key.0, key.1) }),
            )),
        }
    }
}
