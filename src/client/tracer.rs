//! Outbound request decoration: correlation id, timing, client identity, auth.

use crate::config::ClientConfig;
use crate::types::envelope::now_timestamp;
use crate::types::{Headers, RequestDescriptor};
use uuid::Uuid;

pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_REQUEST_ID: &str = "X-Request-ID";
pub const HEADER_REQUEST_TIMESTAMP: &str = "X-Request-Timestamp";
pub const HEADER_CLIENT_VERSION: &str = "X-Client-Version";
pub const HEADER_PLATFORM: &str = "X-Platform";

const RESERVED: [&str; 5] = [
    HEADER_AUTHORIZATION,
    HEADER_REQUEST_ID,
    HEADER_REQUEST_TIMESTAMP,
    HEADER_CLIENT_VERSION,
    HEADER_PLATFORM,
];

/// Headers produced for one dispatch.
#[derive(Debug, Clone)]
pub struct TracedHeaders {
    pub request_id: String,
    pub headers: Headers,
}

/// Applied before every dispatch, retries and replays included, so each one
/// carries its own request id. Never fails.
#[derive(Debug, Clone)]
pub struct RequestTracer {
    client_version: String,
    platform: String,
}

impl RequestTracer {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            client_version: config.client_version.clone(),
            platform: config.platform.clone(),
        }
    }

    pub fn decorate(&self, desc: &RequestDescriptor, access_token: Option<&str>) -> TracedHeaders {
        let mut headers = Headers::new();
        headers.insert("Accept".into(), "application/json".into());
        headers.insert("Content-Type".into(), "application/json".into());

        for (name, value) in &desc.options.headers {
            if RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name)) {
                continue;
            }
            headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
            headers.insert(name.clone(), value.clone());
        }

        let request_id = Uuid::new_v4().to_string();
        headers.insert(HEADER_REQUEST_ID.into(), request_id.clone());
        headers.insert(HEADER_REQUEST_TIMESTAMP.into(), now_timestamp());
        headers.insert(HEADER_CLIENT_VERSION.into(), self.client_version.clone());
        headers.insert(HEADER_PLATFORM.into(), self.platform.clone());

        if !desc.options.skip_auth {
            if let Some(token) = access_token.filter(|t| !t.is_empty()) {
                headers.insert(HEADER_AUTHORIZATION.into(), format!("Bearer {}", token));
            }
        }

        TracedHeaders {
            request_id,
            headers,
        }
    }
}
