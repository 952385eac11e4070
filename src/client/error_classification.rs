//! Mapping of non-2xx responses onto the error taxonomy.

use super::retry::is_retryable_status;
use crate::transport::TransportResponse;
use crate::{Error, ErrorContext};

/// Best-effort human-readable message from an error body.
///
/// Looks at `message`, then `error` (string), then `error.message`.
pub(crate) fn message_from_body(body: &[u8]) -> Option<String> {
    let json: serde_json::Value = serde_json::from_slice(body).ok()?;
    let non_empty = |v: &serde_json::Value| {
        v.as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    json.get("message")
        .and_then(non_empty)
        .or_else(|| json.get("error").and_then(non_empty))
        .or_else(|| {
            json.get("error")
                .and_then(|e| e.get("message"))
                .and_then(non_empty)
        })
}

pub(crate) fn is_server_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}

pub(crate) fn error_from_response(resp: &TransportResponse, context: ErrorContext) -> Error {
    let status = resp.status;
    let message = message_from_body(&resp.body)
        .unwrap_or_else(|| format!("Request failed with status code {}", status));
    let context = context.with_status_code(status);

    if status == 401 {
        Error::Auth { message, context }
    } else if is_server_status(status) {
        Error::Server {
            status,
            message,
            retryable: is_retryable_status(status),
            context,
        }
    } else {
        Error::Client {
            status,
            message,
            context,
        }
    }
}
