use crate::transport::TransportError;
use thiserror::Error;

/// Structured error context for failed requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// HTTP status of the final response, if one was received.
    pub status_code: Option<u16>,
    /// `X-Request-ID` of the dispatch that produced the error.
    pub request_id: Option<String>,
    /// Endpoint path the request targeted (e.g. "/feed").
    pub endpoint: Option<String>,
    /// Additional free-form details.
    pub details: Option<String>,
    /// Component that raised the error (e.g. "execution", "auth_refresh").
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status_code(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Unified error type for the API client.
///
/// Variants follow the failure taxonomy the client acts on: transport and server
/// failures may be retried, auth failures go through the refresh coordinator, client
/// failures always surface unchanged.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Network error: {0}")]
    Transport(#[from] TransportError),

    #[error("Server error: HTTP {status}: {message}{}", format_context(.context))]
    Server {
        status: u16,
        message: String,
        retryable: bool,
        context: ErrorContext,
    },

    #[error("Authentication error: {message}{}", format_context(.context))]
    Auth {
        message: String,
        context: ErrorContext,
    },

    #[error("Request error: HTTP {status}: {message}{}", format_context(.context))]
    Client {
        status: u16,
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref endpoint) = ctx.endpoint {
        parts.push(format!("endpoint: {}", endpoint));
    }
    if let Some(ref id) = ctx.request_id {
        parts.push(format!("request_id: {}", id));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub fn auth_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Auth {
            message: msg.into(),
            context,
        }
    }

    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage {
            message: msg.into(),
        }
    }

    /// Whether the retry scheduler may redispatch after this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Server { retryable, .. } => *retryable,
            _ => false,
        }
    }

    /// HTTP status carried by the error, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Server { status, .. } | Error::Client { status, .. } => Some(*status),
            Error::Auth { context, .. } => context.status_code,
            _ => None,
        }
    }

    /// Human-readable message suitable for showing to the caller.
    pub fn message(&self) -> String {
        match self {
            Error::Server { message, .. }
            | Error::Auth { message, .. }
            | Error::Client { message, .. }
            | Error::Configuration { message, .. }
            | Error::Storage { message } => message.clone(),
            Error::Transport(e) => e.to_string(),
            Error::Serialization(e) => e.to_string(),
        }
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Server { context, .. }
            | Error::Auth { context, .. }
            | Error::Client { context, .. }
            | Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }
}
