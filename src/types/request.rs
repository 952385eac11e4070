use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Header map used on both sides of the transport boundary.
pub type Headers = BTreeMap<String, String>;

/// Query parameters for `GET` requests.
pub type QueryParams = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call options accepted by every client operation.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Do not attach the `Authorization` header and never attempt a token refresh.
    pub skip_auth: bool,
    /// Bypass the memoizer lookup (the fresh result is still stored).
    pub skip_cache: bool,
    /// Surface the first failure without scheduling retries.
    pub skip_retry: bool,
    /// Log final failures at debug level instead of warn.
    pub silent: bool,
    /// Overrides the configured transport timeout for this call.
    pub timeout: Option<Duration>,
    /// Overrides the retry key (defaults to the request path).
    pub retry_key: Option<String>,
    /// Extra headers; tracing and auth headers always win over these.
    pub headers: Headers,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }

    pub fn skip_cache(mut self) -> Self {
        self.skip_cache = true;
        self
    }

    pub fn skip_retry(mut self) -> Self {
        self.skip_retry = true;
        self
    }

    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retry_key(mut self, key: impl Into<String>) -> Self {
        self.retry_key = Some(key.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// A single logical call, built once and replayed as-is by retries and refreshes.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub params: Option<QueryParams>,
    pub body: Option<serde_json::Value>,
    pub retry_key: String,
    pub created_at: DateTime<Utc>,
    pub options: RequestOptions,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>, options: RequestOptions) -> Self {
        let path = path.into();
        let retry_key = options.retry_key.clone().unwrap_or_else(|| path.clone());
        Self {
            method,
            path,
            params: None,
            body: None,
            retry_key,
            created_at: Utc::now(),
            options,
        }
    }

    pub fn with_params(mut self, params: Option<QueryParams>) -> Self {
        self.params = params;
        self
    }

    pub fn with_body(mut self, body: Option<serde_json::Value>) -> Self {
        self.body = body;
        self
    }
}
