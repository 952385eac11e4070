//! Uniform response wrapper returned by every client call.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default = "now_timestamp")]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
}

pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl<T> Envelope<T> {
    /// Wrap a raw payload as a successful envelope stamped with the current time.
    pub fn success(data: T) -> Self {
        Self {
            data,
            success: true,
            message: None,
            timestamp: now_timestamp(),
            cached: None,
        }
    }

    pub fn is_cached(&self) -> bool {
        self.cached.unwrap_or(false)
    }

    pub fn mark_cached(mut self) -> Self {
        self.cached = Some(true);
        self
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            data: f(self.data),
            success: self.success,
            message: self.message,
            timestamp: self.timestamp,
            cached: self.cached,
        }
    }

    pub fn into_data(self) -> T {
        self.data
    }
}

impl Envelope<serde_json::Value> {
    /// Decode a 2xx body.
    ///
    /// Bodies that are already envelopes (`success` + `data`) are taken as-is,
    /// anything else becomes the `data` of a fresh successful envelope.
    pub fn from_body(body: &[u8]) -> Self {
        let json: serde_json::Value = if body.is_empty() {
            serde_json::Value::Null
        } else {
            match serde_json::from_slice(body) {
                Ok(v) => v,
                Err(_) => serde_json::Value::String(String::from_utf8_lossy(body).into_owned()),
            }
        };

        let is_envelope = json
            .as_object()
            .map(|o| o.contains_key("success") && o.contains_key("data"))
            .unwrap_or(false);
        if is_envelope {
            if let Ok(env) = serde_json::from_value::<Envelope<serde_json::Value>>(json.clone()) {
                return env;
            }
        }
        Envelope::success(json)
    }

    pub(crate) fn decode<T: serde::de::DeserializeOwned>(self) -> crate::Result<Envelope<T>> {
        let Envelope {
            data,
            success,
            message,
            timestamp,
            cached,
        } = self;
        Ok(Envelope {
            data: serde_json::from_value(data)?,
            success,
            message,
            timestamp,
            cached,
        })
    }
}
