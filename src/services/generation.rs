use crate::cache::ResponseMemoizer;
use crate::client::ApiClient;
use crate::types::{Envelope, RequestOptions};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const GENERATE_ENDPOINT: &str = "/ai/generate";
pub const GENERATE_OPERATION: &str = "generate";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            content_type: None,
            tone: None,
            max_length: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = Some(tone.into());
        self
    }

    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub content: String,
    /// Whatever else the backend attaches (suggestions, model, usage...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Content generation over the shared client, memoized per identical request.
pub struct ContentGenerator {
    client: Arc<ApiClient>,
    memoizer: ResponseMemoizer,
}

impl ContentGenerator {
    /// In-memory memoizer with the default five minute TTL.
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self::with_memoizer(client, ResponseMemoizer::in_memory(Duration::from_secs(5 * 60)))
    }

    pub fn with_memoizer(client: Arc<ApiClient>, memoizer: ResponseMemoizer) -> Self {
        Self { client, memoizer }
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
        options: Option<RequestOptions>,
    ) -> Result<Envelope<GeneratedContent>> {
        let params = serde_json::to_value(request)?;
        let options = options.unwrap_or_default();
        let skip_cache = options.skip_cache;

        self.memoizer
            .memoize(GENERATE_OPERATION, &params, skip_cache, || {
                self.client
                    .post(GENERATE_ENDPOINT, Some(params.clone()), Some(options))
            })
            .await
    }

    pub fn memoizer(&self) -> &ResponseMemoizer {
        &self.memoizer
    }
}
