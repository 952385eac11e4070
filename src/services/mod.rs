//! Service-layer consumers of [`ApiClient`](crate::client::ApiClient).

pub mod generation;

pub use generation::{ContentGenerator, GeneratedContent, GenerationRequest};
