//! Response memoization for expensive service-layer operations.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ResponseMemoizer`] | TTL-keyed memoizer with lazy invalidation and statistics |
//! | [`MemoizerConfig`] | TTL (default 5 minutes) and on/off switch |
//! | [`CacheBackend`] | Trait for storage backends |
//! | [`MemoryCache`] | In-process map backend |
//! | [`NullCache`] | No-op backend |
//! | [`CacheKey`] | Operation name + canonical parameters |
//!
//! ## Example
//!
//! ```rust
//! use api_client_core::cache::ResponseMemoizer;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let memo = ResponseMemoizer::in_memory(Duration::from_secs(300));
//! let key = memo.key("generate", &serde_json::json!({"prompt": "hi"}));
//! memo.set(&key, &"hello").await.unwrap();
//! assert_eq!(memo.get::<String>(&key).await.as_deref(), Some("hello"));
//! # }
//! ```

mod backend;
mod key;
mod memoizer;

pub use backend::{CacheBackend, CacheEntry, MemoryCache, NullCache};
pub use key::{canonical_json, CacheKey};
pub use memoizer::{CacheStats, MemoizerConfig, ResponseMemoizer};
