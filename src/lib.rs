//! # api-client-core
//!
//! Networking core of the mobile app: one auth-aware API client shared by every
//! service, plus a response memoizer for expensive service-layer calls.
//!
//! ## Request pipeline
//!
//! ```text
//! caller → RequestTracer (ids, timestamp, Bearer token) → Transport
//!        → 2xx: Envelope
//!        → 401: AuthRefreshCoordinator → refresh exchange → replay once
//!        → 408/429/5xx, network: RetryScheduler → backoff → redispatch
//!        → other 4xx: surfaced as-is
//! ```
//!
//! ## Key Features
//!
//! - **Uniform results**: every call returns an [`Envelope`]
//! - **Transparent 401 recovery**: refresh-and-replay, credentials cleared on failure
//! - **Retry/backoff**: exponential, per-endpoint attempt budgets
//! - **Credential persistence**: pluggable [`credentials::KeyValueStore`] (memory, OS keyring)
//! - **Memoization**: [`cache::ResponseMemoizer`] with lazy TTL invalidation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use api_client_core::{ApiClient, RequestOptions};
//!
//! #[tokio::main]
//! async fn main() -> api_client_core::Result<()> {
//!     let client = ApiClient::builder()
//!         .base_url("https://api.example.com/v1")
//!         .build()
//!         .await?;
//!
//!     client.login("access-token", "refresh-token").await;
//!     let profile = client.get::<serde_json::Value>("/profile", None, None).await?;
//!     println!("{:?}", profile.data);
//!
//!     let _ = client
//!         .get::<serde_json::Value>("/status", None, Some(RequestOptions::new().skip_auth()))
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | `ApiClient`, builder, tracer, retry scheduler, auth refresh |
//! | [`transport`] | `Transport` trait, `reqwest` and mock implementations |
//! | [`credentials`] | Credential pair persistence |
//! | [`cache`] | Response memoizer and backends |
//! | [`services`] | Service-layer consumers (content generation) |
//! | [`types`] | Envelope, request descriptor, options |
//! | [`config`] | Client configuration |

pub mod cache;
pub mod client;
pub mod config;
pub mod credentials;
pub mod services;
pub mod transport;
pub mod types;

pub use client::{ApiClient, ApiClientBuilder, AuthState};
pub use config::ClientConfig;
pub use credentials::{CredentialPair, CredentialStore};
pub use types::{Envelope, Method, QueryParams, RequestDescriptor, RequestOptions};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

pub mod error;
pub use error::{Error, ErrorContext};
