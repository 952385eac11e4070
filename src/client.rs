//! API client: request pipeline, retry scheduling and token refresh.
//!
//! The public surface is [`ApiClient`] and its builder; the pipeline stages live
//! in submodules under `src/client/`.

pub mod auth;
pub mod builder;
pub mod core;
mod error_classification;
mod execution;
pub mod retry;
pub mod tracer;

pub use auth::{AuthRefreshCoordinator, AuthState};
pub use builder::ApiClientBuilder;
pub use self::core::ApiClient;
pub use retry::{ChainGuard, Decision, RetryScheduler, RETRYABLE_STATUSES};
pub use tracer::{RequestTracer, TracedHeaders};
