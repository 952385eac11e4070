//! Persisted credential storage.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CredentialStore`] | In-memory pair with best-effort persistence |
//! | [`KeyValueStore`] | Trait for persistence backends |
//! | [`MemoryKeyValueStore`] | Ephemeral backend |
//! | [`KeyringStore`] | OS keychain backend |

mod backend;
mod store;

pub use backend::{KeyValueStore, KeyringStore, MemoryKeyValueStore};
pub use store::{CredentialPair, CredentialStore, CREDENTIALS_KEY};
