use super::backend::KeyValueStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

/// Storage key holding the serialized credential pair.
pub const CREDENTIALS_KEY: &str = "auth.credentials";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
    pub issued_at: DateTime<Utc>,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            issued_at: Utc::now(),
        }
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Durable home of the access/refresh token pair.
///
/// The in-memory copy is authoritative for the running session. Persistence is
/// best-effort: the first backend failure switches the store to in-memory-only
/// operation and no request ever fails because of it.
pub struct CredentialStore {
    backend: Arc<dyn KeyValueStore>,
    current: RwLock<Option<CredentialPair>>,
    degraded: AtomicBool,
    /// Serializes writers so memory and backend always hold the same pair.
    writes: tokio::sync::Mutex<()>,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            current: RwLock::new(None),
            degraded: AtomicBool::new(false),
            writes: tokio::sync::Mutex::new(()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<CredentialPair>> {
        self.current.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<CredentialPair>> {
        self.current.write().unwrap_or_else(|p| p.into_inner())
    }

    fn degrade(&self, op: &str, err: &crate::Error) {
        warn!(
            backend = self.backend.name(),
            operation = op,
            error = %err,
            "credential persistence failed; continuing in memory only"
        );
        self.degraded.store(true, Ordering::Relaxed);
    }

    pub fn is_persistence_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    /// Restore the persisted pair. Missing or corrupt data yields `None`.
    pub async fn load(&self) -> Option<CredentialPair> {
        if self.is_persistence_degraded() {
            return self.current();
        }

        let _writes = self.writes.lock().await;
        let raw = match self.backend.get(CREDENTIALS_KEY).await {
            Ok(raw) => raw,
            Err(e) => {
                self.degrade("load", &e);
                return self.current();
            }
        };

        let pair = raw.and_then(|raw| match serde_json::from_str::<CredentialPair>(&raw) {
            Ok(pair) => Some(pair),
            Err(e) => {
                warn!(error = %e, "discarding unreadable persisted credentials");
                None
            }
        });

        debug!(restored = pair.is_some(), "credentials loaded");
        *self.write() = pair.clone();
        pair
    }

    /// Replace the pair in memory, then persist it.
    pub async fn save(
        &self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> CredentialPair {
        let pair = CredentialPair::new(access_token, refresh_token);
        let _writes = self.writes.lock().await;
        *self.write() = Some(pair.clone());

        if !self.is_persistence_degraded() {
            match serde_json::to_string(&pair) {
                Ok(raw) => {
                    if let Err(e) = self.backend.set(CREDENTIALS_KEY, &raw).await {
                        self.degrade("save", &e);
                    }
                }
                Err(e) => self.degrade("save", &crate::Error::Serialization(e)),
            }
        }
        pair
    }

    /// Forget the pair everywhere (logout, failed refresh).
    pub async fn clear(&self) {
        let _writes = self.writes.lock().await;
        *self.write() = None;
        // Attempted even when degraded so a stale pair is not restored next launch.
        if let Err(e) = self.backend.remove(CREDENTIALS_KEY).await {
            self.degrade("clear", &e);
        }
    }

    pub fn current(&self) -> Option<CredentialPair> {
        self.read().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().as_ref().map(|p| p.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read()
            .as_ref()
            .map(|p| p.refresh_token.clone())
            .filter(|t| !t.is_empty())
    }
}
