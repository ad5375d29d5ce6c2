//! Identity persistence across two key-value stores.
//!
//! The lobby writes the logged-in identity to BOTH a durable store
//! (survives restarts) and a scoped store (lives for one run). Reads
//! prefer the scoped copy. Writing twice sounds redundant, but the two
//! stores fail independently: a crashed run loses the scoped copy and
//! resumes from the durable one, while a cleared durable store (user
//! wiped their data) still leaves the current run logged in.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use chicane_protocol::{ProtocolError, StoredIdentity};

/// The key the serialized identity lives under, in both stores.
pub const IDENTITY_KEY: &str = "chicane.identity";

/// Minimal synchronous key-value surface.
///
/// Implementations wrap whatever the platform offers — browser
/// storage, a settings file, a keychain. Operations are infallible by
/// contract: a backend that can fail should log and degrade, because
/// identity persistence is never worth failing a login over.
pub trait KeyValue: Send + Sync + 'static {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// HashMap-backed [`KeyValue`] for tests and demos.
#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValue for MemoryKv {
    fn get(&self, key: &str) -> Option<String> {
        self.locked().get(key).cloned()
    }

    fn put(&self, key: &str, value: &str) {
        self.locked().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.locked().remove(key);
    }
}

// ---------------------------------------------------------------------------
// IdentityVault
// ---------------------------------------------------------------------------

/// The two-store identity vault.
pub struct IdentityVault {
    durable: Arc<dyn KeyValue>,
    scoped: Arc<dyn KeyValue>,
}

impl IdentityVault {
    pub fn new(durable: Arc<dyn KeyValue>, scoped: Arc<dyn KeyValue>) -> Self {
        Self { durable, scoped }
    }

    /// Vault over two fresh in-memory stores.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKv::new()), Arc::new(MemoryKv::new()))
    }

    /// Serialize once, write to both stores.
    pub fn store(&self, identity: &StoredIdentity) -> Result<(), ProtocolError> {
        let encoded = identity.to_json()?;
        self.durable.put(IDENTITY_KEY, &encoded);
        self.scoped.put(IDENTITY_KEY, &encoded);
        debug!(profile = %identity.profile_id, "identity stored");
        Ok(())
    }

    /// The stored identity, scoped store first. An unreadable entry is
    /// treated as absent — stale identities must never block a fresh
    /// login — so decode failures are logged and skipped.
    pub fn load(&self) -> Option<StoredIdentity> {
        for (name, store) in [("scoped", &self.scoped), ("durable", &self.durable)] {
            if let Some(raw) = store.get(IDENTITY_KEY) {
                match StoredIdentity::from_json(&raw) {
                    Ok(identity) => return Some(identity),
                    Err(err) => {
                        warn!(store = name, %err, "stored identity unreadable; ignoring");
                    }
                }
            }
        }
        None
    }

    /// Remove the identity from both stores.
    pub fn clear(&self) {
        self.durable.remove(IDENTITY_KEY);
        self.scoped.remove(IDENTITY_KEY);
        debug!("identity cleared");
    }
}

// =========================================================================
// Tests
// =========================================================================
