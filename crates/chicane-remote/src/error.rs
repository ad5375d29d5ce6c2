//! Error types for the backing-store layer.

/// Errors that can occur talking to the backing store.
///
/// The in-memory store never fails, but the trait exists precisely so
/// a networked implementation can slot in behind it — and networked
/// calls fail. Callers decide per call site whether a failure is fatal
/// (acquisition) or survivable (heartbeat, logout cleanup).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A remote call failed: network error, backend outage, rejected
    /// request. `op` names the call so a log line is useful on its own.
    #[error("remote call {op} failed: {reason}")]
    Call { op: &'static str, reason: String },

    /// The session-row change feed could not be established or was
    /// lost. Coordinators fall back to heartbeat-only replacement
    /// detection when they see this.
    #[error("session row feed lost")]
    FeedLost,
}

impl StoreError {
    /// Shorthand for a failed call.
    pub fn call(op: &'static str, reason: impl Into<String>) -> Self {
        StoreError::Call {
            op,
            reason: reason.into(),
        }
    }
}
