//! Error types for the session layer.

use chicane_remote::StoreError;

/// Errors that can occur while acquiring or holding a session.
///
/// These cover the full lifecycle: the login handshake, the background
/// coordinator, and the handle callers keep to talk to it.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The backing store failed mid-call. Transparent so callers see
    /// the store's own message ("remote call begin failed: ...").
    #[error(transparent)]
    Remote(#[from] StoreError),

    /// Another device holds the profile and answered the takeover
    /// warning, so the login loses.
    #[error("another session holds this profile and did not yield")]
    Denied,

    /// The wait budget ran out before the store granted or denied.
    #[error("timed out waiting for the session to become available")]
    Timeout,

    /// The caller aborted the login attempt (navigated away, quit).
    #[error("login attempt was cancelled")]
    Cancelled,

    /// The coordinator task is not running — either it never started
    /// or it already tore the session down.
    #[error("session coordinator is not running")]
    Unavailable,
}
