//! Unified error type for the chicane facade.

use chicane_protocol::ProtocolError;
use chicane_remote::StoreError;
use chicane_session::SessionError;

use crate::MessageKey;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `chicane` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// A session-level error (denied, timed out, cancelled).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A backing-store error (remote call failed, feed lost).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A protocol-level error (identity encode/decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl LobbyError {
    /// The user-facing notice for this error, when one exists.
    ///
    /// Only outcomes the user can act on have catalog entries; plumbing
    /// failures surface through logs instead.
    pub fn message_key(&self) -> Option<MessageKey> {
        match self {
            Self::Session(SessionError::Denied | SessionError::Timeout) => {
                Some(MessageKey::SessionInUse)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_session_error() {
        let err: LobbyError = SessionError::Denied.into();
        assert!(matches!(err, LobbyError::Session(_)));
        assert!(err.to_string().contains("did not yield"));
    }

    #[test]
    fn test_from_store_error() {
        let err: LobbyError = StoreError::call("begin", "socket closed").into();
        assert!(matches!(err, LobbyError::Store(_)));
        assert!(err.to_string().contains("socket closed"));
    }

    #[test]
    fn test_contested_outcomes_map_to_session_in_use() {
        let denied: LobbyError = SessionError::Denied.into();
        let timeout: LobbyError = SessionError::Timeout.into();
        assert_eq!(denied.message_key(), Some(MessageKey::SessionInUse));
        assert_eq!(timeout.message_key(), Some(MessageKey::SessionInUse));
    }

    #[test]
    fn test_plumbing_failures_have_no_notice() {
        let err: LobbyError = StoreError::FeedLost.into();
        assert_eq!(err.message_key(), None);
        let cancelled: LobbyError = SessionError::Cancelled.into();
        assert_eq!(cancelled.message_key(), None);
    }
}
