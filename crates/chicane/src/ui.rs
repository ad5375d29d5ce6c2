//! The user-facing seams the lobby drives: navigation and messages.
//!
//! The lobby never renders anything itself. It asks a [`Navigator`] to
//! move the user and a [`Translator`] to turn a stable [`MessageKey`]
//! into display text, so the same core runs under any front end.

use std::fmt;

use chicane_session::LogoutReason;

/// Stable catalog keys for the notices the lobby can show.
///
/// `Display` renders the catalog key itself (`"session_in_use"`), which
/// is what translators look up — and what shows on screen if a catalog
/// entry is missing, so gaps stay greppable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    /// Another device holds the profile and would not yield.
    SessionInUse,
    /// The session was taken over by a newer login.
    LoggedOutReplaced,
    /// The session expired after inactivity.
    LoggedOutInactive,
}

impl MessageKey {
    /// The notice to show after a logout, if any. A logout the user
    /// asked for needs no explanation.
    pub fn for_logout(reason: LogoutReason) -> Option<Self> {
        match reason {
            LogoutReason::Requested => None,
            LogoutReason::Replaced => Some(Self::LoggedOutReplaced),
            LogoutReason::Inactive => Some(Self::LoggedOutInactive),
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionInUse => write!(f, "session_in_use"),
            Self::LoggedOutReplaced => write!(f, "logged_out_replaced"),
            Self::LoggedOutInactive => write!(f, "logged_out_inactive"),
        }
    }
}

/// Where the lobby sends the user when a session ends.
pub trait Navigator: Send + Sync + 'static {
    /// Return to the entry screen, optionally with a notice to show.
    fn to_entry(&self, notice: Option<&str>);
}

/// Message catalog lookup.
pub trait Translator: Send + Sync + 'static {
    fn message(&self, key: MessageKey) -> String;
}

/// Fallback [`Translator`] that returns the raw catalog key.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyTranslator;

impl Translator for KeyTranslator {
    fn message(&self, key: MessageKey) -> String {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_keys_are_stable_catalog_strings() {
        assert_eq!(MessageKey::SessionInUse.to_string(), "session_in_use");
        assert_eq!(MessageKey::LoggedOutReplaced.to_string(), "logged_out_replaced");
        assert_eq!(MessageKey::LoggedOutInactive.to_string(), "logged_out_inactive");
    }

    #[test]
    fn test_requested_logout_shows_no_notice() {
        assert_eq!(MessageKey::for_logout(LogoutReason::Requested), None);
        assert_eq!(
            MessageKey::for_logout(LogoutReason::Replaced),
            Some(MessageKey::LoggedOutReplaced)
        );
        assert_eq!(
            MessageKey::for_logout(LogoutReason::Inactive),
            Some(MessageKey::LoggedOutInactive)
        );
    }

    #[test]
    fn test_key_translator_echoes_the_key() {
        assert_eq!(
            KeyTranslator.message(MessageKey::SessionInUse),
            "session_in_use"
        );
    }
}
