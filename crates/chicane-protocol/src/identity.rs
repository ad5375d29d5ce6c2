//! User identity: who is logged in, and how that fact is persisted.
//!
//! The lobby persists the logged-in identity across page reloads and
//! app restarts by writing a JSON blob into key-value storage. This
//! module owns that blob's exact shape, so the storage format lives in
//! one place instead of being implied by whatever happened to call
//! `serde_json` last.

use serde::{Deserialize, Serialize};

use std::fmt;

use crate::error::ProtocolError;
use crate::types::{ProfileId, SessionId};

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// What a profile is allowed to do in the club.
///
/// `#[serde(rename_all = "lowercase")]` stores these as `"player"`,
/// `"director"`, `"admin"` — the spelling the profile rows use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// An ordinary club member: plays at tables.
    Player,
    /// Runs events: can adjust tables and results.
    Director,
    /// Full administrative access.
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Player => "player",
            Role::Director => "director",
            Role::Admin => "admin",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// A player profile as the lobby sees it after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// The profile row's primary key.
    pub profile_id: ProfileId,
    /// The login name.
    pub username: String,
    /// The name shown at the table.
    pub display_name: String,
    /// What this profile may do.
    pub role: Role,
}

// ---------------------------------------------------------------------------
// StoredIdentity — the persisted login blob
// ---------------------------------------------------------------------------

/// The identity blob written to key-value storage after login.
///
/// This is a [`UserProfile`] plus the [`SessionId`] that was granted
/// for it. Persisting the session id is what lets a reload resume the
/// same exclusive session instead of fighting itself for the lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredIdentity {
    pub profile_id: ProfileId,
    pub username: String,
    pub display_name: String,
    pub role: Role,
    pub session_id: SessionId,
}

impl StoredIdentity {
    /// Combines a profile with its granted session id.
    pub fn new(profile: UserProfile, session_id: SessionId) -> Self {
        Self {
            profile_id: profile.profile_id,
            username: profile.username,
            display_name: profile.display_name,
            role: profile.role,
            session_id,
        }
    }

    /// The profile portion, without the session id.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            profile_id: self.profile_id.clone(),
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            role: self.role,
        }
    }

    /// Serializes the identity for key-value storage.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    /// Parses an identity back out of storage.
    ///
    /// Callers treat a decode failure as "nothing stored": a stale or
    /// corrupt blob must never wedge the lobby in a half-logged-in
    /// state, so the error carries detail for the log and nothing else.
    pub fn from_json(raw: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(raw).map_err(ProtocolError::Decode)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_profile() -> UserProfile {
        UserProfile {
            profile_id: ProfileId::new("p-1"),
            username: "ada".into(),
            display_name: "Ada L.".into(),
            role: Role::Player,
        }
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Player).unwrap(), "\"player\"");
        assert_eq!(serde_json::to_string(&Role::Director).unwrap(), "\"director\"");
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }

    #[test]
    fn test_role_display_matches_stored_form() {
        assert_eq!(Role::Director.to_string(), "director");
    }

    #[test]
    fn test_stored_identity_round_trips_through_json() {
        let identity =
            StoredIdentity::new(sample_profile(), SessionId::new("s-abc"));
        let raw = identity.to_json().unwrap();
        let decoded = StoredIdentity::from_json(&raw).unwrap();
        assert_eq!(identity, decoded);
    }

    #[test]
    fn test_stored_identity_json_field_names() {
        // The blob's field names are the storage contract; renaming a
        // struct field would silently orphan every persisted login.
        let identity =
            StoredIdentity::new(sample_profile(), SessionId::new("s-abc"));
        let json: serde_json::Value =
            serde_json::to_value(&identity).unwrap();

        assert_eq!(json["profile_id"], "p-1");
        assert_eq!(json["username"], "ada");
        assert_eq!(json["display_name"], "Ada L.");
        assert_eq!(json["role"], "player");
        assert_eq!(json["session_id"], "s-abc");
    }

    #[test]
    fn test_stored_identity_profile_accessor_drops_session() {
        let profile = sample_profile();
        let identity =
            StoredIdentity::new(profile.clone(), SessionId::generate());
        assert_eq!(identity.profile(), profile);
    }

    #[test]
    fn test_from_json_garbage_returns_decode_error() {
        let result = StoredIdentity::from_json("not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_from_json_wrong_shape_returns_decode_error() {
        // Valid JSON, wrong fields.
        let result = StoredIdentity::from_json(r#"{"name": "ada"}"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
