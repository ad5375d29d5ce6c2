//! Shared types for the chicane lobby.
//!
//! This crate defines the vocabulary every other chicane crate speaks:
//!
//! - **Identifiers** ([`ProfileId`], [`SessionId`]) — newtype-wrapped
//!   ids so the compiler keeps profiles and login sessions apart.
//! - **Table types** ([`Seat`], [`Side`], [`Strain`], [`Call`]) — the
//!   bridge vocabulary the auction resolver consumes.
//! - **Identity** ([`UserProfile`], [`StoredIdentity`], [`Role`]) —
//!   who is logged in and how that is persisted.
//! - **Errors** ([`ProtocolError`]) — what can go wrong converting any
//!   of the above to and from JSON.
//!
//! # Architecture
//!
//! This layer has no behavior beyond its types. It doesn't know about
//! the backing store or the session coordinator — it only pins down
//! the shapes they exchange.
//!
//! ```text
//! protocol (shapes) → remote (storage) → session (lifecycle) → chicane (facade)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod error;
mod identity;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

// `pub use` flattens the public API to the crate root, so callers write
// `use chicane_protocol::Seat` instead of reaching into submodules.

pub use error::ProtocolError;
pub use identity::{Role, StoredIdentity, UserProfile};
pub use types::{Call, ProfileId, Seat, SessionId, Side, Strain};
