//! # Chicane
//!
//! Core for a duplicate bridge club: contract auction resolution and
//! exclusive login sessions, with swappable storage and UI seams.
//!
//! Chicane enforces one rule above all: a profile has at most one live
//! session across all devices. Logging in elsewhere warns the current
//! holder, waits, and takes over if they stay silent. The lobby object
//! wires that rule to identity persistence and navigation; the auction
//! half is a pure library for scoring what the table bid.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chicane::prelude::*;
//!
//! // Pick a SessionStore (MemoryStore for tests, your backend in
//! // production), then:
//! // let lobby = Lobby::builder(store)
//! //     .vault(IdentityVault::in_memory())
//! //     .build(Arc::new(MyNavigator));
//! // lobby.init().await?;
//! // lobby.attempt_exclusive_login(profile, || {}).await?;
//! ```

mod error;
mod lobby;
mod ui;
mod vault;

pub use error::LobbyError;
pub use lobby::{InitOutcome, Lobby, LobbyBuilder};
pub use ui::{KeyTranslator, MessageKey, Navigator, Translator};
pub use vault::{IdentityVault, KeyValue, MemoryKv, IDENTITY_KEY};

pub use chicane_auction::{
    determine_contract, determine_declarer, resolve_auction, AuctionResult,
    Contract, Doubling,
};
pub use chicane_protocol::{
    Call, ProfileId, ProtocolError, Role, Seat, SessionId, Side, StoredIdentity,
    Strain, UserProfile,
};
pub use chicane_remote::{
    BeginReply, MemoryFeed, MemoryStore, ProfileRecord, RemoteIdentity,
    ResolveReply, SessionFeed, SessionSnapshot, SessionStore, StoreError,
    StoreOp, TouchReply,
};
pub use chicane_session::{
    acquire_session, spawn_coordinator, CoordinatorConfig, CoordinatorHandle,
    CoordinatorStatus, LoginConfig, LogoutReason, SessionError, SessionObserver,
    SessionWarning, WarningKind,
};

/// The types most embedders need, in one import.
pub mod prelude {
    pub use crate::{
        resolve_auction, AuctionResult, Call, Contract, CoordinatorConfig,
        IdentityVault, InitOutcome, KeyValue, Lobby, LobbyBuilder, LobbyError,
        LoginConfig, LogoutReason, MemoryKv, MemoryStore, MessageKey, Navigator,
        ProfileId, Role, Seat, SessionId, SessionObserver, SessionStore,
        SessionWarning, Side, StoredIdentity, Strain, Translator, UserProfile,
        WarningKind,
    };
}
