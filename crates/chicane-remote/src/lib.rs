//! Backing-store abstraction for chicane.
//!
//! The lobby delegates session arbitration to a hosted backend: one
//! "session row" per profile, mutated only through a handful of remote
//! calls, plus a realtime change feed on that row. This crate defines
//! the [`SessionStore`] trait those calls live behind, and an
//! in-memory implementation ([`MemoryStore`]) with the full
//! arbitration semantics for tests and demos.
//!
//! # Why a trait?
//!
//! The session coordinator does not care whether the row lives in a
//! hosted realtime database or a `HashMap`. It cares that:
//! - acquisition is an atomic check-and-set (at most one `granted`
//!   session per profile at any instant), and
//! - row changes are pushed to subscribers.
//!
//! Any type providing those two guarantees can drive a lobby. The
//! in-memory store provides them with a single mutex; a networked
//! store provides them with the backend's own transactions.

mod error;
mod memory;

pub use error::StoreError;
pub use memory::{MemoryFeed, MemoryStore, ProfileRecord, StoreOp};

use std::time::Duration;

use tokio::time::Instant;

use chicane_protocol::{ProfileId, Role, SessionId};

// ---------------------------------------------------------------------------
// Reply types
// ---------------------------------------------------------------------------

/// Outcome of a `begin_session` arbitration call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginReply {
    /// The profile was free (or already ours): the session now holds it.
    Granted,
    /// Another session holds the profile. This request has been queued
    /// as the waiting login; the holder has until `deadline` to show
    /// activity before the waiter may take over.
    Wait { deadline: Instant },
}

/// Outcome of polling `resolve_login_attempt` while queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveReply {
    /// The waiter now holds the session (holder yielded, vanished, or
    /// ran out its warning deadline).
    Granted,
    /// The holder showed activity; the waiting login is rejected.
    Denied,
    /// Still queued; poll again.
    Wait,
}

/// Outcome of a `touch_session` heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchReply {
    /// The row still names this session; activity was recorded.
    Alive,
    /// The row names a different session: this one has been replaced
    /// and must log out locally.
    Replaced,
}

// ---------------------------------------------------------------------------
// Row snapshots and identity
// ---------------------------------------------------------------------------

/// One observed state of a profile's session row, as delivered by the
/// change feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// The session currently holding the profile, or `None` after the
    /// row was deleted by a clean logout.
    pub session_id: Option<SessionId>,
    /// A queued second login waiting to take over, if any.
    pub waiting_session_id: Option<SessionId>,
    /// The waiter's takeover deadline. The holder shows this to the
    /// user as a countdown; past it, the waiter may claim the row.
    pub warning_until: Option<Instant>,
}

impl SessionSnapshot {
    /// Whether the row names the given session as the current holder.
    pub fn is_held_by(&self, session: &SessionId) -> bool {
        self.session_id.as_ref() == Some(session)
    }

    /// Whether a second login is queued against this row.
    pub fn has_waiter(&self) -> bool {
        self.waiting_session_id.is_some()
    }
}

/// The authenticated identity as the backend reports it, independent
/// of any session row. Present when the auth layer has a user even
/// though no exclusive session was established in this context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteIdentity {
    pub profile_id: ProfileId,
    pub display_name: String,
    pub role: Role,
}

// ---------------------------------------------------------------------------
// Store traits
// ---------------------------------------------------------------------------

/// The remote operations the session coordinator is built on.
///
/// # Atomicity contract
///
/// `begin_session` and `resolve_login_attempt` are the only paths that
/// can transfer ownership of a profile's row, and the implementation
/// must serialize them: for a given profile, at most one session is
/// ever `Granted` at a time, even under concurrent calls. The client
/// side does no locking of its own — this contract is the whole
/// arbitration mechanism.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` because one store instance is shared (via
/// `Arc`) between the caller and spawned coordinator tasks. The
/// returned futures carry an explicit `Send` bound for the same
/// reason: they are awaited inside `tokio::spawn`.
pub trait SessionStore: Send + Sync + 'static {
    /// The change-feed handle produced by [`subscribe`](Self::subscribe).
    type Feed: SessionFeed;

    /// Asks for exclusive ownership of the profile's session row.
    ///
    /// Grants immediately if the row is free or already names this
    /// session. Otherwise queues this session as the waiting login
    /// with a takeover deadline `wait` from now, displacing any
    /// earlier waiter.
    fn begin_session(
        &self,
        profile: &ProfileId,
        session: &SessionId,
        wait: Duration,
    ) -> impl std::future::Future<Output = Result<BeginReply, StoreError>> + Send;

    /// Polls the fate of a queued login.
    ///
    /// Grants if the row already names `waiting`, if the row vanished,
    /// or if the queued entry's deadline has passed without holder
    /// activity. Denies if the queued entry is gone (the holder
    /// answered the takeover warning).
    fn resolve_login_attempt(
        &self,
        profile: &ProfileId,
        waiting: &SessionId,
    ) -> impl std::future::Future<Output = Result<ResolveReply, StoreError>> + Send;

    /// Heartbeat: records activity for the holding session.
    ///
    /// A successful touch also dismisses any queued waiting login —
    /// activity is how the holder declines a takeover.
    fn touch_session(
        &self,
        profile: &ProfileId,
        session: &SessionId,
    ) -> impl std::future::Future<Output = Result<TouchReply, StoreError>> + Send;

    /// Releases the session row.
    ///
    /// Called by the holder on logout (promoting any queued waiter),
    /// and by a queued waiter to withdraw its own pending login.
    /// Unknown session ids are a no-op.
    fn end_session(
        &self,
        profile: &ProfileId,
        session: &SessionId,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Best-effort logout cleanup unrelated to the session row
    /// (presence markers, open table seats, and the like).
    fn cleanup_logout(
        &self,
        profile: &ProfileId,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Signs the authenticated user out of the auth layer.
    fn sign_out(&self) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// The authenticated identity, if the auth layer has one.
    fn current_identity(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<RemoteIdentity>, StoreError>> + Send;

    /// Creates or attaches the profile record for an authenticated
    /// identity, without touching the session row.
    fn ensure_profile(
        &self,
        profile: &ProfileId,
        display_name: &str,
        role: Role,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Subscribes to changes of the profile's session row.
    ///
    /// Every accepted mutation of the row is pushed to subscribers as
    /// a [`SessionSnapshot`]. Delivery order matches mutation order,
    /// but a subscriber may observe a snapshot before or after the
    /// reply of the call that caused it — consumers must converge on
    /// row state, not on event timing.
    fn subscribe(
        &self,
        profile: &ProfileId,
    ) -> impl std::future::Future<Output = Result<Self::Feed, StoreError>> + Send;
}

/// A live subscription to one profile's session row.
pub trait SessionFeed: Send + 'static {
    /// Waits for the next row snapshot.
    ///
    /// Returns `None` when the feed is closed (store shut down or
    /// subscription torn down remotely); the consumer then runs
    /// without push updates and relies on heartbeats alone.
    fn next(&mut self) -> impl std::future::Future<Output = Option<SessionSnapshot>> + Send;
}

// =========================================================================
// Tests
// =========================================================================
