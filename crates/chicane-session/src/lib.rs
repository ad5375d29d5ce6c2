//! Exclusive session lifecycle for chicane.
//!
//! A profile may hold at most one live session across all devices. This
//! crate implements both halves of that rule:
//!
//! 1. **Acquisition** — [`acquire_session`] runs the login side: ask the
//!    store for the row, and if another device holds it, poll until the
//!    takeover deadline passes, the holder yields, or the budget runs out.
//! 2. **Custody** — [`spawn_coordinator`] runs the holding side: a
//!    background task that heartbeats the row, watches the change feed
//!    for takeover attempts, warns the user before idle logout, and
//!    tears the session down when it ends for any reason.
//!
//! # How it fits in the stack
//!
//! ```text
//! chicane (above)      ← facade: wires stores, vault, and navigation together
//!     ↕
//! Session Layer (this crate)  ← owns WHEN a session starts, stays alive, ends
//!     ↕
//! chicane-remote (below)      ← owns HOW the row is read and written
//! ```
//!
//! The coordinator is an actor: callers keep a cheap [`CoordinatorHandle`]
//! and everything else happens on one task, so there is exactly one place
//! where timers, feed pushes, and user activity meet.

mod config;
mod coordinator;
mod error;
mod login;

pub use config::{CoordinatorConfig, LoginConfig};
pub use coordinator::{
    spawn_coordinator, CoordinatorHandle, CoordinatorStatus, LogoutReason,
    SessionObserver, SessionWarning, WarningKind,
};
pub use error::SessionError;
pub use login::acquire_session;
