//! In-memory backing store with the full arbitration semantics.
//!
//! This is the reference [`SessionStore`]: every rule a hosted backend
//! must enforce about session rows is implemented here against a
//! `HashMap`, so the session coordinator can be tested end to end with
//! deterministic (paused) time and no network.
//!
//! # Concurrency note
//!
//! All state sits behind one `std::sync::Mutex`, and every operation
//! runs start to finish under a single lock acquisition. That single
//! acquisition IS the atomic check-and-set the arbitration contract
//! requires: two concurrent `begin_session` calls for one profile are
//! serialized by the mutex, so exactly one of them finds the row free.
//! No lock is ever held across an `.await`.
//!
//! # Row lifecycle
//!
//! ```text
//! begin(a) ──→ [held by a] ──begin(b)──→ [held by a, b waiting]
//!                  │                          │            │
//!              end(a)                     touch(a)     resolve(b)
//!                  │                          │       (past deadline)
//!                  ▼                          ▼            ▼
//!              [no row]                  [held by a]  [held by b]
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;

use chicane_protocol::{ProfileId, Role, SessionId};

use crate::{
    BeginReply, RemoteIdentity, ResolveReply, SessionFeed, SessionSnapshot,
    SessionStore, StoreError, TouchReply,
};

/// Snapshots buffered per subscriber before old ones are dropped.
const FEED_BUFFER: usize = 16;

// ---------------------------------------------------------------------------
// Row state
// ---------------------------------------------------------------------------

/// A queued second login waiting to take a row over.
#[derive(Debug, Clone)]
struct WaitingLogin {
    session_id: SessionId,
    /// Past this instant the waiter may promote itself.
    deadline: Instant,
}

/// One profile's session row.
#[derive(Debug, Clone)]
struct SessionRow {
    /// The session currently holding the profile.
    session_id: SessionId,
    /// Last recorded activity. Kept for operator introspection; the
    /// takeover decision runs off `waiting.deadline`, not this.
    last_touch: Instant,
    waiting: Option<WaitingLogin>,
}

/// A profile record attached by `ensure_profile`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    pub display_name: String,
    pub role: Role,
}

/// One entry in the store's operation journal.
///
/// The journal records every mutating call in arrival order. Tests use
/// it to assert call sequences ("cleanup before end", "exactly one
/// touch inside the throttle window") without instrumenting callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Begin { profile: ProfileId, session: SessionId },
    Resolve { profile: ProfileId, session: SessionId },
    Touch { profile: ProfileId, session: SessionId },
    End { profile: ProfileId, session: SessionId },
    Cleanup { profile: ProfileId },
    SignOut,
    EnsureProfile { profile: ProfileId },
}

struct StoreInner {
    rows: HashMap<ProfileId, SessionRow>,
    profiles: HashMap<ProfileId, ProfileRecord>,
    feeds: HashMap<ProfileId, broadcast::Sender<SessionSnapshot>>,
    identity: Option<RemoteIdentity>,
    journal: Vec<StoreOp>,
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory [`SessionStore`] for tests and demos.
///
/// Cheap to share: callers wrap it in an `Arc` and hand clones to as
/// many lobbies as the scenario needs — that is exactly how "two
/// devices fighting over one profile" is simulated.
pub struct MemoryStore {
    inner: Mutex<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                rows: HashMap::new(),
                profiles: HashMap::new(),
                feeds: HashMap::new(),
                identity: None,
                journal: Vec::new(),
            }),
        }
    }

    /// Pretends the auth layer has a signed-in user. Demo/test hook
    /// for the "remote identity without a local session" init path.
    pub fn set_current_identity(&self, identity: RemoteIdentity) {
        self.locked().identity = Some(identity);
    }

    /// The session currently holding the profile's row, if any.
    pub fn holder(&self, profile: &ProfileId) -> Option<SessionId> {
        self.locked()
            .rows
            .get(profile)
            .map(|row| row.session_id.clone())
    }

    /// The queued waiting login on the profile's row, if any.
    pub fn waiting_login(&self, profile: &ProfileId) -> Option<SessionId> {
        self.locked()
            .rows
            .get(profile)
            .and_then(|row| row.waiting.as_ref())
            .map(|w| w.session_id.clone())
    }

    /// The attached profile record, if `ensure_profile` ran.
    pub fn profile_record(&self, profile: &ProfileId) -> Option<ProfileRecord> {
        self.locked().profiles.get(profile).cloned()
    }

    /// Every mutating call so far, in arrival order.
    pub fn journal(&self) -> Vec<StoreOp> {
        self.locked().journal.clone()
    }

    /// A poisoned mutex only means another test thread panicked while
    /// holding it; the data is still usable, so recover the guard.
    fn locked(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pushes the row's current state to subscribers, if any.
    fn publish(inner: &mut StoreInner, profile: &ProfileId) {
        let snapshot = match inner.rows.get(profile) {
            Some(row) => SessionSnapshot {
                session_id: Some(row.session_id.clone()),
                waiting_session_id: row
                    .waiting
                    .as_ref()
                    .map(|w| w.session_id.clone()),
                warning_until: row.waiting.as_ref().map(|w| w.deadline),
            },
            None => SessionSnapshot {
                session_id: None,
                waiting_session_id: None,
                warning_until: None,
            },
        };
        if let Some(tx) = inner.feeds.get(profile) {
            // A send only fails with no live subscribers; that's fine.
            let _ = tx.send(snapshot);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemoryStore {
    type Feed = MemoryFeed;

    async fn begin_session(
        &self,
        profile: &ProfileId,
        session: &SessionId,
        wait: Duration,
    ) -> Result<BeginReply, StoreError> {
        let mut inner = self.locked();
        inner.journal.push(StoreOp::Begin {
            profile: profile.clone(),
            session: session.clone(),
        });
        let now = Instant::now();

        let reply = if let Some(row) = inner.rows.get_mut(profile) {
            if row.session_id == *session {
                // Same session asking again (reload, retry): refresh
                // instead of queueing it against itself.
                row.last_touch = now;
                row.waiting = None;
                tracing::debug!(
                    profile = %profile,
                    session = %session,
                    "begin from current holder; refreshed"
                );
                BeginReply::Granted
            } else {
                let deadline = now + wait;
                row.waiting = Some(WaitingLogin {
                    session_id: session.clone(),
                    deadline,
                });
                tracing::info!(
                    profile = %profile,
                    holder = %row.session_id,
                    waiter = %session,
                    "profile held; login queued for takeover"
                );
                BeginReply::Wait { deadline }
            }
        } else {
            inner.rows.insert(
                profile.clone(),
                SessionRow {
                    session_id: session.clone(),
                    last_touch: now,
                    waiting: None,
                },
            );
            tracing::info!(profile = %profile, session = %session, "session granted");
            BeginReply::Granted
        };

        Self::publish(&mut inner, profile);
        Ok(reply)
    }

    async fn resolve_login_attempt(
        &self,
        profile: &ProfileId,
        waiting: &SessionId,
    ) -> Result<ResolveReply, StoreError> {
        let mut inner = self.locked();
        inner.journal.push(StoreOp::Resolve {
            profile: profile.clone(),
            session: waiting.clone(),
        });
        let now = Instant::now();

        let (reply, changed) = if let Some(row) = inner.rows.get_mut(profile) {
            if row.session_id == *waiting {
                // Already promoted (holder logged out between polls).
                (ResolveReply::Granted, false)
            } else if let Some(w) = &row.waiting {
                let ours = w.session_id == *waiting;
                let expired = now >= w.deadline;
                if !ours {
                    // Displaced by an even newer login attempt.
                    (ResolveReply::Denied, false)
                } else if expired {
                    tracing::info!(
                        profile = %profile,
                        replaced = %row.session_id,
                        session = %waiting,
                        "takeover deadline passed; waiter promoted"
                    );
                    row.session_id = waiting.clone();
                    row.last_touch = now;
                    row.waiting = None;
                    (ResolveReply::Granted, true)
                } else {
                    (ResolveReply::Wait, false)
                }
            } else {
                // The holder answered the warning; our queue entry is gone.
                (ResolveReply::Denied, false)
            }
        } else {
            // The holder vanished without promoting anyone: claim the row.
            inner.rows.insert(
                profile.clone(),
                SessionRow {
                    session_id: waiting.clone(),
                    last_touch: now,
                    waiting: None,
                },
            );
            tracing::info!(profile = %profile, session = %waiting, "row vacated; waiter claims it");
            (ResolveReply::Granted, true)
        };

        if changed {
            Self::publish(&mut inner, profile);
        }
        Ok(reply)
    }

    async fn touch_session(
        &self,
        profile: &ProfileId,
        session: &SessionId,
    ) -> Result<TouchReply, StoreError> {
        let mut inner = self.locked();
        inner.journal.push(StoreOp::Touch {
            profile: profile.clone(),
            session: session.clone(),
        });
        let now = Instant::now();

        let reply = match inner.rows.get_mut(profile) {
            Some(row) if row.session_id == *session => {
                row.last_touch = now;
                if row.waiting.take().is_some() {
                    tracing::info!(
                        profile = %profile,
                        session = %session,
                        "holder active; queued takeover dismissed"
                    );
                }
                TouchReply::Alive
            }
            _ => {
                tracing::debug!(
                    profile = %profile,
                    session = %session,
                    "touch from a session that no longer holds the row"
                );
                TouchReply::Replaced
            }
        };

        if reply == TouchReply::Alive {
            Self::publish(&mut inner, profile);
        }
        Ok(reply)
    }

    async fn end_session(
        &self,
        profile: &ProfileId,
        session: &SessionId,
    ) -> Result<(), StoreError> {
        let mut inner = self.locked();
        inner.journal.push(StoreOp::End {
            profile: profile.clone(),
            session: session.clone(),
        });
        let now = Instant::now();

        let mut remove = false;
        let mut changed = false;
        if let Some(row) = inner.rows.get_mut(profile) {
            if row.session_id == *session {
                if let Some(w) = row.waiting.take() {
                    tracing::info!(
                        profile = %profile,
                        ended = %session,
                        promoted = %w.session_id,
                        "session ended; waiter promoted"
                    );
                    row.session_id = w.session_id;
                    row.last_touch = now;
                } else {
                    remove = true;
                }
                changed = true;
            } else if row
                .waiting
                .as_ref()
                .is_some_and(|w| w.session_id == *session)
            {
                // A queued waiter giving up (denied, timed out, or
                // cancelled) withdraws with the same call.
                row.waiting = None;
                tracing::info!(profile = %profile, session = %session, "waiting login withdrawn");
                changed = true;
            }
            // Anything else is a stale end for a session that owns
            // nothing anymore: a no-op.
        }

        if remove {
            inner.rows.remove(profile);
            tracing::info!(profile = %profile, session = %session, "session ended; row cleared");
        }
        if changed {
            Self::publish(&mut inner, profile);
        }
        Ok(())
    }

    async fn cleanup_logout(&self, profile: &ProfileId) -> Result<(), StoreError> {
        let mut inner = self.locked();
        inner.journal.push(StoreOp::Cleanup {
            profile: profile.clone(),
        });
        tracing::debug!(profile = %profile, "logout cleanup");
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), StoreError> {
        let mut inner = self.locked();
        inner.journal.push(StoreOp::SignOut);
        inner.identity = None;
        tracing::debug!("signed out of auth layer");
        Ok(())
    }

    async fn current_identity(&self) -> Result<Option<RemoteIdentity>, StoreError> {
        Ok(self.locked().identity.clone())
    }

    async fn ensure_profile(
        &self,
        profile: &ProfileId,
        display_name: &str,
        role: Role,
    ) -> Result<(), StoreError> {
        let mut inner = self.locked();
        inner.journal.push(StoreOp::EnsureProfile {
            profile: profile.clone(),
        });
        inner
            .profiles
            .entry(profile.clone())
            .or_insert_with(|| ProfileRecord {
                display_name: display_name.to_string(),
                role,
            });
        tracing::debug!(profile = %profile, "profile record ensured");
        Ok(())
    }

    async fn subscribe(&self, profile: &ProfileId) -> Result<MemoryFeed, StoreError> {
        let mut inner = self.locked();
        let tx = inner
            .feeds
            .entry(profile.clone())
            .or_insert_with(|| broadcast::channel(FEED_BUFFER).0);
        Ok(MemoryFeed { rx: tx.subscribe() })
    }
}

// ---------------------------------------------------------------------------
// MemoryFeed
// ---------------------------------------------------------------------------

/// Change feed over a broadcast channel.
pub struct MemoryFeed {
    rx: broadcast::Receiver<SessionSnapshot>,
}

impl SessionFeed for MemoryFeed {
    async fn next(&mut self) -> Option<SessionSnapshot> {
        loop {
            match self.rx.recv().await {
                Ok(snapshot) => return Some(snapshot),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Missed snapshots are survivable: the next one
                    // carries the full row state, not a delta.
                    tracing::warn!(skipped, "session feed lagged; catching up");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Store-semantics tests. Time-dependent cases run under paused
    //! Tokio time so deadlines can be crossed instantly with
    //! `tokio::time::advance`.

    use super::*;

    fn profile() -> ProfileId {
        ProfileId::new("p-1")
    }

    fn sid(raw: &str) -> SessionId {
        SessionId::new(raw)
    }

    const WAIT: Duration = Duration::from_secs(60);

    // =====================================================================
    // begin_session
    // =====================================================================

    #[tokio::test]
    async fn test_begin_free_profile_grants() {
        let store = MemoryStore::new();
        let reply = store.begin_session(&profile(), &sid("a"), WAIT).await.unwrap();
        assert_eq!(reply, BeginReply::Granted);
        assert_eq!(store.holder(&profile()), Some(sid("a")));
        assert_eq!(store.waiting_login(&profile()), None);
    }

    #[tokio::test]
    async fn test_begin_same_session_is_idempotent() {
        let store = MemoryStore::new();
        store.begin_session(&profile(), &sid("a"), WAIT).await.unwrap();
        let reply = store.begin_session(&profile(), &sid("a"), WAIT).await.unwrap();
        assert_eq!(reply, BeginReply::Granted);
        assert_eq!(store.holder(&profile()), Some(sid("a")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_begin_held_profile_queues_waiter_with_deadline() {
        let store = MemoryStore::new();
        store.begin_session(&profile(), &sid("a"), WAIT).await.unwrap();

        let before = Instant::now();
        let reply = store.begin_session(&profile(), &sid("b"), WAIT).await.unwrap();
        match reply {
            BeginReply::Wait { deadline } => assert_eq!(deadline, before + WAIT),
            other => panic!("expected wait, got {other:?}"),
        }
        assert_eq!(store.holder(&profile()), Some(sid("a")));
        assert_eq!(store.waiting_login(&profile()), Some(sid("b")));
    }

    #[tokio::test]
    async fn test_begin_third_login_displaces_earlier_waiter() {
        let store = MemoryStore::new();
        store.begin_session(&profile(), &sid("a"), WAIT).await.unwrap();
        store.begin_session(&profile(), &sid("b"), WAIT).await.unwrap();
        store.begin_session(&profile(), &sid("c"), WAIT).await.unwrap();
        assert_eq!(store.waiting_login(&profile()), Some(sid("c")));
    }

    // =====================================================================
    // resolve_login_attempt
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_resolve_before_deadline_says_wait() {
        let store = MemoryStore::new();
        store.begin_session(&profile(), &sid("a"), WAIT).await.unwrap();
        store.begin_session(&profile(), &sid("b"), WAIT).await.unwrap();

        let reply = store.resolve_login_attempt(&profile(), &sid("b")).await.unwrap();
        assert_eq!(reply, ResolveReply::Wait);
        assert_eq!(store.holder(&profile()), Some(sid("a")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_after_deadline_promotes_waiter() {
        let store = MemoryStore::new();
        store.begin_session(&profile(), &sid("a"), WAIT).await.unwrap();
        store.begin_session(&profile(), &sid("b"), WAIT).await.unwrap();

        tokio::time::advance(WAIT).await;

        let reply = store.resolve_login_attempt(&profile(), &sid("b")).await.unwrap();
        assert_eq!(reply, ResolveReply::Granted);
        assert_eq!(store.holder(&profile()), Some(sid("b")));
        assert_eq!(store.waiting_login(&profile()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_after_holder_touch_is_denied() {
        let store = MemoryStore::new();
        store.begin_session(&profile(), &sid("a"), WAIT).await.unwrap();
        store.begin_session(&profile(), &sid("b"), WAIT).await.unwrap();

        // Holder answers the takeover warning.
        store.touch_session(&profile(), &sid("a")).await.unwrap();

        let reply = store.resolve_login_attempt(&profile(), &sid("b")).await.unwrap();
        assert_eq!(reply, ResolveReply::Denied);
        assert_eq!(store.holder(&profile()), Some(sid("a")));
    }

    #[tokio::test]
    async fn test_resolve_on_vacated_row_claims_it() {
        let store = MemoryStore::new();
        // No row at all: the waiter claims it outright.
        let reply = store.resolve_login_attempt(&profile(), &sid("b")).await.unwrap();
        assert_eq!(reply, ResolveReply::Granted);
        assert_eq!(store.holder(&profile()), Some(sid("b")));
    }

    #[tokio::test]
    async fn test_resolve_when_already_promoted_grants() {
        let store = MemoryStore::new();
        store.begin_session(&profile(), &sid("a"), WAIT).await.unwrap();
        store.begin_session(&profile(), &sid("b"), WAIT).await.unwrap();
        // Holder logs out cleanly; b is promoted by end_session.
        store.end_session(&profile(), &sid("a")).await.unwrap();

        let reply = store.resolve_login_attempt(&profile(), &sid("b")).await.unwrap();
        assert_eq!(reply, ResolveReply::Granted);
    }

    #[tokio::test]
    async fn test_resolve_for_displaced_waiter_is_denied() {
        let store = MemoryStore::new();
        store.begin_session(&profile(), &sid("a"), WAIT).await.unwrap();
        store.begin_session(&profile(), &sid("b"), WAIT).await.unwrap();
        store.begin_session(&profile(), &sid("c"), WAIT).await.unwrap();

        // b was displaced by c and is no longer queued.
        let reply = store.resolve_login_attempt(&profile(), &sid("b")).await.unwrap();
        assert_eq!(reply, ResolveReply::Denied);
    }

    // =====================================================================
    // touch_session
    // =====================================================================

    #[tokio::test]
    async fn test_touch_by_holder_is_alive_and_clears_waiter() {
        let store = MemoryStore::new();
        store.begin_session(&profile(), &sid("a"), WAIT).await.unwrap();
        store.begin_session(&profile(), &sid("b"), WAIT).await.unwrap();

        let reply = store.touch_session(&profile(), &sid("a")).await.unwrap();
        assert_eq!(reply, TouchReply::Alive);
        assert_eq!(store.waiting_login(&profile()), None);
    }

    #[tokio::test]
    async fn test_touch_by_non_holder_is_replaced() {
        let store = MemoryStore::new();
        store.begin_session(&profile(), &sid("a"), WAIT).await.unwrap();

        let reply = store.touch_session(&profile(), &sid("b")).await.unwrap();
        assert_eq!(reply, TouchReply::Replaced);
        // The row is untouched.
        assert_eq!(store.holder(&profile()), Some(sid("a")));
    }

    #[tokio::test]
    async fn test_touch_on_missing_row_is_replaced() {
        let store = MemoryStore::new();
        let reply = store.touch_session(&profile(), &sid("a")).await.unwrap();
        assert_eq!(reply, TouchReply::Replaced);
    }

    // =====================================================================
    // end_session
    // =====================================================================

    #[tokio::test]
    async fn test_end_by_holder_without_waiter_clears_row() {
        let store = MemoryStore::new();
        store.begin_session(&profile(), &sid("a"), WAIT).await.unwrap();
        store.end_session(&profile(), &sid("a")).await.unwrap();
        assert_eq!(store.holder(&profile()), None);
    }

    #[tokio::test]
    async fn test_end_by_holder_promotes_waiter() {
        let store = MemoryStore::new();
        store.begin_session(&profile(), &sid("a"), WAIT).await.unwrap();
        store.begin_session(&profile(), &sid("b"), WAIT).await.unwrap();
        store.end_session(&profile(), &sid("a")).await.unwrap();

        assert_eq!(store.holder(&profile()), Some(sid("b")));
        assert_eq!(store.waiting_login(&profile()), None);
    }

    #[tokio::test]
    async fn test_end_by_waiter_withdraws_queued_login() {
        let store = MemoryStore::new();
        store.begin_session(&profile(), &sid("a"), WAIT).await.unwrap();
        store.begin_session(&profile(), &sid("b"), WAIT).await.unwrap();
        store.end_session(&profile(), &sid("b")).await.unwrap();

        assert_eq!(store.holder(&profile()), Some(sid("a")));
        assert_eq!(store.waiting_login(&profile()), None);
    }

    #[tokio::test]
    async fn test_end_by_stranger_is_noop() {
        let store = MemoryStore::new();
        store.begin_session(&profile(), &sid("a"), WAIT).await.unwrap();
        store.end_session(&profile(), &sid("zz")).await.unwrap();
        assert_eq!(store.holder(&profile()), Some(sid("a")));
    }

    // =====================================================================
    // Identity, profiles, journal
    // =====================================================================

    #[tokio::test]
    async fn test_sign_out_clears_identity() {
        let store = MemoryStore::new();
        store.set_current_identity(RemoteIdentity {
            profile_id: profile(),
            display_name: "Ada".into(),
            role: Role::Player,
        });
        assert!(store.current_identity().await.unwrap().is_some());

        store.sign_out().await.unwrap();
        assert!(store.current_identity().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ensure_profile_keeps_first_record() {
        let store = MemoryStore::new();
        store.ensure_profile(&profile(), "Ada", Role::Player).await.unwrap();
        store.ensure_profile(&profile(), "Someone Else", Role::Admin).await.unwrap();

        let record = store.profile_record(&profile()).unwrap();
        assert_eq!(record.display_name, "Ada");
        assert_eq!(record.role, Role::Player);
    }

    #[tokio::test]
    async fn test_journal_records_calls_in_order() {
        let store = MemoryStore::new();
        store.begin_session(&profile(), &sid("a"), WAIT).await.unwrap();
        store.touch_session(&profile(), &sid("a")).await.unwrap();
        store.cleanup_logout(&profile()).await.unwrap();
        store.end_session(&profile(), &sid("a")).await.unwrap();

        let ops = store.journal();
        assert_eq!(
            ops,
            vec![
                StoreOp::Begin { profile: profile(), session: sid("a") },
                StoreOp::Touch { profile: profile(), session: sid("a") },
                StoreOp::Cleanup { profile: profile() },
                StoreOp::End { profile: profile(), session: sid("a") },
            ]
        );
    }

    // =====================================================================
    // Change feed
    // =====================================================================

    #[tokio::test]
    async fn test_feed_delivers_row_mutations() {
        let store = MemoryStore::new();
        let mut feed = store.subscribe(&profile()).await.unwrap();

        store.begin_session(&profile(), &sid("a"), WAIT).await.unwrap();
        let snap = feed.next().await.unwrap();
        assert!(snap.is_held_by(&sid("a")));
        assert!(!snap.has_waiter());

        store.begin_session(&profile(), &sid("b"), WAIT).await.unwrap();
        let snap = feed.next().await.unwrap();
        assert!(snap.is_held_by(&sid("a")));
        assert_eq!(snap.waiting_session_id, Some(sid("b")));
        assert!(snap.warning_until.is_some());
    }

    #[tokio::test]
    async fn test_feed_reports_cleared_row_after_end() {
        let store = MemoryStore::new();
        store.begin_session(&profile(), &sid("a"), WAIT).await.unwrap();
        let mut feed = store.subscribe(&profile()).await.unwrap();

        store.end_session(&profile(), &sid("a")).await.unwrap();
        let snap = feed.next().await.unwrap();
        assert_eq!(snap.session_id, None);
    }

    #[tokio::test]
    async fn test_feed_closes_when_store_dropped() {
        let store = MemoryStore::new();
        let mut feed = store.subscribe(&profile()).await.unwrap();
        drop(store);
        assert_eq!(feed.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_denied_resolve_publishes_nothing() {
        let store = MemoryStore::new();
        store.begin_session(&profile(), &sid("a"), WAIT).await.unwrap();
        store.begin_session(&profile(), &sid("b"), WAIT).await.unwrap();
        store.touch_session(&profile(), &sid("a")).await.unwrap();

        let mut feed = store.subscribe(&profile()).await.unwrap();
        store.resolve_login_attempt(&profile(), &sid("b")).await.unwrap();

        // No row mutation happened after we subscribed, so the feed
        // must stay silent.
        let pending =
            tokio::time::timeout(Duration::from_millis(50), feed.next()).await;
        assert!(pending.is_err(), "denied resolve must not publish");
    }
}
