//! Integration tests for the login side: [`acquire_session`] against
//! the in-memory store, under paused Tokio time.
//!
//! Timeline tests rely on auto-advance: when every task is parked on a
//! timer, the paused clock jumps to the next deadline, so a 60-second
//! wait budget elapses in microseconds of wall clock.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use chicane_protocol::{ProfileId, Role, SessionId};
use chicane_remote::{
    BeginReply, MemoryStore, RemoteIdentity, ResolveReply, SessionFeed,
    SessionSnapshot, SessionStore, StoreError, TouchReply,
};
use chicane_session::{acquire_session, LoginConfig, SessionError};

fn profile() -> ProfileId {
    ProfileId::new("p-1")
}

fn sid(raw: &str) -> SessionId {
    SessionId::new(raw)
}

/// Shrunk timings: budget 12s, poll 3s, slack 3s → local deadline 15s.
fn fast_config() -> LoginConfig {
    LoginConfig {
        wait_budget: Duration::from_secs(12),
        poll_interval: Duration::from_secs(3),
        resolve_slack: Duration::from_secs(3),
    }
}

// =========================================================================
// Immediate outcomes
// =========================================================================

#[tokio::test]
async fn test_acquire_free_profile_is_granted_without_waiting() {
    let store = MemoryStore::new();
    let (_abort_tx, abort) = watch::channel(false);
    let mut waits = 0;

    acquire_session(&store, &profile(), &sid("a"), &fast_config(), || waits += 1, abort)
        .await
        .unwrap();

    assert_eq!(store.holder(&profile()), Some(sid("a")));
    assert_eq!(waits, 0, "a free profile must not report waiting");
}

#[tokio::test]
async fn test_acquire_twice_with_same_session_is_idempotent() {
    let store = MemoryStore::new();
    let (_abort_tx, abort) = watch::channel(false);
    acquire_session(&store, &profile(), &sid("a"), &fast_config(), || {}, abort)
        .await
        .unwrap();

    let (_abort_tx, abort) = watch::channel(false);
    acquire_session(&store, &profile(), &sid("a"), &fast_config(), || {}, abort)
        .await
        .unwrap();

    assert_eq!(store.holder(&profile()), Some(sid("a")));
    assert_eq!(store.waiting_login(&profile()), None);
}

// =========================================================================
// Contested logins
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_contested_login_wins_after_takeover_deadline() {
    let store = Arc::new(MemoryStore::new());
    store
        .begin_session(&profile(), &sid("a"), Duration::from_secs(12))
        .await
        .unwrap();

    let waits = Arc::new(AtomicUsize::new(0));
    let task = {
        let store = Arc::clone(&store);
        let waits = Arc::clone(&waits);
        tokio::spawn(async move {
            let (_abort_tx, abort) = watch::channel(false);
            acquire_session(
                &*store,
                &profile(),
                &sid("b"),
                &fast_config(),
                move || {
                    waits.fetch_add(1, Ordering::SeqCst);
                },
                abort,
            )
            .await
        })
    };

    // The holder stays silent, so b polls at 3, 6, 9 (Wait) and is
    // promoted by the store at the 12s deadline.
    task.await.unwrap().unwrap();

    assert_eq!(store.holder(&profile()), Some(sid("b")));
    // Queued once at begin, then three Wait polls.
    assert_eq!(waits.load(Ordering::SeqCst), 4);
    assert_eq!(
        store.touch_session(&profile(), &sid("a")).await.unwrap(),
        TouchReply::Replaced,
        "the displaced holder must see itself replaced"
    );
}

#[tokio::test(start_paused = true)]
async fn test_contested_login_is_denied_when_holder_stays_active() {
    let store = Arc::new(MemoryStore::new());
    store
        .begin_session(&profile(), &sid("a"), Duration::from_secs(12))
        .await
        .unwrap();

    let task = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            let (_abort_tx, abort) = watch::channel(false);
            acquire_session(&*store, &profile(), &sid("b"), &fast_config(), || {}, abort).await
        })
    };

    // Let b queue itself, then answer the warning as the holder.
    while store.waiting_login(&profile()).is_none() {
        tokio::task::yield_now().await;
    }
    store.touch_session(&profile(), &sid("a")).await.unwrap();

    let outcome = task.await.unwrap();
    assert!(matches!(outcome, Err(SessionError::Denied)));
    assert_eq!(store.holder(&profile()), Some(sid("a")));
    assert_eq!(store.waiting_login(&profile()), None);
}

#[tokio::test(start_paused = true)]
async fn test_aborted_login_withdraws_its_queue_entry() {
    let store = Arc::new(MemoryStore::new());
    store
        .begin_session(&profile(), &sid("a"), Duration::from_secs(12))
        .await
        .unwrap();

    let (abort_tx, abort) = watch::channel(false);
    let task = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            acquire_session(&*store, &profile(), &sid("b"), &fast_config(), || {}, abort).await
        })
    };

    while store.waiting_login(&profile()).is_none() {
        tokio::task::yield_now().await;
    }
    abort_tx.send(true).unwrap();

    let outcome = task.await.unwrap();
    assert!(matches!(outcome, Err(SessionError::Cancelled)));
    assert_eq!(
        store.waiting_login(&profile()),
        None,
        "a cancelled attempt must not leave the holder warned"
    );
    assert_eq!(store.holder(&profile()), Some(sid("a")));
}

// =========================================================================
// Timeout against a store that never resolves
// =========================================================================

/// A store that queues every login and never decides. Covers backends
/// whose takeover processing is down while reads still work.
struct StallingStore {
    ended: AtomicBool,
}

struct PendingFeed;

impl SessionFeed for PendingFeed {
    async fn next(&mut self) -> Option<SessionSnapshot> {
        std::future::pending().await
    }
}

impl SessionStore for StallingStore {
    type Feed = PendingFeed;

    async fn begin_session(
        &self,
        _profile: &ProfileId,
        _session: &SessionId,
        wait: Duration,
    ) -> Result<BeginReply, StoreError> {
        Ok(BeginReply::Wait {
            deadline: Instant::now() + wait,
        })
    }

    async fn resolve_login_attempt(
        &self,
        _profile: &ProfileId,
        _session: &SessionId,
    ) -> Result<ResolveReply, StoreError> {
        Ok(ResolveReply::Wait)
    }

    async fn touch_session(
        &self,
        _profile: &ProfileId,
        _session: &SessionId,
    ) -> Result<TouchReply, StoreError> {
        Ok(TouchReply::Alive)
    }

    async fn end_session(
        &self,
        _profile: &ProfileId,
        _session: &SessionId,
    ) -> Result<(), StoreError> {
        self.ended.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn cleanup_logout(&self, _profile: &ProfileId) -> Result<(), StoreError> {
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn current_identity(&self) -> Result<Option<RemoteIdentity>, StoreError> {
        Ok(None)
    }

    async fn ensure_profile(
        &self,
        _profile: &ProfileId,
        _display_name: &str,
        _role: Role,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    async fn subscribe(&self, _profile: &ProfileId) -> Result<PendingFeed, StoreError> {
        Ok(PendingFeed)
    }
}

#[tokio::test(start_paused = true)]
async fn test_login_times_out_when_store_never_decides() {
    let store = StallingStore {
        ended: AtomicBool::new(false),
    };
    let (_abort_tx, abort) = watch::channel(false);
    let mut waits = 0;

    let outcome = acquire_session(
        &store,
        &profile(),
        &sid("b"),
        &fast_config(),
        || waits += 1,
        abort,
    )
    .await;

    assert!(matches!(outcome, Err(SessionError::Timeout)));
    // Initial queue plus polls at 3, 6, 9, 12; the 15s poll hits the
    // local deadline first.
    assert_eq!(waits, 5);
    assert!(
        store.ended.load(Ordering::SeqCst),
        "a timed-out attempt must withdraw its queue entry"
    );
}
