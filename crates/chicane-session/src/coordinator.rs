//! The holding side of the exclusivity rule: a background actor that
//! keeps the session alive and ends it when it should end.
//!
//! One coordinator task runs per live session. Everything that can end
//! or threaten the session — user activity, row snapshots from the
//! store, the idle timer, a warning deadline — arrives at one
//! `tokio::select!` loop, so events are handled strictly one at a time
//! and there are no lock-ordering or re-entrancy questions.
//!
//! ```text
//!            handle.notify_activity() / logout() / status()
//!                              │ (mpsc)
//!                              ▼
//!   feed push ──────────→ ┌──────────┐ ──touch──→ store
//!   idle timer ─────────→ │ drive()  │ ──end────→ store
//!   warning deadline ───→ └──────────┘ ──────────→ observer
//! ```
//!
//! The session can end three ways, and all of them funnel through the
//! same teardown: the user asked ([`LogoutReason::Requested`]), a newer
//! login won the row ([`LogoutReason::Replaced`]), or the inactivity
//! warning expired ([`LogoutReason::Inactive`]). Teardown is fail-open
//! against the store: remote calls are attempted, failures are logged,
//! and the local logout proceeds regardless.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};
use tracing::{debug, info, trace, warn};

use chicane_protocol::{ProfileId, SessionId};
use chicane_remote::{SessionFeed, SessionSnapshot, SessionStore, TouchReply};

use crate::{CoordinatorConfig, SessionError};

/// Commands queued per coordinator before senders are backpressured.
const COMMAND_BUFFER: usize = 16;

// ---------------------------------------------------------------------------
// Warnings and logout reasons
// ---------------------------------------------------------------------------

/// Why a warning is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// The user has been idle; the session will expire unless they act.
    Inactivity,
    /// Another device wants the profile; the session will be replaced
    /// unless the user claims it.
    Takeover,
}

/// A live warning, delivered to the observer once when raised and then
/// once per countdown tick with `remaining` updated.
#[derive(Debug, Clone)]
pub struct SessionWarning {
    pub kind: WarningKind,
    /// When the warned-about logout happens.
    pub deadline: Instant,
    /// Time left until `deadline`, saturating at zero.
    pub remaining: Duration,
    /// For [`WarningKind::Takeover`], the session trying to take over.
    pub waiting_session_id: Option<SessionId>,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// The user logged out themselves.
    Requested,
    /// A newer login took the row.
    Replaced,
    /// The inactivity warning expired unanswered.
    Inactive,
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => write!(f, "requested"),
            Self::Replaced => write!(f, "replaced"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}

/// Callbacks from the coordinator task to the embedding application.
///
/// Implementations must be cheap and non-blocking — they run on the
/// coordinator's own task, between events. Anything slow belongs on a
/// channel the implementation forwards to.
pub trait SessionObserver: Send + Sync + 'static {
    /// A warning was raised, or its countdown ticked.
    fn on_warning(&self, warning: &SessionWarning);

    /// The active warning resolved without ending the session.
    fn on_warning_cleared(&self);

    /// The session ended. Always the last callback; by the time a
    /// requested logout's [`CoordinatorHandle::logout`] returns, this
    /// has already run.
    fn on_logged_out(&self, reason: LogoutReason);
}

/// Point-in-time view of a coordinator, for status displays and tests.
#[derive(Debug, Clone)]
pub struct CoordinatorStatus {
    pub profile_id: ProfileId,
    pub session_id: SessionId,
    /// The warning currently showing, if any.
    pub warning: Option<WarningKind>,
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

enum Command {
    Activity,
    Logout { reply: oneshot::Sender<()> },
    Shutdown { reply: oneshot::Sender<()> },
    Status { reply: oneshot::Sender<CoordinatorStatus> },
}

/// Cheap, cloneable handle to a running coordinator.
///
/// All methods return [`SessionError::Unavailable`] once the
/// coordinator has stopped, whatever the reason. Callers treat that as
/// "no session" and re-initialize.
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Command>,
    profile_id: ProfileId,
    session_id: SessionId,
}

impl CoordinatorHandle {
    pub fn profile_id(&self) -> &ProfileId {
        &self.profile_id
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Report user activity. Resets the idle timer; answers an
    /// inactivity warning; forces the heartbeat that dismisses a
    /// takeover attempt.
    pub async fn notify_activity(&self) -> Result<(), SessionError> {
        self.tx
            .send(Command::Activity)
            .await
            .map_err(|_| SessionError::Unavailable)
    }

    /// End the session deliberately. Resolves after teardown has run,
    /// including the observer's logged-out callback.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let (reply, done) = oneshot::channel();
        self.tx
            .send(Command::Logout { reply })
            .await
            .map_err(|_| SessionError::Unavailable)?;
        done.await.map_err(|_| SessionError::Unavailable)
    }

    /// Stop the coordinator WITHOUT ending the remote session. The row
    /// stays held, so a later [`acquire_session`](crate::acquire_session)
    /// with the same session id resumes it. Used when the app shuts
    /// down or replaces the coordinator.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        let (reply, done) = oneshot::channel();
        self.tx
            .send(Command::Shutdown { reply })
            .await
            .map_err(|_| SessionError::Unavailable)?;
        done.await.map_err(|_| SessionError::Unavailable)
    }

    pub async fn status(&self) -> Result<CoordinatorStatus, SessionError> {
        let (reply, done) = oneshot::channel();
        self.tx
            .send(Command::Status { reply })
            .await
            .map_err(|_| SessionError::Unavailable)?;
        done.await.map_err(|_| SessionError::Unavailable)
    }
}

/// Spawn a coordinator for a session already granted by the store.
///
/// The returned handle is the only way to talk to it. Dropping every
/// clone stops the task without ending the remote session — same as
/// [`CoordinatorHandle::shutdown`].
pub fn spawn_coordinator<S: SessionStore>(
    store: Arc<S>,
    profile_id: ProfileId,
    session_id: SessionId,
    config: CoordinatorConfig,
    observer: Arc<dyn SessionObserver>,
) -> CoordinatorHandle {
    let (tx, commands) = mpsc::channel(COMMAND_BUFFER);
    let coordinator = Coordinator {
        store,
        profile_id: profile_id.clone(),
        session_id: session_id.clone(),
        config: config.validated(),
        observer,
        commands,
        feed: None,
        warning: None,
        idle_deadline: None,
        countdown_at: None,
        last_touch: None,
        pending_logout_ack: None,
    };
    tokio::spawn(coordinator.run());
    CoordinatorHandle {
        tx,
        profile_id,
        session_id,
    }
}

// ---------------------------------------------------------------------------
// The actor
// ---------------------------------------------------------------------------

struct ActiveWarning {
    kind: WarningKind,
    deadline: Instant,
    waiting_session_id: Option<SessionId>,
}

struct Coordinator<S: SessionStore> {
    store: Arc<S>,
    profile_id: ProfileId,
    session_id: SessionId,
    config: CoordinatorConfig,
    observer: Arc<dyn SessionObserver>,
    commands: mpsc::Receiver<Command>,
    /// `None` after subscribe failed or the feed closed — degraded
    /// mode, where replacement is only detected by heartbeats.
    feed: Option<S::Feed>,
    warning: Option<ActiveWarning>,
    /// Armed while no warning is showing.
    idle_deadline: Option<Instant>,
    /// Next countdown emission, armed while a warning is showing.
    countdown_at: Option<Instant>,
    /// Last successful heartbeat, for throttling.
    last_touch: Option<Instant>,
    pending_logout_ack: Option<oneshot::Sender<()>>,
}

impl<S: SessionStore> Coordinator<S> {
    async fn run(mut self) {
        info!(
            profile = %self.profile_id,
            session = %self.session_id,
            "session coordinator started"
        );

        match self.store.subscribe(&self.profile_id).await {
            Ok(feed) => self.feed = Some(feed),
            Err(err) => {
                warn!(%err, "row feed unavailable; relying on heartbeat replacement checks");
            }
        }
        self.arm_idle_timer();

        if let Some(reason) = self.drive().await {
            self.teardown(reason).await;
        }

        info!(
            profile = %self.profile_id,
            session = %self.session_id,
            "session coordinator stopped"
        );
    }

    /// The event loop. Returns the logout reason, or `None` to detach
    /// without ending the remote session.
    ///
    /// Each disarmed timer is a pending future, so an unarmed branch
    /// simply never wins the select.
    async fn drive(&mut self) -> Option<LogoutReason> {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Activity) => {
                        if let Some(reason) = self.handle_activity().await {
                            return Some(reason);
                        }
                    }
                    Some(Command::Logout { reply }) => {
                        self.pending_logout_ack = Some(reply);
                        return Some(LogoutReason::Requested);
                    }
                    Some(Command::Shutdown { reply }) => {
                        let _ = reply.send(());
                        return None;
                    }
                    Some(Command::Status { reply }) => {
                        let _ = reply.send(self.status());
                    }
                    None => {
                        debug!("all handles dropped; detaching from session");
                        return None;
                    }
                },

                snapshot = Self::next_snapshot(&mut self.feed) => match snapshot {
                    Some(snapshot) => {
                        if let Some(reason) = self.handle_snapshot(snapshot) {
                            return Some(reason);
                        }
                    }
                    None => {
                        warn!("row feed closed; relying on heartbeat replacement checks");
                        self.feed = None;
                    }
                },

                _ = Self::sleep_until_opt(self.idle_deadline) => {
                    self.raise_inactivity_warning();
                }

                _ = Self::sleep_until_opt(self.warning.as_ref().map(|w| w.deadline)) => {
                    let Some(warning) = self.warning.as_ref() else {
                        continue;
                    };
                    warn!(
                        profile = %self.profile_id,
                        kind = ?warning.kind,
                        "warning expired; forcing logout"
                    );
                    return Some(match warning.kind {
                        WarningKind::Inactivity => LogoutReason::Inactive,
                        WarningKind::Takeover => LogoutReason::Replaced,
                    });
                }

                _ = Self::sleep_until_opt(self.countdown_at) => {
                    self.emit_countdown();
                }
            }
        }
    }

    /// Next feed snapshot, or pending forever in degraded mode.
    async fn next_snapshot(feed: &mut Option<S::Feed>) -> Option<SessionSnapshot> {
        match feed {
            Some(feed) => feed.next().await,
            None => std::future::pending().await,
        }
    }

    async fn sleep_until_opt(at: Option<Instant>) {
        match at {
            Some(at) => time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    }

    // -- event handlers ----------------------------------------------------

    fn handle_snapshot(&mut self, snapshot: SessionSnapshot) -> Option<LogoutReason> {
        if !snapshot.is_held_by(&self.session_id) {
            info!(
                profile = %self.profile_id,
                session = %self.session_id,
                "row no longer held by this session"
            );
            return Some(LogoutReason::Replaced);
        }

        let now = Instant::now();
        match (snapshot.waiting_session_id, snapshot.warning_until) {
            (Some(waiter), Some(until)) if until > now => {
                self.raise_takeover_warning(waiter, until);
            }
            (Some(_), _) => {
                // Learned of the takeover only after its deadline: the
                // promotion is a formality, log out now.
                info!(profile = %self.profile_id, "takeover deadline already passed");
                return Some(LogoutReason::Replaced);
            }
            (None, _) => {
                // The queued login is gone — withdrawn, or dismissed by
                // our own forced heartbeat.
                if self
                    .warning
                    .as_ref()
                    .is_some_and(|w| w.kind == WarningKind::Takeover)
                {
                    self.clear_warning();
                }
            }
        }
        None
    }

    async fn handle_activity(&mut self) -> Option<LogoutReason> {
        let force = match self.warning.as_ref().map(|w| w.kind) {
            Some(WarningKind::Inactivity) => {
                self.clear_warning();
                true
            }
            Some(WarningKind::Takeover) => {
                // Claiming the session is done at the store: the forced
                // touch dismisses the queued login, and the snapshot
                // that publishes comes back around to clear the warning.
                true
            }
            None => {
                self.arm_idle_timer();
                false
            }
        };
        self.heartbeat(force).await
    }

    /// Write a heartbeat unless throttled. `force` bypasses the
    /// throttle for heartbeats that answer a warning.
    async fn heartbeat(&mut self, force: bool) -> Option<LogoutReason> {
        let now = Instant::now();
        if !force {
            if let Some(last) = self.last_touch {
                if now.saturating_duration_since(last) < self.config.heartbeat_throttle {
                    trace!("activity coalesced; heartbeat throttled");
                    return None;
                }
            }
        }

        match self
            .store
            .touch_session(&self.profile_id, &self.session_id)
            .await
        {
            Ok(TouchReply::Alive) => {
                self.last_touch = Some(now);
                None
            }
            Ok(TouchReply::Replaced) => {
                warn!(
                    profile = %self.profile_id,
                    session = %self.session_id,
                    "heartbeat rejected; session was replaced"
                );
                Some(LogoutReason::Replaced)
            }
            Err(err) => {
                // Fail open: a flaky store must not log the user out.
                warn!(%err, "heartbeat failed; keeping session");
                None
            }
        }
    }

    // -- warnings and timers -----------------------------------------------

    fn raise_takeover_warning(&mut self, waiter: SessionId, deadline: Instant) {
        let already = self.warning.as_ref().is_some_and(|w| {
            w.kind == WarningKind::Takeover
                && w.deadline == deadline
                && w.waiting_session_id.as_ref() == Some(&waiter)
        });
        if already {
            // Repeat snapshot for the same attempt (rows republish on
            // every mutation); nothing new to show.
            return;
        }

        info!(
            profile = %self.profile_id,
            waiter = %waiter,
            "another login wants this profile; takeover warning raised"
        );
        self.warning = Some(ActiveWarning {
            kind: WarningKind::Takeover,
            deadline,
            waiting_session_id: Some(waiter),
        });
        self.idle_deadline = None;
        self.countdown_at = Some(Instant::now() + self.config.countdown_tick);
        self.notify_warning();
    }

    fn raise_inactivity_warning(&mut self) {
        let deadline = Instant::now() + self.config.warning_grace;
        warn!(
            profile = %self.profile_id,
            grace = ?self.config.warning_grace,
            "user idle past the timeout; inactivity warning raised"
        );
        self.warning = Some(ActiveWarning {
            kind: WarningKind::Inactivity,
            deadline,
            waiting_session_id: None,
        });
        self.idle_deadline = None;
        self.countdown_at = Some(Instant::now() + self.config.countdown_tick);
        self.notify_warning();
    }

    fn emit_countdown(&mut self) {
        if self.warning.is_some() {
            self.notify_warning();
            self.countdown_at = Some(Instant::now() + self.config.countdown_tick);
        } else {
            self.countdown_at = None;
        }
    }

    fn notify_warning(&self) {
        let Some(warning) = self.warning.as_ref() else {
            return;
        };
        self.observer.on_warning(&SessionWarning {
            kind: warning.kind,
            deadline: warning.deadline,
            remaining: warning.deadline.saturating_duration_since(Instant::now()),
            waiting_session_id: warning.waiting_session_id.clone(),
        });
    }

    fn clear_warning(&mut self) {
        if self.warning.take().is_some() {
            self.countdown_at = None;
            info!(profile = %self.profile_id, "warning cleared");
            self.observer.on_warning_cleared();
            self.arm_idle_timer();
        }
    }

    fn arm_idle_timer(&mut self) {
        self.idle_deadline = Some(Instant::now() + self.config.idle_timeout);
    }

    fn status(&self) -> CoordinatorStatus {
        CoordinatorStatus {
            profile_id: self.profile_id.clone(),
            session_id: self.session_id.clone(),
            warning: self.warning.as_ref().map(|w| w.kind),
        }
    }

    // -- teardown ----------------------------------------------------------

    /// End the session. Remote calls are best-effort; the local logout
    /// and the observer callback always happen.
    async fn teardown(&mut self, reason: LogoutReason) {
        info!(
            profile = %self.profile_id,
            session = %self.session_id,
            %reason,
            "session ending"
        );

        if let Err(err) = self.store.cleanup_logout(&self.profile_id).await {
            warn!(%err, "logout cleanup failed; continuing");
        }
        if let Err(err) = self
            .store
            .end_session(&self.profile_id, &self.session_id)
            .await
        {
            warn!(%err, "could not end session at the store; local logout proceeds");
        }

        self.feed = None;
        self.warning = None;
        self.idle_deadline = None;
        self.countdown_at = None;

        self.observer.on_logged_out(reason);
        if let Some(ack) = self.pending_logout_ack.take() {
            let _ = ack.send(());
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for the plain data types. The actor itself is
    //! exercised end to end in `tests/coordinator.rs`.

    use super::*;

    #[test]
    fn test_logout_reason_display_is_log_friendly() {
        assert_eq!(LogoutReason::Requested.to_string(), "requested");
        assert_eq!(LogoutReason::Replaced.to_string(), "replaced");
        assert_eq!(LogoutReason::Inactive.to_string(), "inactive");
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_warning_remaining_saturates() {
        let deadline = Instant::now();
        tokio::time::advance(Duration::from_secs(5)).await;
        // A warning built after its own deadline reports zero, not a panic.
        let warning = SessionWarning {
            kind: WarningKind::Inactivity,
            deadline,
            remaining: deadline.saturating_duration_since(Instant::now()),
            waiting_session_id: None,
        };
        assert_eq!(warning.remaining, Duration::ZERO);
    }
}
