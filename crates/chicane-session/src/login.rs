//! The acquiring side of the exclusivity rule: win the row or give up.

use tokio::sync::watch;
use tokio::time::{self, Instant};
use tracing::{debug, info};

use chicane_protocol::{ProfileId, SessionId};
use chicane_remote::{BeginReply, ResolveReply, SessionStore};

use crate::{LoginConfig, SessionError};

/// Acquire the profile's session row for `session_id`.
///
/// The happy path is one store call: the row is free (or already ours)
/// and the store grants it. When another device holds the row, the
/// attempt is queued and this function polls [`resolve_login_attempt`]
/// every [`poll_interval`] until one of:
///
/// - the store grants (holder yielded, or the takeover deadline passed),
/// - the store denies (holder answered the warning) → [`SessionError::Denied`],
/// - the local budget (`wait_budget + resolve_slack`) runs out →
///   [`SessionError::Timeout`],
/// - `abort` flips to `true` → [`SessionError::Cancelled`]. A closed
///   abort channel counts as cancelled too — the caller went away.
///
/// `on_wait` fires each time the attempt is (still) queued, so a UI can
/// show "signed in elsewhere, waiting…" with live feedback.
///
/// On any failed outcome the queued attempt is withdrawn from the store
/// best-effort, so the holder's takeover warning comes down promptly.
///
/// [`resolve_login_attempt`]: chicane_remote::SessionStore::resolve_login_attempt
/// [`poll_interval`]: LoginConfig::poll_interval
pub async fn acquire_session<S: SessionStore>(
    store: &S,
    profile_id: &ProfileId,
    session_id: &SessionId,
    config: &LoginConfig,
    mut on_wait: impl FnMut(),
    mut abort: watch::Receiver<bool>,
) -> Result<(), SessionError> {
    let config = config.clone().validated();
    match store
        .begin_session(profile_id, session_id, config.wait_budget)
        .await?
    {
        BeginReply::Granted => {
            info!(profile = %profile_id, session = %session_id, "session acquired");
            return Ok(());
        }
        BeginReply::Wait { .. } => {
            info!(
                profile = %profile_id,
                session = %session_id,
                "profile held elsewhere; queued for takeover"
            );
            on_wait();
        }
    }

    // The local deadline runs slightly past the store's: the store is
    // the authority on WHO wins, the slack only bounds how long we keep
    // asking it.
    let deadline = Instant::now() + config.wait_budget + config.resolve_slack;

    let outcome = loop {
        tokio::select! {
            _ = time::sleep(config.poll_interval) => {}
            _ = abort.wait_for(|stop| *stop) => break Err(SessionError::Cancelled),
        }
        if Instant::now() >= deadline {
            break Err(SessionError::Timeout);
        }
        match store.resolve_login_attempt(profile_id, session_id).await {
            Ok(ResolveReply::Granted) => break Ok(()),
            Ok(ResolveReply::Denied) => break Err(SessionError::Denied),
            Ok(ResolveReply::Wait) => on_wait(),
            Err(err) => break Err(SessionError::Remote(err)),
        }
    };

    match &outcome {
        Ok(()) => {
            info!(profile = %profile_id, session = %session_id, "takeover granted");
        }
        Err(err) => {
            info!(profile = %profile_id, session = %session_id, %err, "login attempt failed");
            // Withdraw so the holder's warning clears. If the store is
            // the thing that failed, this will likely fail too; the
            // queue entry then dies with its deadline.
            if let Err(err) = store.end_session(profile_id, session_id).await {
                debug!(%err, "could not withdraw queued login");
            }
        }
    }
    outcome
}
