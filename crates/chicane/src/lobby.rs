//! `Lobby` builder and the lobby surface itself.
//!
//! This is the entry point for embedding chicane. It ties together all
//! the layers: one [`SessionStore`] for arbitration, an
//! [`IdentityVault`] for persistence, a [`Navigator`] and
//! [`Translator`] for the user-facing side, and the session
//! coordinator that runs in the background while someone is logged in.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use chicane_protocol::{ProfileId, SessionId, StoredIdentity, UserProfile};
use chicane_remote::SessionStore;
use chicane_session::{
    acquire_session, spawn_coordinator, CoordinatorConfig, CoordinatorHandle,
    CoordinatorStatus, LoginConfig, LogoutReason, SessionObserver, SessionWarning,
};

use crate::{IdentityVault, KeyTranslator, LobbyError, MessageKey, Navigator, Translator};

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring a [`Lobby`].
///
/// # Example
///
/// ```rust,ignore
/// use chicane::prelude::*;
///
/// let lobby = Lobby::builder(store)
///     .vault(IdentityVault::in_memory())
///     .translator(Arc::new(MyCatalog))
///     .build(Arc::new(MyNavigator));
/// ```
pub struct LobbyBuilder<S: SessionStore> {
    store: Arc<S>,
    vault: Option<IdentityVault>,
    translator: Option<Arc<dyn Translator>>,
    observer: Option<Arc<dyn SessionObserver>>,
    coordinator_config: CoordinatorConfig,
    login_config: LoginConfig,
}

impl<S: SessionStore> LobbyBuilder<S> {
    fn new(store: Arc<S>) -> Self {
        Self {
            store,
            vault: None,
            translator: None,
            observer: None,
            coordinator_config: CoordinatorConfig::default(),
            login_config: LoginConfig::default(),
        }
    }

    /// Identity persistence. Defaults to [`IdentityVault::in_memory`],
    /// which forgets the login when the process exits.
    pub fn vault(mut self, vault: IdentityVault) -> Self {
        self.vault = Some(vault);
        self
    }

    /// Message catalog. Defaults to [`KeyTranslator`], which shows the
    /// raw catalog keys.
    pub fn translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Extra observer for session warnings and logouts, called after
    /// the lobby's own handling. For warning dialogs and countdowns.
    pub fn session_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn coordinator_config(mut self, config: CoordinatorConfig) -> Self {
        self.coordinator_config = config;
        self
    }

    pub fn login_config(mut self, config: LoginConfig) -> Self {
        self.login_config = config;
        self
    }

    /// Builds the lobby with the given navigator.
    pub fn build(self, navigator: Arc<dyn Navigator>) -> Lobby<S> {
        let (abort, _) = watch::channel(false);
        Lobby {
            store: self.store,
            vault: Arc::new(self.vault.unwrap_or_else(IdentityVault::in_memory)),
            navigator,
            translator: self
                .translator
                .unwrap_or_else(|| Arc::new(KeyTranslator)),
            observer: self.observer,
            coordinator_config: self.coordinator_config,
            login_config: self.login_config,
            active: Mutex::new(None),
            abort,
        }
    }
}

// ---------------------------------------------------------------------------
// Lobby
// ---------------------------------------------------------------------------

/// How [`Lobby::init`] found the world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// A stored identity was found and its session resumed.
    Resumed { profile_id: ProfileId },
    /// The auth layer knows the user but no local session exists. The
    /// profile record was attached; a login is still required.
    ProfileAttached { profile_id: ProfileId },
    /// Nobody is signed in.
    LoggedOut,
}

/// The lobby surface: login, logout, activity, and identity state for
/// one device.
///
/// One lobby holds at most one live session. All methods take `&self`;
/// the lobby is meant to sit in an `Arc` shared by UI call sites.
pub struct Lobby<S: SessionStore> {
    store: Arc<S>,
    vault: Arc<IdentityVault>,
    navigator: Arc<dyn Navigator>,
    translator: Arc<dyn Translator>,
    observer: Option<Arc<dyn SessionObserver>>,
    coordinator_config: CoordinatorConfig,
    login_config: LoginConfig,
    active: Mutex<Option<CoordinatorHandle>>,
    /// Flipping this to `true` aborts an in-flight login attempt.
    abort: watch::Sender<bool>,
}

impl<S: SessionStore> Lobby<S> {
    /// Creates a new builder over the given store.
    pub fn builder(store: Arc<S>) -> LobbyBuilder<S> {
        LobbyBuilder::new(store)
    }

    /// Restore state after process start.
    ///
    /// Checked in order: a stored identity (resume its session), a
    /// signed-in auth user with no session (attach the profile record),
    /// or nothing. The store being unreachable never fails init — the
    /// lobby starts logged out, or resumes when an identity is already
    /// stored (resume makes no remote claim).
    pub async fn init(&self) -> Result<InitOutcome, LobbyError> {
        if let Some(old) = self.active.lock().await.take() {
            // A previous init's coordinator; detach it before rewiring.
            let _ = old.shutdown().await;
        }

        if let Some(identity) = self.vault.load() {
            return Ok(self.resume(identity).await);
        }

        match self.store.current_identity().await {
            Ok(Some(remote)) => {
                info!(profile = %remote.profile_id, "auth user found; attaching profile");
                if let Err(err) = self
                    .store
                    .ensure_profile(&remote.profile_id, &remote.display_name, remote.role)
                    .await
                {
                    warn!(%err, "could not attach profile record");
                }
                Ok(InitOutcome::ProfileAttached {
                    profile_id: remote.profile_id,
                })
            }
            Ok(None) => Ok(InitOutcome::LoggedOut),
            Err(err) => {
                warn!(%err, "auth layer unreachable; starting logged out");
                Ok(InitOutcome::LoggedOut)
            }
        }
    }

    /// Resume custody of a stored session.
    ///
    /// The persisted identity is trusted as-is: the coordinator
    /// re-subscribes and re-arms the inactivity timer, and no remote
    /// call is made. If another session took the profile while this
    /// device was away, the first heartbeat or snapshot says so and
    /// the coordinator forces the replaced logout then.
    async fn resume(&self, identity: StoredIdentity) -> InitOutcome {
        let profile_id = identity.profile_id.clone();
        info!(profile = %profile_id, "stored session resumed");
        let handle = self.spawn_for(profile_id.clone(), identity.session_id);
        self.active.lock().await.replace(handle);
        InitOutcome::Resumed { profile_id }
    }

    /// Log `profile` in, taking the session over from another device if
    /// necessary.
    ///
    /// Blocks until the store decides, the wait budget runs out, or
    /// [`logout`](Self::logout) aborts the attempt. `on_wait` fires
    /// whenever the attempt is queued behind a live holder, so the UI
    /// can explain the delay. On success the identity is persisted and
    /// a coordinator holds the session until it ends.
    pub async fn attempt_exclusive_login(
        &self,
        profile: UserProfile,
        on_wait: impl FnMut(),
    ) -> Result<SessionId, LobbyError> {
        self.abort.send_replace(false);
        let session_id = SessionId::generate();

        acquire_session(
            self.store.as_ref(),
            &profile.profile_id,
            &session_id,
            &self.login_config,
            on_wait,
            self.abort.subscribe(),
        )
        .await?;

        self.set_session(profile, session_id.clone()).await?;
        Ok(session_id)
    }

    /// Install `session_id` as `profile`'s live session on this device.
    ///
    /// Persists the identity and hands the session to a background
    /// coordinator (feed subscription, heartbeats, idle tracking).
    /// [`attempt_exclusive_login`](Self::attempt_exclusive_login) calls
    /// this after acquiring a session; embedders that obtained one some
    /// other way against the same store install it here directly.
    ///
    /// If the identity cannot be persisted, the session is released
    /// remotely (best-effort) and the error returned.
    pub async fn set_session(
        &self,
        profile: UserProfile,
        session_id: SessionId,
    ) -> Result<(), LobbyError> {
        if let Some(old) = self.active.lock().await.take() {
            // An earlier login on this device; detach its coordinator.
            // The same profile's row has already changed hands to the
            // new session. A different profile's row would stay held
            // with nobody left to heartbeat it, so release that one.
            let _ = old.shutdown().await;
            if old.profile_id() != &profile.profile_id {
                if let Err(err) = self
                    .store
                    .end_session(old.profile_id(), old.session_id())
                    .await
                {
                    debug!(%err, "could not release the previous profile's session");
                }
            }
        }

        let identity = StoredIdentity::new(profile, session_id.clone());
        if let Err(err) = self.vault.store(&identity) {
            warn!(%err, "could not persist identity; abandoning session");
            if let Err(end_err) = self
                .store
                .end_session(&identity.profile_id, &session_id)
                .await
            {
                debug!(%end_err, "could not release the abandoned session");
            }
            return Err(err.into());
        }

        let handle = self.spawn_for(identity.profile_id, session_id);
        self.active.lock().await.replace(handle);
        Ok(())
    }

    fn spawn_for(&self, profile_id: ProfileId, session_id: SessionId) -> CoordinatorHandle {
        let observer: Arc<dyn SessionObserver> = Arc::new(LobbyObserver {
            store: Arc::clone(&self.store),
            vault: Arc::clone(&self.vault),
            navigator: Arc::clone(&self.navigator),
            translator: Arc::clone(&self.translator),
            forward: self.observer.clone(),
        });
        spawn_coordinator(
            Arc::clone(&self.store),
            profile_id,
            session_id,
            self.coordinator_config.clone(),
            observer,
        )
    }

    /// Log out deliberately.
    ///
    /// Ends the session remotely (best-effort), clears the stored
    /// identity, signs out of the auth layer, and navigates to the
    /// entry screen — without a notice, since the user chose this.
    /// Also aborts any login attempt still in flight.
    pub async fn logout(&self) -> Result<(), LobbyError> {
        self.abort.send_replace(true);

        let handle = self.active.lock().await.take();
        if let Some(handle) = handle {
            match handle.logout().await {
                // The coordinator's teardown drove the observer, which
                // already cleared the vault and navigated.
                Ok(()) => return Ok(()),
                Err(err) => {
                    warn!(%err, "coordinator gone; falling back to local logout")
                }
            }
        }

        // No coordinator (or a dead one): do the local half ourselves.
        self.vault.clear();
        if let Err(err) = self.store.sign_out().await {
            warn!(%err, "sign-out call failed; local logout proceeds");
        }
        self.navigator.to_entry(None);
        Ok(())
    }

    /// Report user activity (navigation, play, chat). Cheap to call on
    /// every interaction; the coordinator throttles the actual writes.
    pub async fn notify_activity(&self) {
        let mut active = self.active.lock().await;
        if let Some(handle) = active.as_ref() {
            if handle.notify_activity().await.is_err() {
                // The coordinator ended between lock and send; its
                // observer already handled the logout.
                debug!("activity after session ended; dropping handle");
                active.take();
            }
        }
    }

    /// Live session status, if a session is held.
    pub async fn session_status(&self) -> Option<CoordinatorStatus> {
        let mut active = self.active.lock().await;
        let handle = active.as_ref()?;
        match handle.status().await {
            Ok(status) => Some(status),
            Err(_) => {
                active.take();
                None
            }
        }
    }

    pub async fn is_logged_in(&self) -> bool {
        self.session_status().await.is_some()
    }

    /// The persisted identity, if someone is logged in.
    pub fn identity(&self) -> Option<StoredIdentity> {
        self.vault.load()
    }

    /// Resolve a notice key through the configured catalog.
    pub fn translate(&self, key: MessageKey) -> String {
        self.translator.message(key)
    }
}

// ---------------------------------------------------------------------------
// LobbyObserver
// ---------------------------------------------------------------------------

/// The lobby's own [`SessionObserver`]: applies the local consequences
/// of session events, then forwards to the embedder's observer.
struct LobbyObserver<S: SessionStore> {
    store: Arc<S>,
    vault: Arc<IdentityVault>,
    navigator: Arc<dyn Navigator>,
    translator: Arc<dyn Translator>,
    forward: Option<Arc<dyn SessionObserver>>,
}

impl<S: SessionStore> SessionObserver for LobbyObserver<S> {
    fn on_warning(&self, warning: &SessionWarning) {
        debug!(kind = ?warning.kind, remaining = ?warning.remaining, "session warning");
        if let Some(forward) = &self.forward {
            forward.on_warning(warning);
        }
    }

    fn on_warning_cleared(&self) {
        if let Some(forward) = &self.forward {
            forward.on_warning_cleared();
        }
    }

    fn on_logged_out(&self, reason: LogoutReason) {
        self.vault.clear();

        // Sign-out is remote; run it off the coordinator's teardown
        // path. Its failure changes nothing locally.
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(err) = store.sign_out().await {
                warn!(%err, "sign-out after logout failed");
            }
        });

        let notice = MessageKey::for_logout(reason).map(|key| self.translator.message(key));
        self.navigator.to_entry(notice.as_deref());

        if let Some(forward) = &self.forward {
            forward.on_logged_out(reason);
        }
    }
}
