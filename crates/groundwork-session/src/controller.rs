//! The session lifecycle controller.
//!
//! This is the central piece of the session layer. It owns the bearer
//! token and is responsible for:
//! - Restoring a persisted session on startup ([`init`](SessionController::init))
//! - Logging in and out
//! - Renewing the token silently before it expires, by scheduling
//!   exactly one renewal timer at a time
//! - Publishing every state change to observers
//!
//! # Concurrency note
//!
//! The controller is a cheap-to-clone handle (`Arc` inside). The UI and
//! the renewal timer task may drive the same session at once, so the
//! state sits behind a `std::sync::Mutex`. The lock is only ever held
//! for the synchronous part of a transition, never across an `.await`:
//!
//! ```text
//! lock → mutate → unlock → await gateway → lock → still relevant? → mutate → unlock
//! ```
//!
//! "Still relevant" is two checks. Every session clear and every login
//! start bumps the epoch, and a gateway result that comes back under an
//! older epoch is discarded instead of resurrecting a cleared session.
//! A result about a token (a renewal, a restore) is also discarded when
//! the token it was about has since been replaced.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use groundwork_protocol::{
    AuthResult, CreatedUser, Credentials, SignUpData, Token, UserIdentity,
    UserSummary,
};
use groundwork_timer::{TimerHandle, TimerScheduler};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    AuthGateway, KeyValueStore, SessionConfig, SessionError, SessionPhase,
    SessionSnapshot,
};

/// The controller's single mutable record.
#[derive(Debug, Default)]
struct SessionState {
    phase: SessionPhase,
    token: Option<Token>,
    identity: Option<UserIdentity>,
    role: Option<String>,
    /// At most one outstanding renewal timer.
    pending_timer: Option<TimerHandle>,
    /// Bumped on every clear and every login start.
    epoch: u64,
    initialized: bool,
    disposed: bool,
}

impl SessionState {
    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.disposed {
            return Err(SessionError::Disposed);
        }
        Ok(())
    }

    /// Whether a result started under `epoch` may still be applied.
    fn is_current(&self, epoch: u64) -> bool {
        !self.disposed && self.epoch == epoch
    }

    /// A token was seeded from the store and `init` hasn't looked at it.
    fn restore_pending(&self) -> bool {
        !self.initialized && self.token.is_some() && self.identity.is_none()
    }

    /// The phase to settle in once no transition is in flight.
    fn settled_phase(&self) -> SessionPhase {
        match (&self.token, &self.identity) {
            (Some(_), Some(_)) => SessionPhase::Authenticated,
            // Only reachable on restart: the persisted token is still
            // being validated by `init`.
            (Some(_), None) => SessionPhase::Authenticating,
            _ => SessionPhase::LoggedOut,
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            token: self.token.clone(),
            identity: self.identity.clone(),
            role: self.role.clone(),
        }
    }
}

struct Inner<G, K, T>
where
    T: TimerScheduler,
{
    gateway: G,
    store: K,
    scheduler: T,
    config: SessionConfig,
    state: Mutex<SessionState>,
    published: watch::Sender<SessionSnapshot>,
}

impl<G, K, T> Drop for Inner<G, K, T>
where
    T: TimerScheduler,
{
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = state.pending_timer.take() {
            self.scheduler.cancel(handle);
        }
    }
}

/// Owns the authentication token and drives the session lifecycle.
///
/// Generic over the three collaborators it is built from:
/// - `G`: the [`AuthGateway`] performing the network calls
/// - `K`: the [`KeyValueStore`] persisting the token
/// - `T`: the [`TimerScheduler`] running the renewal timer
///
/// ## Lifecycle
///
/// ```text
/// start() ──→ init() ──→ login() ──→ [timer fires] ──→ refresh_token() ──┐
///                │          │                               │  ▲          │
///                │          │                               │  └──────────┘
///                ▼          ▼                               ▼   reschedule
///           [Authenticated or LoggedOut]          logout() / failure → [LoggedOut]
/// ```
pub struct SessionController<G, K, T>
where
    T: TimerScheduler,
{
    inner: Arc<Inner<G, K, T>>,
}

impl<G, K, T> Clone for SessionController<G, K, T>
where
    T: TimerScheduler,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G, K, T> SessionController<G, K, T>
where
    G: AuthGateway,
    K: KeyValueStore,
    T: TimerScheduler,
{
    /// Creates a controller with the token seeded from `store`.
    ///
    /// Identity and role start absent and the phase is `LoggedOut`; call
    /// [`init`](Self::init) (or use [`start`](Self::start)) to validate a
    /// seeded token against the gateway.
    pub fn new(gateway: G, store: K, scheduler: T, config: SessionConfig) -> Self {
        let config = config.validated();
        let token = match store.get(&config.token_key) {
            Ok(Some(raw)) if !raw.is_empty() => Some(Token::new(raw)),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "could not read persisted token, starting logged out");
                None
            }
        };

        let state = SessionState {
            token,
            ..SessionState::default()
        };
        let (published, _) = watch::channel(state.snapshot());

        Self {
            inner: Arc::new(Inner {
                gateway,
                store,
                scheduler,
                config,
                state: Mutex::new(state),
                published,
            }),
        }
    }

    /// Creates a controller and runs [`init`](Self::init) once.
    ///
    /// An init failure is not returned: it has already moved the session
    /// to `LoggedOut`, which is all a restarting client needs to know.
    pub async fn start(gateway: G, store: K, scheduler: T, config: SessionConfig) -> Self {
        let controller = Self::new(gateway, store, scheduler, config);
        if let Err(e) = controller.init().await {
            debug!(error = %e, "session restore did not complete");
        }
        controller
    }

    // =====================================================================
    // Published surface
    // =====================================================================

    /// A copy of the current session.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    /// Subscribes to session changes.
    ///
    /// The receiver always holds the latest snapshot. `changed().await`
    /// wakes after each transition; a slow observer may skip intermediate
    /// states but always sees the newest one.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.published.subscribe()
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock().phase
    }

    pub fn token(&self) -> Option<Token> {
        self.lock().token.clone()
    }

    pub fn identity(&self) -> Option<UserIdentity> {
        self.lock().identity.clone()
    }

    pub fn role(&self) -> Option<String> {
        self.lock().role.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        let state = self.lock();
        state.token.is_some() && state.identity.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().phase.is_loading()
    }

    /// The outstanding renewal timer, if any.
    ///
    /// `None` while a renewal is in flight: the timer that triggered it
    /// has been consumed and the next one is scheduled on success.
    pub fn pending_refresh(&self) -> Option<TimerHandle> {
        self.lock().pending_timer
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    // =====================================================================
    // Operations
    // =====================================================================

    /// Validates a persisted token and restores the session from it.
    ///
    /// Runs at most once per controller; later calls return `Ok(())`
    /// without doing anything. No renewal is scheduled on success: the
    /// current-user endpoint carries no expiry, so the first renewal
    /// comes from the next login or manual refresh.
    ///
    /// # Errors
    /// - [`SessionError::Gateway`] if the token was rejected (the
    ///   session is cleared and the persisted token removed)
    /// - [`SessionError::Superseded`] if the session changed meanwhile
    /// - [`SessionError::Disposed`]
    pub async fn init(&self) -> Result<(), SessionError> {
        let (token, epoch) = {
            let mut state = self.lock();
            state.ensure_live()?;
            if state.initialized {
                return Ok(());
            }
            state.initialized = true;
            let Some(token) = state.token.clone() else {
                debug!("no persisted token, staying logged out");
                return Ok(());
            };
            state.phase = SessionPhase::Authenticating;
            self.publish(&state);
            (token, state.epoch)
        };

        let result = self.inner.gateway.current_user(&token).await;

        let mut state = self.lock();
        if !state.is_current(epoch) {
            debug!("discarding stale session restore result");
            return Err(SessionError::Superseded);
        }
        match result {
            Ok(user) => {
                let (identity, role) = user.into_parts();
                info!(user = %identity.username, %role, "session restored");
                state.identity = Some(identity);
                state.role = Some(role);
                state.phase = SessionPhase::Authenticated;
                self.publish(&state);
                Ok(())
            }
            Err(e) if state.token.as_ref() != Some(&token) => {
                // The token was replaced while it was being validated; the
                // rejection of the old one says nothing about the new one.
                debug!(error = %e, "ignoring restore failure for a replaced token");
                state.phase = state.settled_phase();
                self.publish(&state);
                Err(SessionError::Superseded)
            }
            Err(e) => {
                info!(error = %e, "persisted token rejected, logged out");
                self.clear_session(&mut state);
                Err(e.into())
            }
        }
    }

    /// Logs in and schedules the first silent renewal.
    ///
    /// The token is only committed (in memory and in the store) together
    /// with the identity returned by the follow-up current-user call, so
    /// observers never see a token without its owner.
    ///
    /// # Errors
    /// Any gateway failure is returned as-is after the session has been
    /// fully cleared. [`SessionError::Superseded`] if a logout or another
    /// login overtook this one.
    pub async fn login(&self, credentials: &Credentials) -> Result<(), SessionError> {
        let epoch = {
            let mut state = self.lock();
            state.ensure_live()?;
            state.epoch += 1;
            state.phase = SessionPhase::Authenticating;
            self.publish(&state);
            state.epoch
        };

        let result = self.authenticate(credentials).await;

        let mut state = self.lock();
        if !state.is_current(epoch) {
            debug!(user = %credentials.username, "discarding stale login result");
            return Err(SessionError::Superseded);
        }
        match result {
            Ok((auth, user)) => {
                let (identity, role) = user.into_parts();
                info!(
                    user = %identity.username,
                    %role,
                    expires_in = auth.expires_in,
                    "logged in"
                );
                state.token = Some(auth.access_token.clone());
                state.identity = Some(identity);
                state.role = Some(role);
                state.phase = SessionPhase::Authenticated;
                self.persist_token(&auth.access_token);
                self.schedule_refresh(&mut state, auth.expires_in);
                self.publish(&state);
                Ok(())
            }
            Err(e) => {
                info!(user = %credentials.username, error = %e, "login failed");
                self.clear_session(&mut state);
                Err(e)
            }
        }
    }

    /// Creates an account. Never logs in and never touches the session.
    ///
    /// # Errors
    /// Gateway failures (typically [`GatewayError::Validation`](crate::GatewayError::Validation)).
    pub async fn register(&self, data: &SignUpData) -> Result<CreatedUser, SessionError> {
        self.lock().ensure_live()?;
        match self.inner.gateway.register(data).await {
            Ok(created) => {
                info!(user = %created.username, id = %created.id, "account registered");
                Ok(created)
            }
            Err(e) => {
                info!(user = %data.username, error = %e, "registration rejected");
                Err(e.into())
            }
        }
    }

    /// Exchanges the current token for a fresh one and reschedules the
    /// next renewal. No-op if there is no token.
    ///
    /// This is the single renewal path: a manual refresh and a fired
    /// renewal timer both land here. Starting a renewal cancels the
    /// pending timer; the renewal schedules the next one when it succeeds.
    ///
    /// A token restored from the store is validated first: if
    /// [`init`](Self::init) hasn't run yet it runs now, and while it is
    /// still in flight the refresh is a no-op.
    ///
    /// # Errors
    /// A gateway failure clears the session (forced logout) and is
    /// returned. [`SessionError::Superseded`] if the session changed
    /// while the call was in flight (logout, another login, or another
    /// renewal that already replaced the token); the result was then
    /// discarded.
    pub async fn refresh_token(&self) -> Result<(), SessionError> {
        let needs_restore = {
            let state = self.lock();
            state.ensure_live()?;
            state.restore_pending()
        };
        if needs_restore {
            self.init().await?;
        }

        let (token, epoch) = {
            let mut state = self.lock();
            state.ensure_live()?;
            let Some(token) = state.token.clone() else {
                debug!("refresh skipped, no token");
                return Ok(());
            };
            if state.identity.is_none() {
                debug!("refresh skipped, persisted session is still being restored");
                return Ok(());
            }
            if let Some(handle) = state.pending_timer.take() {
                self.inner.scheduler.cancel(handle);
            }
            state.phase = SessionPhase::Refreshing;
            self.publish(&state);
            (token, state.epoch)
        };

        let result = self.renew(&token).await;

        let mut state = self.lock();
        if !state.is_current(epoch) {
            debug!("discarding stale refresh result");
            return Err(SessionError::Superseded);
        }
        if state.token.as_ref() != Some(&token) {
            // A login or another renewal replaced the token this call
            // renewed. Its outcome, success or failure, belongs to a
            // session that no longer exists.
            debug!(ok = result.is_ok(), "discarding refresh result for a replaced token");
            return Err(SessionError::Superseded);
        }
        match result {
            Ok(auth) => {
                info!(expires_in = auth.expires_in, "token renewed");
                state.token = Some(auth.access_token.clone());
                state.phase = state.settled_phase();
                self.persist_token(&auth.access_token);
                self.schedule_refresh(&mut state, auth.expires_in);
                self.publish(&state);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "token renewal failed, session cleared");
                self.clear_session(&mut state);
                Err(e)
            }
        }
    }

    /// Logs out: cancels the renewal timer, clears the session locally,
    /// then tells the gateway (best effort).
    ///
    /// Local cleanup never depends on the gateway: a client that cannot
    /// reach the server must still be able to forget its own session.
    pub async fn logout(&self) {
        let token = {
            let mut state = self.lock();
            let token = state.token.clone();
            self.clear_session(&mut state);
            token
        };

        if let Some(token) = token {
            if let Err(e) = self.inner.gateway.logout(&token).await {
                warn!(error = %e, "server-side logout failed, local session already cleared");
            }
        }
        info!("logged out");
    }

    /// Tears the controller down: cancels the renewal timer and discards
    /// the result of anything still in flight.
    ///
    /// The session is not cleared and the persisted token stays, so the
    /// next process can restore it. Dropping the last controller handle
    /// cancels the timer as well.
    pub fn dispose(&self) {
        let mut state = self.lock();
        if state.disposed {
            return;
        }
        state.disposed = true;
        if let Some(handle) = state.pending_timer.take() {
            self.inner.scheduler.cancel(handle);
        }
        debug!("session controller disposed");
    }

    // =====================================================================
    // Internals
    // =====================================================================

    /// Login followed by the current-user lookup for the new token.
    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<(AuthResult, UserSummary), SessionError> {
        let auth = self.inner.gateway.login(credentials).await?;
        auth.validate()?;
        let user = self.inner.gateway.current_user(&auth.access_token).await?;
        Ok((auth, user))
    }

    async fn renew(&self, token: &Token) -> Result<AuthResult, SessionError> {
        let auth = self.inner.gateway.refresh_token(token).await?;
        auth.validate()?;
        Ok(auth)
    }

    /// Replaces the renewal timer according to the token's lifetime.
    ///
    /// Always cancels the previous timer first. A token that doesn't
    /// outlive the safety margin gets no timer at all.
    fn schedule_refresh(&self, state: &mut SessionState, expires_in_secs: u64) {
        if let Some(previous) = state.pending_timer.take() {
            self.inner.scheduler.cancel(previous);
        }

        let lifetime = Duration::from_secs(expires_in_secs);
        let margin = self.inner.config.refresh_margin;
        if lifetime <= margin {
            debug!(
                expires_in = expires_in_secs,
                margin_secs = margin.as_secs(),
                "token lifetime within safety margin, renewal not scheduled"
            );
            return;
        }

        let delay = lifetime - margin;
        let weak = Arc::downgrade(&self.inner);
        let handle = self
            .inner
            .scheduler
            .schedule(delay, groundwork_timer::callback(move || run_scheduled_refresh(weak)));
        state.pending_timer = Some(handle);
        debug!(timer = %handle, delay_ms = delay.as_millis() as u64, "renewal scheduled");
    }

    /// Cancels the timer, then drops token, identity, role, and the
    /// persisted token in one step.
    fn clear_session(&self, state: &mut SessionState) {
        if let Some(handle) = state.pending_timer.take() {
            self.inner.scheduler.cancel(handle);
        }
        state.token = None;
        state.identity = None;
        state.role = None;
        state.phase = SessionPhase::LoggedOut;
        state.epoch += 1;
        if let Err(e) = self.inner.store.remove(&self.inner.config.token_key) {
            warn!(error = %e, "could not remove persisted token");
        }
        self.publish(state);
    }

    fn persist_token(&self, token: &Token) {
        if let Err(e) = self.inner.store.set(&self.inner.config.token_key, token.as_str()) {
            warn!(error = %e, "could not persist token, session will not survive a restart");
        }
    }

    /// Publishes under the state lock so observers see transitions in
    /// the order they happened.
    fn publish(&self, state: &SessionState) {
        self.inner.published.send_replace(state.snapshot());
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Body of a fired renewal timer.
///
/// Holds the controller weakly: once every handle is dropped there is
/// nothing left to renew, and the timer does nothing.
async fn run_scheduled_refresh<G, K, T>(weak: Weak<Inner<G, K, T>>)
where
    G: AuthGateway,
    K: KeyValueStore,
    T: TimerScheduler,
{
    let Some(inner) = weak.upgrade() else {
        return;
    };
    let controller = SessionController { inner };
    if let Err(e) = controller.refresh_token().await {
        debug!(error = %e, "scheduled renewal did not complete");
    }
}
