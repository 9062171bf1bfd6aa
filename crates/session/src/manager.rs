//! Access token lifecycle
//!
//! [`SessionManager`] owns the session store, the API seam and the single
//! proactive-refresh timer. Every authenticated call is expected to obtain its
//! bearer credential from [`SessionManager::ensure_valid_token`].
//!
//! Refresh is fail-closed: any failure while refreshing removes the whole
//! session and cancels the timer.

use crate::api::AuthApi;
use crate::error::SessionError;
use crate::store::SessionStore;
use crate::timer::{self, RefreshTimer};
use portal_core::{SessionConfig, token};
use portal_http::{AuthResponse, Profile, RegisterRequest};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// The signed-in user and what they may do
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: Profile,
    pub permissions: Vec<String>,
}

impl From<AuthResponse> for Identity {
    fn from(response: AuthResponse) -> Self {
        Self {
            user: response.user,
            permissions: response.permissions,
        }
    }
}

/// Called when a session ends without the user asking for it
pub type SessionEndedListener = Arc<dyn Fn() + Send + Sync>;

struct Inner {
    store: SessionStore,
    api: Arc<dyn AuthApi>,
    refresh_interval: Duration,
    timer: Mutex<Option<RefreshTimer>>,
    generation: AtomicU64,
    /// Serializes refreshes so concurrent callers share one round trip
    refresh_lock: tokio::sync::Mutex<()>,
    listeners: Mutex<Vec<SessionEndedListener>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let timer = self
            .timer
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(timer) = timer {
            timer.cancel();
        }
    }
}

/// Session lifecycle manager.
///
/// Cheap to clone; clones share the same session and timer. Create one per
/// session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(store: SessionStore, api: Arc<dyn AuthApi>, config: &SessionConfig) -> Self {
        Self::with_refresh_interval(store, api, config.refresh_interval())
    }

    /// Create a manager refreshing `interval` after each token is issued
    pub fn with_refresh_interval(
        store: SessionStore,
        api: Arc<dyn AuthApi>,
        interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                api,
                refresh_interval: interval,
                timer: Mutex::new(None),
                generation: AtomicU64::new(0),
                refresh_lock: tokio::sync::Mutex::new(()),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.inner.store
    }

    pub fn refresh_interval(&self) -> Duration {
        self.inner.refresh_interval
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.store.access_token()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.inner.store.refresh_token()
    }

    pub fn user(&self) -> Option<Profile> {
        self.inner.store.user()
    }

    pub fn set_user(&self, user: &Profile) -> Result<(), SessionError> {
        Ok(self.inner.store.set_user(user)?)
    }

    /// Drop the whole session: tokens, profile and pending refresh
    pub fn clear_auth(&self) {
        self.stop_refresh_timer();
        if let Err(e) = self.inner.store.clear() {
            warn!(error = %e, "Failed to clear stored session");
        }
    }

    /// Register `listener` to run whenever the session is torn down by a
    /// failed refresh or a rejected access token. Explicit logout and
    /// [`clear_auth`](Self::clear_auth) do not notify.
    pub fn on_session_ended(&self, listener: SessionEndedListener) {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    fn end_session(&self) {
        self.clear_auth();
        let listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener();
        }
    }

    fn lock_timer(&self) -> MutexGuard<'_, Option<RefreshTimer>> {
        self.inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Schedule the proactive refresh, replacing any pending one
    pub fn start_refresh_timer(&self) {
        let mut slot = self.lock_timer();
        if let Some(previous) = slot.take() {
            previous.cancel();
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let weak = Arc::downgrade(&self.inner);
        let task = async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let manager = Self { inner };
            if manager.claim_timer(generation) {
                debug!(generation, "Proactive token refresh due");
                manager.refresh_access_token().await;
            }
        };

        *slot = timer::schedule(self.inner.refresh_interval, generation, task);
        if slot.is_some() {
            debug!(
                generation,
                delay_secs = self.inner.refresh_interval.as_secs(),
                "Scheduled token refresh"
            );
        } else {
            warn!("No async runtime available, proactive token refresh disabled");
        }
    }

    /// Cancel the pending refresh, if any
    pub fn stop_refresh_timer(&self) {
        if let Some(timer) = self.lock_timer().take() {
            debug!(generation = timer.generation(), "Cancelled token refresh");
            timer.cancel();
        }
    }

    /// Whether a proactive refresh is scheduled
    pub fn has_pending_refresh(&self) -> bool {
        self.lock_timer().is_some()
    }

    /// Release the timer slot if it still belongs to `generation`
    fn claim_timer(&self, generation: u64) -> bool {
        let mut slot = self.lock_timer();
        if slot.as_ref().is_some_and(|t| t.generation() == generation) {
            slot.take();
            true
        } else {
            false
        }
    }

    /// Exchange the stored refresh token for a new session.
    ///
    /// Returns `false` without a network call when no refresh token is stored.
    /// Any other failure clears the session.
    pub async fn refresh_access_token(&self) -> bool {
        let _guard = self.inner.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> bool {
        let Some(refresh_token) = self.inner.store.refresh_token() else {
            debug!("No refresh token stored, skipping refresh");
            return false;
        };

        let response = match self.inner.api.refresh_token(&refresh_token).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Token refresh failed, ending session");
                self.end_session();
                return false;
            }
        };

        if let Err(e) = self.inner.store.persist(&response) {
            warn!(error = %e, "Failed to store refreshed session, ending session");
            self.end_session();
            return false;
        }

        self.start_refresh_timer();
        debug!(user_id = %response.user.id, "Access token refreshed");
        true
    }

    fn usable_access_token(&self) -> Option<String> {
        self.access_token()
            .filter(|t| !token::is_expired(Some(t.as_str())))
    }

    /// A non-expired access token, refreshing first if necessary.
    ///
    /// `None` means the caller is logged out.
    pub async fn ensure_valid_token(&self) -> Option<String> {
        if let Some(token) = self.usable_access_token() {
            return Some(token);
        }

        let _guard = self.inner.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited
        if let Some(token) = self.usable_access_token() {
            return Some(token);
        }

        if !self.refresh_locked().await {
            return None;
        }

        let token = self.usable_access_token();
        if token.is_none() {
            warn!("Refresh returned an access token that is already expired");
        }
        token
    }

    fn establish(&self, response: AuthResponse) -> Result<Identity, SessionError> {
        if let Err(e) = self.inner.store.persist(&response) {
            self.clear_auth();
            return Err(e.into());
        }
        self.start_refresh_timer();
        info!(user_id = %response.user.id, role = %response.user.role, "Session established");
        Ok(response.into())
    }

    /// Log in with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, SessionError> {
        let response = self.inner.api.login(email, password).await?;
        self.establish(response)
    }

    /// Create an account and start its session
    pub async fn register(&self, request: &RegisterRequest) -> Result<Identity, SessionError> {
        let response = self.inner.api.register(request).await?;
        self.establish(response)
    }

    /// Log in with a Google ID token
    pub async fn google_login(&self, id_token: &str) -> Result<Identity, SessionError> {
        let response = self.inner.api.google_login(id_token).await?;
        self.establish(response)
    }

    /// Revoke the refresh token and clear the session.
    ///
    /// The local session is cleared even when revocation fails.
    pub async fn logout(&self) {
        self.stop_refresh_timer();
        if let Some(refresh_token) = self.refresh_token()
            && let Err(e) = self.inner.api.logout(&refresh_token).await
        {
            warn!(error = %e, "Logout request failed, clearing local session anyway");
        }
        self.clear_auth();
        info!("Logged out");
    }

    /// Reload the profile from the API and store it
    pub async fn fetch_current_user(&self) -> Result<Identity, SessionError> {
        let token = self
            .ensure_valid_token()
            .await
            .ok_or(SessionError::NotAuthenticated)?;

        let me = match self.inner.api.get_me(&token).await {
            Ok(me) => me,
            Err(e) if e.is_auth_error() => {
                warn!(error = %e, "Access token rejected, ending session");
                self.end_session();
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        self.inner.store.set_user(&me.user)?;
        Ok(Identity {
            user: me.user,
            permissions: me.permissions,
        })
    }

    /// Resume a persisted session at startup.
    ///
    /// Returns the stored user when the session is still usable, refreshing
    /// it first if needed, and schedules the proactive refresh.
    pub async fn restore(&self) -> Option<Profile> {
        if self.access_token().is_none() && self.refresh_token().is_none() {
            return None;
        }

        self.ensure_valid_token().await?;
        if !self.has_pending_refresh() {
            self.start_refresh_timer();
        }

        match self.user() {
            Some(user) => Some(user),
            None => match self.fetch_current_user().await {
                Ok(identity) => Some(identity.user),
                Err(e) => {
                    warn!(error = %e, "Could not reload profile for restored session");
                    None
                }
            },
        }
    }
}
