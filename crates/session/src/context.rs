//! Observable session state for views
//!
//! [`SessionState`] is a plain reducer; [`SessionContext`] drives the
//! [`SessionManager`] and publishes each new state over a `watch` channel so
//! any number of views can follow along.

use crate::error::SessionError;
use crate::manager::{Identity, SessionManager};
use portal_http::{Profile, RegisterRequest};
use std::sync::{Arc, Weak};
use tokio::sync::watch;

const SESSION_EXPIRED: &str = "Session expired. Please log in again.";

/// Snapshot of the session as seen by views
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<Profile>,
    pub permissions: Vec<String>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user: None,
            permissions: Vec::new(),
            // Nothing is known until the stored session has been checked
            is_loading: true,
            error: None,
        }
    }
}

/// State transitions
#[derive(Debug, Clone)]
pub enum SessionAction {
    /// Startup check finished, with the stored user if the session survived
    Restored(Option<Profile>),
    LoggedIn(Identity),
    LoggedOut,
    /// The session ended without the user asking for it
    Expired,
    /// An operation failed; the current user is kept
    Failed(String),
    SetLoading(bool),
}

impl SessionState {
    pub fn reduce(&self, action: SessionAction) -> Self {
        match action {
            SessionAction::Restored(user) => Self {
                user,
                permissions: Vec::new(),
                is_loading: false,
                error: None,
            },
            SessionAction::LoggedIn(identity) => Self {
                user: Some(identity.user),
                permissions: identity.permissions,
                is_loading: false,
                error: None,
            },
            SessionAction::LoggedOut => Self {
                user: None,
                permissions: Vec::new(),
                is_loading: false,
                error: None,
            },
            SessionAction::Expired => Self {
                user: None,
                permissions: Vec::new(),
                is_loading: false,
                error: Some(SESSION_EXPIRED.to_string()),
            },
            SessionAction::Failed(message) => Self {
                is_loading: false,
                error: Some(message),
                ..self.clone()
            },
            SessionAction::SetLoading(is_loading) => Self {
                is_loading,
                ..self.clone()
            },
        }
    }

    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

/// Session manager bound to an observable [`SessionState`]
pub struct SessionContext {
    manager: SessionManager,
    state: Arc<watch::Sender<SessionState>>,
}

impl SessionContext {
    /// Bind `manager`; sessions it tears down on its own (a failed background
    /// refresh, a rejected token) are published as [`SessionAction::Expired`]
    pub fn new(manager: SessionManager) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        let state = Arc::new(state);

        let weak: Weak<watch::Sender<SessionState>> = Arc::downgrade(&state);
        manager.on_session_ended(Arc::new(move || {
            if let Some(state) = weak.upgrade() {
                expire(&state);
            }
        }));

        Self { manager, state }
    }

    pub const fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// Follow state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Current snapshot
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn dispatch(&self, action: SessionAction) {
        self.state.send_modify(|state| *state = state.reduce(action));
    }

    /// Resume the stored session, if any
    pub async fn restore(&self) -> Option<Profile> {
        self.dispatch(SessionAction::SetLoading(true));
        let user = self.manager.restore().await;
        self.dispatch(SessionAction::Restored(user.clone()));
        user
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, SessionError> {
        self.dispatch(SessionAction::SetLoading(true));
        let result = self.manager.login(email, password).await;
        self.settle(result)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<Identity, SessionError> {
        self.dispatch(SessionAction::SetLoading(true));
        let result = self.manager.register(request).await;
        self.settle(result)
    }

    pub async fn google_login(&self, id_token: &str) -> Result<Identity, SessionError> {
        self.dispatch(SessionAction::SetLoading(true));
        let result = self.manager.google_login(id_token).await;
        self.settle(result)
    }

    pub async fn logout(&self) {
        self.manager.logout().await;
        self.dispatch(SessionAction::LoggedOut);
    }

    /// Reload the profile from the API
    pub async fn refresh_user(&self) -> Result<Identity, SessionError> {
        match self.manager.fetch_current_user().await {
            Ok(identity) => {
                self.dispatch(SessionAction::LoggedIn(identity.clone()));
                Ok(identity)
            }
            Err(e) if e.requires_login() => {
                self.dispatch(SessionAction::Expired);
                Err(e)
            }
            Err(e) => {
                self.dispatch(SessionAction::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Bearer credential for an API call; marks the session expired when
    /// none can be produced for a signed-in user
    pub async fn ensure_valid_token(&self) -> Option<String> {
        let token = self.manager.ensure_valid_token().await;
        if token.is_none() && self.state.borrow().is_authenticated() {
            self.dispatch(SessionAction::Expired);
        }
        token
    }

    fn settle(&self, result: Result<Identity, SessionError>) -> Result<Identity, SessionError> {
        match &result {
            Ok(identity) => self.dispatch(SessionAction::LoggedIn(identity.clone())),
            Err(e) => self.dispatch(SessionAction::Failed(e.to_string())),
        }
        result
    }
}

/// Publish an expiry, notifying only if it changes the state
fn expire(state: &watch::Sender<SessionState>) {
    state.send_if_modified(|current| {
        let next = current.reduce(SessionAction::Expired);
        let changed = *current != next;
        *current = next;
        changed
    });
}
