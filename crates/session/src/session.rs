//! Session lifecycle: OTP, password login and logout
//!
//! Each action persists through the [`CredentialStore`] first and only then
//! updates the [`SessionContainer`]. Network calls race the action's
//! cancellation token so a superseded call never lands a stale result.

use crate::api::{ApiError, AuthApi};
use crate::credentials::CredentialStore;
use crate::guard::RouteGuard;
use crate::state::{ActionTicket, SessionAction, SessionContainer, Superseded};
use crate::storage::StorageError;
use crate::types::{AuthResponse, LoginCredentials, UserProfile};
use std::future::Future;
use std::sync::Arc;
use talent_core::RouteConfig;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a lifecycle action was rejected
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Could not persist session: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Superseded(#[from] Superseded),
}

/// How the backend took part in a logout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutOutcome {
    /// The backend revoked the refresh token
    Notified,
    /// No refresh token was stored, so the backend was not called
    Skipped,
    /// The backend call failed; the refresh token may stay live until it expires
    BackendFailed(String),
}

/// Drives the session lifecycle against the backend
pub struct SessionManager {
    store: CredentialStore,
    container: Arc<SessionContainer>,
    api: Arc<dyn AuthApi>,
}

impl SessionManager {
    pub fn new(container: Arc<SessionContainer>, api: Arc<dyn AuthApi>) -> Self {
        Self {
            store: container.store().clone(),
            container,
            api,
        }
    }

    pub const fn container(&self) -> &Arc<SessionContainer> {
        &self.container
    }

    /// A route guard over this manager's session
    pub fn guard(&self, routes: RouteConfig) -> RouteGuard {
        RouteGuard::new(Arc::clone(&self.container), routes)
    }

    /// Ask the backend to email a one-time password
    pub async fn request_otp(&self, email: &str) -> Result<(), ActionError> {
        let ticket = self.container.begin(SessionAction::RequestOtp);
        match race(&ticket, self.api.request_otp(email)).await {
            Ok(()) => {
                self.container.fulfill(&ticket, |_| {})?;
                debug!("OTP requested");
                Ok(())
            }
            Err(err) => self.rejected(&ticket, err),
        }
    }

    /// Verify a one-time password and start the session
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<UserProfile, ActionError> {
        let ticket = self.container.begin(SessionAction::VerifyOtp);
        self.authenticate(&ticket, self.api.verify_otp(email, otp))
            .await
    }

    /// Password login
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<UserProfile, ActionError> {
        let ticket = self.container.begin(SessionAction::Login);
        self.authenticate(&ticket, self.api.login(credentials)).await
    }

    async fn authenticate(
        &self,
        ticket: &ActionTicket,
        call: impl Future<Output = Result<AuthResponse, ApiError>>,
    ) -> Result<UserProfile, ActionError> {
        let response = match race(ticket, call).await {
            Ok(response) => response,
            Err(err) => return self.rejected(ticket, err),
        };

        if !self.container.is_current(ticket) {
            return Err(Superseded(ticket.action()).into());
        }

        if let Err(err) = self.store.save(
            &response.user,
            &response.access_token,
            Some(&response.refresh_token),
        ) {
            return self.rejected(ticket, err.into());
        }

        let user = response.user;
        self.container
            .fulfill(ticket, |state| state.apply_credentials(user.clone(), None))?;
        info!(action = %ticket.action(), roles = %self.container.roles(), "Session started");
        Ok(user)
    }

    /// End the session
    ///
    /// The backend is notified when a refresh token is stored, but the local
    /// session ends whether or not that call succeeds.
    pub async fn logout(&self) -> Result<LogoutOutcome, ActionError> {
        let ticket = self.container.begin(SessionAction::Logout);

        let outcome = match self.store.refresh_token() {
            None => {
                debug!("No refresh token stored; skipping backend logout");
                LogoutOutcome::Skipped
            }
            Some(refresh_token) => match race(&ticket, self.api.logout(&refresh_token)).await {
                Ok(()) => LogoutOutcome::Notified,
                // A newer action owns the session now; leave storage to it
                Err(err @ ActionError::Superseded(_)) => return Err(err),
                Err(err) => {
                    warn!(error = %err, "Backend logout failed; ending session locally");
                    LogoutOutcome::BackendFailed(err.to_string())
                }
            },
        };

        if let Err(err) = self.store.clear() {
            warn!(error = %err, "Failed to clear stored session");
            self.container.clear_credentials();
            return self.rejected(&ticket, err.into());
        }
        self.container.clear_credentials();

        let container = &self.container;
        container.fulfill(&ticket, |state| container.reset_from_storage(state))?;
        info!(?outcome, "Session ended");
        Ok(outcome)
    }

    /// Reconcile the in-memory session with storage
    pub fn sync_with_storage(&self) {
        self.container.sync_with_storage();
    }

    /// Resync whenever another tab changes the stored session
    ///
    /// The listener is removed when the returned handle is dropped.
    #[cfg(target_arch = "wasm32")]
    pub fn watch_storage(&self) -> Option<gloo_events::EventListener> {
        use wasm_bindgen::JsCast;

        let window = web_sys::window()?;
        let container = Arc::clone(&self.container);
        let key = self.store.key().to_string();

        Some(gloo_events::EventListener::new(&window, "storage", move |event| {
            // A `None` key means the whole store was cleared
            let relevant = event
                .dyn_ref::<web_sys::StorageEvent>()
                .and_then(web_sys::StorageEvent::key)
                .is_none_or(|changed| changed == key);
            if relevant {
                container.sync_with_storage();
            }
        }))
    }

    fn rejected<T>(&self, ticket: &ActionTicket, err: ActionError) -> Result<T, ActionError> {
        if !matches!(err, ActionError::Superseded(_)) {
            self.container.reject(ticket, err.to_string())?;
        }
        Err(err)
    }
}

async fn race<T>(
    ticket: &ActionTicket,
    call: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, ActionError> {
    tokio::select! {
        biased;
        () = ticket.cancelled() => Err(Superseded(ticket.action()).into()),
        result = call => result.map_err(ActionError::from),
    }
}
