//! Observable in-memory session state
//!
//! [`SessionContainer`] is the single in-memory source of session truth. It
//! mirrors the [`CredentialStore`] but never writes to it: callers persist
//! first and then update the container.
//!
//! Lifecycle actions move through `Idle -> Pending -> Fulfilled | Rejected`.
//! Starting a new action supersedes any action still in flight: its
//! cancellation token fires and its late result is discarded.

use crate::credentials::CredentialStore;
use crate::roles::{RoleResolver, RoleSet};
use crate::types::{SessionPayload, UserProfile};
use serde::Serialize;
use std::fmt::{self, Display};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Asynchronous session lifecycle actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionAction {
    RequestOtp,
    VerifyOtp,
    Login,
    Logout,
}

impl Display for SessionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RequestOtp => "requestOtp",
            Self::VerifyOtp => "verifyOtp",
            Self::Login => "login",
            Self::Logout => "logout",
        };
        f.write_str(name)
    }
}

/// Phase of a lifecycle action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionPhase {
    Idle,
    Pending,
    Fulfilled,
    Rejected(String),
}

/// The most recent lifecycle action and where it stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionActivity {
    pub action: SessionAction,
    pub phase: ActionPhase,
}

/// Snapshot of the in-memory session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub user: Option<UserProfile>,
    pub roles: RoleSet,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<String>,
    pub activity: Option<ActionActivity>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::unauthenticated()
    }
}

impl SessionState {
    pub const fn unauthenticated() -> Self {
        Self {
            user: None,
            roles: RoleSet::new(),
            is_authenticated: false,
            is_loading: false,
            error: None,
            activity: None,
        }
    }

    /// Initial state for whatever the credential store currently holds
    pub fn from_payload(payload: Option<SessionPayload>) -> Self {
        let mut state = Self::unauthenticated();
        if let Some(payload) = payload.filter(SessionPayload::is_valid) {
            if let Some(user) = payload.user {
                state.apply_credentials(user, None);
            }
        }
        state
    }

    pub(crate) fn apply_credentials(&mut self, user: UserProfile, roles: Option<RoleSet>) {
        self.roles = roles.unwrap_or_else(|| RoleResolver::resolve(&user));
        self.user = Some(user);
        self.is_authenticated = true;
    }

    fn clear_credentials(&mut self) {
        self.user = None;
        self.roles = RoleSet::new();
        self.is_authenticated = false;
    }

    /// Phase of `action`; anything other than the latest action is idle
    pub fn phase_of(&self, action: SessionAction) -> ActionPhase {
        match &self.activity {
            Some(activity) if activity.action == action => activity.phase.clone(),
            _ => ActionPhase::Idle,
        }
    }
}

/// Returned when a superseded action tries to settle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{0} was superseded by a newer session action")]
pub struct Superseded(pub SessionAction);

/// Handle for one in-flight lifecycle action
#[derive(Debug, Clone)]
pub struct ActionTicket {
    action: SessionAction,
    generation: u64,
    cancel: CancellationToken,
}

impl ActionTicket {
    pub const fn action(&self) -> SessionAction {
        self.action
    }

    /// Resolves once a newer action supersedes this one
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Generation of the latest action and its cancellation token while unsettled
#[derive(Default)]
struct InFlight {
    generation: u64,
    cancel: Option<CancellationToken>,
}

/// Explicitly constructed, observable session state container
///
/// Starting and settling actions serialize on `in_flight`, which is always
/// taken before the state channel.
pub struct SessionContainer {
    store: CredentialStore,
    state: watch::Sender<SessionState>,
    in_flight: Mutex<InFlight>,
}

impl fmt::Debug for SessionContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContainer")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionContainer {
    /// Create a container initialised from the credential store
    pub fn new(store: CredentialStore) -> Self {
        let initial = SessionState::from_payload(store.load());
        debug!(
            authenticated = initial.is_authenticated,
            roles = %initial.roles,
            "Session container created"
        );
        let (state, _) = watch::channel(initial);
        Self {
            store,
            state,
            in_flight: Mutex::new(InFlight::default()),
        }
    }

    pub const fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Current state
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receive every subsequent state transition
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.state.borrow().user.clone()
    }

    pub fn roles(&self) -> RoleSet {
        self.state.borrow().roles.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn activity(&self) -> Option<ActionActivity> {
        self.state.borrow().activity.clone()
    }

    /// Mark the session authenticated; roles default to those of `user`
    pub fn set_credentials(&self, user: UserProfile, roles: Option<RoleSet>) {
        self.state.send_modify(|state| state.apply_credentials(user, roles));
    }

    /// Drop the in-memory session; the credential store is left untouched
    pub fn clear_credentials(&self) {
        self.state.send_modify(SessionState::clear_credentials);
    }

    /// Re-read the credential store and reconcile the in-memory session
    pub fn sync_with_storage(&self) {
        match self.store.load().filter(SessionPayload::is_valid) {
            Some(SessionPayload {
                user: Some(user), ..
            }) => {
                debug!("Resynced session from storage");
                self.set_credentials(user, None);
            }
            _ => {
                if self.is_authenticated() {
                    debug!("Stored session is gone; clearing in-memory session");
                }
                self.clear_credentials();
            }
        }
    }

    fn in_flight(&self) -> MutexGuard<'_, InFlight> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enter the pending phase of `action`, superseding any in-flight action
    pub fn begin(&self, action: SessionAction) -> ActionTicket {
        let cancel = CancellationToken::new();
        let mut in_flight = self.in_flight();
        in_flight.generation += 1;
        if let Some(previous) = in_flight.cancel.replace(cancel.clone()) {
            previous.cancel();
        }
        let generation = in_flight.generation;

        debug!(%action, generation, "Session action pending");
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
            state.activity = Some(ActionActivity {
                action,
                phase: ActionPhase::Pending,
            });
        });

        ActionTicket {
            action,
            generation,
            cancel,
        }
    }

    /// Whether `ticket` belongs to the most recently started action
    pub fn is_current(&self, ticket: &ActionTicket) -> bool {
        Self::is_latest(&self.in_flight(), ticket)
    }

    fn is_latest(in_flight: &InFlight, ticket: &ActionTicket) -> bool {
        !ticket.is_cancelled() && in_flight.generation == ticket.generation
    }

    /// Settle `ticket` successfully, applying `update` to the state
    pub fn fulfill(
        &self,
        ticket: &ActionTicket,
        update: impl FnOnce(&mut SessionState),
    ) -> Result<(), Superseded> {
        self.settle(ticket, |state| {
            update(state);
            state.error = None;
            ActionPhase::Fulfilled
        })
    }

    /// Settle `ticket` with an error; the session itself is left unchanged
    pub fn reject(&self, ticket: &ActionTicket, message: impl Into<String>) -> Result<(), Superseded> {
        let message = message.into();
        self.settle(ticket, |state| {
            state.error = Some(message.clone());
            ActionPhase::Rejected(message)
        })
    }

    fn settle(
        &self,
        ticket: &ActionTicket,
        apply: impl FnOnce(&mut SessionState) -> ActionPhase,
    ) -> Result<(), Superseded> {
        let mut in_flight = self.in_flight();
        if !Self::is_latest(&in_flight, ticket) {
            debug!(action = %ticket.action, "Discarding result of superseded action");
            return Err(Superseded(ticket.action));
        }
        in_flight.cancel = None;

        self.state.send_modify(|state| {
            let phase = apply(state);
            debug!(action = %ticket.action, ?phase, "Session action settled");
            state.is_loading = false;
            state.activity = Some(ActionActivity {
                action: ticket.action,
                phase,
            });
        });
        Ok(())
    }

    /// Replace `state` with the initial state for the current store contents
    pub(crate) fn reset_from_storage(&self, state: &mut SessionState) {
        *state = SessionState::from_payload(self.store.load());
    }

    /// End the container's lifecycle, cancelling any in-flight action
    ///
    /// The cancelled action can no longer settle, so loading is cleared here.
    pub fn dispose(&self) {
        let mut in_flight = self.in_flight();
        if let Some(token) = in_flight.cancel.take() {
            token.cancel();
            self.state.send_modify(|state| state.is_loading = false);
        }
        debug!("Session container disposed");
    }
}
