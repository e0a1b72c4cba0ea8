//! Talent Connect client-side session manager
//!
//! Keeps an obfuscated copy of the session in a key-value store, mirrors it in
//! an observable [`SessionContainer`], drives the OTP and password lifecycles
//! against the backend and guards routes on authentication and role.

pub mod api;
pub mod codec;
pub mod credentials;
pub mod guard;
pub mod roles;
pub mod session;
pub mod state;
pub mod storage;
pub mod types;

pub use api::{ApiError, AuthApi, HttpAuthApi};
pub use codec::{CodecError, Obfuscator};
pub use credentials::CredentialStore;
pub use guard::{Access, GuardDecision, NavigationRequest, RouteGuard};
pub use roles::{Role, RoleResolver, RoleSet};
pub use session::{ActionError, LogoutOutcome, SessionManager};
pub use state::{ActionPhase, SessionAction, SessionContainer, SessionState};
pub use storage::{KeyValueStore, MemoryStore, StorageError};
pub use types::{AuthResponse, LoginCredentials, SessionPayload, UserProfile};

#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStore;

#[cfg(target_arch = "wasm32")]
pub use storage::BrowserStore;
