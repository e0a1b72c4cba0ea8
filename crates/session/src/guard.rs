//! Per-navigation route guarding

use crate::credentials::CredentialStore;
use crate::roles::{RoleResolver, RoleSet};
use crate::state::SessionContainer;
use std::sync::Arc;
use talent_core::RouteConfig;
use tracing::debug;

/// A navigation attempt and the roles it requires
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    pub target: String,
    pub required_roles: RoleSet,
}

impl NavigationRequest {
    /// Navigation open to any authenticated user
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            required_roles: RoleSet::new(),
        }
    }

    /// Require at least one of `roles`
    #[must_use]
    pub fn requiring<S: Into<String>>(mut self, roles: impl IntoIterator<Item = S>) -> Self {
        for role in roles {
            self.required_roles.insert(role);
        }
        self
    }
}

/// Raw guard outcome, before redirect targets are attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Denied,
    Forbidden,
}

/// Decide access from already-gathered inputs
///
/// Both the in-memory flag and the stored token must agree before roles are
/// even considered.
pub fn evaluate_access(
    required: &RoleSet,
    session_authenticated: bool,
    stored_token_present: bool,
    actual: &RoleSet,
) -> Access {
    if !session_authenticated || !stored_token_present {
        return Access::Denied;
    }
    if !RoleResolver::has_any(required, actual) {
        return Access::Forbidden;
    }
    Access::Allowed
}

/// Result of guarding a navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allowed,
    /// Not authenticated; `return_to` is the target to resume after login
    Denied { redirect: String, return_to: String },
    /// Authenticated but missing every required role
    Forbidden { redirect: String },
}

impl GuardDecision {
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    pub fn redirect(&self) -> Option<&str> {
        match self {
            Self::Allowed => None,
            Self::Denied { redirect, .. } | Self::Forbidden { redirect } => Some(redirect),
        }
    }
}

/// Evaluates navigations against the live session, fresh every time
#[derive(Debug, Clone)]
pub struct RouteGuard {
    container: Arc<SessionContainer>,
    store: CredentialStore,
    routes: RouteConfig,
}

impl RouteGuard {
    pub fn new(container: Arc<SessionContainer>, routes: RouteConfig) -> Self {
        let store = container.store().clone();
        Self {
            container,
            store,
            routes,
        }
    }

    pub fn evaluate(&self, request: &NavigationRequest) -> GuardDecision {
        let state = self.container.snapshot();
        let session_authenticated = state.is_authenticated && state.user.is_some();
        let stored_token_present = self.store.access_token().is_some();

        let access = evaluate_access(
            &request.required_roles,
            session_authenticated,
            stored_token_present,
            &state.roles,
        );
        debug!(
            route = %request.target,
            required = %request.required_roles,
            session_authenticated,
            stored_token_present,
            ?access,
            "Route guard evaluated"
        );

        match access {
            Access::Allowed => GuardDecision::Allowed,
            Access::Denied => GuardDecision::Denied {
                redirect: self.routes.login.clone(),
                return_to: request.target.clone(),
            },
            Access::Forbidden => GuardDecision::Forbidden {
                redirect: self.routes.unauthorized.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Obfuscator;
    use crate::storage::MemoryStore;
    use crate::types::UserProfile;
    use serde_json::json;

    fn roles(names: &[&str]) -> RoleSet {
        names.iter().copied().collect()
    }

    fn guard_with_session(role: Option<&str>) -> (RouteGuard, CredentialStore) {
        let store = CredentialStore::new(
            Arc::new(MemoryStore::new()),
            "auth_state",
            Obfuscator::new("test-secret").unwrap(),
        );
        if let Some(role) = role {
            let user: UserProfile = serde_json::from_value(json!({"role": role})).unwrap();
            store.save(&user, "tok123", Some("ref456")).unwrap();
        }
        let container = Arc::new(SessionContainer::new(store.clone()));
        (RouteGuard::new(container, RouteConfig::default()), store)
    }

    #[test]
    fn test_evaluate_access_table() {
        let none = RoleSet::new();
        assert_eq!(evaluate_access(&none, true, true, &none), Access::Allowed);
        assert_eq!(evaluate_access(&none, false, true, &none), Access::Denied);
        assert_eq!(evaluate_access(&none, true, false, &none), Access::Denied);
        assert_eq!(
            evaluate_access(&roles(&["admin"]), true, true, &roles(&["user"])),
            Access::Forbidden
        );
        assert_eq!(
            evaluate_access(&roles(&["admin"]), false, true, &roles(&["user"])),
            Access::Denied
        );
        assert_eq!(
            evaluate_access(&roles(&["admin", "user"]), true, true, &roles(&["user"])),
            Access::Allowed
        );
    }

    #[test]
    fn test_no_requirement_allows_any_role() {
        let (guard, _) = guard_with_session(Some("guest"));
        assert_eq!(guard.evaluate(&NavigationRequest::new("/jobs")), GuardDecision::Allowed);
    }

    #[test]
    fn test_unauthenticated_is_denied() {
        let (guard, _) = guard_with_session(None);
        let decision = guard.evaluate(&NavigationRequest::new("/jobs"));
        assert_eq!(
            decision,
            GuardDecision::Denied {
                redirect: "/login".to_string(),
                return_to: "/jobs".to_string(),
            }
        );
        assert_eq!(decision.redirect(), Some("/login"));
    }

    #[test]
    fn test_role_mismatch_is_forbidden() {
        let (guard, _) = guard_with_session(Some("user"));
        let decision = guard.evaluate(&NavigationRequest::new("/companies").requiring(["admin"]));
        assert_eq!(
            decision,
            GuardDecision::Forbidden {
                redirect: "/unauthorized".to_string()
            }
        );
    }

    #[test]
    fn test_externally_cleared_storage_is_denied() {
        let (guard, store) = guard_with_session(Some("admin"));
        assert!(guard.container.is_authenticated());

        store.clear().unwrap();
        // The in-memory session still claims to be authenticated
        assert!(guard.container.is_authenticated());
        let decision = guard.evaluate(&NavigationRequest::new("/admin").requiring(["admin"]));
        assert!(matches!(decision, GuardDecision::Denied { .. }));
    }

    #[test]
    fn test_decision_tracks_session_changes() {
        let (guard, store) = guard_with_session(Some("admin"));
        let request = NavigationRequest::new("/admin").requiring(["admin"]);
        assert!(guard.evaluate(&request).is_allowed());

        store.clear().unwrap();
        guard.container.clear_credentials();
        assert!(!guard.evaluate(&request).is_allowed());
    }

    #[test]
    fn test_custom_redirects() {
        let (guard, _) = guard_with_session(Some("user"));
        let guard = RouteGuard::new(
            guard.container,
            RouteConfig {
                login: "/auth/sign-in".to_string(),
                unauthorized: "/403".to_string(),
            },
        );
        let decision = guard.evaluate(&NavigationRequest::new("/admin").requiring(["admin"]));
        assert_eq!(decision.redirect(), Some("/403"));
    }
}
