//! Role normalisation and role checks

use crate::types::UserProfile;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

/// Known dashboard roles, ordered by privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    User,
    Admin,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
            Self::Guest => "guest",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    /// Case-sensitive: "Admin" is not a role
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            "guest" => Ok(Self::Guest),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// The `role` field of a user profile as the backend sends it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoleField {
    One(String),
    Many(Vec<String>),
}

/// Deduplicated role names in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(Vec<String>);

impl RoleSet {
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Add a role, ignoring duplicates
    pub fn insert(&mut self, role: impl Into<String>) -> bool {
        let role = role.into();
        if self.0.contains(&role) {
            return false;
        }
        self.0.push(role);
        true
    }

    pub fn contains(&self, role: &str) -> bool {
        self.0.iter().any(|r| r == role)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Recognised roles only
    pub fn known(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().filter_map(|r| r.parse().ok())
    }
}

impl<S: Into<String>> FromIterator<S> for RoleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for role in iter {
            set.insert(role);
        }
        set
    }
}

impl From<Role> for RoleSet {
    fn from(role: Role) -> Self {
        std::iter::once(role.as_str()).collect()
    }
}

impl Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// Derives role sets from user profiles and compares them
pub struct RoleResolver;

impl RoleResolver {
    /// Normalise `user.role` into a role set; a missing role yields an empty set
    pub fn resolve(user: &UserProfile) -> RoleSet {
        match &user.role {
            Some(RoleField::One(role)) => std::iter::once(role.clone()).collect(),
            Some(RoleField::Many(roles)) => roles.iter().cloned().collect(),
            None => RoleSet::new(),
        }
    }

    /// `admin > user > guest`; defaults to `guest` when nothing is recognised
    pub fn highest_priority(roles: &RoleSet) -> Role {
        roles.known().max().unwrap_or(Role::Guest)
    }

    /// True if any required role is held; no requirement always passes
    pub fn has_any(required: &RoleSet, actual: &RoleSet) -> bool {
        required.is_empty() || required.iter().any(|role| actual.contains(role))
    }
}
