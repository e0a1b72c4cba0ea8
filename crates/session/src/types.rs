//! Session payload and wire types

use crate::roles::RoleField;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User profile as returned by the backend
///
/// Only `role` is interpreted; every other field is carried through
/// untouched so the dashboard can render it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleField>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl UserProfile {
    /// Look up an arbitrary profile field
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Display name, falling back to the email address
    pub fn display_name(&self) -> Option<&str> {
        self.attribute("name")
            .or_else(|| self.attribute("email"))
            .and_then(Value::as_str)
    }
}

/// Persisted session bundle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    #[serde(default)]
    pub user: Option<UserProfile>,
    #[serde(default)]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl SessionPayload {
    /// A payload restores a session only with both a user and an access token
    pub fn is_valid(&self) -> bool {
        self.user.is_some() && !self.access_token.is_empty()
    }
}

/// OTP request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpRequest {
    pub email: String,
}

/// OTP verification body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpVerifyRequest {
    pub email: String,
    pub otp: String,
}

/// Password login body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

/// Successful OTP verification or login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProfile,
}

/// Logout and token refresh body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Tokens issued by a refresh-token exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    /// Present when the backend rotates refresh tokens
    #[serde(default)]
    pub refresh_token: Option<String>,
}
