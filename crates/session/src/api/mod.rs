//! Authentication backend

pub mod client;
pub mod error;

pub use client::{HttpAuthApi, HttpAuthApiBuilder};
pub use error::ApiError;

use crate::types::{AuthResponse, LoginCredentials, TokenPair};
use async_trait::async_trait;

/// Calls the session lifecycle depends on
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait AuthApi: Send + Sync {
    /// `POST /otp/request`
    async fn request_otp(&self, email: &str) -> Result<(), ApiError>;

    /// `POST /otp/verify`
    async fn verify_otp(&self, email: &str, otp: &str) -> Result<AuthResponse, ApiError>;

    /// `POST /login`
    async fn login(&self, credentials: &LoginCredentials) -> Result<AuthResponse, ApiError>;

    /// `POST /logout`
    async fn logout(&self, refresh_token: &str) -> Result<(), ApiError>;

    /// `POST /token/refresh`
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError>;
}
