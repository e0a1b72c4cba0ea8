//! reqwest-backed authentication client
//!
//! Authorized requests carry the stored access token as a bearer credential.
//! A `401` triggers one refresh-token exchange; when it yields a new access
//! token the request is retried exactly once.

use super::error::error_message;
use super::{ApiError, AuthApi};
use crate::credentials::CredentialStore;
use crate::types::{
    AuthResponse, LoginCredentials, OtpRequest, OtpVerifyRequest, RefreshTokenRequest, TokenPair,
};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use talent_core::ApiConfig;
use tracing::{debug, warn};

/// HTTP implementation of [`AuthApi`]
#[derive(Clone)]
pub struct HttpAuthApi {
    client: Client,
    base_url: String,
    credentials: Option<CredentialStore>,
}

impl HttpAuthApi {
    /// Create a new client with default configuration
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> HttpAuthApiBuilder {
        HttpAuthApiBuilder::default()
    }

    /// Build a client from configuration, injecting tokens from `store`
    pub fn from_config(config: &ApiConfig, store: CredentialStore) -> Result<Self, ApiError> {
        Self::builder()
            .base_url(&config.base_url)
            .timeout(config.timeout())
            .credential_store(store)
            .build()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create an unauthenticated request
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, url)
    }

    /// Create a request carrying the stored access token, if any
    pub fn authorized(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.request(method, path);
        match self
            .credentials
            .as_ref()
            .and_then(CredentialStore::access_token)
        {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(status, error_message(status, &body)))
    }

    /// Execute a request and decode its JSON body
    pub async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Execute a request whose body is irrelevant
    pub async fn execute_unit(&self, request: RequestBuilder) -> Result<(), ApiError> {
        Self::check(request.send().await?).await?;
        Ok(())
    }

    /// Send an authorized request, refreshing the session once on `401`
    pub async fn send_authorized<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, ApiError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let build = || {
            let request = self.authorized(method.clone(), path);
            match body {
                Some(body) => request.json(body),
                None => request,
            }
        };

        match Self::check(build().send().await?).await {
            Err(err) if err.is_unauthorized() => match self.refresh_session().await {
                Ok(true) => {
                    debug!(path, "Retrying request with refreshed access token");
                    Self::check(build().send().await?).await
                }
                Ok(false) => Err(err),
                Err(refresh_err) => {
                    warn!(path, error = %refresh_err, "Token refresh failed");
                    Err(err)
                }
            },
            other => other,
        }
    }

    /// Exchange the stored refresh token for new tokens and persist them
    ///
    /// Returns `false` when there is nothing to refresh.
    pub async fn refresh_session(&self) -> Result<bool, ApiError> {
        let Some(store) = &self.credentials else {
            return Ok(false);
        };
        let Some(refresh_token) = store.refresh_token() else {
            debug!("No refresh token stored; skipping refresh");
            return Ok(false);
        };

        let tokens = self.refresh(&refresh_token).await?;
        if tokens.access_token.is_empty() {
            return Err(ApiError::InvalidResponse(
                "refresh response has an empty access token".to_string(),
            ));
        }

        store
            .update_tokens(&tokens.access_token, tokens.refresh_token.as_deref())
            .map_err(|e| ApiError::Storage(e.to_string()))
    }
}

fn ensure_tokens(response: AuthResponse) -> Result<AuthResponse, ApiError> {
    if response.access_token.is_empty() {
        return Err(ApiError::InvalidResponse(
            "response has an empty access token".to_string(),
        ));
    }
    Ok(response)
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl AuthApi for HttpAuthApi {
    async fn request_otp(&self, email: &str) -> Result<(), ApiError> {
        let req = self.request(Method::POST, "/otp/request").json(&OtpRequest {
            email: email.to_string(),
        });
        self.execute_unit(req).await
    }

    async fn verify_otp(&self, email: &str, otp: &str) -> Result<AuthResponse, ApiError> {
        let req = self
            .request(Method::POST, "/otp/verify")
            .json(&OtpVerifyRequest {
                email: email.to_string(),
                otp: otp.to_string(),
            });
        ensure_tokens(self.execute(req).await?)
    }

    async fn login(&self, credentials: &LoginCredentials) -> Result<AuthResponse, ApiError> {
        let req = self.request(Method::POST, "/login").json(credentials);
        ensure_tokens(self.execute(req).await?)
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), ApiError> {
        let body = RefreshTokenRequest {
            refresh_token: refresh_token.to_string(),
        };
        self.send_authorized(Method::POST, "/logout", Some(&body))
            .await?;
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let req = self
            .request(Method::POST, "/token/refresh")
            .json(&RefreshTokenRequest {
                refresh_token: refresh_token.to_string(),
            });
        self.execute(req).await
    }
}

/// Builder for [`HttpAuthApi`]
#[derive(Default)]
pub struct HttpAuthApiBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    credentials: Option<CredentialStore>,
}

impl HttpAuthApiBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Source of bearer tokens for authorized requests
    pub fn credential_store(mut self, store: CredentialStore) -> Self {
        self.credentials = Some(store);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<HttpAuthApi, ApiError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ApiError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut client_builder = ClientBuilder::new();

        #[cfg(not(target_arch = "wasm32"))]
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        client_builder = client_builder.user_agent(
            self.user_agent
                .unwrap_or_else(|| concat!("talent-session/", env!("CARGO_PKG_VERSION")).to_string()),
        );

        Ok(HttpAuthApi {
            client: client_builder.build()?,
            base_url,
            credentials: self.credentials,
        })
    }
}
