//! Auth service client.
//!
//! Token issuing and registration are fully delegated to the auth service;
//! this client only shapes the requests and parses the responses. Session
//! state lives in [`crate::auth::AuthSession`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use shophub_core::{Email, UserId, UserRole};

use super::{ApiError, check_status, endpoint};

/// Successful login response: the issued token plus the identity fields the
/// service echoes back.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub userid: UserId,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RoleRecord {
    id: i64,
    name: &'static str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
    roles: Vec<RoleRecord>,
    enabled: bool,
}

/// Client for the auth service.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<AuthClientInner>,
}

struct AuthClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl AuthClient {
    /// Create a new auth service client.
    #[must_use]
    pub fn new(base_url: &Url) -> Self {
        Self {
            inner: Arc::new(AuthClientInner {
                client: reqwest::Client::new(),
                base_url: base_url.clone(),
            }),
        }
    }

    /// Exchange credentials for a token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` for rejected credentials (the service
    /// answers 401) or another `ApiError` if the request fails.
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let url = endpoint(&self.inner.base_url, "/api/auth/login");
        let response = self
            .inner
            .client
            .post(url)
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Register a new account.
    ///
    /// The service expects the role as a seeded `{id, name}` record and
    /// answers 201 on success. Registration does not log the user in.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` if the request fails or the service rejects the
    /// registration.
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn register(
        &self,
        username: &str,
        email: &Email,
        password: &str,
        role: UserRole,
    ) -> Result<(), ApiError> {
        let url = endpoint(&self.inner.base_url, "/api/auth/register");
        let request = RegisterRequest {
            username,
            email: email.as_str(),
            password,
            roles: vec![RoleRecord {
                id: role.record_id(),
                name: role.record_name(),
            }],
            enabled: true,
        };

        let response = self.inner.client.post(url).json(&request).send().await?;
        check_status(response).await?;
        Ok(())
    }
}
