//! Auth session state.
//!
//! Owns the current identity and the authentication flag. Login, signup, and
//! logout delegate to the auth service; this module only manages the
//! resulting session state and its persistence.
//!
//! The structured [`AuthIdentity`] record (store key `user`) is the single
//! source of truth. The raw `authToken`/`username`/`userid` entries are
//! legacy-shaped projections written for the embedding shell at the same
//! moment; they are never read back as truth, and logout clears all of them
//! together along with the cached cart count.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shophub_core::{Email, EmailError, UserId, UserRole};

use crate::services::{ApiError, AuthClient, LoginResponse};
use crate::store::{SharedStore, keys, lock_store};

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A required field was empty.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Auth service error.
    #[error("auth service error: {0}")]
    Api(ApiError),
}

/// The active user identity.
///
/// Exists only while a session is active; created on login success,
/// destroyed on logout. Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct AuthIdentity {
    /// User's id at the auth service.
    pub id: UserId,
    /// Login username.
    pub username: String,
    /// Email, when known (signup knows it; login does not echo it).
    pub email: Option<Email>,
    /// Display name, when known.
    pub name: Option<String>,
    /// Avatar image URL, when known.
    pub avatar_url: Option<String>,
    token: SecretString,
}

impl AuthIdentity {
    /// The bearer token for authenticated service calls.
    #[must_use]
    pub const fn bearer_token(&self) -> &SecretString {
        &self.token
    }
}

impl std::fmt::Debug for AuthIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthIdentity")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("avatar_url", &self.avatar_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Persisted shape of the identity record (store key `user`).
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUser {
    id: UserId,
    username: String,
    #[serde(default)]
    email: Option<Email>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    avatar: Option<String>,
    token: String,
}

impl From<&AuthIdentity> for StoredUser {
    fn from(identity: &AuthIdentity) -> Self {
        Self {
            id: identity.id,
            username: identity.username.clone(),
            email: identity.email.clone(),
            name: identity.name.clone(),
            avatar: identity.avatar_url.clone(),
            token: identity.token.expose_secret().to_owned(),
        }
    }
}

impl From<StoredUser> for AuthIdentity {
    fn from(stored: StoredUser) -> Self {
        Self {
            id: stored.id,
            username: stored.username,
            email: stored.email,
            name: stored.name,
            avatar_url: stored.avatar,
            token: SecretString::from(stored.token),
        }
    }
}

/// Owns the current identity and performs login/signup/logout.
pub struct AuthSession {
    identity: Option<AuthIdentity>,
    store: SharedStore,
    api: AuthClient,
}

impl AuthSession {
    /// Create a session, restoring any persisted identity from the store.
    #[must_use]
    pub fn restore(store: SharedStore, api: AuthClient) -> Self {
        let identity = lock_store(&store)
            .get::<StoredUser>(keys::USER)
            .map(AuthIdentity::from);

        if identity.is_some() {
            tracing::debug!("Restored persisted session");
        }

        Self {
            identity,
            store,
            api,
        }
    }

    /// Whether a session is active.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// The active identity, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&AuthIdentity> {
        self.identity.as_ref()
    }

    /// Log in with username and password.
    ///
    /// On success the identity and every persisted projection are written in
    /// one step, so the caller observes either the whole session or none of
    /// it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` for empty inputs,
    /// `AuthError::InvalidCredentials` if the service rejects the login, or
    /// `AuthError::Api` for transport failures.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<&AuthIdentity, AuthError> {
        if username.trim().is_empty() {
            return Err(AuthError::MissingField("username"));
        }
        if password.is_empty() {
            return Err(AuthError::MissingField("password"));
        }

        let response = self.api.login(username, password).await.map_err(|e| {
            if e.is_unauthorized() {
                AuthError::InvalidCredentials
            } else {
                AuthError::Api(e)
            }
        })?;

        let identity = identity_from_login(response);
        self.persist_identity(&identity);
        tracing::info!(user_id = %identity.id, "Logged in");

        Ok(self.identity.insert(identity))
    }

    /// Register a new account.
    ///
    /// Does not log the user in; the caller returns to the sign-in view on
    /// success.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` for empty inputs,
    /// `AuthError::InvalidEmail` for a malformed email, or `AuthError::Api`
    /// if the service rejects the registration.
    pub async fn signup(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> Result<(), AuthError> {
        if username.trim().is_empty() {
            return Err(AuthError::MissingField("username"));
        }
        if password.is_empty() {
            return Err(AuthError::MissingField("password"));
        }
        let email = Email::parse(email)?;

        self.api
            .register(username, &email, password, role)
            .await
            .map_err(AuthError::Api)?;

        tracing::info!(username, "Account created");
        Ok(())
    }

    /// End the session.
    ///
    /// Clears the identity and every key the login path wrote, including the
    /// cached cart count - the next anonymous session must start from zero.
    pub fn logout(&mut self) {
        self.identity = None;

        let mut store = lock_store(&self.store);
        store.remove(keys::USER);
        store.remove(keys::AUTH_TOKEN);
        store.remove(keys::USERNAME);
        store.remove(keys::USER_ID);
        store.remove(keys::CART_COUNT);

        tracing::info!("Logged out");
    }

    /// Write the identity record and its legacy projections under one lock.
    fn persist_identity(&self, identity: &AuthIdentity) {
        let mut store = lock_store(&self.store);
        store.set(keys::USER, &StoredUser::from(identity));
        store.set_raw(keys::AUTH_TOKEN, identity.token.expose_secret());
        store.set_raw(keys::USERNAME, &identity.username);
        store.set_raw(keys::USER_ID, &identity.id.to_string());
    }
}

#[cfg(test)]
impl AuthIdentity {
    /// Build an identity directly, bypassing the auth service.
    pub(crate) fn for_tests(id: i64, username: &str, token: &str) -> Self {
        Self {
            id: UserId::new(id),
            username: username.to_string(),
            email: None,
            name: None,
            avatar_url: None,
            token: SecretString::from(token.to_string()),
        }
    }
}

/// Build the identity from what the login endpoint echoes back.
fn identity_from_login(response: LoginResponse) -> AuthIdentity {
    AuthIdentity {
        id: response.userid,
        username: response.username,
        email: None,
        name: None,
        avatar_url: None,
        token: SecretString::from(response.token),
    }
}
