//! Unified error handling.
//!
//! Provides a unified `AppError` the embedding views consume. No failure in
//! this crate is fatal to the process: everything maps either to a
//! non-blocking notification ([`AppError::user_message`]) or to a sign-in
//! redirect ([`AppError::requires_sign_in`]).

use thiserror::Error;

use crate::auth::AuthError;
use crate::checkout::CheckoutError;
use crate::services::ApiError;
use crate::store::StoreError;

/// Application-level error type for the storefront core.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend service call failed.
    #[error("Service error: {0}")]
    Api(#[from] ApiError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Checkout operation failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Local store could not be opened.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation needs an authenticated session.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad input from the view.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Whether the view should redirect to the sign-in page instead of
    /// showing a notification.
    #[must_use]
    pub const fn requires_sign_in(&self) -> bool {
        match self {
            Self::Unauthorized(_) | Self::Checkout(CheckoutError::NotAuthenticated) => true,
            Self::Api(api) => api.is_unauthorized(),
            Self::Checkout(CheckoutError::Api(api)) => api.is_unauthorized(),
            _ => false,
        }
    }

    /// Non-blocking notification text for the user.
    ///
    /// Internal details (bodies, transport errors) stay in the logs.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(ApiError::Http(_)) => "Network error - please try again".to_string(),
            Self::Api(ApiError::NotFound(msg)) | Self::NotFound(msg) => msg.clone(),
            Self::Api(_) | Self::Store(_) => "Service error - please try again".to_string(),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::MissingField(_) => "Please fill in all fields".to_string(),
                AuthError::Api(_) => "Authentication failed".to_string(),
            },
            Self::Checkout(err) => match err {
                CheckoutError::NotAuthenticated => "Please login to checkout".to_string(),
                CheckoutError::IncompleteAddress | CheckoutError::IncompleteCardDetails => {
                    err.to_string()
                }
                CheckoutError::Api(_) => "Failed to place order".to_string(),
            },
            Self::Unauthorized(_) => "Please sign in to continue".to_string(),
            Self::BadRequest(msg) => msg.clone(),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_requires_sign_in() {
        assert!(AppError::Unauthorized("cart".to_string()).requires_sign_in());
        assert!(AppError::Checkout(CheckoutError::NotAuthenticated).requires_sign_in());
        assert!(
            AppError::Api(ApiError::Status {
                status: 401,
                message: String::new()
            })
            .requires_sign_in()
        );
        assert!(!AppError::NotFound("x".to_string()).requires_sign_in());
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = AppError::Api(ApiError::Status {
            status: 500,
            message: "stack trace with secrets".to_string(),
        });
        assert_eq!(err.user_message(), "Service error - please try again");
    }

    #[test]
    fn test_user_message_for_auth_errors() {
        assert_eq!(
            AppError::Auth(AuthError::InvalidCredentials).user_message(),
            "Invalid credentials"
        );
        assert_eq!(
            AppError::Auth(AuthError::MissingField("username")).user_message(),
            "Please fill in all fields"
        );
    }

    #[test]
    fn test_user_message_for_checkout_errors() {
        assert_eq!(
            AppError::Checkout(CheckoutError::NotAuthenticated).user_message(),
            "Please login to checkout"
        );
        assert_eq!(
            AppError::Checkout(CheckoutError::IncompleteAddress).user_message(),
            "please complete the address fields"
        );
    }
}
