//! HTTP clients for the backend REST services.
//!
//! # Architecture
//!
//! - One client per service: products, cart, auth, orders
//! - The services are the source of truth - no local database, direct calls
//! - In-memory caching via `moka` for product reads (5 minute TTL); cart
//!   state is never cached
//! - Authenticated endpoints take the bearer token per call; clients hold no
//!   session state
//!
//! # Example
//!
//! ```rust,ignore
//! use shophub_storefront::services::ProductsClient;
//!
//! let products = ProductsClient::new(&config.products_base_url);
//! let all = products.get_all_products().await?;
//! let one = products.get_product_by_id(ProductId::new(1)).await?;
//! ```

pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;

pub use auth::{AuthClient, LoginResponse};
pub use cart::{CartAddOutcome, CartClient};
pub use orders::OrdersClient;
pub use products::{Product, ProductsClient};

use thiserror::Error;
use url::Url;

/// Errors that can occur when calling the backend services.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (network/transport).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the service.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Service returned a non-success status.
    #[error("Service returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        message: String,
    },
}

impl ApiError {
    /// Whether the error indicates a missing or expired session.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}

/// Build an endpoint URL from a service base URL and an absolute path.
///
/// `Url::join` would discard any path component of the base, so the path is
/// appended to the trimmed base string instead.
pub(crate) fn endpoint(base: &Url, path: &str) -> String {
    let base = base.as_str().trim_end_matches('/');
    format!("{base}{path}")
}

/// Map a non-success response to an `ApiError`, consuming the body for
/// diagnostics. Success responses pass through untouched.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(ApiError::RateLimited(retry_after));
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(
            status = %status,
            body = %body.chars().take(500).collect::<String>(),
            "Service returned non-success status"
        );
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: body.chars().take(200).collect(),
        });
    }

    Ok(response)
}
