//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `SHOPHUB_PRODUCTS_BASE_URL` - Products service origin (default: `http://localhost:8082`)
//! - `SHOPHUB_CART_BASE_URL` - Cart/auth service origin (default: `http://localhost:9090`)
//! - `SHOPHUB_ORDER_BASE_URL` - Order service origin (default: the cart service origin)
//! - `SHOPHUB_STORE_PATH` - Local store file (default: `.shophub/store.json`)
//! - `SHOPHUB_SEARCH_DEBOUNCE_MS` - Search debounce interval (default: 300)
//!
//! The split between the products origin and the cart origin mirrors the
//! deployment this client talks to: product catalog reads go to one service,
//! cart/auth/order traffic to another.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_PRODUCTS_BASE_URL: &str = "http://localhost:8082";
const DEFAULT_CART_BASE_URL: &str = "http://localhost:9090";
const DEFAULT_STORE_PATH: &str = ".shophub/store.json";
const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Base URL of the products service.
    pub products_base_url: Url,
    /// Base URL of the cart and auth services.
    pub cart_base_url: Url,
    /// Base URL of the order service.
    pub order_base_url: Url,
    /// Path of the persisted local store file.
    pub store_path: PathBuf,
    /// Debounce interval applied to search input before navigating.
    pub search_debounce: Duration,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let products_base_url = parse_base_url(
            "SHOPHUB_PRODUCTS_BASE_URL",
            &get_env_or_default("SHOPHUB_PRODUCTS_BASE_URL", DEFAULT_PRODUCTS_BASE_URL),
        )?;
        let cart_base_url = parse_base_url(
            "SHOPHUB_CART_BASE_URL",
            &get_env_or_default("SHOPHUB_CART_BASE_URL", DEFAULT_CART_BASE_URL),
        )?;
        // Orders are served from the cart service unless split out explicitly.
        let order_base_url = match get_optional_env("SHOPHUB_ORDER_BASE_URL") {
            Some(raw) => parse_base_url("SHOPHUB_ORDER_BASE_URL", &raw)?,
            None => cart_base_url.clone(),
        };

        let store_path =
            PathBuf::from(get_env_or_default("SHOPHUB_STORE_PATH", DEFAULT_STORE_PATH));

        let debounce_ms = match get_optional_env("SHOPHUB_SEARCH_DEBOUNCE_MS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidEnvVar("SHOPHUB_SEARCH_DEBOUNCE_MS".to_string(), e.to_string())
            })?,
            None => DEFAULT_SEARCH_DEBOUNCE_MS,
        };

        Ok(Self {
            products_base_url,
            cart_base_url,
            order_base_url,
            store_path,
            search_debounce: Duration::from_millis(debounce_ms),
        })
    }
}

impl Default for StorefrontConfig {
    /// Configuration with the documented defaults, no environment read.
    #[allow(clippy::unwrap_used)] // the default URLs are compile-time constants
    fn default() -> Self {
        Self {
            products_base_url: Url::parse(DEFAULT_PRODUCTS_BASE_URL).unwrap(),
            cart_base_url: Url::parse(DEFAULT_CART_BASE_URL).unwrap(),
            order_base_url: Url::parse(DEFAULT_CART_BASE_URL).unwrap(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            search_debounce: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a base URL, rejecting non-HTTP schemes.
fn parse_base_url(var_name: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    Ok(url)
}
