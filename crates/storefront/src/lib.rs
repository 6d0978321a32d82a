//! ShopHub storefront state core.
//!
//! The state layer behind the storefront UI: product search and filtering,
//! cart management, auth session state, and checkout - backed by separate
//! REST services for products, cart, auth, and orders. Rendering, routing,
//! and styling live in the embedding shell; this crate owns the state those
//! views display and the HTTP traffic that feeds it.
//!
//! # Architecture
//!
//! - [`store`] - persisted local key/value store, read once at startup and
//!   written on every state change
//! - [`cart`] - cart state engine: local-first mutation with best-effort
//!   background sync to the server cart
//! - [`auth`] - auth session: login/signup/logout delegated to the auth
//!   service, identity persisted across restarts
//! - [`search`] - search/filter view-model with URL synchronization and a
//!   debounced navigation timer
//! - [`checkout`] - order validation, building, and submission
//! - [`services`] - one `reqwest` client per backend service
//!
//! # Concurrency
//!
//! Local state mutation is synchronous and single-owner; all I/O is async.
//! Background server syncs are fire-and-forget with no ordering guarantee
//! relative to each other or to later local mutations (see [`sync`]).
//!
//! # Example
//!
//! ```rust,ignore
//! use shophub_storefront::{
//!     cart::CartEngine,
//!     config::StorefrontConfig,
//!     services::{CartClient, ProductsClient},
//!     store::LocalStore,
//!     sync::SyncQueue,
//! };
//!
//! let config = StorefrontConfig::from_env()?;
//! let store = LocalStore::open_shared(&config.store_path)?;
//! let mut cart = CartEngine::new(
//!     store,
//!     CartClient::new(&config.cart_base_url),
//!     SyncQueue::new(),
//! );
//!
//! let products = ProductsClient::new(&config.products_base_url);
//! let all = products.get_all_products().await?;
//! if let Some(first) = all.first() {
//!     cart.add_to_cart(first, None);
//! }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod search;
pub mod services;
pub mod store;
pub mod sync;

pub use error::{AppError, Result};

/// Initialize tracing with an `EnvFilter` and fmt layer.
///
/// Intended for embedding binaries and examples; defaults to info level for
/// this crate if `RUST_LOG` is not set. Calling it twice is a no-op.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shophub_storefront=info".into());

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
