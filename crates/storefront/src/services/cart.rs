//! Cart service client.
//!
//! All endpoints require a bearer token. Cart state is mutable and is never
//! cached; the engine re-fetches the full cart when it needs fresh state.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;
use url::Url;

use shophub_core::{CartId, ProductId, UserId};

use crate::cart::ServerCartRecord;

use super::{ApiError, check_status, endpoint};

/// Outcome of adding a product to the server cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartAddOutcome {
    /// The product was already in the cart; the service bumped its quantity
    /// (200).
    AlreadyInCart,
    /// The product was newly added (201).
    Added,
}

impl CartAddOutcome {
    /// Map the service's success status codes to an outcome.
    fn from_status(status: reqwest::StatusCode) -> Self {
        if status == reqwest::StatusCode::CREATED {
            Self::Added
        } else {
            Self::AlreadyInCart
        }
    }
}

/// Client for the cart service.
#[derive(Clone)]
pub struct CartClient {
    inner: Arc<CartClientInner>,
}

struct CartClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl CartClient {
    /// Create a new cart service client.
    #[must_use]
    pub fn new(base_url: &Url) -> Self {
        Self {
            inner: Arc::new(CartClientInner {
                client: reqwest::Client::new(),
                base_url: base_url.clone(),
            }),
        }
    }

    /// Add one unit of a product to the user's server cart.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` if the request fails or the service answers
    /// with a non-success status.
    #[instrument(skip(self, token), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        token: &SecretString,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartAddOutcome, ApiError> {
        let url = endpoint(&self.inner.base_url, "/api/cart/add/addToCart");
        let response = self
            .inner
            .client
            .post(url)
            .query(&[
                ("userId", user_id.as_i64()),
                ("productId", product_id.as_i64()),
            ])
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        let status = response.status();
        check_status(response).await?;
        Ok(CartAddOutcome::from_status(status))
    }

    /// Fetch the user's full server cart.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` if the request fails or the body does not parse.
    #[instrument(skip(self, token), fields(user_id = %user_id))]
    pub async fn find_all_for_user(
        &self,
        token: &SecretString,
        user_id: UserId,
    ) -> Result<Vec<ServerCartRecord>, ApiError> {
        let url = endpoint(
            &self.inner.base_url,
            &format!("/api/cart/findAllCartOfSpecificUser/{user_id}"),
        );
        let response = self
            .inner
            .client
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Set the quantity of a server cart record.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` if the request fails or the service answers
    /// with a non-success status.
    #[instrument(skip(self, token), fields(cart_id = %cart_id, quantity))]
    pub async fn update_quantity(
        &self,
        token: &SecretString,
        cart_id: CartId,
        quantity: i64,
    ) -> Result<(), ApiError> {
        let url = endpoint(
            &self.inner.base_url,
            &format!("/api/cart/updateCartQuantity/{cart_id}"),
        );
        let response = self
            .inner
            .client
            .put(url)
            .query(&[("quantity", quantity)])
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }

    /// Delete a server cart record.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` if the request fails or the service answers
    /// with a non-success status.
    #[instrument(skip(self, token), fields(cart_id = %cart_id))]
    pub async fn delete_item(&self, token: &SecretString, cart_id: CartId) -> Result<(), ApiError> {
        let url = endpoint(
            &self.inner.base_url,
            &format!("/api/cart/deleteCartByCartId/{cart_id}"),
        );
        let response = self
            .inner
            .client
            .delete(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }

    /// Total number of records in the user's server cart.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` if the request fails or the body does not parse.
    #[instrument(skip(self, token), fields(user_id = %user_id))]
    pub async fn total_count(&self, token: &SecretString, user_id: UserId) -> Result<i64, ApiError> {
        let url = endpoint(
            &self.inner.base_url,
            &format!("/api/cart/totalNumberOfAllCartOfSpecificUser/{user_id}"),
        );
        let response = self
            .inner
            .client
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}
