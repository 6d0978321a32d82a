//! Order service client.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;
use url::Url;

use crate::checkout::OrderRequest;

use super::{ApiError, check_status, endpoint};

/// Client for the order service.
#[derive(Clone)]
pub struct OrdersClient {
    inner: Arc<OrdersClientInner>,
}

struct OrdersClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl OrdersClient {
    /// Create a new order service client.
    #[must_use]
    pub fn new(base_url: &Url) -> Self {
        Self {
            inner: Arc::new(OrdersClientInner {
                client: reqwest::Client::new(),
                base_url: base_url.clone(),
            }),
        }
    }

    /// Create an order from the cart payload. The service answers 201 on
    /// success.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` if the request fails or the service answers
    /// with a non-success status.
    #[instrument(skip(self, token, order), fields(order_number = %order.order_number))]
    pub async fn create_order_from_cart(
        &self,
        token: &SecretString,
        order: &OrderRequest,
    ) -> Result<(), ApiError> {
        let url = endpoint(&self.inner.base_url, "/api/order/createOrderFromCart");
        let response = self
            .inner
            .client
            .post(url)
            .json(order)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}
