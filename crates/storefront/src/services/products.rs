//! Products service client.
//!
//! Read-only catalog access. Responses are cached for 5 minutes; product
//! data changes rarely and the home view refetches on every mount.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use shophub_core::{CurrencyCode, Price, ProductId};

use super::{ApiError, check_status, endpoint};

/// A catalog product as the products service returns it.
///
/// Most fields are optional on the wire; only the id and name are reliably
/// present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub product_name: String,
    #[serde(default)]
    pub catalogue_name: Option<String>,
    #[serde(default)]
    pub sub_catalogue_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub base_price: Option<Decimal>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub long_description: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub is_returnable: Option<bool>,
}

impl Product {
    /// Display category: catalogue name, falling back to the sub-catalogue,
    /// then `"Other"`.
    #[must_use]
    pub fn category(&self) -> &str {
        self.catalogue_name
            .as_deref()
            .or(self.sub_catalogue_name.as_deref())
            .unwrap_or("Other")
    }

    /// The display price, if the catalog carries one. The services quote
    /// everything in the store currency.
    #[must_use]
    pub fn price(&self) -> Option<Price> {
        self.base_price
            .map(|amount| Price::new(amount, CurrencyCode::USD))
    }
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Product(Box<Product>),
    Products(Vec<Product>),
}

/// Client for the products service.
///
/// Cheaply cloneable; product reads are cached for 5 minutes.
#[derive(Clone)]
pub struct ProductsClient {
    inner: Arc<ProductsClientInner>,
}

struct ProductsClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<String, CacheValue>,
}

impl ProductsClient {
    /// Create a new products service client.
    #[must_use]
    pub fn new(base_url: &Url) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(ProductsClientInner {
                client: reqwest::Client::new(),
                base_url: base_url.clone(),
                cache,
            }),
        }
    }

    /// Fetch the full product list.
    ///
    /// A response that is not a JSON array is treated as empty - the view
    /// renders "no products" rather than failing.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be read.
    #[instrument(skip(self))]
    pub async fn get_all_products(&self) -> Result<Vec<Product>, ApiError> {
        let cache_key = "products:all".to_string();

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product list");
            return Ok(products);
        }

        let url = endpoint(&self.inner.base_url, "/api/products/getAllProduct");
        let response = check_status(self.inner.client.get(url).send().await?).await?;

        let body = response.text().await?;
        let products: Vec<Product> = match serde_json::from_str(&body) {
            Ok(products) => products,
            Err(e) => {
                tracing::warn!(error = %e, "Products response was not an array, treating as empty");
                Vec::new()
            }
        };

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Fetch a single product by id.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the service has no such product, or
    /// another `ApiError` if the request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product_by_id(&self, product_id: ProductId) -> Result<Product, ApiError> {
        let cache_key = format!("product:{product_id}");

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let url = endpoint(
            &self.inner.base_url,
            &format!("/api/products/getProductById/{product_id}"),
        );
        let response = self.inner.client.get(url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(format!("Product not found: {product_id}")));
        }

        let response = check_status(response).await?;
        let body = response.text().await?;

        // The service answers 200 with an empty body for unknown ids.
        if body.trim().is_empty() || body.trim() == "null" {
            return Err(ApiError::NotFound(format!("Product not found: {product_id}")));
        }

        let product: Product = serde_json::from_str(&body)?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Invalidate all cached product data.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}
