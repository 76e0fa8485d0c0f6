//! REST client for the Krispy Cottage storefront backend.
//!
//! Uses `reqwest` with a default-header client (`x-auth-token` on every
//! request). Catalog reads are cached via `moka` (5-minute TTL); cart and
//! checkout reads are never cached.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use krispy_cottage_core::{CartSnapshot, LineKey, OrderId, PageNumber, ProductId};

use super::cache::CacheValue;
use super::types::{
    Category, CheckoutDetails, PlaceOrderResponse, ProductDetail, ProductDetailResponse,
    ProductSummary, SearchPage, UpdateLineRequest,
};
use super::{CartGateway, GatewayError, OrderConfirmation};
use crate::checkout::OrderPayload;
use crate::config::{ConfigError, StoreConfig};

/// Client for the storefront REST API.
///
/// Provides catalog reads (cached for 5 minutes) and cart/checkout
/// operations (never cached). Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct StoreClient {
    inner: Arc<StoreClientInner>,
}

struct StoreClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<String, CacheValue>,
}

impl StoreClient {
    /// Create a new storefront API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the auth token is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &StoreConfig) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        let mut token = HeaderValue::from_str(config.auth_token.expose_secret()).map_err(|e| {
            ConfigError::InvalidEnvVar("STORE_AUTH_TOKEN".to_string(), e.to_string())
        })?;
        token.set_sensitive(true);
        headers.insert("x-auth-token", token);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STORE_BASE_URL".to_string(), e.to_string())
            })?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(StoreClientInner {
                client,
                base_url: config.base_url.clone(),
                cache,
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Read a response, mapping rate limits and non-2xx statuses to errors
    /// before attempting to parse the body.
    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(GatewayError::RateLimited(retry_after));
        }

        // Read the body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "storefront API returned non-success status"
            );
            return Err(GatewayError::Server {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        match serde_json::from_str(&body) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %body.chars().take(500).collect::<String>(),
                    "failed to parse storefront API response"
                );
                Err(GatewayError::Parse(e))
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let response = self.inner.client.get(self.url(path)).send().await?;
        Self::read_json(response).await
    }

    // =========================================================================
    // Catalog Methods (cached)
    // =========================================================================

    /// Get the category list.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, GatewayError> {
        let cache_key = "categories".to_string();

        if let Some(CacheValue::Categories(categories)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Vec<Category> = self.get_json("/mobile/category").await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Categories(categories.clone()))
            .await;

        Ok(categories)
    }

    /// Get the products in a category by its slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn products_by_category(
        &self,
        slug: &str,
    ) -> Result<Vec<ProductSummary>, GatewayError> {
        let cache_key = format!("category:{slug}");

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for category products");
            return Ok(products);
        }

        let page: SearchPage = self
            .get_json(&format!(
                "/mobile/category/{}",
                urlencoding::encode(slug)
            ))
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(page.products.clone()))
            .await;

        Ok(page.products)
    }

    /// Get the latest products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn latest_products(&self) -> Result<Vec<ProductSummary>, GatewayError> {
        let cache_key = "latest".to_string();

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for latest products");
            return Ok(products);
        }

        let page: SearchPage = self.get_json("/mobile/latestProducts").await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(page.products.clone()))
            .await;

        Ok(page.products)
    }

    /// Get a product's detail by its id, including variants and related
    /// products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn product(&self, product_id: &ProductId) -> Result<ProductDetail, GatewayError> {
        let cache_key = format!("product:{product_id}");

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let response: ProductDetailResponse = self
            .get_json(&format!("/mobile/product/{product_id}"))
            .await?;

        self.inner
            .cache
            .insert(
                cache_key,
                CacheValue::Product(Box::new(response.product.clone())),
            )
            .await;

        Ok(response.product)
    }

    /// Search products by free-text query (never cached).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(query = %query, page = page.as_u32()))]
    pub async fn search(&self, query: &str, page: PageNumber) -> Result<SearchPage, GatewayError> {
        self.get_json(&format!(
            "/mobile/search?searchquery={}&page={}",
            urlencoding::encode(query),
            page.as_u32()
        ))
        .await
    }

    /// Get the checkout summary for the current cart (never cached).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn checkout_details(&self) -> Result<CheckoutDetails, GatewayError> {
        self.get_json("/mobile/checkout").await
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Invalidate a cached product.
    pub async fn invalidate_product(&self, product_id: &ProductId) {
        self.inner
            .cache
            .invalidate(&format!("product:{product_id}"))
            .await;
    }

    /// Invalidate all cached catalog data.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

// =============================================================================
// Cart Methods (not cached - mutable state)
// =============================================================================

impl CartGateway for StoreClient {
    #[instrument(skip(self))]
    async fn fetch_cart(&self) -> Result<CartSnapshot, GatewayError> {
        self.get_json("/mobile/cart").await
    }

    #[instrument(skip(self), fields(product_id = %key.product_id, variant_index = key.variant_index, quantity = quantity))]
    async fn update_line(&self, key: &LineKey, quantity: u32) -> Result<(), GatewayError> {
        let body = UpdateLineRequest {
            product_id: &key.product_id,
            variant_index: key.variant_index,
            quantity,
        };

        let response = self
            .inner
            .client
            .post(self.url("/cart/update"))
            .json(&body)
            .send()
            .await?;

        // The backend acknowledges with an opaque body; only the status matters.
        Self::read_json::<serde_json::Value>(response).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %key.product_id, variant_index = key.variant_index))]
    async fn delete_line(&self, key: &LineKey) -> Result<(), GatewayError> {
        let response = self
            .inner
            .client
            .delete(self.url("/cart/delete"))
            .json(key)
            .send()
            .await?;

        Self::read_json::<serde_json::Value>(response).await?;
        Ok(())
    }

    #[instrument(skip(self, payload))]
    async fn place_order(
        &self,
        payload: &OrderPayload,
    ) -> Result<OrderConfirmation, GatewayError> {
        let response = self
            .inner
            .client
            .post(self.url("/mobile/placeOrderWithoutDispatching"))
            .json(payload)
            .send()
            .await?;

        let body: PlaceOrderResponse = Self::read_json(response).await?;
        confirm_order(body)
    }
}

/// Map a 2xx placeOrder body to a confirmation.
///
/// Only `success: true` counts as placed; `success: false` is an explicit
/// rejection and a body without the field is an unexpected response.
fn confirm_order(body: PlaceOrderResponse) -> Result<OrderConfirmation, GatewayError> {
    match body.success {
        Some(true) => Ok(OrderConfirmation {
            order_id: body.order_id.map(OrderId::new),
        }),
        Some(false) => Err(GatewayError::Rejected(
            body.message
                .unwrap_or_else(|| "order was rejected".to_string()),
        )),
        None => Err(GatewayError::UnexpectedResponse(
            "placeOrder response is missing the success field".to_string(),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn response(json: &str) -> PlaceOrderResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_confirm_order_placed() {
        let confirmation =
            confirm_order(response(r#"{"success": true, "orderId": "o42"}"#)).unwrap();
        assert_eq!(
            confirmation.order_id.as_ref().map(OrderId::as_str),
            Some("o42")
        );
    }

    #[test]
    fn test_confirm_order_placed_without_id() {
        let confirmation = confirm_order(response(r#"{"success": true}"#)).unwrap();
        assert!(confirmation.order_id.is_none());
    }

    #[test]
    fn test_confirm_order_rejected_carries_server_message() {
        let err =
            confirm_order(response(r#"{"success": false, "message": "out of stock"}"#))
                .unwrap_err();
        assert!(matches!(err, GatewayError::Rejected(ref m) if m == "out of stock"));
    }

    #[test]
    fn test_confirm_order_missing_success_is_unexpected() {
        let err = confirm_order(response(r#"{"orderId": "o42"}"#)).unwrap_err();
        assert!(matches!(err, GatewayError::UnexpectedResponse(_)));
    }
}
