//! Wire types for the storefront backend's catalog and checkout endpoints.
//!
//! These mirror the JSON the backend returns; field names follow its
//! camelCase (and Mongo `_id`) conventions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use krispy_cottage_core::{CartLine, CategoryId, ProductId, VariantId};

/// A top-level product category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Category identifier.
    #[serde(rename = "_id")]
    pub id: CategoryId,
    /// Display name.
    pub name: String,
    /// URL slug used by `/mobile/category/{slug}`.
    pub slug: String,
    /// Absolute image URL, when the category has one.
    #[serde(default)]
    pub image: Option<String>,
}

/// Image reference as returned by catalog endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    /// Path relative to the store origin.
    pub file_src: String,
}

/// A product as it appears in category listings and search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    /// Product identifier.
    #[serde(rename = "_id")]
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Short marketing copy.
    #[serde(default)]
    pub short_description: Option<String>,
    /// Featured image, when present.
    #[serde(default)]
    pub featured_image: Option<ImageRef>,
    /// Purchasable variants.
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
}

/// One purchasable variant of a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    /// Variant identifier.
    #[serde(rename = "_id")]
    pub id: VariantId,
    /// Display label for the attribute combination.
    #[serde(default)]
    pub attributes: String,
    /// Variant price.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// Full product detail, as returned by `/mobile/product/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    /// Product identifier.
    #[serde(rename = "_id")]
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Featured image, when present.
    #[serde(default)]
    pub featured_image: Option<ImageRef>,
    /// Purchasable variants, in backend order. `variantIndex` in cart
    /// operations refers to a position in this list.
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
    /// Parent category, when the backend includes it.
    #[serde(default)]
    pub category: Option<Category>,
}

/// Response envelope for `/mobile/product/{id}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProductDetailResponse {
    pub product: ProductDetail,
    #[serde(default)]
    pub related_products: Vec<ProductSummary>,
}

/// Pagination metadata for search results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Whether another page follows this one.
    #[serde(default)]
    pub has_next_page: bool,
}

/// One page of product search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    /// Matching products for this page.
    #[serde(default)]
    pub products: Vec<ProductSummary>,
    /// Pagination metadata.
    #[serde(default)]
    pub pagination: Pagination,
}

/// Cart summary for the checkout screen, from `/mobile/checkout`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutDetails {
    /// Cart lines at checkout time.
    #[serde(default)]
    pub products: Vec<CartLine>,
    /// Subtotal before shipping.
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    /// Shipping cost.
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping: Decimal,
    /// Grand total.
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

/// Request body for `/cart/update`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateLineRequest<'a> {
    pub product_id: &'a ProductId,
    pub variant_index: u32,
    pub quantity: u32,
}

/// Response body for `/mobile/placeOrderWithoutDispatching`.
///
/// Only an explicit `success: true` counts as placed; a 2xx body without
/// the field is an unexpected response, never an implicit success.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaceOrderResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
