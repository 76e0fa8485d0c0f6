//! Storefront backend gateway.
//!
//! # Architecture
//!
//! - The backend is the source of truth for cart contents, pricing, and
//!   order placement - NO local persistence, direct API calls
//! - Cart and order operations are never retried automatically: the backend
//!   does not guarantee idempotency for repeated `update`/`placeOrder` calls
//! - In-memory caching via `moka` for catalog reads (5 minute TTL); cart
//!   and checkout reads are never cached
//!
//! The [`CartGateway`] trait is the seam the cart engine and checkout
//! pipeline depend on; [`StoreClient`] is the reqwest implementation
//! against the production REST backend.

mod cache;
mod http;
pub mod types;

pub use http::StoreClient;
pub use types::{
    Category, CheckoutDetails, ProductDetail, ProductSummary, ProductVariant, SearchPage,
};

use krispy_cottage_core::{CartSnapshot, LineKey, OrderId};
use thiserror::Error;

use crate::checkout::OrderPayload;

/// Errors that can occur when talking to the storefront backend.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport failure or timeout before a response arrived.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("Server error: HTTP {status}: {message}")]
    Server { status: u16, message: String },

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// A 2xx response body failed to parse as JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A 2xx response was missing the fields the operation requires.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The backend explicitly rejected the submitted order.
    #[error("Order rejected: {0}")]
    Rejected(String),
}

/// Confirmation returned by a successfully placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConfirmation {
    /// Server-assigned order id, when the backend reports one.
    pub order_id: Option<OrderId>,
}

/// The four cart/checkout operations the state machines depend on.
///
/// Every call is a request/response pair with server-side effects; callers
/// own dedup and single-flight control (the gateway never retries).
#[allow(async_fn_in_trait)] // engine/pipeline are generic, never dyn
pub trait CartGateway {
    /// Fetch the authoritative cart.
    async fn fetch_cart(&self) -> Result<CartSnapshot, GatewayError>;

    /// Set the quantity of one line. `quantity` must be >= 1; deletion is a
    /// separate operation, never a zero-quantity update.
    async fn update_line(&self, key: &LineKey, quantity: u32) -> Result<(), GatewayError>;

    /// Remove one line from the cart.
    async fn delete_line(&self, key: &LineKey) -> Result<(), GatewayError>;

    /// Submit an order. Only an explicit success status from the backend
    /// counts as placed.
    async fn place_order(&self, payload: &OrderPayload)
    -> Result<OrderConfirmation, GatewayError>;
}
