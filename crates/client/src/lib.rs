//! Krispy Cottage storefront client core.
//!
//! This crate is the non-presentational core of the Krispy Cottage mobile
//! storefront: it owns the client-side cart state, keeps it reconciled with
//! the authoritative server cart, validates the checkout form, and drives
//! order submission. Screen layout, navigation, and rendering live in the
//! presentation layer, which consumes read-only snapshots from this crate
//! and forwards user intent into it.
//!
//! # Architecture
//!
//! - [`gateway`] - REST gateway to the storefront backend ([`StoreClient`])
//!   and the [`CartGateway`] trait the state machines depend on
//! - [`cart`] - optimistic cart mutations with single-flight server
//!   reconciliation ([`CartEngine`])
//! - [`checkout`] - address form validation and the order submission
//!   pipeline ([`CheckoutPipeline`])
//! - [`config`] - environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use krispy_cottage_client::{CartEngine, StoreClient, config::StoreConfig};
//!
//! let config = StoreConfig::from_env()?;
//! let client = StoreClient::new(&config)?;
//! let engine = CartEngine::new(client);
//!
//! engine.refresh().await?;
//! engine.increment(0).await?; // optimistic, reconciled in the background
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod config;
pub mod gateway;

pub use cart::{CartEngine, CartError};
pub use checkout::{
    AddressForm, CheckoutError, CheckoutPipeline, FieldErrors, FormField, SubmitOutcome,
    SubmitState, ValidatedForm, validate,
};
pub use gateway::{CartGateway, GatewayError, OrderConfirmation, StoreClient};
