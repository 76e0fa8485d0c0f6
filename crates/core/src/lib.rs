//! Krispy Cottage Core - Shared types library.
//!
//! This crate provides common types used across all Krispy Cottage client
//! components:
//! - `client` - Storefront API gateway, cart reconciliation, and checkout
//! - `integration-tests` - End-to-end tests against a scripted gateway
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, cart snapshots, and outcome states

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
