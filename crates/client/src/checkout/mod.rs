//! Checkout: address form validation and order submission.
//!
//! Split in two:
//!
//! - [`form`] - the raw [`AddressForm`], the all-at-once [`validate`] pass,
//!   and the per-field [`FieldErrors`] map
//! - [`order`] - the [`OrderPayload`] wire type and the single-flight
//!   [`CheckoutPipeline`] state machine

pub mod form;
pub mod order;

pub use form::{AddressForm, FieldErrors, FormField, ValidatedForm, validate};
pub use order::{
    CheckoutError, CheckoutPipeline, OrderLine, OrderPayload, SubmitOutcome, SubmitState,
};
