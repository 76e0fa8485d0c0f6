//! Order payload and the submission pipeline.
//!
//! [`CheckoutPipeline`] is the state machine behind the checkout screen:
//! it holds the form, the per-field error map, and the submission phase,
//! and enforces single-flight order placement. Placement is never retried
//! automatically; on failure the form is retained and an alert message is
//! surfaced so the user decides whether to try again.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use krispy_cottage_core::{CartLine, ProductId};

use super::form::{AddressForm, FieldErrors, FormField, ValidatedForm, validate};
use crate::gateway::{CartGateway, GatewayError, OrderConfirmation};

/// Alert shown when the backend fails or rejects an order.
const PLACE_ORDER_FAILED: &str = "Failed to place order. Please try again.";
/// Alert shown when checkout is attempted on an empty cart.
const EMPTY_CART: &str =
    "Cart is empty, add items to your cart before proceeding to checkout.";

/// One cart line in an order submission.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub variant_index: u32,
    pub quantity: u32,
    pub has_variants: bool,
}

impl From<&CartLine> for OrderLine {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id.clone(),
            variant_index: line.variant_index,
            quantity: line.quantity,
            has_variants: line.has_variants,
        }
    }
}

/// Request body for placing an order: the validated shipping address plus
/// the cart lines as displayed at submit time.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile_no: String,
    pub address_line1: String,
    pub address_line2: String,
    pub country: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub cart: Vec<OrderLine>,
}

impl OrderPayload {
    fn new(form: ValidatedForm, lines: &[CartLine]) -> Self {
        Self {
            first_name: form.first_name,
            last_name: form.last_name,
            email: form.email.into_inner(),
            mobile_no: form.mobile_no,
            address_line1: form.address_line1,
            address_line2: form.address_line2,
            country: form.country,
            city: form.city,
            state: form.state,
            zip_code: form.zip_code,
            cart: lines.iter().map(OrderLine::from).collect(),
        }
    }
}

/// Where the pipeline is in the submission lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmitState {
    /// Accepting edits; nothing in flight.
    #[default]
    Idle,
    /// Running the validator (synchronous, transient).
    Validating,
    /// An order request is in flight. Further submits are ignored.
    Submitting,
    /// The backend confirmed the order. Terminal until [`CheckoutPipeline::reset`].
    Succeeded,
}

/// Result of a submit attempt that did not error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The backend confirmed the order.
    Placed(OrderConfirmation),
    /// A submission was already in flight (or already succeeded); this
    /// attempt was dropped, not queued.
    Ignored,
}

/// Errors surfaced by a submit attempt.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Submit was attempted with no cart lines. Checked before validation.
    #[error("Cart is empty, add items to your cart before proceeding to checkout.")]
    EmptyCart,

    /// The form failed validation; the map carries every invalid field.
    #[error("address form has {} invalid field(s)", .0.len())]
    Invalid(FieldErrors),

    /// The backend call failed or rejected the order. The form is retained
    /// for a manual retry.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

struct PipelineState {
    form: AddressForm,
    field_errors: FieldErrors,
    phase: SubmitState,
    alert: Option<String>,
    confirmation: Option<OrderConfirmation>,
}

/// Checkout form state and single-flight order submission.
///
/// Cheaply cloneable; clones share the same form and phase.
pub struct CheckoutPipeline<G> {
    inner: Arc<PipelineInner<G>>,
}

struct PipelineInner<G> {
    gateway: G,
    state: Mutex<PipelineState>,
}

impl<G> Clone for CheckoutPipeline<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G: CartGateway> CheckoutPipeline<G> {
    #[must_use]
    pub fn new(gateway: G) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                gateway,
                state: Mutex::new(PipelineState {
                    form: AddressForm::default(),
                    field_errors: FieldErrors::default(),
                    phase: SubmitState::Idle,
                    alert: None,
                    confirmation: None,
                }),
            }),
        }
    }

    /// Current form contents.
    #[must_use]
    pub fn form(&self) -> AddressForm {
        self.state().form.clone()
    }

    /// Per-field validation messages from the last failed submit, minus any
    /// fields edited since.
    #[must_use]
    pub fn field_errors(&self) -> FieldErrors {
        self.state().field_errors.clone()
    }

    /// Current submission phase.
    #[must_use]
    pub fn phase(&self) -> SubmitState {
        self.state().phase
    }

    /// Screen-level alert message, if the last submit failed outside the
    /// form (empty cart, backend failure).
    #[must_use]
    pub fn alert(&self) -> Option<String> {
        self.state().alert.clone()
    }

    /// Confirmation from a succeeded submission.
    #[must_use]
    pub fn confirmation(&self) -> Option<OrderConfirmation> {
        self.state().confirmation.clone()
    }

    /// Overwrite one field and clear that field's validation error.
    ///
    /// Other fields' errors stay visible until the next full validation
    /// pass; clearing is strictly per field.
    pub fn update_field(&self, field: FormField, value: impl Into<String>) {
        let mut state = self.state();
        state.form.set_field(field, value);
        state.field_errors.clear(field);
    }

    /// Return to [`SubmitState::Idle`] with a blank form, e.g. to start a
    /// new order after a confirmation was shown.
    pub fn reset(&self) {
        let mut state = self.state();
        state.form = AddressForm::default();
        state.field_errors = FieldErrors::default();
        state.phase = SubmitState::Idle;
        state.alert = None;
        state.confirmation = None;
    }

    /// Submit the order for the given cart lines.
    ///
    /// The empty-cart check runs before validation. Validation is
    /// all-at-once; a failure stores the full error map and no request is
    /// sent. At most one submission is ever in flight: a submit while one
    /// is running (or after success) returns [`SubmitOutcome::Ignored`].
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::EmptyCart`] when `lines` is empty
    /// - [`CheckoutError::Invalid`] when the form fails validation
    /// - [`CheckoutError::Gateway`] when the backend fails or rejects the
    ///   order; the form and phase are restored so the user can retry
    #[instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn submit(&self, lines: &[CartLine]) -> Result<SubmitOutcome, CheckoutError> {
        let payload = {
            let mut state = self.state();
            match state.phase {
                SubmitState::Submitting | SubmitState::Succeeded => {
                    return Ok(SubmitOutcome::Ignored);
                }
                SubmitState::Idle | SubmitState::Validating => {}
            }

            if lines.is_empty() {
                state.alert = Some(EMPTY_CART.to_string());
                return Err(CheckoutError::EmptyCart);
            }

            state.phase = SubmitState::Validating;
            let validated = match validate(&state.form) {
                Ok(validated) => validated,
                Err(errors) => {
                    state.phase = SubmitState::Idle;
                    state.field_errors = errors.clone();
                    return Err(CheckoutError::Invalid(errors));
                }
            };

            state.phase = SubmitState::Submitting;
            state.field_errors = FieldErrors::default();
            state.alert = None;
            OrderPayload::new(validated, lines)
        };

        match self.inner.gateway.place_order(&payload).await {
            Ok(confirmation) => {
                info!(order_id = ?confirmation.order_id, "order placed");
                let mut state = self.state();
                state.phase = SubmitState::Succeeded;
                state.confirmation = Some(confirmation.clone());
                Ok(SubmitOutcome::Placed(confirmation))
            }
            Err(e) => {
                warn!(error = %e, "order placement failed");
                let mut state = self.state();
                state.phase = SubmitState::Idle;
                state.alert = Some(PLACE_ORDER_FAILED.to_string());
                Err(CheckoutError::Gateway(e))
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, PipelineState> {
        // Never held across an await.
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use krispy_cottage_core::Email;
    use rust_decimal::dec;

    fn validated_form() -> ValidatedForm {
        ValidatedForm {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: Email::parse("ada@example.com").unwrap(),
            mobile_no: "5551234567".to_string(),
            address_line1: "1 Analytical Way".to_string(),
            address_line2: "Unit 2".to_string(),
            country: "US".to_string(),
            city: "London".to_string(),
            state: "LDN".to_string(),
            zip_code: "12345".to_string(),
        }
    }

    fn line(id: &str, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            variant_index: 1,
            quantity,
            unit_price: dec!(4.25),
            has_variants: true,
            name: String::new(),
            attributes: std::collections::BTreeMap::new(),
            featured_image: None,
        }
    }

    #[test]
    fn test_order_payload_wire_shape() {
        let payload = OrderPayload::new(validated_form(), &[line("p1", 3)]);
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["firstName"], "Ada");
        assert_eq!(value["mobileNo"], "5551234567");
        assert_eq!(value["addressLine1"], "1 Analytical Way");
        assert_eq!(value["zipCode"], "12345");
        assert_eq!(
            value["cart"],
            serde_json::json!([{
                "productId": "p1",
                "variantIndex": 1,
                "quantity": 3,
                "hasVariants": true
            }])
        );
    }

    #[test]
    fn test_order_line_copies_display_quantities() {
        let order_line = OrderLine::from(&line("p9", 7));
        assert_eq!(order_line.quantity, 7);
        assert_eq!(order_line.product_id.as_str(), "p9");
    }
}
