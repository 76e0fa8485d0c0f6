//! Integration tests for the checkout pipeline.
//!
//! These drive a `CheckoutPipeline` against the in-memory `MockGateway`,
//! covering the empty-cart guard, all-at-once validation, single-flight
//! submission, and failure recovery.

use krispy_cottage_client::checkout::{
    CheckoutPipeline, CheckoutError, FormField, SubmitOutcome, SubmitState,
};
use krispy_cottage_client::gateway::GatewayError;
use krispy_cottage_integration_tests::{MockGateway, RecordedCall, cart_line, sample_cart};
use krispy_cottage_core::CartLine;
use rust_decimal::dec;

fn fill_valid_form(pipeline: &CheckoutPipeline<MockGateway>) {
    pipeline.update_field(FormField::FirstName, "Ada");
    pipeline.update_field(FormField::LastName, "Lovelace");
    pipeline.update_field(FormField::Email, "ada@example.com");
    pipeline.update_field(FormField::MobileNo, "5551234567");
    pipeline.update_field(FormField::AddressLine1, "1 Analytical Way");
    pipeline.update_field(FormField::AddressLine2, "Unit 2");
    pipeline.update_field(FormField::Country, "US");
    pipeline.update_field(FormField::City, "London");
    pipeline.update_field(FormField::State, "LDN");
    pipeline.update_field(FormField::ZipCode, "12345");
}

fn place_order_calls(gateway: &MockGateway) -> Vec<serde_json::Value> {
    gateway
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            RecordedCall::PlaceOrder { payload } => Some(payload),
            _ => None,
        })
        .collect()
}

// =============================================================================
// Empty-cart guard
// =============================================================================

#[tokio::test]
async fn test_empty_cart_blocks_before_validation() {
    let gateway = MockGateway::default();
    let pipeline = CheckoutPipeline::new(gateway.clone());
    // Deliberately invalid form: the empty-cart check must win anyway.

    let err = pipeline.submit(&[]).await.unwrap_err();

    assert!(matches!(err, CheckoutError::EmptyCart));
    assert_eq!(
        pipeline.alert().as_deref(),
        Some("Cart is empty, add items to your cart before proceeding to checkout.")
    );
    // Validation never ran and nothing reached the backend.
    assert!(pipeline.field_errors().is_empty());
    assert!(gateway.calls().is_empty());
    assert_eq!(pipeline.phase(), SubmitState::Idle);
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_invalid_form_reports_all_fields_and_skips_the_backend() {
    let gateway = MockGateway::default();
    let pipeline = CheckoutPipeline::new(gateway.clone());
    let lines = sample_cart().lines;

    let err = pipeline.submit(&lines).await.unwrap_err();

    let CheckoutError::Invalid(errors) = err else {
        panic!("expected validation failure");
    };
    assert_eq!(errors.len(), 10);
    assert_eq!(pipeline.field_errors().len(), 10);
    assert!(gateway.calls().is_empty());
    assert_eq!(pipeline.phase(), SubmitState::Idle);
}

#[tokio::test]
async fn test_editing_a_field_clears_only_its_error() {
    let gateway = MockGateway::default();
    let pipeline = CheckoutPipeline::new(gateway);
    let lines = sample_cart().lines;

    pipeline.submit(&lines).await.unwrap_err();
    pipeline.update_field(FormField::Email, "ada@example.com");

    let errors = pipeline.field_errors();
    assert_eq!(errors.message(FormField::Email), None);
    assert_eq!(
        errors.message(FormField::FirstName),
        Some("First name is required")
    );
    assert_eq!(errors.len(), 9);
}

// =============================================================================
// Submission
// =============================================================================

#[tokio::test]
async fn test_successful_submission() {
    let gateway = MockGateway::default();
    let pipeline = CheckoutPipeline::new(gateway.clone());
    fill_valid_form(&pipeline);
    gateway.place_order_succeeds(Some("order-77"));
    let lines = vec![cart_line("p1", 2, 3, dec!(10.00))];

    let outcome = pipeline.submit(&lines).await.unwrap();

    let SubmitOutcome::Placed(confirmation) = outcome else {
        panic!("expected a placed order");
    };
    assert_eq!(
        confirmation.order_id.as_ref().map(|id| id.as_str()),
        Some("order-77")
    );
    assert_eq!(pipeline.phase(), SubmitState::Succeeded);
    assert_eq!(pipeline.confirmation(), Some(confirmation));
    assert!(pipeline.alert().is_none());
}

#[tokio::test]
async fn test_order_payload_carries_address_and_displayed_cart() {
    let gateway = MockGateway::default();
    let pipeline = CheckoutPipeline::new(gateway.clone());
    fill_valid_form(&pipeline);
    let lines = vec![cart_line("p1", 2, 3, dec!(10.00))];

    pipeline.submit(&lines).await.unwrap();

    let payloads = place_order_calls(&gateway);
    assert_eq!(payloads.len(), 1);
    let payload = &payloads[0];
    assert_eq!(payload["firstName"], "Ada");
    assert_eq!(payload["email"], "ada@example.com");
    assert_eq!(payload["addressLine1"], "1 Analytical Way");
    assert_eq!(payload["zipCode"], "12345");
    assert_eq!(
        payload["cart"],
        serde_json::json!([{
            "productId": "p1",
            "variantIndex": 2,
            "quantity": 3,
            "hasVariants": true
        }])
    );
}

// =============================================================================
// Failure and retry
// =============================================================================

#[tokio::test]
async fn test_backend_failure_surfaces_alert_and_retains_form() {
    let gateway = MockGateway::default();
    let pipeline = CheckoutPipeline::new(gateway.clone());
    fill_valid_form(&pipeline);
    gateway.place_order_fails(500, "boom");
    let lines = sample_cart().lines;

    let err = pipeline.submit(&lines).await.unwrap_err();

    assert!(matches!(err, CheckoutError::Gateway(_)));
    assert_eq!(
        pipeline.alert().as_deref(),
        Some("Failed to place order. Please try again.")
    );
    assert_eq!(pipeline.phase(), SubmitState::Idle);
    assert_eq!(pipeline.form().first_name, "Ada");

    // A manual retry goes through; nothing retried on its own.
    assert_eq!(place_order_calls(&gateway).len(), 1);
    let outcome = pipeline.submit(&lines).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Placed(_)));
    assert_eq!(place_order_calls(&gateway).len(), 2);
}

#[tokio::test]
async fn test_explicit_rejection_is_a_failure() {
    let gateway = MockGateway::default();
    let pipeline = CheckoutPipeline::new(gateway.clone());
    fill_valid_form(&pipeline);
    gateway.place_order_rejected("out of stock");
    let lines = sample_cart().lines;

    let err = pipeline.submit(&lines).await.unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::Gateway(GatewayError::Rejected(_))
    ));
    assert_eq!(pipeline.phase(), SubmitState::Idle);
    assert!(pipeline.alert().is_some());
}

// =============================================================================
// Single-flight submission
// =============================================================================

#[tokio::test]
async fn test_second_submit_during_flight_is_ignored() {
    let gateway = MockGateway::default();
    let pipeline = CheckoutPipeline::new(gateway.clone());
    fill_valid_form(&pipeline);
    gateway.enable_gate();
    let lines: Vec<CartLine> = sample_cart().lines;

    let (first, ()) = tokio::join!(pipeline.submit(&lines), async {
        assert_eq!(pipeline.phase(), SubmitState::Submitting);
        let second = pipeline.submit(&lines).await.unwrap();
        assert_eq!(second, SubmitOutcome::Ignored);
        gateway.release(1);
    });

    assert!(matches!(first.unwrap(), SubmitOutcome::Placed(_)));
    assert_eq!(place_order_calls(&gateway).len(), 1);
}

#[tokio::test]
async fn test_submit_after_success_is_ignored_until_reset() {
    let gateway = MockGateway::default();
    let pipeline = CheckoutPipeline::new(gateway.clone());
    fill_valid_form(&pipeline);
    let lines = sample_cart().lines;

    pipeline.submit(&lines).await.unwrap();
    assert_eq!(pipeline.phase(), SubmitState::Succeeded);

    let again = pipeline.submit(&lines).await.unwrap();
    assert_eq!(again, SubmitOutcome::Ignored);
    assert_eq!(place_order_calls(&gateway).len(), 1);

    pipeline.reset();
    assert_eq!(pipeline.phase(), SubmitState::Idle);
    assert_eq!(pipeline.form().first_name, "");
    assert!(pipeline.confirmation().is_none());
}
