//! Test support for the storefront client integration tests.
//!
//! Provides [`MockGateway`], an in-memory stand-in for the storefront
//! backend: it keeps a server-side cart it mutates on `update`/`delete`,
//! records every call, and can gate calls behind a semaphore so tests can
//! hold a round trip open while issuing more user actions.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rust_decimal::Decimal;
use tokio::sync::Semaphore;

use krispy_cottage_client::checkout::OrderPayload;
use krispy_cottage_client::gateway::{CartGateway, GatewayError, OrderConfirmation};
use krispy_cottage_core::{CartLine, CartSnapshot, LineKey, OrderId, ProductId};

/// One recorded gateway call, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    FetchCart,
    UpdateLine { key: LineKey, quantity: u32 },
    DeleteLine { key: LineKey },
    PlaceOrder { payload: serde_json::Value },
}

/// Scripted outcome for the next `place_order` call.
#[derive(Debug, Clone)]
enum PlaceOrderScript {
    Success { order_id: Option<String> },
    ServerError { status: u16, message: String },
    Rejected { message: String },
}

struct MockState {
    cart: CartSnapshot,
    calls: Vec<RecordedCall>,
    gated: bool,
    fail_next_fetch: bool,
    fail_next_update: bool,
    fail_next_delete: bool,
    place_order_script: Vec<PlaceOrderScript>,
    /// Server total applied after a successful mutation, when the "server"
    /// prices differently than unit price x quantity (e.g. a discount).
    reconciled_total: Option<Decimal>,
    in_flight: usize,
    max_in_flight: usize,
}

/// In-memory storefront backend.
pub struct MockGateway {
    inner: Arc<MockInner>,
}

struct MockInner {
    state: Mutex<MockState>,
    gate: Semaphore,
}

impl Clone for MockGateway {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new(CartSnapshot::empty())
    }
}

impl MockGateway {
    #[must_use]
    pub fn new(cart: CartSnapshot) -> Self {
        Self {
            inner: Arc::new(MockInner {
                state: Mutex::new(MockState {
                    cart,
                    calls: Vec::new(),
                    gated: false,
                    fail_next_fetch: false,
                    fail_next_update: false,
                    fail_next_delete: false,
                    place_order_script: Vec::new(),
                    reconciled_total: None,
                    in_flight: 0,
                    max_in_flight: 0,
                }),
                gate: Semaphore::new(0),
            }),
        }
    }

    /// Gate every mutating call (`update`, `delete`, `place_order`) behind
    /// the semaphore; calls suspend until [`MockGateway::release`] grants
    /// permits.
    pub fn enable_gate(&self) {
        self.state().gated = true;
    }

    /// Grant `n` gated calls permission to proceed.
    pub fn release(&self, n: usize) {
        self.inner.gate.add_permits(n);
    }

    /// Replace the server-side cart.
    pub fn set_cart(&self, cart: CartSnapshot) {
        self.state().cart = cart;
    }

    /// Make the server report this total after the next successful
    /// mutations, instead of the sum of line totals.
    pub fn set_reconciled_total(&self, total: Decimal) {
        self.state().reconciled_total = Some(total);
    }

    pub fn fail_next_fetch(&self) {
        self.state().fail_next_fetch = true;
    }

    pub fn fail_next_update(&self) {
        self.state().fail_next_update = true;
    }

    pub fn fail_next_delete(&self) {
        self.state().fail_next_delete = true;
    }

    /// Script the next `place_order` to succeed with the given order id.
    pub fn place_order_succeeds(&self, order_id: Option<&str>) {
        self.state()
            .place_order_script
            .push(PlaceOrderScript::Success {
                order_id: order_id.map(ToString::to_string),
            });
    }

    /// Script the next `place_order` to fail with a server error.
    pub fn place_order_fails(&self, status: u16, message: &str) {
        self.state()
            .place_order_script
            .push(PlaceOrderScript::ServerError {
                status,
                message: message.to_string(),
            });
    }

    /// Script the next `place_order` to be explicitly rejected.
    pub fn place_order_rejected(&self, message: &str) {
        self.state()
            .place_order_script
            .push(PlaceOrderScript::Rejected {
                message: message.to_string(),
            });
    }

    /// Every gateway call so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    /// The quantities sent by `update_line` calls, in order.
    #[must_use]
    pub fn update_quantities(&self) -> Vec<u32> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                RecordedCall::UpdateLine { quantity, .. } => Some(*quantity),
                _ => None,
            })
            .collect()
    }

    /// The highest number of gateway calls ever simultaneously in flight.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.state().max_in_flight
    }

    /// Current server-side cart.
    #[must_use]
    pub fn server_cart(&self) -> CartSnapshot {
        self.state().cart.clone()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_call(&self, call: RecordedCall) -> FlightGuard {
        let mut state = self.state();
        state.calls.push(call);
        state.in_flight += 1;
        state.max_in_flight = state.max_in_flight.max(state.in_flight);
        FlightGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    async fn wait_gate(&self) {
        let gated = self.state().gated;
        if gated {
            // Consume one permit per gated call.
            if let Ok(permit) = self.inner.gate.acquire().await {
                permit.forget();
            }
        }
    }

    fn server_error(message: &str) -> GatewayError {
        GatewayError::Server {
            status: 500,
            message: message.to_string(),
        }
    }
}

struct FlightGuard {
    inner: Arc<MockInner>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.in_flight -= 1;
    }
}

impl CartGateway for MockGateway {
    async fn fetch_cart(&self) -> Result<CartSnapshot, GatewayError> {
        let _guard = self.begin_call(RecordedCall::FetchCart);
        let mut state = self.state();
        if state.fail_next_fetch {
            state.fail_next_fetch = false;
            return Err(Self::server_error("fetch failed"));
        }
        Ok(state.cart.clone())
    }

    async fn update_line(&self, key: &LineKey, quantity: u32) -> Result<(), GatewayError> {
        let _guard = self.begin_call(RecordedCall::UpdateLine {
            key: key.clone(),
            quantity,
        });
        self.wait_gate().await;

        let mut state = self.state();
        if state.fail_next_update {
            state.fail_next_update = false;
            return Err(Self::server_error("update failed"));
        }

        let Some(index) = state.cart.position(key) else {
            return Err(Self::server_error("no such line"));
        };
        state.cart.lines[index].quantity = quantity;
        state.cart.total = state
            .reconciled_total
            .unwrap_or_else(|| state.cart.computed_total());
        Ok(())
    }

    async fn delete_line(&self, key: &LineKey) -> Result<(), GatewayError> {
        let _guard = self.begin_call(RecordedCall::DeleteLine { key: key.clone() });
        self.wait_gate().await;

        let mut state = self.state();
        if state.fail_next_delete {
            state.fail_next_delete = false;
            return Err(Self::server_error("delete failed"));
        }

        let Some(index) = state.cart.position(key) else {
            return Err(Self::server_error("no such line"));
        };
        state.cart.lines.remove(index);
        state.cart.total = state
            .reconciled_total
            .unwrap_or_else(|| state.cart.computed_total());
        Ok(())
    }

    async fn place_order(
        &self,
        payload: &OrderPayload,
    ) -> Result<OrderConfirmation, GatewayError> {
        let payload_value = serde_json::to_value(payload).map_err(GatewayError::Parse)?;
        let _guard = self.begin_call(RecordedCall::PlaceOrder {
            payload: payload_value,
        });
        self.wait_gate().await;

        let script = {
            let mut state = self.state();
            if state.place_order_script.is_empty() {
                PlaceOrderScript::Success {
                    order_id: Some("mock-order-1".to_string()),
                }
            } else {
                state.place_order_script.remove(0)
            }
        };

        match script {
            PlaceOrderScript::Success { order_id } => Ok(OrderConfirmation {
                order_id: order_id.map(OrderId::new),
            }),
            PlaceOrderScript::ServerError { status, message } => {
                Err(GatewayError::Server { status, message })
            }
            PlaceOrderScript::Rejected { message } => Err(GatewayError::Rejected(message)),
        }
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A cart line with the given id, variant, quantity, and unit price.
#[must_use]
pub fn cart_line(id: &str, variant_index: u32, quantity: u32, unit_price: Decimal) -> CartLine {
    CartLine {
        product_id: ProductId::new(id),
        variant_index,
        quantity,
        unit_price,
        has_variants: variant_index > 0,
        name: format!("Product {id}"),
        attributes: std::collections::BTreeMap::new(),
        featured_image: None,
    }
}

/// A two-line cart whose total matches the sum of line totals.
#[must_use]
pub fn sample_cart() -> CartSnapshot {
    let lines = vec![
        cart_line("p1", 0, 2, Decimal::new(1000, 2)), // 2 x 10.00
        cart_line("p2", 1, 1, Decimal::new(450, 2)),  // 1 x 4.50
    ];
    let mut cart = CartSnapshot {
        lines,
        total: Decimal::ZERO,
    };
    cart.total = cart.computed_total();
    cart
}
