//! Cart reconciliation engine.
//!
//! Keeps the locally displayed cart responsive to user taps while staying
//! eventually consistent with the server's authoritative cart:
//!
//! 1. Quantity taps mutate the local [`CartSnapshot`] immediately
//!    (optimistic update) and record the new target quantity for the line.
//! 2. A single-flight flush loop sends the target to the backend and then
//!    re-fetches the full cart, replacing the snapshot wholesale - the
//!    authoritative reconciliation point (last-full-fetch-wins).
//! 3. While a round trip is in flight, further taps mutate display state and
//!    overwrite the pending target only; no second dispatch starts until the
//!    in-flight one completes.
//!
//! Deletion is NOT optimistic: a line disappears only after `delete_line`
//! succeeds and the follow-up fetch confirms it, avoiding index-shift bugs
//! across concurrent edits.
//!
//! On failure the optimistic edit is retained and surfaced as a `Failed`
//! outcome; the pending entry is dropped so nothing retries on its own, and
//! [`CartEngine::sync`] lets the presentation layer resume.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use krispy_cottage_core::{CartSnapshot, LineKey, OutcomeState};

use crate::gateway::{CartGateway, GatewayError};

/// Errors surfaced by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The display index does not refer to a cart line.
    #[error("no cart line at index {0}")]
    UnknownLine(usize),

    /// The backend call failed. The optimistic local edit, if any, is
    /// retained (see module docs).
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// The operation queued for a line while a round trip is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingOp {
    /// Send this target quantity. Overwritten by later taps on the same line.
    Update { quantity: u32 },
    /// Remove the line. Overrides any pending quantity target.
    Delete,
}

struct EngineState {
    snapshot: CartSnapshot,
    outcome: OutcomeState,
    /// Single-flight guard: true while an update/delete + refetch round trip
    /// is outstanding. Taps stay non-blocking; their dispatch is deferred.
    busy: bool,
    /// Deferred operations in first-requested order, at most one per line.
    pending: Vec<(LineKey, PendingOp)>,
}

impl EngineState {
    /// Record `op` for `key`, overwriting any pending operation for the same
    /// line (last tap wins) while keeping the line's queue position.
    fn set_pending(&mut self, key: LineKey, op: PendingOp) {
        if let Some(entry) = self.pending.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = op;
        } else {
            self.pending.push((key, op));
        }
    }
}

/// Owns the in-memory cart snapshot and reconciles it with the server.
///
/// Cheaply cloneable; all clones share one snapshot and one single-flight
/// guard. The snapshot is mutated only through the engine's operations -
/// the presentation layer reads it via [`CartEngine::snapshot`] or
/// [`CartEngine::subscribe`] and never writes it directly.
pub struct CartEngine<G> {
    inner: Arc<EngineInner<G>>,
}

struct EngineInner<G> {
    gateway: G,
    state: Mutex<EngineState>,
    publisher: watch::Sender<CartSnapshot>,
}

impl<G> Clone for CartEngine<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G: CartGateway> CartEngine<G> {
    /// Create an engine with an empty local cart.
    #[must_use]
    pub fn new(gateway: G) -> Self {
        let (publisher, _) = watch::channel(CartSnapshot::empty());
        Self {
            inner: Arc::new(EngineInner {
                gateway,
                state: Mutex::new(EngineState {
                    snapshot: CartSnapshot::empty(),
                    outcome: OutcomeState::Idle,
                    busy: false,
                    pending: Vec::new(),
                }),
                publisher,
            }),
        }
    }

    /// Current read-only snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.state().snapshot.clone()
    }

    /// Outcome of the most recent reconciliation round trip.
    #[must_use]
    pub fn outcome(&self) -> OutcomeState {
        self.state().outcome.clone()
    }

    /// Subscribe to snapshot changes (the render boundary). The receiver
    /// yields a fresh snapshot after every optimistic edit and every
    /// reconciliation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.inner.publisher.subscribe()
    }

    /// Fetch the authoritative cart and replace the local snapshot wholesale.
    ///
    /// Used for initial load and pull-to-refresh. If a reconciliation round
    /// trip is already in flight, returns the current snapshot unchanged -
    /// that round trip ends with a full fetch anyway.
    ///
    /// # Errors
    ///
    /// Returns the gateway failure; the local snapshot is left untouched.
    pub async fn refresh(&self) -> Result<CartSnapshot, CartError> {
        {
            let mut state = self.state();
            if state.busy {
                return Ok(state.snapshot.clone());
            }
            state.busy = true;
            state.outcome = OutcomeState::Loading;
        }

        let fetched = self.inner.gateway.fetch_cart().await;
        let result = {
            let mut state = self.state();
            state.busy = false;
            match fetched {
                Ok(cart) => {
                    state.snapshot = cart;
                    state.outcome = OutcomeState::Success;
                    Ok(state.snapshot.clone())
                }
                Err(e) => {
                    state.outcome = OutcomeState::Failed(e.to_string());
                    Err(CartError::Gateway(e))
                }
            }
        };

        if let Ok(snapshot) = &result {
            self.publish(snapshot.clone());
        }

        // Taps that arrived during the fetch are dispatched now.
        self.flush().await?;
        result
    }

    /// Increase the quantity of the line at `index` by one.
    ///
    /// The local snapshot updates immediately; the server round trip runs
    /// in the background of this call (or is deferred when one is already
    /// in flight).
    ///
    /// # Errors
    ///
    /// Returns [`CartError::UnknownLine`] for an out-of-range index, or the
    /// gateway failure from the reconciliation round trip. On gateway
    /// failure the optimistic edit is retained.
    pub async fn increment(&self, index: usize) -> Result<CartSnapshot, CartError> {
        self.adjust(index, QuantityDelta::Up).await
    }

    /// Decrease the quantity of the line at `index` by one, flooring at 1.
    ///
    /// Decrement at quantity 1 is a strict no-op: no state change and no
    /// gateway call. Removing a line is [`CartEngine::delete`], never an
    /// implicit zero-quantity update.
    ///
    /// # Errors
    ///
    /// Same contract as [`CartEngine::increment`].
    pub async fn decrement(&self, index: usize) -> Result<CartSnapshot, CartError> {
        self.adjust(index, QuantityDelta::Down).await
    }

    /// Remove the line at `index`.
    ///
    /// Deletion is not optimistic: the snapshot keeps the line until the
    /// backend confirms the removal and the follow-up fetch no longer
    /// contains it.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::UnknownLine`] for an out-of-range index, or the
    /// gateway failure from the round trip.
    pub async fn delete(&self, index: usize) -> Result<CartSnapshot, CartError> {
        let dispatch = {
            let mut state = self.state();
            let line = state
                .snapshot
                .line(index)
                .ok_or(CartError::UnknownLine(index))?;
            let key = line.key();
            debug!(product_id = %key.product_id, variant_index = key.variant_index, "queueing line deletion");
            state.set_pending(key, PendingOp::Delete);
            !state.busy
        };

        if dispatch {
            self.flush().await?;
        }
        Ok(self.snapshot())
    }

    /// Resume dispatching deferred operations, e.g. after a failed round
    /// trip left entries queued. A no-op when nothing is pending or a round
    /// trip is already in flight.
    ///
    /// # Errors
    ///
    /// Returns the first gateway failure encountered.
    pub async fn sync(&self) -> Result<(), CartError> {
        self.flush().await
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        // The lock is never held across an await, so poisoning can only
        // come from a panicking test assertion.
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, snapshot: CartSnapshot) {
        // Send fails only when no receiver exists, which is fine.
        let _ = self.inner.publisher.send(snapshot);
    }

    async fn adjust(&self, index: usize, delta: QuantityDelta) -> Result<CartSnapshot, CartError> {
        let (changed, dispatch) = {
            let mut state = self.state();
            let line = state
                .snapshot
                .lines
                .get_mut(index)
                .ok_or(CartError::UnknownLine(index))?;

            // Quantity floors at 1; deletion is a distinct explicit action.
            if delta == QuantityDelta::Down && line.quantity <= 1 {
                return Ok(state.snapshot.clone());
            }

            line.quantity = match delta {
                QuantityDelta::Up => line.quantity + 1,
                QuantityDelta::Down => line.quantity - 1,
            };
            let key = line.key();
            let target = line.quantity;

            // Optimistic display total; the server total wins on reconcile.
            state.snapshot.total = state.snapshot.computed_total();
            state.set_pending(key, PendingOp::Update { quantity: target });

            (state.snapshot.clone(), !state.busy)
        };

        self.publish(changed.clone());

        if dispatch {
            self.flush().await?;
            return Ok(self.snapshot());
        }

        // A round trip is in flight; the new target rides on its completion.
        Ok(changed)
    }

    /// Single-flight flush loop: claim the busy flag, then repeatedly send
    /// the oldest pending operation and reconcile with a full fetch until
    /// the queue drains.
    async fn flush(&self) -> Result<(), CartError> {
        {
            let mut state = self.state();
            if state.busy || state.pending.is_empty() {
                return Ok(());
            }
            state.busy = true;
            state.outcome = OutcomeState::Loading;
        }

        loop {
            let next = {
                let mut state = self.state();
                if state.pending.is_empty() {
                    state.busy = false;
                    state.outcome = OutcomeState::Success;
                    None
                } else {
                    Some(state.pending.remove(0))
                }
            };
            let Some((key, op)) = next else {
                return Ok(());
            };

            let result = self.round_trip(&key, op).await;
            match result {
                Ok(cart) => {
                    // Authoritative reconciliation point: replace wholesale.
                    let snapshot = {
                        let mut state = self.state();
                        state.snapshot = cart;
                        state.snapshot.clone()
                    };
                    self.publish(snapshot);
                }
                Err(e) => {
                    warn!(
                        product_id = %key.product_id,
                        variant_index = key.variant_index,
                        error = %e,
                        "cart round trip failed; keeping optimistic local state"
                    );
                    let mut state = self.state();
                    state.busy = false;
                    state.outcome = OutcomeState::Failed(e.to_string());
                    return Err(CartError::Gateway(e));
                }
            }
        }
    }

    async fn round_trip(&self, key: &LineKey, op: PendingOp) -> Result<CartSnapshot, GatewayError> {
        match op {
            PendingOp::Update { quantity } => {
                self.inner.gateway.update_line(key, quantity).await?;
            }
            PendingOp::Delete => {
                self.inner.gateway.delete_line(key).await?;
            }
        }
        self.inner.gateway.fetch_cart().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuantityDelta {
    Up,
    Down,
}

#[cfg(test)]
mod tests {
    use super::*;
    use krispy_cottage_core::ProductId;

    fn key(id: &str, variant_index: u32) -> LineKey {
        LineKey {
            product_id: ProductId::new(id),
            variant_index,
        }
    }

    fn empty_state() -> EngineState {
        EngineState {
            snapshot: CartSnapshot::empty(),
            outcome: OutcomeState::Idle,
            busy: false,
            pending: Vec::new(),
        }
    }

    #[test]
    fn test_set_pending_overwrites_same_line() {
        let mut state = empty_state();
        state.set_pending(key("a", 0), PendingOp::Update { quantity: 2 });
        state.set_pending(key("a", 0), PendingOp::Update { quantity: 5 });

        assert_eq!(state.pending.len(), 1);
        assert_eq!(state.pending[0].1, PendingOp::Update { quantity: 5 });
    }

    #[test]
    fn test_set_pending_delete_overrides_update() {
        let mut state = empty_state();
        state.set_pending(key("a", 0), PendingOp::Update { quantity: 3 });
        state.set_pending(key("a", 0), PendingOp::Delete);

        assert_eq!(state.pending.len(), 1);
        assert_eq!(state.pending[0].1, PendingOp::Delete);
    }

    #[test]
    fn test_set_pending_keeps_queue_position_across_lines() {
        let mut state = empty_state();
        state.set_pending(key("a", 0), PendingOp::Update { quantity: 2 });
        state.set_pending(key("b", 0), PendingOp::Update { quantity: 1 });
        state.set_pending(key("a", 0), PendingOp::Update { quantity: 4 });

        assert_eq!(state.pending[0].0, key("a", 0));
        assert_eq!(state.pending[0].1, PendingOp::Update { quantity: 4 });
        assert_eq!(state.pending[1].0, key("b", 0));
    }
}
