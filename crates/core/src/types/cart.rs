//! Cart domain types.
//!
//! These types mirror the wire shape of the storefront backend's cart
//! endpoints (`/mobile/cart`, `/cart/update`, `/cart/delete`). The backend
//! is authoritative for all pricing: a [`CartSnapshot`] is replaced wholesale
//! on every successful round trip and only mutated optimistically in between.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::id::ProductId;

/// Identity of a cart line, stable across list reordering.
///
/// Lines are addressed on the wire by product id plus the index of the
/// selected variant/attribute combination. Positional indices shift when the
/// server reorders or drops lines, so all pending-operation bookkeeping is
/// keyed by `LineKey` instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineKey {
    /// Product identifier.
    #[serde(rename = "productId")]
    pub product_id: ProductId,
    /// Index of the selected variant/attribute combination.
    pub variant_index: u32,
}

/// One product+variant+quantity entry within a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Product identifier (server-assigned).
    #[serde(rename = "_id")]
    pub product_id: ProductId,
    /// Index of the selected variant/attribute combination.
    pub variant_index: u32,
    /// Quantity, always >= 1. A line reduced to zero is removed, never kept.
    pub quantity: u32,
    /// Price per unit. The server owns pricing; this is display data.
    #[serde(rename = "price", with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    /// Whether the product has more than one variant.
    #[serde(default)]
    pub has_variants: bool,
    /// Product display name.
    #[serde(default)]
    pub name: String,
    /// Selected attribute names and values (display only).
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Path of the product's featured image, relative to the store origin.
    #[serde(default)]
    pub featured_image: Option<String>,
}

impl CartLine {
    /// The stable identity of this line.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey {
            product_id: self.product_id.clone(),
            variant_index: self.variant_index,
        }
    }

    /// Extended price for this line (unit price x quantity).
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// The client's reflection of the server-side cart.
///
/// Owned exclusively by the reconciliation engine. Replaced wholesale from
/// `fetch_cart` responses; never patched field-by-field from server data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    /// Ordered line items, as the server returned them.
    #[serde(rename = "products")]
    pub lines: Vec<CartLine>,
    /// Server-computed cart total. May differ from the sum of line totals
    /// (discounts); after reconciliation the server value always wins.
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

impl CartSnapshot {
    /// An empty cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            lines: Vec::new(),
            total: Decimal::ZERO,
        }
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Locally-computed total: sum of unit price x quantity over all lines.
    ///
    /// Used for optimistic display between round trips. The server total in
    /// [`CartSnapshot::total`] replaces it at every reconciliation point.
    #[must_use]
    pub fn computed_total(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// The line at a display index, if any.
    #[must_use]
    pub fn line(&self, index: usize) -> Option<&CartLine> {
        self.lines.get(index)
    }

    /// Find the display index of a line by its stable key.
    #[must_use]
    pub fn position(&self, key: &LineKey) -> Option<usize> {
        self.lines.iter().position(|line| line.key() == *key)
    }
}

impl Default for CartSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    fn line(id: &str, variant_index: u32, quantity: u32, unit_price: Decimal) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            variant_index,
            quantity,
            unit_price,
            has_variants: false,
            name: String::new(),
            attributes: BTreeMap::new(),
            featured_image: None,
        }
    }

    #[test]
    fn test_line_total() {
        let line = line("x", 0, 3, dec!(10.00));
        assert_eq!(line.line_total(), dec!(30.00));
    }

    #[test]
    fn test_computed_total_sums_all_lines() {
        let snapshot = CartSnapshot {
            lines: vec![line("a", 0, 2, dec!(5.50)), line("b", 1, 1, dec!(4.00))],
            total: dec!(0),
        };
        assert_eq!(snapshot.computed_total(), dec!(15.00));
    }

    #[test]
    fn test_position_by_key() {
        let snapshot = CartSnapshot {
            lines: vec![line("a", 0, 1, dec!(1)), line("a", 2, 1, dec!(1))],
            total: dec!(2),
        };
        let key = LineKey {
            product_id: ProductId::new("a"),
            variant_index: 2,
        };
        assert_eq!(snapshot.position(&key), Some(1));
    }

    #[test]
    fn test_deserialize_server_cart() {
        let json = r#"{
            "products": [{
                "_id": "66862b5e6cfb8b8f9127f6a2",
                "variantIndex": 1,
                "quantity": 2,
                "price": 10.5,
                "hasVariants": true,
                "name": "Cinnamon Roll",
                "attributes": {"Size": "Large"},
                "featuredImage": "/uploads/roll.jpg"
            }],
            "total": 21.0
        }"#;

        let snapshot: CartSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.lines.len(), 1);
        let line = &snapshot.lines[0];
        assert_eq!(line.product_id.as_str(), "66862b5e6cfb8b8f9127f6a2");
        assert_eq!(line.variant_index, 1);
        assert_eq!(line.quantity, 2);
        assert_eq!(line.unit_price, dec!(10.5));
        assert!(line.has_variants);
        assert_eq!(line.attributes.get("Size").map(String::as_str), Some("Large"));
        assert_eq!(snapshot.total, dec!(21.0));
    }

    #[test]
    fn test_deserialize_minimal_line() {
        // Older backend payloads omit hasVariants/attributes/featuredImage.
        let json = r#"{"products": [{"_id": "x", "variantIndex": 0, "quantity": 1, "price": 3.0}], "total": 3.0}"#;
        let snapshot: CartSnapshot = serde_json::from_str(json).unwrap();
        assert!(!snapshot.lines[0].has_variants);
        assert!(snapshot.lines[0].attributes.is_empty());
        assert!(snapshot.lines[0].featured_image.is_none());
    }

    #[test]
    fn test_line_key_wire_shape() {
        let key = LineKey {
            product_id: ProductId::new("abc"),
            variant_index: 3,
        };
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"productId": "abc", "variantIndex": 3})
        );
    }
}
