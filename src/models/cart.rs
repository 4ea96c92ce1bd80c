//! Cart snapshot and update event models.

use serde::{Deserialize, Serialize};

/// Unresolved cart line as returned by the cart-read service.
///
/// Carries only the product ID; display names are resolved separately
/// through the product catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CartItem {
    /// Catalog product identifier.
    pub product_id: String,
    /// Number of units in the cart.
    pub quantity: u32,
}

/// Fully resolved cart line carried in update events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartLine {
    /// Catalog product identifier.
    #[serde(rename = "productId")]
    pub product_id: String,
    /// Display name resolved from the product catalog.
    #[serde(rename = "productName")]
    pub product_name: String,
    /// Number of units in the cart.
    pub quantity: u32,
}

/// Ordered sequence of resolved cart lines, rebuilt fresh on every publish.
pub type CartSnapshot = Vec<CartLine>;

/// Wire payload pushed through a session mailbox and streamed to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartEvent {
    /// Total item count: the sum of line quantities.
    pub count: u32,
    /// The full cart snapshot.
    pub items: CartSnapshot,
}

impl CartEvent {
    /// Build an event from a snapshot, deriving the item count.
    #[must_use]
    pub fn from_snapshot(items: CartSnapshot) -> Self {
        let count = items.iter().map(|line| line.quantity).sum();
        Self { count, items }
    }
}
