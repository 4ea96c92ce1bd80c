//! Ports to the external collaborator services.
//!
//! Each collaborator is a trait so the core can be exercised against
//! in-process fakes; the shipped implementations are thin reqwest clients
//! driven by configured base URLs.

pub mod cart;
pub mod catalog;
pub mod orchestrator;

use std::sync::Arc;

use tracing::warn;

use crate::models::cart::{CartLine, CartSnapshot};
use crate::Result;

pub use cart::{CartService, HttpCartService};
pub use catalog::{HttpProductCatalog, ProductCatalog};
pub use orchestrator::{HttpRecipeOrchestrator, RecipeOrchestrator};

/// Build a fresh, fully resolved cart snapshot for a session.
///
/// Reads the current cart lines and resolves each product ID to its
/// display name. A failed name lookup degrades to the raw product ID so a
/// single catalog hiccup never loses a line.
///
/// # Errors
///
/// Returns `AppError::Upstream` if the cart read itself fails.
pub async fn snapshot_cart(
    cart: &Arc<dyn CartService>,
    catalog: &Arc<dyn ProductCatalog>,
    session_id: &str,
) -> Result<CartSnapshot> {
    let items = cart.cart_items(session_id).await?;

    let mut snapshot = Vec::with_capacity(items.len());
    for item in items {
        let product_name = match catalog.product_name(&item.product_id).await {
            Ok(name) => name,
            Err(err) => {
                warn!(product_id = %item.product_id, %err, "product name lookup failed, using id");
                item.product_id.clone()
            }
        };
        snapshot.push(CartLine {
            product_id: item.product_id,
            product_name,
            quantity: item.quantity,
        });
    }
    Ok(snapshot)
}
