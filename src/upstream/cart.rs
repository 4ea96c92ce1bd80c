//! Cart-read service port.

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::cart::CartItem;
use crate::{AppError, Result};

/// Read access to a session's current cart lines.
#[async_trait]
pub trait CartService: Send + Sync {
    /// Fetch the current cart lines for a session.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Upstream` on transport or decode failure.
    async fn cart_items(&self, session_id: &str) -> Result<Vec<CartItem>>;
}

#[derive(Debug, Deserialize)]
struct CartResponse {
    #[serde(default)]
    items: Vec<CartItem>,
}

/// HTTP client for the cart-read service.
pub struct HttpCartService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCartService {
    /// Create a client against the given base URL.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl CartService for HttpCartService {
    async fn cart_items(&self, session_id: &str) -> Result<Vec<CartItem>> {
        let url = format!("{}/cart/{session_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()
            .map_err(|err| AppError::Upstream(format!("cart read failed: {err}")))?;
        let body: CartResponse = response.json().await?;
        Ok(body.items)
    }
}
