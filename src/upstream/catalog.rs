//! Product catalog name-resolution port.

use async_trait::async_trait;
use serde::Deserialize;

use crate::{AppError, Result};

/// Resolves product IDs to display names.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Look up the display name for a product ID.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Upstream` on transport or decode failure.
    /// Callers fall back to the raw product ID.
    async fn product_name(&self, product_id: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct ProductResponse {
    name: String,
}

/// HTTP client for the product catalog service.
pub struct HttpProductCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProductCatalog {
    /// Create a client against the given base URL.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl ProductCatalog for HttpProductCatalog {
    async fn product_name(&self, product_id: &str) -> Result<String> {
        let url = format!("{}/products/{product_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()
            .map_err(|err| AppError::Upstream(format!("product lookup failed: {err}")))?;
        let body: ProductResponse = response.json().await?;
        Ok(body.name)
    }
}
