//! Recipe suggestion orchestrator port.
//!
//! The orchestrator is opaque: it generates recipe suggestions for an
//! ingredient set (with best-effort asynchronous image attachment), runs
//! the authoritative ingredient-to-catalog matcher, and applies selected
//! recipe ingredients to a cart.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::recipe::SuggestedRecipe;
use crate::{AppError, Result};

/// External recipe orchestrator operations.
#[async_trait]
pub trait RecipeOrchestrator: Send + Sync {
    /// Generate recipe suggestions for an ingredient set.
    ///
    /// Returned recipes may carry partial or absent image data; repeating
    /// the identical call discovers late-arriving images.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Upstream` on transport or decode failure.
    async fn suggest(&self, session_id: &str, ingredients: &[String])
        -> Result<Vec<SuggestedRecipe>>;

    /// Run the authoritative catalog matcher, returning the ingredient
    /// names that cannot be fulfilled from the catalog.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Upstream` on transport or decode failure.
    async fn check_availability(
        &self,
        session_id: &str,
        ingredients: &[String],
    ) -> Result<Vec<String>>;

    /// Apply selected recipe ingredients to the session's cart, scaled to
    /// `servings`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Upstream` on transport failure.
    async fn add_ingredients_to_cart(
        &self,
        session_id: &str,
        ingredients: &[String],
        servings: u32,
    ) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct SuggestRequest<'a> {
    cart_items: &'a [String],
    session_id: &'a str,
}

#[derive(Debug, Serialize)]
struct AvailabilityRequest<'a> {
    ingredients: &'a [String],
    session_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct AvailabilityResponse {
    #[serde(default)]
    unmatched_ingredients: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ApplyRequest<'a> {
    ingredients: &'a [String],
    servings: u32,
    session_id: &'a str,
}

/// HTTP client for the recipe orchestrator service.
pub struct HttpRecipeOrchestrator {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRecipeOrchestrator {
    /// Create a client against the given base URL.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl RecipeOrchestrator for HttpRecipeOrchestrator {
    async fn suggest(
        &self,
        session_id: &str,
        ingredients: &[String],
    ) -> Result<Vec<SuggestedRecipe>> {
        let url = format!("{}/suggested-recipes", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&SuggestRequest {
                cart_items: ingredients,
                session_id,
            })
            .send()
            .await?
            .error_for_status()
            .map_err(|err| AppError::Upstream(format!("suggestion call failed: {err}")))?;
        let recipes: Vec<SuggestedRecipe> = response.json().await?;
        Ok(recipes)
    }

    async fn check_availability(
        &self,
        session_id: &str,
        ingredients: &[String],
    ) -> Result<Vec<String>> {
        let url = format!("{}/check-ingredients", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&AvailabilityRequest {
                ingredients,
                session_id,
            })
            .send()
            .await?
            .error_for_status()
            .map_err(|err| AppError::Upstream(format!("availability check failed: {err}")))?;
        let body: AvailabilityResponse = response.json().await?;
        Ok(body.unmatched_ingredients)
    }

    async fn add_ingredients_to_cart(
        &self,
        session_id: &str,
        ingredients: &[String],
        servings: u32,
    ) -> Result<()> {
        let url = format!("{}/process-recipe", self.base_url);
        self.client
            .post(&url)
            .json(&ApplyRequest {
                ingredients,
                servings,
                session_id,
            })
            .send()
            .await?
            .error_for_status()
            .map_err(|err| AppError::Upstream(format!("recipe apply failed: {err}")))?;
        Ok(())
    }
}
