//! Suggested recipe models and derived ingredient status.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Single ingredient of a suggested recipe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct RecipeIngredient {
    /// Ingredient name as produced by the orchestrator.
    pub name: String,
    /// Amount for the default serving count.
    pub quantity: f32,
    /// Measurement unit (may be empty).
    #[serde(default)]
    pub unit: String,
}

/// Recipe suggestion generated by the external orchestrator.
///
/// `image_data` is absent at creation and filled in later, at most once,
/// as the orchestrator's image pipeline catches up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct SuggestedRecipe {
    /// Identifier unique within one cache generation.
    pub recipe_id: String,
    /// Display title.
    pub title: String,
    /// Short description.
    pub description: String,
    /// Human-readable cook time (e.g. "25 min").
    pub cook_time: String,
    /// Serving count the ingredient quantities are scaled for.
    pub default_servings: u32,
    /// Ingredient list.
    pub ingredients: Vec<RecipeIngredient>,
    /// Preparation steps.
    pub instructions: Vec<String>,
    /// Base64-encoded image, attached asynchronously.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
}

impl SuggestedRecipe {
    /// Whether the image attachment has not arrived yet.
    #[must_use]
    pub fn missing_image(&self) -> bool {
        self.image_data.is_none()
    }
}

/// Derived, ephemeral per-ingredient cart status; recomputed per render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngredientCartStatus {
    /// The ingredient matched a cart line.
    InCart {
        /// Quantity of the matched line.
        quantity: u32,
        /// Product ID of the matched line.
        product_id: String,
    },
    /// The authoritative matcher determined the ingredient cannot be
    /// fulfilled from the catalog. Never overwritten once set.
    NotAvailable,
}

impl Serialize for IngredientCartStatus {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::InCart {
                quantity,
                product_id,
            } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("in_cart", &true)?;
                map.serialize_entry("quantity", quantity)?;
                map.serialize_entry("product_id", product_id)?;
                map.end()
            }
            Self::NotAvailable => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("in_cart", &false)?;
                map.serialize_entry("not_available", &true)?;
                map.end()
            }
        }
    }
}
