//! HTTP/SSE server surface.
//!
//! Mounts the cart update stream and the suggestion endpoints behind an
//! axum router. The suggestion generation endpoint never surfaces an
//! orchestrator failure: it degrades to an empty array so the client can
//! keep rendering.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::GlobalConfig;
use crate::hub::{stream as sse_stream, CartUpdateHub};
use crate::matcher;
use crate::models::cart::CartEvent;
use crate::models::recipe::{IngredientCartStatus, SuggestedRecipe};
use crate::suggest::SuggestionEngine;
use crate::upstream::{self, CartService, ProductCatalog, RecipeOrchestrator};
use crate::{AppError, Result};

/// Timeout for applying recipe ingredients to the cart.
const APPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared state injected into every handler.
pub struct AppState {
    /// Global configuration.
    pub config: Arc<GlobalConfig>,
    /// Per-session update bus.
    pub hub: CartUpdateHub,
    /// Suggestion engine.
    pub engine: Arc<SuggestionEngine>,
    /// Cart-read collaborator.
    pub cart: Arc<dyn CartService>,
    /// Product catalog collaborator.
    pub catalog: Arc<dyn ProductCatalog>,
    /// Recipe orchestrator collaborator.
    pub orchestrator: Arc<dyn RecipeOrchestrator>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

/// Handler for `GET /health` — returns 200 OK with a plain-text body.
async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    session_id: String,
}

/// Unmounts the suggestions view when the SSE stream is dropped.
struct ViewGuard {
    engine: Arc<SuggestionEngine>,
    session_id: String,
    view_id: u64,
}

impl Drop for ViewGuard {
    fn drop(&mut self) {
        self.engine.unmount_view(&self.session_id, self.view_id);
    }
}

/// Handler for `GET /cart/updates?session_id=` — the streaming
/// subscription.
///
/// Registers the session's subscriber (displacing any previous one),
/// mounts the suggestions view for the connection's lifetime, and emits a
/// resync frame before entering the live loop.
async fn cart_updates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let session_id = query.session_id;
    info!(session_id, "cart update stream connected");

    let subscription = state.hub.register(&session_id);
    let view_id = state.engine.mount_view(&session_id);
    let guard = ViewGuard {
        engine: Arc::clone(&state.engine),
        session_id: session_id.clone(),
        view_id,
    };

    // Resync frame: a freshly computed full snapshot. An upstream failure
    // degrades to skipping the frame, never failing the stream.
    let resync = match upstream::snapshot_cart(&state.cart, &state.catalog, &session_id).await {
        Ok(snapshot) => Some(CartEvent::from_snapshot(snapshot)),
        Err(err) => {
            warn!(session_id, %err, "initial cart read failed, skipping resync frame");
            None
        }
    };

    let live = sse_stream::live_stream(subscription, resync);

    // Carry the view guard in the stream state so client disconnect tears
    // the view down along with the subscription.
    let guarded = stream::unfold((Box::pin(live), guard), |(mut live, guard)| async move {
        live.next().await.map(|item| (item, (live, guard)))
    });

    Sse::new(guarded).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
struct SuggestBody {
    #[serde(default)]
    cart_items: Vec<String>,
    session_id: String,
}

/// Handler for `POST /suggested-recipes`.
///
/// Returns the generated suggestions as a JSON array. Insufficient cart
/// items and orchestrator failure both yield an empty array with HTTP
/// 200.
async fn suggested_recipes(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SuggestBody>,
) -> Json<Vec<SuggestedRecipe>> {
    let recipes = state
        .engine
        .generate(&body.session_id, &body.cart_items)
        .await;
    Json(recipes)
}

#[derive(Debug, Serialize)]
struct RecipeDetailResponse {
    recipe: SuggestedRecipe,
    ingredient_cart_status: HashMap<String, IngredientCartStatus>,
}

/// Handler for `GET /suggested-recipe/{id}?session_id=`.
///
/// Resolves the recipe within the session's most recent generation and
/// derives the per-ingredient cart status: the authoritative availability
/// verdict first, then the local fuzzy cart match.
async fn suggested_recipe_detail(
    State(state): State<Arc<AppState>>,
    Path(recipe_id): Path<String>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<RecipeDetailResponse>> {
    let session_id = query.session_id;
    let recipe = state
        .engine
        .cache()
        .get(&session_id, &recipe_id)
        .ok_or_else(|| AppError::NotFound(format!("suggested recipe {recipe_id} not found")))?;

    let ingredient_names: Vec<String> = recipe
        .ingredients
        .iter()
        .map(|ingredient| ingredient.name.clone())
        .collect();

    // Both lookups degrade: a failed cart read renders no in-cart badges,
    // a failed availability check marks nothing unavailable.
    let cart = match upstream::snapshot_cart(&state.cart, &state.catalog, &session_id).await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!(session_id, %err, "cart read failed for recipe detail");
            Vec::new()
        }
    };
    let unavailable = match state
        .orchestrator
        .check_availability(&session_id, &ingredient_names)
        .await
    {
        Ok(unmatched) => unmatched,
        Err(err) => {
            warn!(session_id, %err, "availability check failed, skipping verdicts");
            Vec::new()
        }
    };

    let mut ingredient_cart_status = HashMap::new();
    matcher::reconcile(
        &ingredient_names,
        &cart,
        &unavailable,
        &mut ingredient_cart_status,
    );

    Ok(Json(RecipeDetailResponse {
        recipe,
        ingredient_cart_status,
    }))
}

#[derive(Debug, Deserialize)]
struct ApplyBody {
    session_id: String,
    #[serde(default)]
    selected_ingredients: Vec<String>,
    servings: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ApplyResponse {
    status: &'static str,
}

/// Handler for `POST /suggested-recipe/{id}/add-to-cart`.
///
/// Delegates the cart mutation to the orchestrator, then publishes a
/// freshly fetched snapshot so subscribers observe the change without
/// polling the cart themselves.
async fn add_suggested_recipe_to_cart(
    State(state): State<Arc<AppState>>,
    Path(recipe_id): Path<String>,
    Json(body): Json<ApplyBody>,
) -> Result<Json<ApplyResponse>> {
    let session_id = body.session_id;
    if state.engine.cache().get(&session_id, &recipe_id).is_none() {
        return Err(AppError::NotFound(format!(
            "suggested recipe {recipe_id} not found"
        )));
    }
    if body.selected_ingredients.is_empty() {
        return Err(AppError::InvalidRequest("no ingredients selected".into()));
    }
    let servings = body.servings.unwrap_or(4);

    info!(
        session_id,
        recipe_id,
        servings,
        selected = body.selected_ingredients.len(),
        "applying recipe ingredients to cart"
    );

    tokio::time::timeout(
        APPLY_TIMEOUT,
        state.orchestrator.add_ingredients_to_cart(
            &session_id,
            &body.selected_ingredients,
            servings,
        ),
    )
    .await
    .map_err(|_| AppError::Upstream("recipe apply timed out".into()))??;

    // The cart mutation lands asynchronously upstream: wait for it to
    // settle, then push the fresh snapshot through the hub.
    let settle = state.config.cart_settle();
    let publish_state = Arc::clone(&state);
    let publish_session = session_id.clone();
    tokio::spawn(async move {
        tokio::time::sleep(settle).await;
        match upstream::snapshot_cart(
            &publish_state.cart,
            &publish_state.catalog,
            &publish_session,
        )
        .await
        {
            Ok(snapshot) => {
                publish_state.hub.publish(&publish_session, snapshot);
                publish_state.engine.notify_cart_change(&publish_session);
            }
            Err(err) => {
                warn!(session_id = %publish_session, %err, "cart read failed, skipping update event");
            }
        }
    });

    Ok(Json(ApplyResponse { status: "added" }))
}

/// Build the application router over shared state.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/cart/updates", get(cart_updates))
        .route("/suggested-recipes", post(suggested_recipes))
        .route("/suggested-recipe/{id}", get(suggested_recipe_detail))
        .route(
            "/suggested-recipe/{id}/add-to-cart",
            post(add_suggested_recipe_to_cart),
        )
        .with_state(state)
}

/// Start the HTTP transport on `config.http_port`.
///
/// # Errors
///
/// Returns `AppError::Config` if the server fails to bind, or
/// `AppError::Stream` if the transport fails while serving.
pub async fn serve(state: Arc<AppState>, ct: CancellationToken) -> Result<()> {
    let bind = SocketAddr::from(([0, 0, 0, 0], state.config.http_port));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind HTTP on {bind}: {err}")))?;

    info!(%bind, "starting HTTP/SSE transport");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            ct.cancelled().await;
        })
        .await
        .map_err(|err| AppError::Stream(format!("HTTP server error: {err}")))?;

    info!("HTTP/SSE transport shut down");
    Ok(())
}
