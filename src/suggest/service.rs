//! Suggestion engine: generation, cache replacement, and scheduler
//! lifecycles.
//!
//! The engine is the single owner of per-session suggestion state: the
//! cache entry, the image poller for the latest generation, and the
//! debounced regenerate worker for an active suggestions view.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::SuggestConfig;
use crate::models::recipe::SuggestedRecipe;
use crate::schedule::{Debouncer, DebouncerHandle};
use crate::suggest::cache::SuggestionCache;
use crate::suggest::image_poller::ImagePoller;
use crate::suggest::view;
use crate::upstream::{CartService, ProductCatalog, RecipeOrchestrator};

/// Capacity of a view worker's fire channel. Fires are coalesced by the
/// debouncer, so this stays tiny.
const FIRE_CHANNEL_CAPACITY: usize = 4;

pub(crate) struct ViewSlot {
    id: u64,
    debouncer: DebouncerHandle,
}

struct PollerSlot {
    id: u64,
    cancel: CancellationToken,
}

/// Owner of suggestion generation and its background schedulers.
pub struct SuggestionEngine {
    pub(crate) cache: Arc<SuggestionCache>,
    pub(crate) orchestrator: Arc<dyn RecipeOrchestrator>,
    pub(crate) cart: Arc<dyn CartService>,
    pub(crate) catalog: Arc<dyn ProductCatalog>,
    config: SuggestConfig,
    shutdown: CancellationToken,
    pollers: Mutex<HashMap<String, PollerSlot>>,
    views: Mutex<HashMap<String, ViewSlot>>,
    next_view_id: AtomicU64,
    next_poller_id: AtomicU64,
}

impl SuggestionEngine {
    /// Construct an engine over the shared cache and collaborator ports.
    ///
    /// `shutdown` is the root token; every poller and view worker runs
    /// under a child of it.
    #[must_use]
    pub fn new(
        cache: Arc<SuggestionCache>,
        orchestrator: Arc<dyn RecipeOrchestrator>,
        cart: Arc<dyn CartService>,
        catalog: Arc<dyn ProductCatalog>,
        config: SuggestConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            cache,
            orchestrator,
            cart,
            catalog,
            config,
            shutdown,
            pollers: Mutex::new(HashMap::new()),
            views: Mutex::new(HashMap::new()),
            next_view_id: AtomicU64::new(1),
            next_poller_id: AtomicU64::new(1),
        }
    }

    /// The shared suggestion cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<SuggestionCache> {
        &self.cache
    }

    /// Generate suggestions for a session and replace its cache entry.
    ///
    /// Fewer than two ingredients short-circuits to an empty result
    /// without calling the orchestrator. Orchestrator failure or timeout
    /// degrades to an empty result and leaves the cache untouched — the
    /// caller never sees an error. A successful generation with imageless
    /// entries starts a fresh image poller, cancelling any previous one
    /// for the session.
    pub async fn generate(
        self: &Arc<Self>,
        session_id: &str,
        ingredient_names: &[String],
    ) -> Vec<SuggestedRecipe> {
        if ingredient_names.len() < 2 {
            debug!(
                session_id,
                count = ingredient_names.len(),
                "insufficient ingredients, skipping generation"
            );
            return Vec::new();
        }

        let outcome = tokio::time::timeout(
            self.config.generate_timeout(),
            self.orchestrator.suggest(session_id, ingredient_names),
        )
        .await;

        let recipes = match outcome {
            Ok(Ok(recipes)) => recipes,
            Ok(Err(err)) => {
                warn!(session_id, %err, "suggestion generation failed, degrading to empty");
                return Vec::new();
            }
            Err(_) => {
                warn!(session_id, "suggestion generation timed out, degrading to empty");
                return Vec::new();
            }
        };

        self.cache.replace(session_id, recipes.clone());

        let missing: HashSet<String> = recipes
            .iter()
            .filter(|recipe| recipe.missing_image())
            .map(|recipe| recipe.recipe_id.clone())
            .collect();

        // The previous generation's poller is obsolete either way.
        self.cancel_poller(session_id);
        if !missing.is_empty() {
            self.spawn_poller(session_id, ingredient_names.to_vec(), missing);
        }

        recipes
    }

    fn spawn_poller(
        self: &Arc<Self>,
        session_id: &str,
        ingredients: Vec<String>,
        missing: HashSet<String>,
    ) {
        let id = self.next_poller_id.fetch_add(1, Ordering::Relaxed);
        let cancel = self.shutdown.child_token();
        let poller = ImagePoller::new(
            session_id.to_owned(),
            ingredients,
            missing,
            self.config.poll_interval(),
            self.config.poll_timeout(),
            self.config.poll_attempts,
            Arc::clone(&self.orchestrator),
            Arc::clone(&self.cache),
            cancel.clone(),
        );
        let handle = poller.spawn();
        self.pollers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session_id.to_owned(), PollerSlot { id, cancel });

        // Reap the tracking entry once the poller exits on its own, so a
        // session that never regenerates does not keep a stale slot. The
        // id guard leaves a newer poller's slot alone.
        let engine = Arc::clone(self);
        let session = session_id.to_owned();
        tokio::spawn(async move {
            let _ = handle.await;
            let mut pollers = engine.pollers.lock().unwrap_or_else(PoisonError::into_inner);
            if pollers.get(&session).is_some_and(|slot| slot.id == id) {
                pollers.remove(&session);
            }
        });
    }

    fn cancel_poller(&self, session_id: &str) {
        if let Some(slot) = self
            .pollers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
        {
            slot.cancel.cancel();
        }
    }

    /// Whether an image poller is still tracked for the session.
    #[must_use]
    pub fn has_active_poller(&self, session_id: &str) -> bool {
        self.pollers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(session_id)
    }

    /// Mount the suggestions view for a session, replacing any previous
    /// one, and return the view ID for the matching unmount.
    ///
    /// The view owns a debouncer and a worker task that regenerates
    /// suggestions from the current cart after each quiescent burst of
    /// cart changes.
    #[must_use]
    pub fn mount_view(self: &Arc<Self>, session_id: &str) -> u64 {
        let id = self.next_view_id.fetch_add(1, Ordering::Relaxed);
        let cancel = self.shutdown.child_token();
        let (fire_tx, fire_rx) = mpsc::channel(FIRE_CHANNEL_CAPACITY);

        let debouncer =
            Debouncer::new(self.config.debounce_window(), fire_tx, cancel.clone()).spawn();
        view::spawn_worker(Arc::clone(self), session_id.to_owned(), fire_rx, cancel);

        let displaced = self
            .views
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session_id.to_owned(), ViewSlot { id, debouncer });
        if displaced.is_some() {
            debug!(session_id, "replacing existing suggestions view");
        }
        // Dropping a displaced slot cancels its debouncer and worker.
        id
    }

    /// Tear down the session's view, but only if `view_id` is still the
    /// current one. Cancels any pending regenerate.
    pub fn unmount_view(&self, session_id: &str, view_id: u64) {
        let mut views = self.views.lock().unwrap_or_else(PoisonError::into_inner);
        if views
            .get(session_id)
            .is_some_and(|slot| slot.id == view_id)
        {
            views.remove(session_id);
            debug!(session_id, view_id, "suggestions view unmounted");
        }
    }

    /// Record an observed cart change for the session's view, restarting
    /// its debounce window. No-op when no view is mounted.
    pub fn notify_cart_change(&self, session_id: &str) {
        let views = self.views.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = views.get(session_id) {
            slot.debouncer.poke();
        }
    }
}
