//! Last-write-wins store of generated recipe suggestions per session.
//!
//! Each regenerate fully replaces the prior entry; older generations are
//! unreachable. Image data is filled in at most once per recipe. A
//! background sweep task evicts stale entries so the cache does not grow
//! without bound with session count.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::models::recipe::SuggestedRecipe;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct CacheEntry {
    recipes: Vec<SuggestedRecipe>,
    created_at: DateTime<Utc>,
}

/// Keyed store of the most recent suggestion generation per session.
pub struct SuggestionCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl Default for SuggestionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SuggestionCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the session's entry with a fresh generation.
    ///
    /// Unconditional: concurrent generations race and the last call to
    /// complete wins, with no reconciliation of stale results.
    pub fn replace(&self, session_id: &str, recipes: Vec<SuggestedRecipe>) {
        self.lock().insert(
            session_id.to_owned(),
            CacheEntry {
                recipes,
                created_at: Utc::now(),
            },
        );
    }

    /// Look up one recipe within the most recently stored generation.
    #[must_use]
    pub fn get(&self, session_id: &str, recipe_id: &str) -> Option<SuggestedRecipe> {
        self.lock()
            .get(session_id)?
            .recipes
            .iter()
            .find(|recipe| recipe.recipe_id == recipe_id)
            .cloned()
    }

    /// The full current generation for a session, if any.
    #[must_use]
    pub fn list(&self, session_id: &str) -> Option<Vec<SuggestedRecipe>> {
        self.lock()
            .get(session_id)
            .map(|entry| entry.recipes.clone())
    }

    /// Attach image data to a recipe, at most once.
    ///
    /// Returns `true` if the image was applied; `false` when the recipe is
    /// not in the current generation or already carries an image.
    pub fn apply_image(&self, session_id: &str, recipe_id: &str, image_data: String) -> bool {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(session_id) else {
            return false;
        };
        let Some(recipe) = entry
            .recipes
            .iter_mut()
            .find(|recipe| recipe.recipe_id == recipe_id)
        else {
            return false;
        };
        if recipe.image_data.is_some() {
            return false;
        }
        recipe.image_data = Some(image_data);
        true
    }

    /// Evict entries older than `ttl`, returning the number removed.
    pub fn evict_older_than(&self, ttl: chrono::Duration) -> usize {
        let cutoff = Utc::now() - ttl;
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.created_at >= cutoff);
        before - entries.len()
    }

    /// Number of sessions with a cached generation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no session has a cached generation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Spawn the cache eviction background task.
///
/// Sweeps every minute, evicting session entries older than
/// `ttl_seconds`.
#[must_use]
pub fn spawn_ttl_sweeper(
    cache: Arc<SuggestionCache>,
    ttl_seconds: u64,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let ttl = chrono::Duration::seconds(i64::try_from(ttl_seconds).unwrap_or(i64::MAX));
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("suggestion cache sweeper shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let evicted = cache.evict_older_than(ttl);
                    if evicted > 0 {
                        debug!(evicted, "evicted stale suggestion cache entries");
                    }
                }
            }
        }
    })
}
