//! Progressive image polling for a suggestion generation.
//!
//! A generation can return recipes whose images are still being produced.
//! The poller re-issues the identical suggestion call on a fixed cadence
//! and applies newly arrived images into the cached generation, one recipe
//! at a time, until every image has arrived or the attempt budget is
//! exhausted.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::suggest::cache::SuggestionCache;
use crate::upstream::RecipeOrchestrator;

/// Background task that fills in late-arriving recipe images.
pub struct ImagePoller {
    session_id: String,
    ingredients: Vec<String>,
    missing: HashSet<String>,
    interval: Duration,
    attempt_timeout: Duration,
    max_attempts: u32,
    orchestrator: Arc<dyn RecipeOrchestrator>,
    cache: Arc<SuggestionCache>,
    cancel: CancellationToken,
}

impl ImagePoller {
    /// Construct a poller for the given generation (does not start it yet).
    ///
    /// `missing` is the set of recipe IDs still lacking image data;
    /// `ingredients` must be the exact ingredient set of the generation so
    /// each poll re-issues the identical call.
    #[must_use]
    #[allow(clippy::too_many_arguments)] // Internal plumbing; constructed in one place.
    pub fn new(
        session_id: String,
        ingredients: Vec<String>,
        missing: HashSet<String>,
        interval: Duration,
        attempt_timeout: Duration,
        max_attempts: u32,
        orchestrator: Arc<dyn RecipeOrchestrator>,
        cache: Arc<SuggestionCache>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session_id,
            ingredients,
            missing,
            interval,
            attempt_timeout,
            max_attempts,
            orchestrator,
            cache,
            cancel,
        }
    }

    /// Spawn the polling task.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run().instrument(info_span!("image_poller")))
    }

    async fn run(mut self) {
        // A transient failure doubles only the next wait, then the normal
        // cadence resumes.
        let mut delay = self.interval;

        for attempt in 1..=self.max_attempts {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    debug!(session_id = %self.session_id, "image poller cancelled");
                    return;
                }
                () = tokio::time::sleep(delay) => {}
            }
            delay = self.interval;

            let fetched = tokio::time::timeout(
                self.attempt_timeout,
                self.orchestrator.suggest(&self.session_id, &self.ingredients),
            )
            .await;

            let recipes = match fetched {
                Ok(Ok(recipes)) => recipes,
                Ok(Err(err)) => {
                    warn!(session_id = %self.session_id, attempt, %err, "image poll failed");
                    delay = self.interval * 2;
                    continue;
                }
                Err(_) => {
                    warn!(session_id = %self.session_id, attempt, "image poll timed out");
                    delay = self.interval * 2;
                    continue;
                }
            };

            for recipe in recipes {
                if !self.missing.contains(&recipe.recipe_id) {
                    continue;
                }
                if let Some(image_data) = recipe.image_data {
                    if self
                        .cache
                        .apply_image(&self.session_id, &recipe.recipe_id, image_data)
                    {
                        debug!(
                            session_id = %self.session_id,
                            recipe_id = %recipe.recipe_id,
                            "image attached"
                        );
                    }
                    // Applied or superseded either way: never re-request.
                    self.missing.remove(&recipe.recipe_id);
                }
            }

            if self.missing.is_empty() {
                debug!(session_id = %self.session_id, attempt, "all images resolved");
                return;
            }
        }

        info!(
            session_id = %self.session_id,
            remaining = self.missing.len(),
            "image poll budget exhausted, leaving entries without images"
        );
    }
}
