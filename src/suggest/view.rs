//! Per-session debounced regenerate worker.
//!
//! One worker runs for the lifetime of an active suggestions view. Each
//! debouncer fire re-reads the session's cart, derives the ingredient set
//! from the resolved product names, and regenerates suggestions. A failed
//! cart read degrades to skipping the regenerate.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};

use crate::suggest::service::SuggestionEngine;
use crate::upstream;

/// Spawn the worker loop for one mounted view.
pub(crate) fn spawn_worker(
    engine: Arc<SuggestionEngine>,
    session_id: String,
    fire_rx: mpsc::Receiver<()>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run(engine, session_id, fire_rx, cancel).instrument(info_span!("view_worker")))
}

async fn run(
    engine: Arc<SuggestionEngine>,
    session_id: String,
    mut fire_rx: mpsc::Receiver<()>,
    cancel: CancellationToken,
) {
    loop {
        let fired = tokio::select! {
            () = cancel.cancelled() => {
                debug!(session_id, "view worker cancelled");
                return;
            }
            fired = fire_rx.recv() => fired,
        };
        if fired.is_none() {
            // Debouncer gone; the view is being torn down.
            return;
        }
        regenerate(&engine, &session_id).await;
    }
}

async fn regenerate(engine: &Arc<SuggestionEngine>, session_id: &str) {
    let snapshot = match upstream::snapshot_cart(&engine.cart, &engine.catalog, session_id).await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!(session_id, %err, "cart read failed, skipping regenerate");
            return;
        }
    };

    let ingredient_names: Vec<String> = snapshot
        .iter()
        .map(|line| line.product_name.clone())
        .collect();

    debug!(
        session_id,
        lines = ingredient_names.len(),
        "debounce fired, regenerating suggestions"
    );
    let _ = engine.generate(session_id, &ingredient_names).await;
}
