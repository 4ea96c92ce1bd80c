//! Quiescence-window debounce timer.
//!
//! Coalesces a burst of change notifications into a single fire: every
//! [`poke`](DebouncerHandle::poke) cancels the pending fire and restarts
//! the window, so at most one fire is delivered per burst regardless of
//! burst size. Fires are delivered via a `tokio::sync::mpsc` channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, Instrument};

/// Builder for a debounce timer.
///
/// Call [`spawn`](Self::spawn) to start the background task.
pub struct Debouncer {
    window: Duration,
    fire_tx: mpsc::Sender<()>,
    cancel: CancellationToken,
}

impl Debouncer {
    /// Construct a new debouncer (does not start the timer yet).
    #[must_use]
    pub fn new(window: Duration, fire_tx: mpsc::Sender<()>, cancel: CancellationToken) -> Self {
        Self {
            window,
            fire_tx,
            cancel,
        }
    }

    /// Spawn the background timer task and return a handle for poking it.
    #[must_use]
    pub fn spawn(self) -> DebouncerHandle {
        let poke = Arc::new(Notify::new());
        let cancel_for_handle = self.cancel.clone();

        let task = tokio::spawn(
            Self::run(self.window, self.fire_tx, self.cancel, Arc::clone(&poke))
                .instrument(info_span!("debouncer")),
        );

        DebouncerHandle {
            poke,
            cancel: cancel_for_handle,
            join_handle: Some(task),
        }
    }

    async fn run(
        window: Duration,
        fire_tx: mpsc::Sender<()>,
        cancel: CancellationToken,
        poke: Arc<Notify>,
    ) {
        loop {
            // Idle until the first change of a burst arrives.
            tokio::select! {
                () = cancel.cancelled() => return,
                () = poke.notified() => {}
            }

            // Pending: each further poke restarts the quiescence window.
            loop {
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = poke.notified() => {}
                    () = tokio::time::sleep(window) => {
                        debug!("quiescence window elapsed, firing");
                        if fire_tx.send(()).await.is_err() {
                            // Consumer gone; nothing left to coalesce for.
                            return;
                        }
                        break;
                    }
                }
            }
        }
    }
}

/// Handle returned from [`Debouncer::spawn`].
///
/// Dropping the handle cancels the timer task, discarding any pending
/// fire.
pub struct DebouncerHandle {
    poke: Arc<Notify>,
    cancel: CancellationToken,
    join_handle: Option<JoinHandle<()>>,
}

impl DebouncerHandle {
    /// Record an observed change: restart the quiescence window.
    pub fn poke(&self) {
        self.poke.notify_one();
    }

    /// Signal the timer task to stop and wait for it to exit.
    pub async fn await_completion(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for DebouncerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
