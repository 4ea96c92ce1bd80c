//! SSE framing for the cart update stream.
//!
//! A connected client first receives a resync frame — a freshly computed
//! full [`CartEvent`] — and then live events drained from its mailbox.
//! Events delivered while disconnected are not redelivered; the resync on
//! reconnect is the only recovery mechanism.

use std::convert::Infallible;

use axum::response::sse::Event;
use futures_util::stream::{self, Stream};
use tracing::error;

use crate::hub::Subscription;
use crate::models::cart::CartEvent;

/// Encode a cart event as a single-`data`-line SSE frame.
fn frame(event: &CartEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().data(json)),
        Err(err) => {
            error!(%err, "failed to encode cart event, skipping frame");
            None
        }
    }
}

struct LiveState {
    subscription: Subscription,
    resync: Option<CartEvent>,
}

/// Build the resync-then-live SSE stream for one subscriber.
///
/// `resync` is `None` when the initial cart read failed; the stream then
/// degrades to live events only. The stream ends when the subscription is
/// invalidated; dropping it (client disconnect) releases the registration.
pub fn live_stream(
    subscription: Subscription,
    resync: Option<CartEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(
        LiveState {
            subscription,
            resync,
        },
        |mut state| async move {
            loop {
                if let Some(event) = state.resync.take() {
                    if let Some(f) = frame(&event) {
                        return Some((Ok(f), state));
                    }
                }
                let event = state.subscription.next().await?;
                if let Some(f) = frame(&event) {
                    return Some((Ok(f), state));
                }
            }
        },
    )
}
