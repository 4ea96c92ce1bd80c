//! Per-session real-time update bus.
//!
//! [`registry`] owns one bounded mailbox per session and a non-blocking
//! publish path; [`stream`] drains a session's mailbox over a long-lived
//! SSE connection.

pub mod registry;
pub mod stream;

pub use registry::{CartUpdateHub, Subscription};
