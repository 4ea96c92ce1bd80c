//! Cancellable timer-driven scheduling primitives.

pub mod debounce;

pub use debounce::{Debouncer, DebouncerHandle};
