//! Session-scoped suggestion cache and its schedulers.
//!
//! [`cache`] stores the latest generation of suggested recipes per
//! session; [`service`] owns generation, view, and poller lifecycles;
//! [`image_poller`] fills in late-arriving images; [`view`] runs the
//! per-session debounced regenerate worker.

pub mod cache;
pub mod image_poller;
pub mod service;
pub mod view;

pub use cache::SuggestionCache;
pub use service::SuggestionEngine;
