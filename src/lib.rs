#![forbid(unsafe_code)]

pub mod config;
pub mod errors;
pub mod hub;
pub mod matcher;
pub mod models;
pub mod schedule;
pub mod server;
pub mod suggest;
pub mod upstream;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
