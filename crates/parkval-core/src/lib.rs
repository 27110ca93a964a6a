//! `parkval` Core Library
//!
//! Shared functionality for `parkval` components:
//! - Configuration resolution and hierarchy
//! - Tracing initialisation
//! - `SQLite` pool helpers
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
