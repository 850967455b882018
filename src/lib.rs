//! Libris library server
//!
//! REST JSON API for a library's readers, books and loans. The loan
//! engine enforces stock, per-reader limits and duplicate rules, creates
//! batches atomically and computes overdue fines.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
