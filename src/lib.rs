pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::time::Instant;

use crate::config::Config;
use crate::services::{RecordingEngine, Scheduler};

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub engine: RecordingEngine,
    pub scheduler: Scheduler,
    pub start_time: Instant,
}
