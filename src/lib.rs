pub mod config;
pub mod rest;
pub mod storage;
pub mod tracker;

use std::sync::Arc;

use config::TrackerConfig;
use storage::Storage;

/// Shared application state passed to every REST route handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<TrackerConfig>,
    pub storage: Arc<Storage>,
    pub started_at: std::time::Instant,
}
