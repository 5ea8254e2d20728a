use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::Config;
use crate::session::SessionController;

/// Shared application state for HTTP handlers.
///
/// Each created session owns its own controller; nothing is shared across
/// sessions besides the configuration.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Active sessions (session_id -> controller).
    pub sessions: Arc<RwLock<HashMap<String, Arc<SessionController>>>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}
