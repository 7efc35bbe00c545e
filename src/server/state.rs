//! Shared server state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use crate::common::time::Clock;
use crate::domain::ConnectionId;

use super::session::SessionManager;

/// Writer half of one connected client. Sends are fire-and-forget; a send to
/// a closed channel is skipped, never an error.
pub type ConnectionSender = mpsc::UnboundedSender<String>;

/// Shared application state
pub struct AppState {
    /// Writer channels of currently connected clients
    pub connections: Mutex<HashMap<ConnectionId, ConnectionSender>>,
    /// Room directory and clock store, behind the single dispatch lock
    pub sessions: Mutex<SessionManager>,
}

impl AppState {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            sessions: Mutex::new(SessionManager::new(clock)),
        }
    }
}
