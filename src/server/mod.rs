//! WebSocket relay server implementation.

mod handler;
mod runner;
mod session;
mod signal;
mod state;

pub use runner::run_server;
pub use session::{Outgoing, SessionManager};
pub use state::AppState;
