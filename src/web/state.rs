//! Shared application state.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::gateway::Gateway;
use crate::storage::Storage;

pub struct AppState {
    pub storage: Storage,
    pub db_path: PathBuf,
    pub gateway: Gateway,
}

/// Handlers hold the lock only for storage work; the gateway handle is
/// cloned out before any provider round trip.
pub type SharedState = Arc<Mutex<AppState>>;
