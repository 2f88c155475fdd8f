//! tolk web server: REST API for conversations, prompts, dictionary, notes,
//! settings, and the AI proxy endpoints (translate / text-to-speech /
//! transcribe).  Persists state in SQLite.

pub mod config;
pub mod handlers;
pub mod router;
pub mod state;
pub mod utils;

use std::sync::Arc;

use clap::Parser;
use tokio::sync::Mutex;

use crate::gateway::Gateway;
use crate::storage::Storage;
use crate::tlog;

use config::{Cli, Config};
use state::{AppState, SharedState};

/// Entry point: parse CLI, open storage, start server.
pub async fn run() {
    let cli = Cli::parse();
    let config = Config::from_cli_and_env(cli);

    crate::logging::init();

    tlog!("tolk starting");
    tlog!("  data directory: {}", config.data_dir.display());

    std::fs::create_dir_all(&config.data_dir).expect("failed to create data directory");
    let db_path = config.data_dir.join("tolk.db");
    let storage = Storage::open(&db_path).expect("failed to open database");
    tlog!("  database: {}", db_path.display());
    tlog!("  gateway: {}", config.openai_base);

    let state: SharedState = Arc::new(Mutex::new(AppState {
        storage,
        db_path,
        gateway: Gateway::new(&config.openai_base),
    }));

    let app = router::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind");
    tlog!("tolk listening on http://{}", config.bind_addr);

    axum::serve(listener, app).await.expect("server error");
}
