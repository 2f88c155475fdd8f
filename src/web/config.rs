//! Configuration types and constants for the tolk server.

use std::path::PathBuf;

use clap::Parser;

use crate::gateway::OPENAI_API_BASE;

/// Maximum audio upload accepted by `POST /api/transcribe`; matches the
/// provider's own file limit.
pub(crate) const MAX_AUDIO_UPLOAD_SIZE: usize = 25 * 1024 * 1024; // 25 MiB

/// Default page size for list endpoints, and the hard cap a client can
/// request.
pub(crate) const DEFAULT_LIST_LIMIT: u32 = 100;
pub(crate) const MAX_LIST_LIMIT: u32 = 500;

/// Personal translation-assistant backend.
///
/// Stores conversations of translated message pairs, reusable prompts, a
/// custom term dictionary, and notes, and proxies translation, speech
/// synthesis, and transcription to an OpenAI-compatible provider.
///
/// Configuration can be set via CLI arguments or environment variables.
/// CLI arguments take precedence over environment variables.
#[derive(Parser, Debug)]
#[command(name = "tolk", version, about)]
pub struct Cli {
    /// HTTP server bind address [env: TOLK_WEB_BIND] [default: 127.0.0.1:3000]
    #[arg(long, short = 'b')]
    pub bind: Option<String>,

    /// Data directory for the database [env: TOLK_HOME] [default: ~/.tolk]
    #[arg(long, short = 'd')]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the OpenAI-compatible provider [env: TOLK_OPENAI_BASE]
    #[arg(long)]
    pub openai_base: Option<String>,
}

pub struct Config {
    pub bind_addr: String,
    pub data_dir: PathBuf,
    pub openai_base: String,
}

impl Config {
    pub fn from_cli_and_env(cli: Cli) -> Self {
        let data_dir = cli
            .data_dir
            .or_else(|| std::env::var("TOLK_HOME").ok().map(PathBuf::from))
            .unwrap_or_else(|| {
                std::env::var("HOME")
                    .map(|h| PathBuf::from(h).join(".tolk"))
                    .unwrap_or_else(|_| PathBuf::from(".tolk"))
            });

        let bind_addr = cli
            .bind
            .or_else(|| std::env::var("TOLK_WEB_BIND").ok())
            .unwrap_or_else(|| "127.0.0.1:3000".to_string());

        let openai_base = cli
            .openai_base
            .or_else(|| std::env::var("TOLK_OPENAI_BASE").ok())
            .unwrap_or_else(|| OPENAI_API_BASE.to_string());

        Self {
            bind_addr,
            data_dir,
            openai_base,
        }
    }
}
