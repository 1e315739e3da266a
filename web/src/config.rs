//! # Configuration
//!
//! Server settings from command-line flags, falling back to environment
//! variables (a `.env` file is loaded first by the binary).

use std::path::PathBuf;

use clap::Parser;
use dialysis_core::history::DEFAULT_ROOT;

/// Server settings.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about = "Dialysis clinic REST API")]
pub struct Config {
    /// Address the HTTP server listens on.
    #[clap(long, env = "DIALYSIS_BIND", default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// PostgreSQL connection string.
    #[clap(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    /// Maximum number of pooled database connections.
    #[clap(long, env = "DIALYSIS_POOL_SIZE", default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    pub pool_size: u32,

    /// Folder holding one sub-folder of uploaded files per patient.
    #[clap(long, env = "DIALYSIS_HISTORY_DIR", default_value = DEFAULT_ROOT)]
    pub history_dir: PathBuf,

    /// `tracing` filter directives, e.g. `info,dialysis_core=debug`.
    #[clap(long, env = "RUST_LOG", default_value = "info")]
    pub log_filter: String,

    /// Do not apply pending migrations at startup.
    #[clap(long)]
    pub skip_migrations: bool,
}
