//! Growlog application binary - composition root.
//!
//! 1. Load `.env`, parse CLI flags
//! 2. Build the configuration (TOML file, environment, then flags)
//! 3. Initialize tracing
//! 4. Open the SQLite database
//! 5. Serve the REST API until Ctrl+C / SIGTERM

mod cli;

use std::path::Path;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use growlog_api::state::AppState;
use growlog_core::config::GrowlogConfig;
use growlog_core::error::GrowlogError;
use growlog_storage::Database;

use cli::CliArgs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is normal outside development.
    let dotenv = dotenvy::dotenv();

    let args = CliArgs::parse();

    // Config is read before tracing exists so the configured level applies;
    // the outcome is logged once the subscriber is up.
    let config_path = args.resolve_config_path();
    let loaded = GrowlogConfig::load(&config_path);
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => GrowlogConfig::default(),
    };
    let env_result = config.apply_process_env();
    args.apply_overrides(&mut config);

    // Tracing. --log-level wins over RUST_LOG, which wins over the file.
    let filter = match &args.log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.general.log_level))
            .unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting Growlog v{}", env!("CARGO_PKG_VERSION"));

    if let Ok(path) = &dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }
    match &loaded {
        Ok(_) => tracing::info!(path = %config_path.display(), "Configuration loaded"),
        Err(GrowlogError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %config_path.display(), "No config file, using defaults")
        }
        Err(e) => tracing::warn!(
            path = %config_path.display(),
            error = %e,
            "Failed to load config file, using defaults"
        ),
    }
    if let Err(e) = env_result {
        tracing::error!(error = %e, "Invalid environment configuration");
        return Err(e.into());
    }

    // Storage.
    let db_path = Path::new(&config.storage.database_path);
    let db = Database::new(db_path).map_err(|e| {
        tracing::error!(path = %db_path.display(), error = %e, "Failed to open database");
        e
    })?;
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    // API.
    let state = AppState::new(config.clone(), db);
    growlog_api::start_server(&config, state).await?;

    Ok(())
}
