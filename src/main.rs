use std::process::ExitCode;

use clap::Parser;
use tracing::error;

mod cli;
mod config;
mod db;
mod error;
mod users;

use crate::cli::Cli;
use crate::config::AppConfig;
use crate::db::Database;
use crate::users::password::CredentialHasher;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "roleadmin=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    // stdout is reserved for operator output
    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let hasher = CredentialHasher::new(&config.hash)?;

    let db = match Database::connect(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "database connection failed");
            eprintln!("error: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let outcome = cli::execute(cli.command, &db, &hasher).await;
    db.close().await;

    match outcome {
        Ok(code) => Ok(code),
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}
