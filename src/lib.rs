pub mod cash_book;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod money;
pub mod payables;
pub mod payments;
pub mod registration;
pub mod reports;
pub mod service_orders;
pub mod tax_id;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub fn run() -> std::process::ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("{} v{}", config::APP_NAME, config::APP_VERSION);

    let cli = cli::Cli::parse();
    match cli::execute(cli) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("error: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}
