use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use wikicap::app::App;
use wikicap::cli::{Args, Command};
use wikicap::config::Config;
use wikicap::logging::setup_logging;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config and setup logging before App::new() so startup logs are never silently dropped
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&config, args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT_SHORT"),
        environment = if cfg!(debug_assertions) {
            "development"
        } else {
            "production"
        },
        config = ?config,
        "starting wikicap"
    );

    let app = match App::new(config) {
        Ok(app) => app,
        Err(e) => {
            error!(error = ?e, "failed to initialize application");
            return ExitCode::FAILURE;
        }
    };

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => app.serve().await,
        Command::Year { year } => app.print_year(year).await,
    }
}
