use ncasign::cli::Cli;
use ncasign::commands;
use ncasign::error::NcaSignError;
use ncasign::logger::{console_level, initialize as LoggerInitialize};
use ncasign::paths;

use ncalayer_core::ClientConfig;

use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

/// Exit status when the user dismissed the signing dialog.
const EXIT_CANCELLED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // Before parsing, so `.env` values reach clap's env fallbacks.
    let env_file = paths::load_dotenv();
    let cli = Cli::parse();

    let log_dir = match paths::log_dir()
        .and_then(|dir| LoggerInitialize(&dir, console_level(cli.verbose, cli.quiet)).map(|()| dir))
    {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    info!("ncasign {} starting", env!("CARGO_PKG_VERSION"));
    info!("Log directory: {}", log_dir.display());
    if let Some(path) = env_file {
        info!("Loaded .env from: {}", path.display());
    }

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_cancelled_by_user() => {
            // Not a failure: the user chose not to sign.
            info!("Signing cancelled by user");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(e) => {
            error!("{e}");
            if cli.json
                && let Ok(json) = serde_json::to_string_pretty(&e)
            {
                println!("{json}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<(), NcaSignError> {
    let config_dir = paths::config_dir(cli.config_dir.as_deref())?;
    let config = cli.apply_overrides(ClientConfig::load(&config_dir)?);

    commands::run(cli, config, &config_dir).await
}
