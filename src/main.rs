//! Campus bot — entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config)
//!   4. Create the data directory, init logger once
//!   5. Build the application context and command router
//!   6. Spawn Ctrl-C → shutdown signal watcher
//!   7. Run comms channels until shutdown or until they all exit

use std::fs;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use campus_bot::commands::{AppContext, CommandRouter};
use campus_bot::error::AppError;
use campus_bot::{config, logger, subsystems};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let mut config = config::load(args.config_path.as_deref())?;

    if args.interactive {
        config.comms.pty.enabled = true;
    }

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    let force_cli_level = args.log_level.is_some();

    let data_dir = config.data_dir();
    fs::create_dir_all(&data_dir)
        .map_err(|e| AppError::Config(format!("cannot create {}: {e}", data_dir.display())))?;

    logger::init(effective_log_level, force_cli_level, config.log_file.as_deref())?;

    info!(
        bot_name = %config.bot_name,
        work_dir = %config.work_dir.display(),
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        admin_configured = config.admin_id.is_some(),
        interactive = %args.interactive,
        "config loaded"
    );

    let context = Arc::new(AppContext::from_config(&config));
    info!(store = %context.store().path().display(), "record store ready");
    let router = Arc::new(CommandRouter::new(context));

    // Shared shutdown token — Ctrl-C cancels it, all channels watch it.
    let shutdown = CancellationToken::new();

    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received — initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    info!("BOT: active");
    let comms = subsystems::comms::start(&config, router, shutdown.clone());
    let result = comms.join().await;

    // If channels exited on their own (EOF, missing token), still signal
    // everything to stop.
    shutdown.cancel();
    info!("BOT: inactive");

    result
}

struct CliArgs {
    log_level: Option<&'static str>,
    interactive: bool,
    config_path: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut interactive = false;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: campus-bot [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -i, --interactive          Enable the console channel");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-i" | "--interactive" => interactive = true,
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    //   -v      → warn
    //   -vv     → info
    //   -vvv    → debug
    //   -vvvv+  → trace
    let log_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    CliArgs { log_level, interactive, config_path }
}
