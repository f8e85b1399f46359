//! Expiry notifier Telegram bot binary.
//!
//! Start the bot with:
//! ```bash
//! TELEGRAM_BOT_TOKEN=xxx SUPABASE_URL=... SUPABASE_KEY=... ADMIN_ID=... \
//!     cargo run -p notifier-telegram
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use notifier_core::config::{default_state_dir, STATE_DIR_ENV};
use notifier_core::{Config, ConfigError};
use notifier_persistence::{InstanceLock, PersistenceError};
use notifier_telegram::{install_signal_handler, NotifierBot};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Expiry notifier bot - daily reminders about expiring domains and subscriptions
#[derive(Parser, Debug)]
#[command(name = "notifier-telegram")]
#[command(about = "Telegram bot that reminds the operator about expiring services")]
struct Args {
    /// Skip the expired/expiring digest sent at startup
    #[arg(long)]
    no_startup_check: bool,

    /// Directory for counters, heartbeat and PID lock
    #[arg(long, env = STATE_DIR_ENV)]
    state_dir: Option<PathBuf>,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Local .env.local or .env first, then the state directory's .env
    let _ = dotenvy::from_filename(".env.local").or_else(|_| dotenvy::dotenv());

    let args = Args::parse();
    let state_dir = args.state_dir.clone().unwrap_or_else(default_state_dir);
    let env_path = state_dir.join(".env");
    if env_path.exists() {
        let _ = dotenvy::from_path(&env_path);
    }

    let filter = match args.verbose {
        0 => "notifier=info,teloxide=warn",
        1 => "notifier=debug,teloxide=info",
        2 => "notifier=trace,teloxide=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(ConfigError::Missing(names)) => {
            for name in names {
                error!(variable = name, "Required environment variable is not set");
            }
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    config.state_dir = state_dir;

    if !config.has_admin() {
        warn!("ADMIN_ID is not set: reminders are disabled and every command will be refused");
    }

    let _lock = match InstanceLock::acquire(config.lock_path()) {
        Ok(lock) => lock,
        Err(PersistenceError::AlreadyRunning { pid }) => {
            error!(pid, "Another bot instance is already running");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!(error = %e, "Failed to take the instance lock");
            return ExitCode::FAILURE;
        }
    };

    let bot = match NotifierBot::new(config) {
        Ok(bot) => bot,
        Err(e) => {
            error!(error = %e, "Failed to create bot");
            return ExitCode::FAILURE;
        }
    };

    match bot.get_me().await {
        Ok(username) => {
            info!(username = %username, "Bot initialized successfully");
            println!("\n[bell] Expiry Notifier Bot");
            println!("   Bot: @{}", username);
        }
        Err(e) => {
            error!(error = %e, "Failed to get bot info");
            return ExitCode::FAILURE;
        }
    }
    println!("   Press Ctrl+C to stop\n");

    let cancel = install_signal_handler();
    if let Err(e) = bot.run(cancel, !args.no_startup_check).await {
        error!(error = %e, "Bot stopped with an error");
        return ExitCode::FAILURE;
    }

    info!("Shutdown complete");
    ExitCode::SUCCESS
}
