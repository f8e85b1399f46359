//! Telegram bot surface for the expiry notifier.
//!
//! The bot sends daily expiry reminders to the operator, turns free text and
//! photos into services staged behind a confirm/cancel keyboard, and applies
//! reminder-button taps (paid, notified, extend) to the record store.
//!
//! # Environment Variables
//!
//! Required:
//! - `TELEGRAM_BOT_TOKEN`: Bot token from @BotFather
//! - `SUPABASE_URL`, `SUPABASE_KEY`: record store endpoint and key
//!
//! Optional:
//! - `ADMIN_ID`: operator chat id; without it reminders are off and every
//!   command is refused
//! - `GROQ_API_KEY`: enables the completion service for text and photos
//! - `NOTIFY_HOUR`, `TZ_OFFSET_HOURS`: daily trigger (default 9:00 UTC+3)
//!
//! # Example
//!
//! ```no_run
//! use notifier_core::Config;
//! use notifier_telegram::{install_signal_handler, NotifierBot};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bot = NotifierBot::new(Config::from_env()?)?;
//!     bot.run(install_signal_handler(), true).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Commands
//!
//! - `/start`, `/help` - Greeting and help
//! - `/status` - Totals, expiry buckets and counters
//! - `/list` - Every service
//! - `/projects`, `/providers` - Browse by project or provider
//! - `/check` - Expired and expiring within 30 days
//! - `/test_notify` - Run the reminder sweep now
//! - `/cost <name> <amount>` - Change a service's cost
//! - `/cancel_all` - Drop every unconfirmed action
//! - `/cleanup_mutex` - Check the instance lock and reclaim a stale one

pub mod bot;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod messenger;
pub mod shutdown;
pub mod state;

pub use bot::NotifierBot;
pub use error::{Result, TelegramError};
pub use handlers::Command;
pub use messenger::TelegramMessenger;
pub use shutdown::install_signal_handler;
pub use state::{BotState, SharedState};
