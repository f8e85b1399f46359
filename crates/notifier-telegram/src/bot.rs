//! Main Telegram bot implementation.

use std::sync::Arc;
use std::time::Duration;

use notifier_core::scheduler::DEFAULT_EVICTION_INTERVAL;
use notifier_core::{default_pending_ttl, run_eviction, Config, Scheduler};
use notifier_persistence::Heartbeat;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Result, TelegramError};
use crate::handlers::{handle_callback, handle_command, handle_message, handle_photo, Command};
use crate::lifecycle;
use crate::messenger::TelegramMessenger;
use crate::state::BotState;

/// Retry period while waiting for the dispatcher to accept a shutdown.
const SHUTDOWN_RETRY: Duration = Duration::from_millis(200);

/// The expiry notifier bot.
pub struct NotifierBot {
    bot: Bot,
    state: Arc<BotState>,
}

impl NotifierBot {
    /// Create the bot and wire its production adapters.
    pub fn new(config: Config) -> Result<Self> {
        let bot = Bot::new(config.bot_token.clone());
        let messenger = Arc::new(TelegramMessenger::new(bot.clone()));
        let state = Arc::new(BotState::connect(config, messenger)?);
        Ok(Self { bot, state })
    }

    pub fn state(&self) -> &Arc<BotState> {
        &self.state
    }

    /// Get the bot's username.
    pub async fn get_me(&self) -> Result<String> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| TelegramError::BotStartFailed(e.to_string()))?;
        Ok(me.username().to_string())
    }

    /// Poll for updates until `cancel` fires.
    ///
    /// The daily scheduler and the pending-action eviction timer run
    /// alongside the dispatcher and stop with it. The stop notice is sent
    /// once everything has wound down.
    pub async fn run(self, cancel: CancellationToken, startup_check: bool) -> Result<()> {
        let state = Arc::clone(&self.state);

        let engine = Arc::clone(&state.engine);
        let scheduler = Scheduler::new(engine, state.clock, state.config.notify_hour)
            .with_heartbeat(Heartbeat::new(state.config.heartbeat_path()));
        let scheduler_task = tokio::spawn(scheduler.run(cancel.child_token()));

        let eviction_task = tokio::spawn(run_eviction(
            Arc::clone(&state.pending),
            default_pending_ttl(),
            DEFAULT_EVICTION_INTERVAL,
            cancel.child_token(),
        ));

        let notice_state = Arc::clone(&state);
        let notice_task = tokio::spawn(async move {
            lifecycle::announce_start(&notice_state).await;
            if startup_check {
                lifecycle::startup_check(&notice_state).await;
            }
        });

        let handler = update_handler(Arc::clone(&state));
        let mut dispatcher = Dispatcher::builder(self.bot.clone(), handler)
            .default_handler(|upd| async move {
                debug!("Unhandled update: {:?}", upd);
            })
            .error_handler(LoggingErrorHandler::with_custom_text("Error in update handler"))
            .build();

        let shutdown = dispatcher.shutdown_token();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                cancel.cancelled().await;
                // Refused while the dispatcher is still starting up.
                loop {
                    match shutdown.shutdown() {
                        Ok(done) => {
                            done.await;
                            break;
                        }
                        Err(_) => tokio::time::sleep(SHUTDOWN_RETRY).await,
                    }
                }
            })
        };

        info!("Bot is running! Send /start to begin.");
        dispatcher.dispatch().await;
        info!("Dispatcher stopped");

        cancel.cancel();
        watcher.abort();
        notice_task.abort();
        let _ = scheduler_task.await;
        let _ = eviction_task.await;

        lifecycle::announce_stop(&state).await;
        Ok(())
    }
}

/// Routing: button taps, known commands, unknown commands, photos, text.
fn update_handler(
    state: Arc<BotState>,
) -> teloxide::dispatching::UpdateHandler<teloxide::RequestError> {
    let state_for_callbacks = Arc::clone(&state);
    let state_for_commands = Arc::clone(&state);
    let state_for_photos = Arc::clone(&state);
    let state_for_messages = state;

    dptree::entry()
        .branch(
            Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
                let state = Arc::clone(&state_for_callbacks);
                async move { handle_callback(bot, q, state).await }
            }),
        )
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                    let state = Arc::clone(&state_for_commands);
                    async move { handle_command(bot, msg, cmd, state).await }
                }),
        )
        .branch(
            Update::filter_message()
                .filter(|msg: Message| msg.text().is_some_and(|t| t.starts_with('/')))
                .endpoint(|bot: Bot, msg: Message| async move {
                    let text = msg.text().unwrap_or_default();
                    let name = text.split_whitespace().next().unwrap_or(text);
                    info!(cmd = %name, "Unrecognized command");
                    bot.send_message(
                        msg.chat.id,
                        format!("❓ Неизвестная команда: {name}\n\nСписок команд: /help"),
                    )
                    .await?;
                    Ok(())
                }),
        )
        .branch(
            Update::filter_message()
                .filter(|msg: Message| msg.photo().is_some())
                .endpoint(move |bot: Bot, msg: Message| {
                    let state = Arc::clone(&state_for_photos);
                    info!(chat_id = %msg.chat.id, "Photo received");
                    async move { handle_photo(bot, msg, state).await }
                }),
        )
        .branch(
            Update::filter_message()
                .filter(|msg: Message| msg.text().is_some())
                .endpoint(move |bot: Bot, msg: Message| {
                    let state = Arc::clone(&state_for_messages);
                    debug!(chat_id = %msg.chat.id, "Text message received");
                    async move { handle_message(bot, msg, state).await }
                }),
        )
}
