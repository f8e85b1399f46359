//! Shared state for the Telegram bot.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use notifier_core::{
    Clock, Completion, Config, ConfirmationWorkflow, GroqClient, InMemoryPendingActions,
    Interpreter, Messenger, NoCompletion, NotificationEngine, PendingActions,
};
use notifier_persistence::CounterFile;
use notifier_store::{RecordStore, RestTableStore};
use tracing::{info, warn};

use crate::error::Result;

/// Everything the handlers, the scheduler and the lifecycle hooks share.
pub struct BotState {
    pub config: Config,
    pub clock: Clock,
    pub store: Arc<dyn RecordStore>,
    pub pending: Arc<dyn PendingActions>,
    pub workflow: ConfirmationWorkflow,
    pub interpreter: Interpreter,
    pub engine: Arc<NotificationEngine>,
    pub messenger: Arc<dyn Messenger>,
    pub started_at: DateTime<Utc>,
}

impl BotState {
    /// Wire the production adapters: REST table store, Groq client (when a
    /// key is configured) and the given messenger.
    pub fn connect(config: Config, messenger: Arc<dyn Messenger>) -> Result<Self> {
        let store: Arc<dyn RecordStore> = Arc::new(RestTableStore::new(
            &config.store_url,
            &config.store_key,
            &config.store_table,
        )?);

        let completion: Arc<dyn Completion> = match &config.completion {
            Some(settings) => {
                info!(model = %settings.model, "Completion service enabled");
                Arc::new(GroqClient::new(settings)?)
            }
            None => {
                warn!("GROQ_API_KEY not set, interpreting messages without completion service");
                Arc::new(NoCompletion)
            }
        };

        Ok(Self::assemble(config, store, completion, messenger))
    }

    /// Build the state from explicit parts.
    pub fn assemble(
        config: Config,
        store: Arc<dyn RecordStore>,
        completion: Arc<dyn Completion>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        let clock = Clock::with_offset_hours(config.tz_offset_hours);
        let pending: Arc<dyn PendingActions> = Arc::new(InMemoryPendingActions::new());
        let counters = Arc::new(CounterFile::load(config.counters_path()));
        let engine = Arc::new(NotificationEngine::new(
            Arc::clone(&store),
            Arc::clone(&messenger),
            counters,
            config.admin_id,
        ));

        Self {
            workflow: ConfirmationWorkflow::new(Arc::clone(&store), Arc::clone(&pending), clock),
            interpreter: Interpreter::new(completion),
            clock,
            store,
            pending,
            engine,
            messenger,
            config,
            started_at: Utc::now(),
        }
    }

    /// Only the configured operator may use the bot; with no operator set,
    /// nobody may.
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.config.has_admin() && user_id == self.config.admin_id
    }

    pub fn admin_chat(&self) -> i64 {
        self.config.admin_id
    }

    pub fn uptime(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}

/// Shared state handle.
pub type SharedState = Arc<BotState>;
