//! Expiry notifier core - platform-agnostic business logic.
//!
//! - **engine**: daily reminder sweep and the startup digest
//! - **scheduler**: once-a-day trigger and pending-action eviction
//! - **interpreter**: free text to a structured intent via a fallback chain
//! - **pending**: staged actions awaiting a confirm/cancel tap
//! - **workflow**: commits staged actions and reminder-button changes
//! - **callback**: inline-button callback data
//! - **format**: chat message rendering
//! - **completion**: hosted chat-completion client (Groq)
//! - **config** / **clock**: environment settings and the fixed-offset clock
//!
//! The chat platform is reached only through [`Messenger`].

pub mod callback;
pub mod clock;
pub mod completion;
pub mod config;
pub mod engine;
pub mod format;
pub mod interpreter;
pub mod messenger;
pub mod pending;
pub mod scheduler;
pub mod workflow;

pub use callback::CallbackAction;
pub use clock::Clock;
pub use completion::{Completion, CompletionError, GroqClient, NoCompletion, ToolReply, ToolSpec};
pub use config::{CompletionConfig, Config, ConfigError};
pub use engine::{EngineError, NotificationEngine, SweepReport};
pub use interpreter::{
    BatchDraft, DraftSource, Intent, Interpreter, RenewalRequest, ServiceDraft,
};
pub use messenger::{Button, Keyboard, Messenger, MessengerError, SentMessage};
pub use pending::{
    default_pending_ttl, InMemoryPendingActions, PendingAction, PendingActions, PendingError,
    PendingKind, PendingPayload,
};
pub use scheduler::{run_eviction, DailyTrigger, Scheduler};
pub use workflow::{ConfirmationWorkflow, Outcome, RenewalReport, StatusChange, WorkflowError};
