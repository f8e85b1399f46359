//! Command interpreter: free text (typed or OCR'd) to one structured intent.
//!
//! Routing happens first (renewal phrasing, explicit list requests, free-form
//! assistant requests). Everything else runs the add-service chain:
//!
//! 1. budget phrase (`5000 ₽ на 30 дней`), deterministic
//! 2. multi-domain table, deterministic
//! 3. multi-domain table via the completion service
//! 4. single service via the completion service
//! 5. minimal regex fallback, never declines
//!
//! Each step returns `Some` to accept or `None` to decline. Completion calls
//! are timeboxed and any failure is a decline.

mod assistant;
mod budget;
pub mod dates;
mod fallback;
mod llm;
mod prompts;
mod renewal;
pub mod scan;
mod table;

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use notifier_models::{NewService, ServiceStatus};
use tracing::{debug, warn};

use crate::completion::{Completion, ToolReply, ToolSpec};

pub use renewal::{is_renewal_request, parse_duration};

/// Upper bound on any single completion call made by the interpreter.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(20);

const MAX_NAME_CHARS: usize = 100;

/// Which step produced a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftSource {
    Budget,
    Table,
    CompletionBatch,
    Completion,
    Assistant,
    Fallback,
}

/// Candidate fields for one new service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDraft {
    pub name: String,
    pub expires_at: NaiveDate,
    pub cost: Option<f64>,
    pub project: Option<String>,
    pub provider: Option<String>,
    pub source: DraftSource,
}

impl ServiceDraft {
    pub fn new(name: impl Into<String>, expires_at: NaiveDate, source: DraftSource) -> Self {
        Self {
            name: scan::clip(&name.into(), MAX_NAME_CHARS),
            expires_at,
            cost: None,
            project: None,
            provider: None,
            source,
        }
    }

    /// Row to insert on confirmation.
    pub fn to_new_service(&self, owner: Option<i64>, created_at: &str) -> NewService {
        NewService {
            name: self.name.clone(),
            expires_at: self.expires_at,
            status: ServiceStatus::Active,
            project: self.project.clone(),
            provider: self.provider.clone(),
            cost: self.cost,
            user_id: owner,
            created_at: created_at.to_string(),
        }
    }
}

/// Several domains, each paired with an expiry date, sharing one project.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchDraft {
    domains: Vec<String>,
    dates: Vec<NaiveDate>,
    project: Option<String>,
    source: DraftSource,
}

impl BatchDraft {
    /// `None` unless `domains` and `dates` are non-empty and of equal length.
    pub fn new(
        domains: Vec<String>,
        dates: Vec<NaiveDate>,
        project: Option<String>,
        source: DraftSource,
    ) -> Option<Self> {
        if domains.is_empty() || domains.len() != dates.len() {
            return None;
        }
        Some(Self {
            domains,
            dates,
            project,
            source,
        })
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    pub fn source(&self) -> DraftSource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// `(domain, expiry)` pairs in input order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, NaiveDate)> + '_ {
        self.domains
            .iter()
            .map(String::as_str)
            .zip(self.dates.iter().copied())
    }

    /// One row per domain.
    pub fn to_new_services(&self, owner: Option<i64>, created_at: &str) -> Vec<NewService> {
        self.entries()
            .map(|(domain, expires_at)| NewService {
                name: domain.to_string(),
                expires_at,
                status: ServiceStatus::Active,
                project: self.project.clone(),
                provider: None,
                cost: None,
                user_id: owner,
                created_at: created_at.to_string(),
            })
            .collect()
    }
}

/// Names to renew and by how much.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenewalRequest {
    pub targets: Vec<String>,
    pub extension_days: i64,
    pub extension_months: u32,
}

/// What the user asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    AddService(ServiceDraft),
    AddBatch(BatchDraft),
    ListServices,
    Renew(RenewalRequest),
}

/// The interpreter. Cheap to clone.
#[derive(Clone)]
pub struct Interpreter {
    completion: Arc<dyn Completion>,
    step_timeout: Duration,
}

impl Interpreter {
    pub fn new(completion: Arc<dyn Completion>) -> Self {
        Self {
            completion,
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Map `text` to exactly one intent. Never fails.
    pub async fn interpret(&self, text: &str, today: NaiveDate) -> Intent {
        if is_renewal_request(text) {
            if let Some(request) = self.interpret_renewal(text).await {
                return Intent::Renew(request);
            }
            debug!("Renewal phrasing without targets, treating as add");
        }

        if is_list_request(text) {
            return Intent::ListServices;
        }

        if is_free_form(text) {
            if let Some(intent) = self.assistant_dispatch(text, today).await {
                return intent;
            }
        }

        self.extract_service(text, today).await
    }

    /// Run the add-service chain. Always yields `AddService` or `AddBatch`.
    pub async fn extract_service(&self, text: &str, today: NaiveDate) -> Intent {
        if let Some(draft) = budget::extract(text, today) {
            debug!(step = "budget", "Interpreter step accepted");
            return Intent::AddService(draft);
        }
        if let Some(batch) = table::extract(text) {
            debug!(step = "table", domains = batch.len(), "Interpreter step accepted");
            return Intent::AddBatch(batch);
        }
        if let Some(batch) = self.completion_batch(text, today).await {
            debug!(step = "completion_batch", domains = batch.len(), "Interpreter step accepted");
            return Intent::AddBatch(batch);
        }
        if let Some(draft) = self.completion_single(text, today).await {
            debug!(step = "completion", "Interpreter step accepted");
            return Intent::AddService(draft);
        }
        debug!(step = "fallback", "Interpreter step accepted");
        Intent::AddService(fallback::extract(text, today))
    }

    /// Renewal interpreter: completion first, regex second.
    pub async fn interpret_renewal(&self, text: &str) -> Option<RenewalRequest> {
        if let Some(request) = self.completion_renewal(text).await {
            return Some(request);
        }
        renewal::extract(text)
    }

    /// Transcribe an image; `None` when the vision call fails.
    pub async fn read_image(&self, image: &[u8]) -> Option<String> {
        let call = self.completion.read_image(image, prompts::OCR);
        match tokio::time::timeout(self.step_timeout, call).await {
            Ok(Ok(text)) => Some(text),
            Ok(Err(e)) => {
                warn!(error = %e, "Image recognition failed");
                None
            }
            Err(_) => {
                warn!("Image recognition timed out");
                None
            }
        }
    }

    /// One timeboxed completion call; failures become `None`.
    async fn ask(&self, step: &'static str, system: &str, user: &str) -> Option<String> {
        let call = self.completion.complete(system, user);
        match tokio::time::timeout(self.step_timeout, call).await {
            Ok(Ok(reply)) => Some(reply),
            Ok(Err(e)) => {
                debug!(step, error = %e, "Completion declined");
                None
            }
            Err(_) => {
                warn!(step, "Completion timed out");
                None
            }
        }
    }

    async fn ask_with_tools(
        &self,
        system: &str,
        user: &str,
        tools: &[ToolSpec],
    ) -> Option<ToolReply> {
        let call = self.completion.complete_with_tools(system, user, tools);
        match tokio::time::timeout(self.step_timeout, call).await {
            Ok(Ok(reply)) => Some(reply),
            Ok(Err(e)) => {
                debug!(step = "assistant", error = %e, "Completion declined");
                None
            }
            Err(_) => {
                warn!(step = "assistant", "Completion timed out");
                None
            }
        }
    }
}

/// Explicit "show me everything" phrasing.
pub fn is_list_request(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    let lower = lower.trim_end_matches(['.', '!', '?']);
    matches!(
        lower,
        "список" | "list" | "покажи все" | "покажи всё" | "все сервисы" | "мои сервисы"
    ) || lower.starts_with("покажи список")
        || lower.starts_with("список сервисов")
        || lower.starts_with("list services")
}

/// Text with no date, domain or amount: a request rather than data.
fn is_free_form(text: &str) -> bool {
    !dates::contains_date(text)
        && scan::find_domains(text).is_empty()
        && scan::find_amount(text).is_none()
}
