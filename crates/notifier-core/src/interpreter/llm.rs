//! Completion-backed steps. Replies are validated before they are trusted.

use chrono::NaiveDate;
use tracing::debug;

use super::dates::{default_expiry, find_first_date, repair_date};
use super::scan::{extract_json_object, find_domains, json_number, json_str, json_str_array};
use super::{prompts, renewal, BatchDraft, DraftSource, Interpreter, RenewalRequest, ServiceDraft};

impl Interpreter {
    /// Step 3: multi-domain extraction for messy input with two or more
    /// domain-like tokens.
    pub(super) async fn completion_batch(
        &self,
        text: &str,
        today: NaiveDate,
    ) -> Option<BatchDraft> {
        if find_domains(text).len() < 2 {
            return None;
        }
        let reply = self.ask("completion_batch", prompts::MULTI_DOMAIN, text).await?;
        let value = extract_json_object(&reply)?;

        let domains = json_str_array(&value, "domains")?;
        let raw_dates = value.get("dates")?.as_array()?;
        if domains.len() < 2 || domains.len() != raw_dates.len() {
            debug!(
                domains = domains.len(),
                dates = raw_dates.len(),
                "Completion batch has mismatched arrays, declining"
            );
            return None;
        }
        let dates = raw_dates
            .iter()
            .map(|raw| repair_date(raw.as_str().unwrap_or_default(), today))
            .collect();

        BatchDraft::new(domains, dates, json_str(&value, "project"), DraftSource::CompletionBatch)
    }

    /// Step 4: single-service extraction, with a narrower date-only retry.
    pub(super) async fn completion_single(
        &self,
        text: &str,
        today: NaiveDate,
    ) -> Option<ServiceDraft> {
        let reply = self.ask("completion", prompts::SINGLE_SERVICE, text).await?;
        let value = extract_json_object(&reply)?;
        let name = json_str(&value, "name")?;

        let parsed = json_str(&value, "expires_at").and_then(|raw| find_first_date(&raw));
        let expires_at = match parsed {
            Some(date) => date,
            None => self.completion_date(text, today).await,
        };

        let mut draft = ServiceDraft::new(name, expires_at, DraftSource::Completion);
        draft.cost = json_number(&value, "cost").filter(|c| *c > 0.0);
        draft.project = json_str(&value, "project");
        draft.provider = json_str(&value, "provider");
        Some(draft)
    }

    /// Date-only completion; defaults to one year ahead.
    async fn completion_date(&self, text: &str, today: NaiveDate) -> NaiveDate {
        match self.ask("completion_date", prompts::DATE_ONLY, text).await {
            Some(reply) => repair_date(&reply, today),
            None => default_expiry(today),
        }
    }

    /// Renewal extraction; declines unless targets and a positive term come
    /// back.
    pub(super) async fn completion_renewal(&self, text: &str) -> Option<RenewalRequest> {
        let reply = self.ask("renewal", prompts::RENEWAL, text).await?;
        let value = extract_json_object(&reply)?;
        renewal::from_json(&value)
    }
}
