//! Confirmation workflow: staged actions committed or discarded by button
//! taps, plus the direct status changes offered on reminder messages.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use notifier_models::{
    ActionToken, Filter, NotificationKind, ServiceId, ServicePatch, TrackedService,
};
use notifier_store::{RecordStore, StoreError};
use thiserror::Error;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::interpreter::{BatchDraft, RenewalRequest, ServiceDraft};
use crate::pending::{PendingAction, PendingActions, PendingError, PendingPayload};

/// Window used by the startup digest buttons.
pub const EXPIRING_WINDOW_DAYS: i64 = 30;

/// Workflow failures. Stale tokens are not errors; see [`Outcome`].
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Per-target result of a bulk renewal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenewalReport {
    /// `(name, new expiry)` for every extended record.
    pub extended: Vec<(String, NaiveDate)>,
    /// Targets with no record of that exact name.
    pub not_found: Vec<String>,
    /// Targets whose update failed.
    pub failed: Vec<String>,
    pub extension_days: i64,
}

impl RenewalReport {
    pub fn extended_count(&self) -> usize {
        self.extended.len()
    }
}

/// Final state of a confirm or cancel tap.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Added(TrackedService),
    AddedBatch {
        added: Vec<TrackedService>,
        failed: Vec<String>,
        project: Option<String>,
    },
    Renewed(RenewalReport),
    CostUpdated {
        name: String,
        cost: f64,
    },
    /// The record behind an edit disappeared before confirmation.
    ServiceMissing,
    Cancelled,
    /// Token expired, was already used, or never existed.
    Expired,
    /// The button carried the overflow token.
    TooLarge,
}

/// Result of a reminder or digest button.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusChange {
    Paid {
        name: String,
    },
    Notified {
        name: String,
    },
    Extended {
        name: String,
        previous: Option<NaiveDate>,
        until: NaiveDate,
    },
    AllPaid {
        count: usize,
    },
    HostingExtended {
        count: usize,
        until: NaiveDate,
    },
    NothingToUpdate,
    NotFound,
}

/// New expiry for an extension by `days`: counted from the current expiry
/// when that is still in the future, otherwise from today.
pub fn extended_expiry(current: Option<NaiveDate>, today: NaiveDate, days: i64) -> NaiveDate {
    let base = match current {
        Some(date) if date > today => date,
        _ => today,
    };
    base + Duration::days(days)
}

/// Binds staged actions to the record store.
#[derive(Clone)]
pub struct ConfirmationWorkflow {
    store: Arc<dyn RecordStore>,
    pending: Arc<dyn PendingActions>,
    clock: Clock,
}

impl ConfirmationWorkflow {
    pub fn new(
        store: Arc<dyn RecordStore>,
        pending: Arc<dyn PendingActions>,
        clock: Clock,
    ) -> Self {
        Self { store, pending, clock }
    }

    pub fn pending(&self) -> &Arc<dyn PendingActions> {
        &self.pending
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn stage_service(&self, draft: ServiceDraft, owner: i64) -> ActionToken {
        self.pending.stage(PendingPayload::AddService(draft), owner, Utc::now())
    }

    pub fn stage_batch(&self, batch: BatchDraft, owner: i64) -> ActionToken {
        self.pending.stage(PendingPayload::AddBatch(batch), owner, Utc::now())
    }

    pub fn stage_renewal(&self, request: RenewalRequest, owner: i64) -> ActionToken {
        self.pending.stage(PendingPayload::RenewBatch(request), owner, Utc::now())
    }

    /// Look up the service named `name` and stage a cost change for it.
    /// `None` when no record has that exact name.
    pub async fn prepare_cost_edit(
        &self,
        name: &str,
        cost: f64,
        owner: i64,
    ) -> Result<Option<(TrackedService, ActionToken)>> {
        let Some(service) = self.store.find_by_name(name).await?.into_iter().next() else {
            return Ok(None);
        };
        let token = self.pending.stage(
            PendingPayload::EditCost {
                service_id: service.id.clone(),
                name: service.name.clone(),
                cost,
            },
            owner,
            Utc::now(),
        );
        Ok(Some((service, token)))
    }

    /// Commit the action behind `token`.
    ///
    /// The entry is taken before the store is touched, so a second tap finds
    /// nothing and reports [`Outcome::Expired`]. If the commit fails without
    /// writing anything the entry is put back and the tap can be retried.
    pub async fn confirm(&self, token: &ActionToken) -> Result<Outcome> {
        let action = match self.pending.take(token) {
            Ok(action) => action,
            Err(PendingError::NotFound) => return Ok(Outcome::Expired),
            Err(PendingError::DataTooLarge) => return Ok(Outcome::TooLarge),
        };

        match self.apply(&action).await {
            Ok(outcome) => {
                info!(token = %token, kind = ?action.kind(), "Pending action committed");
                Ok(outcome)
            }
            Err(e) => {
                warn!(token = %token, error = %e, "Commit failed, action restored");
                self.pending.restore(action);
                Err(e)
            }
        }
    }

    /// Drop the action behind `token` without touching the store.
    pub fn cancel(&self, token: &ActionToken) -> Outcome {
        match self.pending.resolve(token) {
            Err(PendingError::DataTooLarge) => Outcome::TooLarge,
            Err(PendingError::NotFound) => Outcome::Expired,
            Ok(_) => {
                self.pending.discard(token);
                Outcome::Cancelled
            }
        }
    }

    /// Drop everything staged by `owner`.
    pub fn cancel_all(&self, owner: i64) -> usize {
        self.pending.discard_owned_by(owner)
    }

    async fn apply(&self, action: &PendingAction) -> Result<Outcome> {
        let created_at = self.clock.now_iso();
        match &action.payload {
            PendingPayload::AddService(draft) => {
                let row = draft.to_new_service(Some(action.owner), &created_at);
                let service = self.store.insert(&row).await?;
                Ok(Outcome::Added(service))
            }
            PendingPayload::AddBatch(batch) => {
                self.apply_batch(batch, action.owner, &created_at).await
            }
            PendingPayload::RenewBatch(request) => self.apply_renewal(request).await,
            PendingPayload::EditCost { service_id, name, cost } => {
                let patch = ServicePatch::set_cost(*cost);
                let updated = self.store.update_by_id(service_id, &patch).await?;
                if updated.is_empty() {
                    return Ok(Outcome::ServiceMissing);
                }
                Ok(Outcome::CostUpdated {
                    name: name.clone(),
                    cost: *cost,
                })
            }
        }
    }

    async fn apply_batch(
        &self,
        batch: &BatchDraft,
        owner: i64,
        created_at: &str,
    ) -> Result<Outcome> {
        let mut added = Vec::new();
        let mut failed = Vec::new();
        let mut last_error = None;

        for row in batch.to_new_services(Some(owner), created_at) {
            match self.store.insert(&row).await {
                Ok(service) => added.push(service),
                Err(e) => {
                    warn!(service = %row.name, error = %e, "Batch insert failed");
                    failed.push(row.name);
                    last_error = Some(e);
                }
            }
        }

        if added.is_empty() {
            if let Some(e) = last_error {
                return Err(e.into());
            }
        }
        Ok(Outcome::AddedBatch {
            added,
            failed,
            project: batch.project().map(str::to_string),
        })
    }

    async fn apply_renewal(&self, request: &RenewalRequest) -> Result<Outcome> {
        let today = self.clock.today();
        let mut report = RenewalReport {
            extension_days: request.extension_days,
            ..RenewalReport::default()
        };
        let mut last_error = None;

        for target in &request.targets {
            let matches = match self.store.find_by_name(target).await {
                Ok(matches) => matches,
                Err(e) => {
                    warn!(service = %target, error = %e, "Renewal lookup failed");
                    report.failed.push(target.clone());
                    last_error = Some(e);
                    continue;
                }
            };
            if matches.is_empty() {
                report.not_found.push(target.clone());
                continue;
            }
            for service in matches {
                let until = extended_expiry(service.expires_at, today, request.extension_days);
                match self.store.update_by_id(&service.id, &ServicePatch::extend_to(until)).await {
                    Ok(_) => report.extended.push((service.name.clone(), until)),
                    Err(e) => {
                        warn!(service = %service.name, error = %e, "Renewal update failed");
                        report.failed.push(service.name.clone());
                        last_error = Some(e);
                    }
                }
            }
        }

        if report.extended.is_empty() && report.not_found.is_empty() {
            if let Some(e) = last_error {
                return Err(e.into());
            }
        }
        Ok(Outcome::Renewed(report))
    }

    pub async fn mark_paid(&self, id: &ServiceId) -> Result<StatusChange> {
        let patch = ServicePatch::mark_paid(self.clock.now_iso());
        let updated = self.store.update_by_id(id, &patch).await?;
        Ok(match updated.into_iter().next() {
            Some(service) => StatusChange::Paid { name: service.name },
            None => StatusChange::NotFound,
        })
    }

    pub async fn mark_notified(
        &self,
        id: &ServiceId,
        kind: NotificationKind,
    ) -> Result<StatusChange> {
        let patch = ServicePatch::mark_notified(kind, self.clock.today());
        let updated = self.store.update_by_id(id, &patch).await?;
        Ok(match updated.into_iter().next() {
            Some(service) => StatusChange::Notified { name: service.name },
            None => StatusChange::NotFound,
        })
    }

    /// Push one service's expiry forward by `days`.
    pub async fn extend(&self, id: &ServiceId, days: i64) -> Result<StatusChange> {
        let Some(service) = self.store.find_by_id(id).await? else {
            return Ok(StatusChange::NotFound);
        };
        let until = extended_expiry(service.expires_at, self.clock.today(), days);
        self.store.update_by_id(id, &ServicePatch::extend_to(until)).await?;
        info!(service = %service.name, until = %until, "Service extended");
        Ok(StatusChange::Extended {
            name: service.name,
            previous: service.expires_at,
            until,
        })
    }

    /// Mark every active service expiring within the window as paid, in one
    /// batched update.
    pub async fn mark_all_paid(&self, today: NaiveDate) -> Result<StatusChange> {
        let ids = self.expiring_ids(today, |_| true).await?;
        if ids.is_empty() {
            return Ok(StatusChange::NothingToUpdate);
        }
        let filters = [Filter::is_in("id", ids.iter().map(|id| id.as_str().to_string()))];
        let patch = ServicePatch::mark_paid(self.clock.now_iso());
        let updated = self.store.update(&filters, &patch).await?;
        Ok(StatusChange::AllPaid { count: updated.len() })
    }

    /// Move every hosting/domain service expiring within the window to
    /// today + 365 days.
    pub async fn extend_all_hosting(&self, today: NaiveDate) -> Result<StatusChange> {
        let ids = self.expiring_ids(today, TrackedService::is_hosting).await?;
        if ids.is_empty() {
            return Ok(StatusChange::NothingToUpdate);
        }
        let until = today + Duration::days(365);
        let filters = [Filter::is_in("id", ids.iter().map(|id| id.as_str().to_string()))];
        let updated = self.store.update(&filters, &ServicePatch::extend_to(until)).await?;
        Ok(StatusChange::HostingExtended {
            count: updated.len(),
            until,
        })
    }

    async fn expiring_ids(
        &self,
        today: NaiveDate,
        keep: impl Fn(&TrackedService) -> bool,
    ) -> Result<Vec<ServiceId>> {
        Ok(self
            .store
            .active_services()
            .await?
            .into_iter()
            .filter(|s| s.days_left(today).is_some_and(|d| d <= EXPIRING_WINDOW_DAYS))
            .filter(|s| keep(s))
            .map(|s| s.id)
            .collect())
    }
}
