//! The record store seam.

use async_trait::async_trait;
use notifier_models::{Filter, NewService, ServiceId, ServicePatch, ServiceStatus, TrackedService};

use crate::error::Result;

/// Filtered CRUD over the tracked-service table.
///
/// No joins and no transactions: bulk operations are loops of single-row
/// calls, except `update` with an `In` filter.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a row and return it with its assigned id.
    async fn insert(&self, service: &NewService) -> Result<TrackedService>;

    /// Rows matching every filter, in store order.
    async fn select(&self, filters: &[Filter]) -> Result<Vec<TrackedService>>;

    /// Patch every row matching the filters; returns the updated rows.
    async fn update(&self, filters: &[Filter], patch: &ServicePatch) -> Result<Vec<TrackedService>>;

    async fn all_services(&self) -> Result<Vec<TrackedService>> {
        self.select(&[]).await
    }

    async fn active_services(&self) -> Result<Vec<TrackedService>> {
        self.select(&[Filter::eq("status", ServiceStatus::Active.as_str())])
            .await
    }

    async fn find_by_id(&self, id: &ServiceId) -> Result<Option<TrackedService>> {
        Ok(self
            .select(&[Filter::eq("id", id.as_str())])
            .await?
            .into_iter()
            .next())
    }

    /// Rows whose name equals `name` exactly.
    async fn find_by_name(&self, name: &str) -> Result<Vec<TrackedService>> {
        self.select(&[Filter::eq("name", name)]).await
    }

    async fn update_by_id(
        &self,
        id: &ServiceId,
        patch: &ServicePatch,
    ) -> Result<Vec<TrackedService>> {
        self.update(&[Filter::eq("id", id.as_str())], patch).await
    }

    /// Sorted distinct non-empty project tags.
    async fn distinct_projects(&self) -> Result<Vec<String>> {
        let rows = self.select(&[Filter::not_null("project")]).await?;
        Ok(distinct(rows.into_iter().filter_map(|s| s.project)))
    }

    /// Sorted distinct non-empty provider tags.
    async fn distinct_providers(&self) -> Result<Vec<String>> {
        let rows = self.select(&[Filter::not_null("provider")]).await?;
        Ok(distinct(rows.into_iter().filter_map(|s| s.provider)))
    }
}

fn distinct(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = values.filter(|v| !v.trim().is_empty()).collect();
    out.sort();
    out.dedup();
    out
}
