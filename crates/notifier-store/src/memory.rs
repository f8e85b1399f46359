//! In-process record store used by tests and dry runs.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use notifier_models::{Filter, NewService, ServicePatch, TrackedService};
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};
use crate::store::RecordStore;

/// Rows held as JSON objects so filters and patches behave like the hosted
/// table does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Map<String, Value>>>,
    next_id: AtomicU64,
    inserts: AtomicUsize,
    updates: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            ..Self::default()
        }
    }

    /// Seed rows verbatim (ids included).
    pub fn with_rows(rows: impl IntoIterator<Item = Value>) -> Self {
        let store = Self::new();
        {
            let mut guard = store.lock();
            for row in rows {
                if let Value::Object(map) = row {
                    if let Some(id) = map.get("id").and_then(numeric_id) {
                        store.next_id.fetch_max(id + 1, Ordering::SeqCst);
                    }
                    guard.push(map);
                }
            }
        }
        store
    }

    /// Snapshot of every row, decoded.
    pub fn services(&self) -> Vec<TrackedService> {
        self.lock()
            .iter()
            .filter_map(|row| serde_json::from_value(Value::Object(row.clone())).ok())
            .collect()
    }

    /// Number of successful inserts.
    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Number of rows touched by successful updates.
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Make every select fail until cleared.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every insert and update fail until cleared.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Map<String, Value>>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_writes(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Http("memory store writes disabled".into()));
        }
        Ok(())
    }
}

fn numeric_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn matches(row: &Map<String, Value>, filter: &Filter) -> bool {
    let cell = row.get(filter.column()).and_then(cell_text);
    match filter {
        Filter::Eq { value, .. } => cell.as_deref() == Some(value.as_str()),
        Filter::In { values, .. } => cell.is_some_and(|c| values.iter().any(|v| *v == c)),
        Filter::NotNull { .. } => cell.is_some(),
    }
}

fn decode(row: &Map<String, Value>) -> Result<TrackedService> {
    Ok(serde_json::from_value(Value::Object(row.clone()))?)
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(&self, service: &NewService) -> Result<TrackedService> {
        self.check_writes()?;
        let Value::Object(mut row) = serde_json::to_value(service)? else {
            return Err(StoreError::EmptyInsert);
        };
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        row.insert("id".into(), Value::from(id));
        let decoded = decode(&row)?;
        self.lock().push(row);
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(decoded)
    }

    async fn select(&self, filters: &[Filter]) -> Result<Vec<TrackedService>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Http("memory store reads disabled".into()));
        }
        self.lock()
            .iter()
            .filter(|row| filters.iter().all(|f| matches(row, f)))
            .map(decode)
            .collect()
    }

    async fn update(
        &self,
        filters: &[Filter],
        patch: &ServicePatch,
    ) -> Result<Vec<TrackedService>> {
        if filters.is_empty() {
            return Err(StoreError::UnfilteredUpdate);
        }
        self.check_writes()?;
        let Value::Object(changes) = serde_json::to_value(patch)? else {
            return Ok(Vec::new());
        };

        let mut rows = self.lock();
        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|row| filters.iter().all(|f| matches(row, f))) {
            for (column, value) in &changes {
                row.insert(column.clone(), value.clone());
            }
            updated.push(decode(row)?);
        }
        self.updates.fetch_add(updated.len(), Ordering::SeqCst);
        Ok(updated)
    }
}
