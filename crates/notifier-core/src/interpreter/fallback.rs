//! Last-resort extraction. Never declines.

use chrono::NaiveDate;

use super::dates::{default_expiry, find_first_date};
use super::scan::{find_amount, find_domains};
use super::{DraftSource, ServiceDraft};

const UNNAMED: &str = "Без названия";

/// Name is the first domain, else the second line, else the first line.
/// With two or more lines the first line becomes the project.
pub fn extract(text: &str, today: NaiveDate) -> ServiceDraft {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    let name = find_domains(text)
        .into_iter()
        .next()
        .or_else(|| lines.get(1).map(|l| l.to_string()))
        .or_else(|| lines.first().map(|l| l.to_string()))
        .unwrap_or_else(|| UNNAMED.to_string());

    let expires_at = find_first_date(text).unwrap_or_else(|| default_expiry(today));

    let mut draft = ServiceDraft::new(name, expires_at, DraftSource::Fallback);
    if draft.name.is_empty() {
        draft.name = UNNAMED.to_string();
    }
    draft.cost = find_amount(text);
    if lines.len() >= 2 && find_first_date(lines[0]).is_none() && lines[0] != draft.name {
        draft.project = Some(lines[0].to_string());
    }
    draft
}
