//! Multi-domain tables pasted from registrar panels or spreadsheets.
//!
//! Handles a header + column layout:
//!
//! ```text
//! ДОМЕН
//! a.ru
//! b.ru
//!
//! ИСТЕКАЕТ
//! 30.03.2025
//! 27.04.2025
//!
//! проект ВЛАДОГРАД
//! ```
//!
//! as well as `a.ru 30.03.2025` rows and `Домен: …` / `Истекает: …` label
//! blocks. Dates pair with domains by position; when there are fewer dates
//! than domains the last date is shared by the rest; more dates than domains
//! declines.

use std::sync::OnceLock;

use regex::Regex;

use super::dates::find_dates;
use super::scan::{find_amount, find_domains};
use super::{BatchDraft, DraftSource};

static PROJECT_LINE: OnceLock<Regex> = OnceLock::new();

fn project_line() -> &'static Regex {
    PROJECT_LINE.get_or_init(|| {
        Regex::new(r"(?i)^(?:проект|project)\s*[:\-–—]?\s*(.+)$").expect("static regex")
    })
}

const HEADERS: [&str; 14] = [
    "домен",
    "домены",
    "доменное имя",
    "истекает",
    "дата",
    "даты",
    "срок",
    "окончание",
    "дата окончания",
    "оплачен до",
    "domain",
    "domains",
    "expires",
    "expiry date",
];

fn is_header(line: &str) -> bool {
    let normalized = line.trim().trim_end_matches(':').trim().to_lowercase();
    HEADERS.contains(&normalized.as_str())
}

/// Accept two or more domains with two or more dates.
pub fn extract(text: &str) -> Option<BatchDraft> {
    let mut names: Vec<String> = Vec::new();
    let mut dates = Vec::new();
    let mut explicit_project = None;
    let mut leftover = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if is_header(line) {
            continue;
        }
        if let Some(caps) = project_line().captures(line) {
            explicit_project = caps.get(1).map(|m| m.as_str().trim().to_string());
            continue;
        }

        let line_domains = find_domains(line);
        let line_dates = find_dates(line);
        if line_domains.is_empty() && line_dates.is_empty() {
            if find_amount(line).is_none() && line.chars().count() <= 60 {
                leftover = Some(line.to_string());
            }
            continue;
        }
        names.extend(line_domains);
        dates.extend(line_dates);
    }

    // A surplus date means some row's name was not recognised, so the
    // positional pairing can no longer be trusted.
    if names.len() < 2 || dates.len() < 2 || dates.len() > names.len() {
        return None;
    }

    while dates.len() < names.len() {
        let last = *dates.last()?;
        dates.push(last);
    }

    BatchDraft::new(names, dates, explicit_project.or(leftover), DraftSource::Table)
}
