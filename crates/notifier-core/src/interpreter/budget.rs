//! Budget phrasing: "5000 ₽ на 30 дней".

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::debug;

use super::dates::add_days;
use super::scan::{find_currency_amount, find_domains};
use super::{DraftSource, ServiceDraft};

static TERM: OnceLock<Regex> = OnceLock::new();
static SERVICE_WORDS: OnceLock<Regex> = OnceLock::new();

fn term() -> &'static Regex {
    TERM.get_or_init(|| {
        Regex::new(r"(?i)(?:\bна|\bfor)\s+(\d{1,4})\s*(?:дн[яейи]\w*|день|days?\b)")
            .expect("static regex")
    })
}

fn service_words() -> &'static Regex {
    SERVICE_WORDS.get_or_init(|| {
        Regex::new(concat!(
            r"(?i)(домен|хостинг|сервер|vps|подписк|лиценз|ssl",
            r"|domain|hosting|server|subscription)",
        ))
        .expect("static regex")
    })
}

/// Accept an amount-with-currency plus an "N days" term, unless the text
/// also names a domain or a service.
pub fn extract(text: &str, today: NaiveDate) -> Option<ServiceDraft> {
    let amount = find_currency_amount(text)?;
    let days: i64 = term().captures(text)?.get(1)?.as_str().parse().ok()?;
    if days == 0 {
        return None;
    }
    if !find_domains(text).is_empty() || service_words().is_match(text) {
        debug!("Budget phrase mentions a service, declining");
        return None;
    }

    let name = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or(text);
    let mut draft = ServiceDraft::new(name, add_days(today, days), DraftSource::Budget);
    draft.cost = Some(amount);
    Some(draft)
}
