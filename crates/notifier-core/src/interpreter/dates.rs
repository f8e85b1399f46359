//! Date recognition in free text.
//!
//! Numeric forms (`30.03.2025`, `30.03.25`, `30/03/2025`, `30-03-2025`,
//! `2025-03-30`) and day + month name + year in Russian or English
//! (`30 марта 2025`, `30 March 2025`).

use std::sync::OnceLock;

use chrono::{Days, NaiveDate};
use regex::Regex;

/// Days added when no expiry date can be recovered.
pub const DEFAULT_TERM_DAYS: u64 = 365;

static DMY: OnceLock<Regex> = OnceLock::new();
static YMD: OnceLock<Regex> = OnceLock::new();
static NAMED: OnceLock<Regex> = OnceLock::new();

fn dmy() -> &'static Regex {
    DMY.get_or_init(|| {
        Regex::new(r"\b(\d{1,2})[./-](\d{1,2})[./-](\d{4}|\d{2})\b").expect("static regex")
    })
}

fn ymd() -> &'static Regex {
    YMD.get_or_init(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})(?:T|\b)").expect("static regex"))
}

fn named() -> &'static Regex {
    NAMED.get_or_init(|| {
        Regex::new(r"(?i)\b(\d{1,2})\s+([а-яёa-z]{3,})\.?,?\s+(\d{4})\b").expect("static regex")
    })
}

const MONTHS: [(&str, u32); 25] = [
    ("янв", 1),
    ("фев", 2),
    ("мар", 3),
    ("апр", 4),
    ("мая", 5),
    ("май", 5),
    ("июн", 6),
    ("июл", 7),
    ("авг", 8),
    ("сен", 9),
    ("окт", 10),
    ("ноя", 11),
    ("дек", 12),
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("may", 5),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sep", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
];

fn month_number(word: &str) -> Option<u32> {
    let word = word.to_lowercase();
    MONTHS
        .iter()
        .find(|(prefix, _)| word.starts_with(prefix))
        .map(|(_, month)| *month)
}

fn full_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.parse().ok()?;
    Some(if raw.len() == 2 { 2000 + year } else { year })
}

/// Every recognisable date in `text`, in order of appearance.
pub fn find_dates(text: &str) -> Vec<NaiveDate> {
    let mut found: Vec<(usize, usize, NaiveDate)> = Vec::new();

    for caps in dmy().captures_iter(text) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let date = (|| {
            let day = caps.get(1)?.as_str().parse().ok()?;
            let month = caps.get(2)?.as_str().parse().ok()?;
            let year = full_year(caps.get(3)?.as_str())?;
            NaiveDate::from_ymd_opt(year, month, day)
        })();
        if let Some(date) = date {
            found.push((whole.start, whole.end, date));
        }
    }

    for caps in ymd().captures_iter(text) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let date = (|| {
            let year = caps.get(1)?.as_str().parse().ok()?;
            let month = caps.get(2)?.as_str().parse().ok()?;
            let day = caps.get(3)?.as_str().parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        })();
        if let Some(date) = date {
            found.push((whole.start, whole.end, date));
        }
    }

    for caps in named().captures_iter(text) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let date = (|| {
            let day = caps.get(1)?.as_str().parse().ok()?;
            let month = month_number(caps.get(2)?.as_str())?;
            let year = caps.get(3)?.as_str().parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        })();
        if let Some(date) = date {
            found.push((whole.start, whole.end, date));
        }
    }

    found.sort_by_key(|(start, _, _)| *start);
    let mut result = Vec::with_capacity(found.len());
    let mut covered_until = 0;
    for (start, end, date) in found {
        if start < covered_until {
            continue;
        }
        covered_until = end;
        result.push(date);
    }
    result
}

/// First date in `text`.
pub fn find_first_date(text: &str) -> Option<NaiveDate> {
    find_dates(text).into_iter().next()
}

pub fn contains_date(text: &str) -> bool {
    dmy().is_match(text) || ymd().is_match(text) || !find_dates(text).is_empty()
}

/// `today` plus the default one-year term.
pub fn default_expiry(today: NaiveDate) -> NaiveDate {
    today.checked_add_days(Days::new(DEFAULT_TERM_DAYS)).unwrap_or(today)
}

/// Parse `raw` or fall back to [`default_expiry`].
pub fn repair_date(raw: &str, today: NaiveDate) -> NaiveDate {
    find_first_date(raw).unwrap_or_else(|| default_expiry(today))
}

/// `date` moved by a signed number of days, saturating at the calendar edge.
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    let shifted = if days >= 0 {
        date.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}
