//! Renewal commands: "a.ru, b.ru - продли на 3 месяца".

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use super::dates::contains_date;
use super::scan::{find_domains, json_number, json_str_array};
use super::RenewalRequest;

static KEYWORD: OnceLock<Regex> = OnceLock::new();
static DURATION: OnceLock<Regex> = OnceLock::new();
static DANGLING: OnceLock<Regex> = OnceLock::new();

fn keyword() -> &'static Regex {
    KEYWORD.get_or_init(|| {
        Regex::new(r"(?i)\b(продли\w*|продление|renew\w*|extend\w*)").expect("static regex")
    })
}

fn duration() -> &'static Regex {
    DURATION.get_or_init(|| {
        Regex::new(concat!(
            r"(?i)\b(полгода|пол\s+года|half\s+a\s+year)",
            r"|(?:(\d{1,3})\s*|\b)(год\w*|лет|years?|месяц\w*|мес\b|months?|дн\w*|день|days?)",
        ))
        .expect("static regex")
    })
}

/// A preposition left behind once the duration is cut out.
fn dangling() -> &'static Regex {
    DANGLING.get_or_init(|| Regex::new(r"(?i)\s*\b(?:на|for|by)\s*$").expect("static regex"))
}

/// The line carrying the command: a keyword followed by a duration or by
/// nothing at all, on a line without an explicit date.
struct CommandLine<'a> {
    index: usize,
    before: &'a str,
    after: &'a str,
}

fn command_line(text: &str) -> Option<CommandLine<'_>> {
    text.lines().enumerate().find_map(|(index, line)| {
        let m = keyword().find(line)?;
        let after = &line[m.end()..];
        let bare = after
            .trim_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
            .is_empty();
        if contains_date(line) || !(bare || duration().is_match(after)) {
            return None;
        }
        Some(CommandLine {
            index,
            before: &line[..m.start()],
            after,
        })
    })
}

/// Whether the text is shaped like `<names> - продли на <duration>`.
pub fn is_renewal_request(text: &str) -> bool {
    command_line(text).is_some()
}

/// `(extension_days, extension_months)` for the first duration phrase.
///
/// year → 365 d / 12 m, N years → 365·N d / 12·N m, half a year → 180 d / 6 m,
/// month → 30 d / 1 m, N months → 30·N d / N m, N days → N d / 0 m.
pub fn parse_duration(text: &str) -> Option<(i64, u32)> {
    let caps = duration().captures(text)?;
    if caps.get(1).is_some() {
        return Some((180, 6));
    }
    let count: u32 = caps.get(2).map_or(Ok(1), |m| m.as_str().parse()).ok()?;
    if count == 0 {
        return None;
    }
    let unit = caps.get(3)?.as_str().to_lowercase();
    let result = if unit.starts_with("год") || unit == "лет" || unit.starts_with("year") {
        (365 * i64::from(count), 12 * count)
    } else if unit.starts_with("мес") || unit.starts_with("month") {
        (30 * i64::from(count), count)
    } else {
        (i64::from(count), 0)
    };
    Some(result)
}

/// Regex renewal parse.
///
/// Targets are the names on the command line before the keyword plus any
/// lines above it; when there are none, the names between the keyword and
/// the duration are used ("продли site.ru на год"). Lines below the command
/// are ignored.
pub fn extract(text: &str) -> Option<RenewalRequest> {
    let command = command_line(text)?;

    let mut targets: Vec<String> = text
        .lines()
        .take(command.index)
        .chain(std::iter::once(command.before))
        .flat_map(names_in)
        .collect();
    if targets.is_empty() {
        targets = names_in(&without_duration(command.after));
    }

    let mut seen = HashSet::new();
    targets.retain(|name| seen.insert(name.to_lowercase()));
    if targets.is_empty() {
        return None;
    }

    let (extension_days, extension_months) = parse_duration(command.after).unwrap_or((365, 12));
    Some(RenewalRequest {
        targets,
        extension_days,
        extension_months,
    })
}

fn names_in(segment: &str) -> Vec<String> {
    let found = find_domains(segment);
    if found.is_empty() {
        split_names(segment)
    } else {
        found
    }
}

fn without_duration(after: &str) -> String {
    match duration().find(after) {
        Some(m) => {
            let head = dangling().replace(&after[..m.start()], "");
            format!("{head}{}", &after[m.end()..])
        }
        None => after.to_string(),
    }
}

fn split_names(segment: &str) -> Vec<String> {
    segment
        .split([',', ';'])
        .map(|part| part.trim().trim_matches(['-', '–', '—', ':']).trim())
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Validate a completion reply `{domains, extension_days, extension_months}`.
pub fn from_json(value: &serde_json::Value) -> Option<RenewalRequest> {
    let targets = json_str_array(value, "domains")?;
    if targets.is_empty() {
        return None;
    }
    let days = json_number(value, "extension_days")?;
    if !(1.0..=3650.0).contains(&days) {
        return None;
    }
    let months = json_number(value, "extension_months").unwrap_or(days / 30.0);
    Some(RenewalRequest {
        targets,
        extension_days: days.round() as i64,
        extension_months: months.max(0.0).round() as u32,
    })
}
