//! Domain, amount and JSON scanning shared by the interpreter steps.

use std::sync::OnceLock;

use regex::Regex;

static DOMAIN: OnceLock<Regex> = OnceLock::new();
static AMOUNT: OnceLock<Regex> = OnceLock::new();
static LABELLED_AMOUNT: OnceLock<Regex> = OnceLock::new();

fn domain() -> &'static Regex {
    DOMAIN.get_or_init(|| {
        Regex::new(concat!(
            r"(?i)\b(?:[\p{L}\d](?:[\p{L}\d-]{0,61}[\p{L}\d])?\.)+",
            r"(?:xn--[a-z\d-]+|\p{L}{2,24})\b",
        ))
        .expect("static regex")
    })
}

fn amount() -> &'static Regex {
    AMOUNT.get_or_init(|| {
        Regex::new(concat!(
            r"(?i)\b(\d{1,3}(?:[ \u{00A0}]\d{3})+|\d+)(?:[.,](\d{1,2}))?",
            r"\s*(?:₽|руб|р\.|rub\b|rur\b|р\b)",
        ))
        .expect("static regex")
    })
}

fn labelled_amount() -> &'static Regex {
    LABELLED_AMOUNT.get_or_init(|| {
        Regex::new(r"(?i)(?:стоимость|цена|стоит|cost|price)\s*[:\-–]?\s*(\d+(?:[.,]\d{1,2})?)")
            .expect("static regex")
    })
}

/// Domain-like tokens (`site.ru`, `прогрэсс.рф`, `xn--80a.xn--p1ai`), in order.
pub fn find_domains(text: &str) -> Vec<String> {
    domain()
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches('.').to_string())
        .collect()
}

/// Money amount followed by a currency marker (`5000 ₽`, `1 500,50 руб`).
pub fn find_currency_amount(text: &str) -> Option<f64> {
    let caps = amount().captures(text)?;
    let whole: String = caps
        .get(1)?
        .as_str()
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    let fraction = caps.get(2).map_or("0", |m| m.as_str());
    format!("{whole}.{fraction}").parse().ok()
}

/// Currency-marked amount, or a number after a cost label.
pub fn find_amount(text: &str) -> Option<f64> {
    if let Some(amount) = find_currency_amount(text) {
        return Some(amount);
    }
    let caps = labelled_amount().captures(text)?;
    caps.get(1)?.as_str().replace(',', ".").parse().ok()
}

/// Decode the outermost JSON object in a model reply (tolerates fences and
/// surrounding prose).
pub fn extract_json_object(reply: &str) -> Option<serde_json::Value> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<serde_json::Value>(&reply[start..=end])
        .ok()
        .filter(|value| value.is_object())
}

/// Non-empty trimmed string field.
pub fn json_str(value: &serde_json::Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
        .map(str::to_string)
}

/// Numeric field given either as a number or a numeric string.
pub fn json_number(value: &serde_json::Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
                .collect();
            cleaned.replace(',', ".").parse().ok()
        }
        _ => None,
    }
}

/// Array of non-empty strings.
pub fn json_str_array(value: &serde_json::Value, key: &str) -> Option<Vec<String>> {
    let items = value.get(key)?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s.trim().to_string()),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

/// Shorten `text` to at most `max` characters.
pub fn clip(text: &str, max: usize) -> String {
    text.chars().take(max).collect::<String>().trim().to_string()
}
