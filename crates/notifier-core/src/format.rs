//! Chat message rendering (Telegram HTML).
//!
//! Everything here is presentation only: callers decide what happened and
//! pass structured results in.

use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset, NaiveDate};
use notifier_models::{ActionToken, NotificationKind, ServiceId, ServiceStatus, TrackedService};
use notifier_persistence::{LockStatus, SweepCounters};

use crate::callback::CallbackAction;
use crate::interpreter::{BatchDraft, RenewalRequest, ServiceDraft};
use crate::messenger::{Button, Keyboard};
use crate::workflow::{Outcome, StatusChange, EXPIRING_WINDOW_DAYS};

/// Chunk size used when splitting long messages (platform limit is 4096).
pub const MESSAGE_CHUNK_CHARS: usize = 4000;

/// Digest sections list at most this many services each.
const DIGEST_SECTION_LIMIT: usize = 10;

/// Escape HTML special characters for Telegram HTML mode.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// `1234567.5` → `1,234,567.50` with `decimals` fraction digits.
pub fn money(value: f64, decimals: usize) -> String {
    let rendered = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match rendered.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rendered.as_str(), None),
    };

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0.0 && rendered.chars().any(|c| matches!(c, '1'..='9')) {
        grouped.insert(0, '-');
    }
    match frac_part {
        Some(f) => format!("{grouped}.{f}"),
        None => grouped,
    }
}

fn day(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

fn status_emoji(status: ServiceStatus) -> &'static str {
    match status {
        ServiceStatus::Active => "🟢",
        ServiceStatus::Notified => "🟡",
        ServiceStatus::Paid => "🔵",
    }
}

fn expiry_text(service: &TrackedService) -> String {
    service.expires_at.map(day).unwrap_or_else(|| "?".to_string())
}

fn cost_suffix(service: &TrackedService) -> String {
    match service.cost {
        Some(cost) if cost > 0.0 => format!(" • {}₽", money(cost, 0)),
        _ => String::new(),
    }
}

fn tag_suffix(service: &TrackedService, with_provider: bool) -> String {
    let mut out = String::new();
    if let Some(project) = service.project.as_deref().filter(|p| !p.is_empty()) {
        let _ = write!(out, " [{}]", html_escape(project));
    }
    if with_provider {
        if let Some(provider) = service.provider.as_deref().filter(|p| !p.is_empty()) {
            let _ = write!(out, " ({})", html_escape(provider));
        }
    }
    out
}

/// Split `text` into chunks of at most `limit` characters, on line
/// boundaries where possible.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split('\n') {
        let mut line = line.to_string();
        let mut line_len = line.chars().count();

        while line_len > limit {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let cut = cut_point(&line, limit);
            chunks.push(line[..cut].to_string());
            line = line[cut..].trim_start().to_string();
            line_len = line.chars().count();
        }

        let needed = if current.is_empty() { line_len } else { line_len + 1 };
        if current_len + needed > limit {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(&line);
        current_len += line_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Byte offset at which to break a line longer than `limit` characters.
///
/// Never inside a tag or an entity. Preference order: whitespace outside any
/// element, any point outside an element, whitespace, any point; a hard cut
/// at `limit` only when the line offers none of these.
fn cut_point(line: &str, limit: usize) -> usize {
    let mut in_tag = false;
    let mut closing = false;
    let mut in_entity = false;
    let mut depth = 0usize;
    // [space at depth 0, any at depth 0, space, any]
    let mut best: [Option<usize>; 4] = [None; 4];
    let mut hard = line.len();

    for (count, (idx, ch)) in line.char_indices().enumerate() {
        if count > 0 && !in_tag && !in_entity {
            let space = ch.is_whitespace();
            if depth == 0 {
                best[1] = Some(idx);
                if space {
                    best[0] = Some(idx);
                }
            }
            best[3] = Some(idx);
            if space {
                best[2] = Some(idx);
            }
        }
        if count == limit {
            hard = idx;
            break;
        }

        match ch {
            '<' if !in_tag => {
                in_tag = true;
                closing = line[idx + 1..].starts_with('/');
            }
            '>' if in_tag => {
                in_tag = false;
                if closing {
                    depth = depth.saturating_sub(1);
                } else {
                    depth += 1;
                }
            }
            '&' if !in_tag => in_entity = true,
            ';' if in_entity => in_entity = false,
            c if in_entity && !(c.is_ascii_alphanumeric() || c == '#') => in_entity = false,
            _ => {}
        }
    }

    best.into_iter().flatten().next().unwrap_or(hard)
}

fn reminder_header(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Month => "📅 <b>За месяц</b>",
        NotificationKind::TwoWeeks => "⚠️ <b>За 2 недели</b>",
        NotificationKind::OneWeek => "🚨 <b>За неделю</b>",
        NotificationKind::Daily => "🔥 <b>Срочно!</b>",
        NotificationKind::Expired => "💀 <b>ИСТЁК!</b>",
        NotificationKind::Manual => "🔔 <b>Напоминание</b>",
    }
}

/// Per-service reminder text.
pub fn reminder(service: &TrackedService, kind: NotificationKind, days_left: i64) -> String {
    let mut msg = format!("{}\n\n", reminder_header(kind));
    let _ = writeln!(msg, "📋 <b>Сервис:</b> {}", html_escape(&service.name));
    let _ = writeln!(msg, "📅 <b>Окончание:</b> {}", expiry_text(service));
    let left = match days_left {
        d if d > 0 => format!("⏳ Осталось {d} дн."),
        0 => "⏳ Истекает сегодня!".to_string(),
        d => format!("⏳ Просрочено {} дн.", -d),
    };
    msg.push_str(&left);
    msg.push('\n');
    if let Some(project) = service.project.as_deref().filter(|p| !p.is_empty()) {
        let _ = writeln!(msg, "🏢 Проект: {}", html_escape(project));
    }
    if let Some(provider) = service.provider.as_deref().filter(|p| !p.is_empty()) {
        let _ = writeln!(msg, "🌐 Провайдер: {}", html_escape(provider));
    }
    if let Some(cost) = service.cost.filter(|c| *c > 0.0) {
        let _ = writeln!(msg, "💰 Стоимость: {} ₽", money(cost, 2));
    }
    msg.trim_end().to_string()
}

/// Paid / notified / extend buttons under a reminder.
pub fn reminder_keyboard(id: &ServiceId, kind: NotificationKind) -> Keyboard {
    Keyboard::new()
        .row([
            Button::new("✅ Оплачено", &CallbackAction::Paid(id.clone())),
            Button::new("🔔 Уведомил", &CallbackAction::Notified(id.clone(), kind)),
        ])
        .row([
            Button::new("📅 Продли на год", &CallbackAction::Extend(id.clone(), 365)),
            Button::new("📅 +3 мес", &CallbackAction::Extend(id.clone(), 90)),
        ])
}

/// Save / cancel buttons for a staged action.
pub fn confirm_keyboard(token: &ActionToken) -> Keyboard {
    Keyboard::new().row([
        Button::new("✅ Сохранить", &CallbackAction::Confirm(token.clone())),
        Button::new("❌ Отмена", &CallbackAction::Cancel(token.clone())),
    ])
}

pub fn draft_preview(draft: &ServiceDraft, today: NaiveDate) -> String {
    let mut msg = String::from("📝 <b>Добавить сервис?</b>\n\n");
    let _ = writeln!(msg, "📋 Сервис: {}", html_escape(&draft.name));
    let days = (draft.expires_at - today).num_days();
    let _ = writeln!(msg, "📅 Окончание: {} ({} дн.)", day(draft.expires_at), days);
    if let Some(cost) = draft.cost {
        let _ = writeln!(msg, "💰 Стоимость: {} ₽", money(cost, 2));
    }
    if let Some(project) = &draft.project {
        let _ = writeln!(msg, "🏢 Проект: {}", html_escape(project));
    }
    if let Some(provider) = &draft.provider {
        let _ = writeln!(msg, "🌐 Провайдер: {}", html_escape(provider));
    }
    msg.trim_end().to_string()
}

pub fn batch_preview(batch: &BatchDraft) -> String {
    let mut msg = format!("📝 <b>Добавить {} сервисов?</b>\n", batch.len());
    if let Some(project) = batch.project() {
        let _ = writeln!(msg, "🏢 Проект: {}", html_escape(project));
    }
    msg.push('\n');
    for (domain, expires_at) in batch.entries() {
        let _ = writeln!(msg, "• {} — до {}", html_escape(domain), day(expires_at));
    }
    msg.trim_end().to_string()
}

fn duration_text(days: i64, months: u32) -> String {
    match (days, months) {
        (_, m) if m > 0 && m % 12 == 0 => format!("{} г. ({} дн.)", m / 12, days),
        (_, m) if m > 0 => format!("{m} мес. ({days} дн.)"),
        (d, _) => format!("{d} дн."),
    }
}

pub fn renewal_preview(request: &RenewalRequest) -> String {
    let mut msg = format!(
        "🔄 <b>Продлить на {}?</b>\n\n",
        duration_text(request.extension_days, request.extension_months)
    );
    for target in &request.targets {
        let _ = writeln!(msg, "• {}", html_escape(target));
    }
    msg.trim_end().to_string()
}

pub fn cost_preview(service: &TrackedService, cost: f64) -> String {
    let old = service
        .cost
        .map(|c| format!("{} ₽", money(c, 2)))
        .unwrap_or_else(|| "—".to_string());
    format!(
        "💰 <b>Изменить стоимость?</b>\n\n📋 {}\nБыло: {}\nСтанет: {} ₽",
        html_escape(&service.name),
        old,
        money(cost, 2)
    )
}

/// Final text for a confirm or cancel tap.
pub fn outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Added(service) => format!(
            "✅ <b>Сохранено!</b>\n\n📋 {}\n📅 До: {}",
            html_escape(&service.name),
            expiry_text(service)
        ),
        Outcome::AddedBatch { added, failed, project } => {
            let mut msg = format!("✅ <b>Сохранено: {}</b>\n", added.len());
            if let Some(project) = project {
                let _ = writeln!(msg, "🏢 Проект: {}", html_escape(project));
            }
            for service in added {
                let name = html_escape(&service.name);
                let _ = writeln!(msg, "• {} — до {}", name, expiry_text(service));
            }
            if !failed.is_empty() {
                let _ = writeln!(msg, "\n❌ Не сохранены: {}", html_escape(&failed.join(", ")));
            }
            msg.trim_end().to_string()
        }
        Outcome::Renewed(report) => {
            let mut msg = format!("🔄 <b>Продлено: {}</b>\n", report.extended_count());
            for (name, until) in &report.extended {
                let _ = writeln!(msg, "• {} → {}", html_escape(name), day(*until));
            }
            if !report.not_found.is_empty() {
                let names = html_escape(&report.not_found.join(", "));
                let _ = writeln!(msg, "\n❓ Не найдены: {names}");
            }
            if !report.failed.is_empty() {
                let names = html_escape(&report.failed.join(", "));
                let _ = writeln!(msg, "\n❌ Ошибка обновления: {names}");
            }
            msg.trim_end().to_string()
        }
        Outcome::CostUpdated { name, cost } => format!(
            "💰 <b>Стоимость обновлена</b>\n\n📋 {}\n💰 {} ₽",
            html_escape(name),
            money(*cost, 2)
        ),
        Outcome::ServiceMissing => "❌ Сервис не найден.".to_string(),
        Outcome::Cancelled => "🚫 Не сохранено.".to_string(),
        Outcome::Expired => "⌛ Действие устарело или уже выполнено.".to_string(),
        Outcome::TooLarge => {
            "⚠️ Слишком много данных для кнопки. Отправьте запрос частями.".to_string()
        }
    }
}

/// Final text for a reminder or digest button.
pub fn status_change(change: &StatusChange) -> String {
    match change {
        StatusChange::Paid { name } => format!(
            "💰 <b>Оплачено!</b>\n\n📋 {}\n✅ Убран из уведомлений.",
            html_escape(name)
        ),
        StatusChange::Notified { name } => format!(
            "🔔 <b>Уведомил, жду оплаты</b>\n\n📋 {}\n✅ Статус обновлён.",
            html_escape(name)
        ),
        StatusChange::Extended { name, previous, until } => format!(
            "📅 <b>Продлено!</b>\n\n📋 {}\n📅 Было: {}\n📅 Стало: {}\n✅ Статус: активен",
            html_escape(name),
            previous.map(day).unwrap_or_else(|| "?".to_string()),
            day(*until)
        ),
        StatusChange::AllPaid { count } => {
            format!("💰 <b>Все оплачены!</b>\n\n📊 Обновлено: {count} сервисов.")
        }
        StatusChange::HostingExtended { count, until } => format!(
            "📅 <b>Хостинги продлены!</b>\n\n📊 Продлено: {}\n📅 До: {}",
            count,
            day(*until)
        ),
        StatusChange::NothingToUpdate => "ℹ️ Нет сервисов для обновления.".to_string(),
        StatusChange::NotFound => "❌ Сервис не найден.".to_string(),
    }
}

/// Every service, grouped by status.
pub fn service_list(services: &[TrackedService]) -> String {
    if services.is_empty() {
        return "📭 Сервисов нет.".to_string();
    }
    let mut msg = format!("📋 <b>Сервисы ({}):</b>\n\n", services.len());
    let mut sorted: Vec<&TrackedService> = services.iter().collect();
    sorted.sort_by_key(|s| (s.status != ServiceStatus::Active, s.expires_at));
    for service in sorted {
        let _ = writeln!(
            msg,
            "{} {}{} — до {}{}",
            status_emoji(service.status),
            html_escape(&service.name),
            tag_suffix(service, false),
            expiry_text(service),
            cost_suffix(service)
        );
    }
    msg.trim_end().to_string()
}

/// Services of one project.
pub fn project_view(project: &str, services: &[TrackedService]) -> String {
    if services.is_empty() {
        return format!("📭 Нет сервисов в проекте «{}»", html_escape(project));
    }
    let mut msg = format!("🏢 <b>Проект: {}</b>\n\n", html_escape(project));
    let mut total = 0.0;
    for service in services {
        let _ = write!(
            msg,
            "{} {} — до {}",
            status_emoji(service.status),
            html_escape(&service.name),
            expiry_text(service)
        );
        if let Some(cost) = service.cost {
            let _ = write!(msg, " ({} ₽)", money(cost, 2));
            if service.is_active() {
                total += cost;
            }
        }
        msg.push('\n');
    }
    if total > 0.0 {
        let _ = write!(msg, "\n💰 Итого активных: {} ₽", money(total, 2));
    }
    msg.trim_end().to_string()
}

/// Services of one provider.
pub fn provider_view(provider: &str, services: &[TrackedService]) -> String {
    if services.is_empty() {
        return format!("📭 Нет сервисов у провайдера «{}»", html_escape(provider));
    }
    let mut msg = format!("🌐 <b>Провайдер: {}</b>\n\n", html_escape(provider));
    for service in services {
        let _ = write!(
            msg,
            "{} {}{} — до {}",
            status_emoji(service.status),
            html_escape(&service.name),
            tag_suffix(service, false),
            expiry_text(service)
        );
        if let Some(cost) = service.cost {
            let _ = write!(msg, " ({} ₽)", money(cost, 2));
        }
        msg.push('\n');
    }
    msg.trim_end().to_string()
}

/// One button per tag, two per row. Tags whose callback would not fit are
/// skipped.
pub fn tag_keyboard(tags: &[String], action: impl Fn(String) -> CallbackAction) -> Keyboard {
    let buttons: Vec<Button> = tags
        .iter()
        .filter_map(|tag| Button::new(tag.clone(), &action(tag.clone())))
        .collect();
    buttons
        .chunks(2)
        .fold(Keyboard::new(), |kb, pair| kb.row(pair.iter().cloned().map(Some)))
}

/// Active services split by days left, each bucket sorted soonest first.
#[derive(Debug, Default)]
pub struct ExpiryBuckets<'a> {
    /// Already past (`days_left < 0`).
    pub expired: Vec<(&'a TrackedService, i64)>,
    /// `0..=30` days left.
    pub expiring: Vec<(&'a TrackedService, i64)>,
    /// More than 30 days left.
    pub ok: Vec<(&'a TrackedService, i64)>,
}

impl<'a> ExpiryBuckets<'a> {
    /// Bucket the active services of `services`; rows without a date are
    /// ignored.
    pub fn new(services: &'a [TrackedService], today: NaiveDate) -> Self {
        let mut buckets = Self::default();
        for service in services.iter().filter(|s| s.is_active()) {
            let Some(days) = service.days_left(today) else {
                continue;
            };
            let bucket = if days < 0 {
                &mut buckets.expired
            } else if days <= EXPIRING_WINDOW_DAYS {
                &mut buckets.expiring
            } else {
                &mut buckets.ok
            };
            bucket.push((service, days));
        }
        buckets.expired.sort_by_key(|(_, d)| *d);
        buckets.expiring.sort_by_key(|(_, d)| *d);
        buckets.ok.sort_by_key(|(_, d)| *d);
        buckets
    }

    pub fn needs_attention(&self) -> bool {
        !self.expired.is_empty() || !self.expiring.is_empty()
    }
}

fn bucket_lines(
    msg: &mut String,
    entries: &[(&TrackedService, i64)],
    limit: usize,
    with_provider: bool,
    emphasise: bool,
) {
    for (service, days) in entries.iter().take(limit) {
        let when = match *days {
            d if d < 0 => format!("{} дн. назад", -d),
            0 => "сегодня".to_string(),
            d if d <= EXPIRING_WINDOW_DAYS => format!("через {d} дн."),
            d => format!("{d} дн."),
        };
        let when = if emphasise { format!("<b>{when}</b>") } else { when };
        let _ = writeln!(
            msg,
            "• {}{} — {} ({}){}",
            html_escape(&service.name),
            tag_suffix(service, with_provider),
            expiry_text(service),
            when,
            cost_suffix(service)
        );
    }
    if entries.len() > limit {
        let _ = writeln!(msg, "... и ещё {}", entries.len() - limit);
    }
}

/// One-off digest sent at startup; `None` when nothing needs attention.
pub fn startup_digest(buckets: &ExpiryBuckets<'_>) -> Option<String> {
    if !buckets.needs_attention() {
        return None;
    }
    let mut msg = String::from("🚨 <b>ПРОВЕРКА ПРИ ЗАПУСКЕ</b>\n");
    if !buckets.expired.is_empty() {
        let _ = writeln!(msg, "\n❌ <b>УЖЕ ИСТЕКЛИ ({}):</b>", buckets.expired.len());
        bucket_lines(&mut msg, &buckets.expired, DIGEST_SECTION_LIMIT, false, false);
    }
    if !buckets.expiring.is_empty() {
        let _ = writeln!(msg, "\n⚠️ <b>СКОРО ИСТЕКУТ ({}):</b>", buckets.expiring.len());
        bucket_lines(&mut msg, &buckets.expiring, DIGEST_SECTION_LIMIT, false, false);
    }
    let _ = write!(
        msg,
        "\n📊 Итого: {} истекших, {} скоро",
        buckets.expired.len(),
        buckets.expiring.len()
    );
    Some(msg)
}

pub fn startup_digest_keyboard() -> Keyboard {
    Keyboard::new().row([
        Button::new("💰 Все оплачены", &CallbackAction::AllPaid),
        Button::new("📅 Продлить хостинги", &CallbackAction::ExtendAllHosting),
    ])
}

/// `/check` report.
pub fn check_report(buckets: &ExpiryBuckets<'_>) -> String {
    if !buckets.needs_attention() {
        return "✅ Все сервисы в порядке! Ближайшие 30 дней без истечений.".to_string();
    }
    let mut msg = String::from("🔍 <b>Проверка сервисов</b>\n");
    if !buckets.expired.is_empty() {
        let _ = writeln!(msg, "\n❌ <b>ИСТЕКЛИ ({}):</b>", buckets.expired.len());
        bucket_lines(&mut msg, &buckets.expired, usize::MAX, true, true);
    }
    if !buckets.expiring.is_empty() {
        let _ = writeln!(msg, "\n⚠️ <b>СКОРО ИСТЕКУТ ({}):</b>", buckets.expiring.len());
        bucket_lines(&mut msg, &buckets.expiring, usize::MAX, true, true);
    }
    let _ = write!(
        msg,
        "\n📊 Итого: {} истекших, {} скоро",
        buckets.expired.len(),
        buckets.expiring.len()
    );
    msg
}

/// Totals by status.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ServiceTotals {
    pub total: usize,
    pub active: usize,
    pub notified: usize,
    pub paid: usize,
    pub users: usize,
    pub active_cost: f64,
}

impl ServiceTotals {
    pub fn of(services: &[TrackedService]) -> Self {
        let mut totals = Self {
            total: services.len(),
            ..Self::default()
        };
        let mut users: Vec<i64> = services.iter().filter_map(|s| s.user_id).collect();
        users.sort_unstable();
        users.dedup();
        totals.users = users.len();
        for service in services {
            match service.status {
                ServiceStatus::Active => {
                    totals.active += 1;
                    totals.active_cost += service.cost.unwrap_or(0.0);
                }
                ServiceStatus::Notified => totals.notified += 1,
                ServiceStatus::Paid => totals.paid += 1,
            }
        }
        totals
    }
}

/// `/status` report.
pub fn status_report(
    services: &[TrackedService],
    today: NaiveDate,
    counters: SweepCounters,
) -> String {
    let totals = ServiceTotals::of(services);
    let mut msg = format!(
        "📊 <b>Статистика сервисов</b>\n\n📋 Всего: {}\n🟢 Активных: {}\n\
         🟡 Ожидают оплаты: {}\n🔵 Оплачено: {}\n",
        totals.total, totals.active, totals.notified, totals.paid
    );
    if totals.active_cost > 0.0 {
        let _ = writeln!(msg, "💰 Стоимость активных: {} ₽", money(totals.active_cost, 2));
    }

    let buckets = ExpiryBuckets::new(services, today);
    if !buckets.expired.is_empty() {
        let _ = writeln!(msg, "\n❌ <b>ИСТЕКЛИ ({}):</b>", buckets.expired.len());
        bucket_lines(&mut msg, &buckets.expired, usize::MAX, false, false);
    }
    if !buckets.expiring.is_empty() {
        let _ = writeln!(msg, "\n⚠️ <b>СКОРО ИСТЕКУТ ({}):</b>", buckets.expiring.len());
        bucket_lines(&mut msg, &buckets.expiring, usize::MAX, false, false);
    }
    if !buckets.ok.is_empty() {
        let _ = writeln!(msg, "\n🟢 <b>В ПОРЯДКЕ ({}):</b>", buckets.ok.len());
        bucket_lines(&mut msg, &buckets.ok, usize::MAX, false, false);
    }
    let _ = write!(
        msg,
        "\n📈 Проверок: {} | Уведомлений: {}",
        counters.total_checks, counters.total_notifications
    );
    msg
}

pub fn start_message(now: DateTime<FixedOffset>, totals: &ServiceTotals) -> String {
    let mut msg = format!(
        "🚀 <b>Бот запущен!</b>\n\n🕐 {}\n\
         📊 Сервисов: {} (активных: {}, ожидают: {}, оплачено: {})\n👥 Пользователей: {}",
        now.format("%d.%m.%Y %H:%M"),
        totals.total,
        totals.active,
        totals.notified,
        totals.paid,
        totals.users
    );
    if totals.active_cost > 0.0 {
        let _ = write!(msg, "\n💰 Стоимость активных: {} ₽", money(totals.active_cost, 2));
    }
    msg
}

pub fn stop_message(uptime: chrono::Duration, counters: SweepCounters) -> String {
    let minutes = uptime.num_minutes().max(0);
    format!(
        "🛑 <b>Бот остановлен</b>\n\n📊 Работал: {}д {}ч {}м\n📈 Проверок: {} | Уведомлений: {}",
        minutes / (24 * 60),
        (minutes / 60) % 24,
        minutes % 60,
        counters.total_checks,
        counters.total_notifications
    )
}

/// Reply to `/cleanup_mutex`.
pub fn lock_report(status: LockStatus) -> String {
    match status {
        LockStatus::Held { pid } => format!("🔒 Lock-файл в порядке (pid {pid})."),
        LockStatus::Contested { pid } => format!(
            "⚠️ Lock-файл занят другим запущенным процессом (pid {pid}). Остановите его вручную."
        ),
        LockStatus::Reclaimed { stale: Some(pid) } => {
            format!("🧹 Устаревший lock-файл (pid {pid}) заменён.")
        }
        LockStatus::Reclaimed { stale: None } => "🧹 Lock-файл восстановлен.".to_string(),
    }
}

pub const START_TEXT: &str = "👋 <b>Привет! Я бот-нотификатор.</b>\n\n\
Отслеживаю сроки действия сервисов и отправляю уведомления.\n\
Пришлите текст или фото с доменами и датами, и я предложу их сохранить.\n\n\
📝 /help — подробная справка";

pub fn help_text(notify_hour: u32) -> String {
    format!(
        "📚 <b>Справка</b>\n\n\
Бот проверяет сервисы ежедневно в {notify_hour}:00 \
и отправляет уведомления при приближении даты окончания.\n\n\
<b>Уведомления:</b> за 30, 14, 7 дней и ежедневно за 5 дней.\n\n\
<b>Кнопки уведомлений:</b>\n\
• ✅ Оплачено — убрать из уведомлений\n\
• 🔔 Уведомил — отметить, что клиент уведомлён\n\
• 📅 Продлить — продлить на год / 3 месяца\n\n\
<b>Добавление:</b> пришлите текст вроде «site.ru до 15.03.2026, 1500 ₽», \
таблицу доменов или фото.\n\
<b>Продление:</b> «a.ru, b.ru - продли на 3 месяца».\n\n\
<b>Команды:</b>\n\
• /start — приветствие\n\
• /help — эта справка\n\
• /status — статистика сервисов\n\
• /list — все сервисы\n\
• /projects — список проектов\n\
• /providers — список провайдеров\n\
• /check — проверить истекающие\n\
• /test_notify — запустить рассылку сейчас\n\
• /cost &lt;название&gt; &lt;сумма&gt; — изменить стоимость\n\
• /cancel_all — отменить все неподтверждённые действия\n\
• /cleanup_mutex — проверить и восстановить lock-файл"
    )
}
