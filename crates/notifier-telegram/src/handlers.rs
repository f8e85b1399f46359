//! Command, message and button handlers for the Telegram bot.
//!
//! The `handle_*` endpoints are the teloxide boundary: they pull ids and
//! payloads out of the update, call the matching `on_*` routine and turn
//! any error into a short reply. The `on_*` routines only talk to the chat
//! through [`BotState::messenger`], so they run unchanged against a fake.

use std::sync::Arc;

use notifier_core::format::{self, ExpiryBuckets, MESSAGE_CHUNK_CHARS};
use notifier_core::{CallbackAction, Intent, Keyboard, SentMessage};
use notifier_models::Filter;
use notifier_persistence::InstanceLock;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;
use tracing::{debug, error, info, warn};

use crate::error::{Result, TelegramError};
use crate::state::BotState;

pub const ACCESS_DENIED: &str = "❌ Доступ запрещён.";

const COST_USAGE: &str = "Использование: <code>/cost &lt;название&gt; &lt;сумма&gt;</code>\n\
Например: <code>/cost site.ru 1500</code>";

const UNREADABLE_IMAGE: &str = "❌ Не удалось распознать изображение. Попробуйте отправить текстом.";

/// Bot commands that can be invoked with /.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Команды:")]
pub enum Command {
    #[command(description = "приветствие")]
    Start,

    #[command(description = "справка")]
    Help,

    #[command(description = "статистика сервисов")]
    Status,

    #[command(description = "все сервисы")]
    List,

    #[command(description = "список проектов")]
    Projects,

    #[command(description = "список провайдеров")]
    Providers,

    #[command(description = "проверить истекающие")]
    Check,

    #[command(rename = "test_notify", description = "запустить рассылку сейчас")]
    TestNotify,

    #[command(description = "изменить стоимость: /cost <название> <сумма>")]
    Cost(String),

    #[command(rename = "cancel_all", description = "отменить все неподтверждённые действия")]
    CancelAll,

    #[command(rename = "cleanup_mutex", description = "проверить и восстановить lock-файл")]
    CleanupMutex,
}

/// Send `text`, split below the platform limit; the keyboard goes under the
/// last part.
async fn reply(
    state: &BotState,
    chat_id: i64,
    text: &str,
    keyboard: Option<&Keyboard>,
) -> Result<()> {
    let parts = format::split_message(text, MESSAGE_CHUNK_CHARS);
    let last = parts.len().saturating_sub(1);
    for (i, part) in parts.iter().enumerate() {
        let kb = if i == last { keyboard } else { None };
        state.messenger.send(chat_id, part, kb).await?;
    }
    Ok(())
}

/// Replace the tapped message with `text`, or send it when there is no
/// message to edit.
async fn show(
    state: &BotState,
    origin: Option<SentMessage>,
    fallback_chat: i64,
    text: &str,
) -> Result<()> {
    let Some(message) = origin else {
        return reply(state, fallback_chat, text, None).await;
    };
    let mut parts = format::split_message(text, MESSAGE_CHUNK_CHARS).into_iter();
    if let Some(first) = parts.next() {
        state.messenger.edit(message, &first, None).await?;
    }
    for part in parts {
        state.messenger.send(message.chat_id, &part, None).await?;
    }
    Ok(())
}

/// `/cost` arguments: everything up to the last word is the name.
pub fn parse_cost_args(args: &str) -> Option<(String, f64)> {
    let (name, amount) = args.trim().rsplit_once(char::is_whitespace)?;
    let name = name.trim();
    let amount: f64 = amount.trim().replace(',', ".").parse().ok()?;
    if name.is_empty() || !amount.is_finite() || amount < 0.0 {
        return None;
    }
    Some((name.to_string(), amount))
}

/// Run one command for `user_id` in `chat_id`.
pub async fn on_command(state: &BotState, chat_id: i64, user_id: i64, cmd: Command) -> Result<()> {
    if !state.is_admin(user_id) {
        warn!(user_id, "Command from non-operator refused");
        return reply(state, chat_id, ACCESS_DENIED, None).await;
    }
    let today = state.clock.today();

    match cmd {
        Command::Start => reply(state, chat_id, format::START_TEXT, None).await,
        Command::Help => {
            let text = format::help_text(state.config.notify_hour);
            reply(state, chat_id, &text, None).await
        }
        Command::Status => {
            let services = state.store.all_services().await?;
            let counters = state.engine.counters().snapshot();
            reply(state, chat_id, &format::status_report(&services, today, counters), None).await
        }
        Command::List => {
            let services = state.store.all_services().await?;
            reply(state, chat_id, &format::service_list(&services), None).await
        }
        Command::Projects => {
            let projects = state.store.distinct_projects().await?;
            if projects.is_empty() {
                return reply(state, chat_id, "📂 Проектов пока нет.", None).await;
            }
            let keyboard = format::tag_keyboard(&projects, CallbackAction::Project);
            let text = format!("📂 <b>Проекты ({}):</b>", projects.len());
            reply(state, chat_id, &text, Some(&keyboard)).await
        }
        Command::Providers => {
            let providers = state.store.distinct_providers().await?;
            if providers.is_empty() {
                return reply(state, chat_id, "🌐 Провайдеров пока нет.", None).await;
            }
            let keyboard = format::tag_keyboard(&providers, CallbackAction::Provider);
            let text = format!("🌐 <b>Провайдеры ({}):</b>", providers.len());
            reply(state, chat_id, &text, Some(&keyboard)).await
        }
        Command::Check => {
            let services = state.store.active_services().await?;
            let buckets = ExpiryBuckets::new(&services, today);
            reply(state, chat_id, &format::check_report(&buckets), None).await
        }
        Command::TestNotify => {
            reply(state, chat_id, "🧪 Запускаю проверку уведомлений...", None).await?;
            let report = state.engine.sweep(today).await?;
            let text = format!(
                "✅ Проверка завершена!\n\nПроверено: {}\nОтправлено: {}",
                report.checked, report.sent
            );
            reply(state, chat_id, &text, None).await
        }
        Command::Cost(args) => {
            let Some((name, cost)) = parse_cost_args(&args) else {
                return reply(state, chat_id, COST_USAGE, None).await;
            };
            match state.workflow.prepare_cost_edit(&name, cost, user_id).await? {
                Some((service, token)) => {
                    let keyboard = format::confirm_keyboard(&token);
                    let text = format::cost_preview(&service, cost);
                    reply(state, chat_id, &text, Some(&keyboard)).await
                }
                None => {
                    let text = format!("❓ Сервис «{}» не найден.", format::html_escape(&name));
                    reply(state, chat_id, &text, None).await
                }
            }
        }
        Command::CancelAll => {
            let dropped = state.workflow.cancel_all(user_id);
            info!(user_id, dropped, "Pending actions cancelled");
            reply(state, chat_id, &format!("🗑 Отменено действий: {dropped}"), None).await
        }
        Command::CleanupMutex => {
            let status = InstanceLock::reclaim(&state.config.lock_path())?;
            reply(state, chat_id, &format::lock_report(status), None).await
        }
    }
}

/// Interpret free text and stage whatever it asks for behind a confirmation.
pub async fn on_text(state: &BotState, chat_id: i64, user_id: i64, text: &str) -> Result<()> {
    if !state.is_admin(user_id) {
        return reply(state, chat_id, ACCESS_DENIED, None).await;
    }
    stage_intent(state, chat_id, user_id, text).await
}

/// OCR the image, then treat the recognised text (and any caption) as typed
/// input.
pub async fn on_image(
    state: &BotState,
    chat_id: i64,
    user_id: i64,
    image: &[u8],
    caption: Option<&str>,
) -> Result<()> {
    if !state.is_admin(user_id) {
        return reply(state, chat_id, ACCESS_DENIED, None).await;
    }
    let caption = caption.map(str::trim).filter(|c| !c.is_empty());
    let recognised = state.interpreter.read_image(image).await;

    let text = match (caption, recognised) {
        (Some(caption), Some(text)) => format!("{caption}\n{text}"),
        (None, Some(text)) => text,
        (Some(caption), None) => caption.to_string(),
        (None, None) => return reply(state, chat_id, UNREADABLE_IMAGE, None).await,
    };
    if text.trim().is_empty() {
        return reply(state, chat_id, UNREADABLE_IMAGE, None).await;
    }
    debug!(chars = text.chars().count(), "Image recognised");
    stage_intent(state, chat_id, user_id, &text).await
}

async fn stage_intent(state: &BotState, chat_id: i64, user_id: i64, text: &str) -> Result<()> {
    let today = state.clock.today();
    match state.interpreter.interpret(text, today).await {
        Intent::AddService(draft) => {
            let preview = format::draft_preview(&draft, today);
            let token = state.workflow.stage_service(draft, user_id);
            reply(state, chat_id, &preview, Some(&format::confirm_keyboard(&token))).await
        }
        Intent::AddBatch(batch) => {
            let preview = format::batch_preview(&batch);
            let token = state.workflow.stage_batch(batch, user_id);
            reply(state, chat_id, &preview, Some(&format::confirm_keyboard(&token))).await
        }
        Intent::Renew(request) => {
            let preview = format::renewal_preview(&request);
            let token = state.workflow.stage_renewal(request, user_id);
            reply(state, chat_id, &preview, Some(&format::confirm_keyboard(&token))).await
        }
        Intent::ListServices => {
            let services = state.store.all_services().await?;
            reply(state, chat_id, &format::service_list(&services), None).await
        }
    }
}

/// Apply a button tap. Returns a short toast for the tap acknowledgement,
/// if any.
pub async fn on_callback(
    state: &BotState,
    user_id: i64,
    origin: Option<SentMessage>,
    data: &str,
) -> Result<Option<&'static str>> {
    if !state.is_admin(user_id) {
        warn!(user_id, "Button tap from non-operator refused");
        return Ok(Some(ACCESS_DENIED));
    }
    let Some(action) = CallbackAction::decode(data) else {
        warn!(data, "Unknown callback data");
        return Ok(Some("Кнопка устарела"));
    };
    debug!(?action, "Callback decoded");

    let today = state.clock.today();
    let text = match action {
        CallbackAction::Confirm(token) => format::outcome(&state.workflow.confirm(&token).await?),
        CallbackAction::Cancel(token) => format::outcome(&state.workflow.cancel(&token)),
        CallbackAction::Paid(id) => format::status_change(&state.workflow.mark_paid(&id).await?),
        CallbackAction::Notified(id, kind) => {
            format::status_change(&state.workflow.mark_notified(&id, kind).await?)
        }
        CallbackAction::Extend(id, days) => {
            format::status_change(&state.workflow.extend(&id, days).await?)
        }
        CallbackAction::AllPaid => {
            format::status_change(&state.workflow.mark_all_paid(today).await?)
        }
        CallbackAction::ExtendAllHosting => {
            format::status_change(&state.workflow.extend_all_hosting(today).await?)
        }
        CallbackAction::Project(project) => {
            let services = state.store.select(&[Filter::eq("project", project.as_str())]).await?;
            format::project_view(&project, &services)
        }
        CallbackAction::Provider(provider) => {
            let services = state.store.select(&[Filter::eq("provider", provider.as_str())]).await?;
            format::provider_view(&provider, &services)
        }
    };

    show(state, origin, user_id, &text).await?;
    Ok(None)
}

fn failure_text(e: &TelegramError) -> String {
    format!("❌ Ошибка: {}", format::html_escape(&e.to_string()))
}

async fn report_failure(bot: &Bot, chat_id: ChatId, e: &TelegramError) -> ResponseResult<()> {
    bot.send_message(chat_id, failure_text(e))
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

fn sender_id(msg: &Message) -> i64 {
    msg.from.as_ref().map(|u| u.id.0 as i64).unwrap_or_default()
}

/// Handle a parsed command.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    info!(chat_id = %msg.chat.id, "Command matched: {:?}", cmd);
    if let Err(e) = on_command(&state, msg.chat.id.0, sender_id(&msg), cmd).await {
        error!(chat_id = %msg.chat.id, error = %e, "Command failed");
        report_failure(&bot, msg.chat.id, &e).await?;
    }
    Ok(())
}

/// Handle a plain text message.
pub async fn handle_message(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    if let Err(e) = on_text(&state, msg.chat.id.0, sender_id(&msg), text).await {
        error!(chat_id = %msg.chat.id, error = %e, "Text message failed");
        report_failure(&bot, msg.chat.id, &e).await?;
    }
    Ok(())
}

/// Handle a photo message: download the largest size and hand it to OCR.
pub async fn handle_photo(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let user_id = sender_id(&msg);
    if !state.is_admin(user_id) {
        bot.send_message(msg.chat.id, ACCESS_DENIED).await?;
        return Ok(());
    }
    let largest = msg.photo().and_then(|sizes| sizes.iter().max_by_key(|p| p.width * p.height));
    let Some(photo) = largest else {
        return Ok(());
    };

    let result: Result<()> = async {
        let file = bot.get_file(photo.file.id.clone()).await?;
        let mut image = Vec::new();
        bot.download_file(&file.path, &mut image).await?;
        debug!(bytes = image.len(), "Photo downloaded");
        on_image(&state, msg.chat.id.0, user_id, &image, msg.caption()).await
    }
    .await;

    if let Err(e) = result {
        error!(chat_id = %msg.chat.id, error = %e, "Photo message failed");
        report_failure(&bot, msg.chat.id, &e).await?;
    }
    Ok(())
}

/// Handle an inline-button tap.
pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    let Some(data) = q.data.as_deref() else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    let user_id = q.from.id.0 as i64;
    let origin = q.message.as_ref().map(|m| SentMessage {
        chat_id: m.chat().id.0,
        message_id: m.id().0,
    });

    let toast = match on_callback(&state, user_id, origin, data).await {
        Ok(toast) => toast,
        Err(e) => {
            error!(data, error = %e, "Callback failed");
            let chat = origin.map(|m| ChatId(m.chat_id)).unwrap_or(ChatId(user_id));
            report_failure(&bot, chat, &e).await?;
            None
        }
    };

    let mut answer = bot.answer_callback_query(q.id.clone());
    if let Some(text) = toast {
        answer = answer.text(text);
    }
    answer.await?;
    Ok(())
}
