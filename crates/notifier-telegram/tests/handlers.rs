//! Handler flows against an in-memory store and a recording messenger.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use notifier_core::messenger::Result as MessengerResult;
use notifier_core::{Config, Keyboard, Messenger, NoCompletion, SentMessage};
use notifier_models::ServiceStatus;
use notifier_store::MemoryStore;
use notifier_telegram::handlers::{on_callback, on_command, on_image, on_text, ACCESS_DENIED};
use notifier_telegram::{lifecycle, BotState, Command};
use serde_json::json;

const ADMIN: i64 = 777;

#[derive(Debug, Clone)]
enum Event {
    Sent {
        chat_id: i64,
        text: String,
        callbacks: Vec<String>,
    },
    Edited {
        text: String,
    },
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn sent_texts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Sent { text, .. } => Some(text),
                Event::Edited { .. } => None,
            })
            .collect()
    }

    fn last_callbacks(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .rev()
            .find_map(|e| match e {
                Event::Sent { callbacks, .. } if !callbacks.is_empty() => Some(callbacks),
                _ => None,
            })
            .unwrap_or_default()
    }

    fn last_edit(&self) -> Option<String> {
        self.events().into_iter().rev().find_map(|e| match e {
            Event::Edited { text } => Some(text),
            Event::Sent { .. } => None,
        })
    }
}

#[async_trait]
impl Messenger for Recorder {
    async fn send(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> MessengerResult<SentMessage> {
        let mut events = self.events.lock().unwrap();
        events.push(Event::Sent {
            chat_id,
            text: text.to_string(),
            callbacks: keyboard
                .map(|k| k.callback_data().map(str::to_string).collect())
                .unwrap_or_default(),
        });
        Ok(SentMessage {
            chat_id,
            message_id: events.len() as i32,
        })
    }

    async fn edit(
        &self,
        _message: SentMessage,
        text: &str,
        _keyboard: Option<&Keyboard>,
    ) -> MessengerResult<()> {
        self.events.lock().unwrap().push(Event::Edited { text: text.to_string() });
        Ok(())
    }
}

fn config(state_dir: &Path, admin: i64) -> Config {
    let state_dir = state_dir.display().to_string();
    let admin = admin.to_string();
    Config::from_lookup(|name| match name {
        "TELEGRAM_BOT_TOKEN" => Some("123:abc".to_string()),
        "SUPABASE_URL" => Some("http://localhost".to_string()),
        "SUPABASE_KEY" => Some("key".to_string()),
        "ADMIN_ID" => Some(admin.clone()),
        "NOTIFIER_STATE_DIR" => Some(state_dir.clone()),
        _ => None,
    })
    .unwrap()
}

fn state_with(store: Arc<MemoryStore>, dir: &Path, admin: i64) -> (BotState, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let completion = Arc::new(NoCompletion);
    let state = BotState::assemble(config(dir, admin), store, completion, recorder.clone());
    (state, recorder)
}

fn origin() -> Option<SentMessage> {
    Some(SentMessage {
        chat_id: ADMIN,
        message_id: 1,
    })
}

#[tokio::test]
async fn strangers_are_refused_everywhere() {
    let dir = tempfile::tempdir().unwrap();
    let row = json!({"id": 1, "name": "a.ru", "status": "active"});
    let store = Arc::new(MemoryStore::with_rows([row]));
    let (state, recorder) = state_with(store.clone(), dir.path(), ADMIN);

    on_command(&state, 5, 5, Command::List).await.unwrap();
    on_text(&state, 5, 5, "site.ru до 01.01.2030").await.unwrap();
    let toast = on_callback(&state, 5, None, "paid:1").await.unwrap();

    assert_eq!(recorder.sent_texts(), vec![ACCESS_DENIED, ACCESS_DENIED]);
    assert_eq!(toast, Some(ACCESS_DENIED));
    assert_eq!(store.update_count(), 0);
    assert!(state.pending.is_empty());
}

#[tokio::test]
async fn unset_operator_refuses_even_user_zero() {
    let dir = tempfile::tempdir().unwrap();
    let (state, recorder) = state_with(Arc::new(MemoryStore::new()), dir.path(), 0);

    on_command(&state, 0, 0, Command::Status).await.unwrap();
    assert_eq!(recorder.sent_texts(), vec![ACCESS_DENIED]);
}

#[tokio::test]
async fn typed_service_is_saved_only_after_confirmation() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let (state, recorder) = state_with(store.clone(), dir.path(), ADMIN);

    on_text(&state, ADMIN, ADMIN, "site.ru до 15.03.2030").await.unwrap();
    assert!(recorder.sent_texts()[0].contains("site.ru"));
    assert_eq!(store.insert_count(), 0);

    let callbacks = recorder.last_callbacks();
    assert_eq!(callbacks.len(), 2);
    let confirm = callbacks.iter().find(|c| c.starts_with("ok:")).unwrap().clone();

    assert_eq!(on_callback(&state, ADMIN, origin(), &confirm).await.unwrap(), None);
    assert_eq!(store.insert_count(), 1);
    assert!(recorder.last_edit().unwrap().contains("Сохранено"));

    on_callback(&state, ADMIN, origin(), &confirm).await.unwrap();
    assert_eq!(store.insert_count(), 1);
    assert!(recorder.last_edit().unwrap().contains("устарело"));
}

#[tokio::test]
async fn cancel_leaves_the_store_alone() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let (state, recorder) = state_with(store.clone(), dir.path(), ADMIN);

    on_text(&state, ADMIN, ADMIN, "site.ru до 15.03.2030").await.unwrap();
    let cancel = recorder
        .last_callbacks()
        .into_iter()
        .find(|c| c.starts_with("no:"))
        .unwrap();

    on_callback(&state, ADMIN, origin(), &cancel).await.unwrap();
    assert_eq!(store.insert_count(), 0);
    assert!(recorder.last_edit().unwrap().contains("Не сохранено"));
    assert!(state.pending.is_empty());
}

#[tokio::test]
async fn cost_command_stages_an_edit() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::with_rows([json!({
        "id": 3, "name": "Figma", "status": "active", "expires_at": "2030-01-01", "cost": 100
    })]));
    let (state, recorder) = state_with(store.clone(), dir.path(), ADMIN);

    on_command(&state, ADMIN, ADMIN, Command::Cost("Figma 1500".into())).await.unwrap();
    let confirm = recorder
        .last_callbacks()
        .into_iter()
        .find(|c| c.starts_with("ok:"))
        .unwrap();
    on_callback(&state, ADMIN, origin(), &confirm).await.unwrap();

    assert_eq!(store.services()[0].cost, Some(1500.0));
    assert!(recorder.last_edit().unwrap().contains("Стоимость обновлена"));
}

#[tokio::test]
async fn cost_command_reports_usage_and_unknown_names() {
    let dir = tempfile::tempdir().unwrap();
    let (state, recorder) = state_with(Arc::new(MemoryStore::new()), dir.path(), ADMIN);

    on_command(&state, ADMIN, ADMIN, Command::Cost(String::new())).await.unwrap();
    on_command(&state, ADMIN, ADMIN, Command::Cost("ghost.ru 10".into())).await.unwrap();

    let texts = recorder.sent_texts();
    assert!(texts[0].contains("Использование"));
    assert!(texts[1].contains("не найден"));
    assert!(state.pending.is_empty());
}

#[tokio::test]
async fn projects_buttons_open_a_project_view() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::with_rows([
        json!({
            "id": 1,
            "name": "a.ru",
            "status": "active",
            "expires_at": "2030-01-01",
            "project": "ВЛАДОГРАД",
            "cost": 500,
        }),
        json!({
            "id": 2,
            "name": "b.ru",
            "status": "active",
            "expires_at": "2030-02-01",
            "project": "Ромашка",
        }),
    ]));
    let (state, recorder) = state_with(store, dir.path(), ADMIN);

    on_command(&state, ADMIN, ADMIN, Command::Projects).await.unwrap();
    let callbacks = recorder.last_callbacks();
    assert_eq!(callbacks, vec!["project:ВЛАДОГРАД", "project:Ромашка"]);

    on_callback(&state, ADMIN, origin(), "project:ВЛАДОГРАД").await.unwrap();
    let view = recorder.last_edit().unwrap();
    assert!(view.contains("a.ru"));
    assert!(!view.contains("b.ru"));
}

#[tokio::test]
async fn reminder_buttons_update_status() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::with_rows([json!({
        "id": 9, "name": "a.ru", "status": "active", "expires_at": "2030-01-01"
    })]));
    let (state, recorder) = state_with(store.clone(), dir.path(), ADMIN);

    on_callback(&state, ADMIN, origin(), "notified:9:one_week").await.unwrap();
    assert_eq!(store.services()[0].status, ServiceStatus::Notified);

    on_callback(&state, ADMIN, origin(), "paid:9").await.unwrap();
    assert_eq!(store.services()[0].status, ServiceStatus::Paid);
    assert!(recorder.last_edit().unwrap().contains("Оплачено"));

    on_callback(&state, ADMIN, origin(), "paid:404").await.unwrap();
    assert!(recorder.last_edit().unwrap().contains("не найден"));
}

#[tokio::test]
async fn unknown_buttons_get_a_toast() {
    let dir = tempfile::tempdir().unwrap();
    let (state, recorder) = state_with(Arc::new(MemoryStore::new()), dir.path(), ADMIN);

    let toast = on_callback(&state, ADMIN, origin(), "connect:something").await.unwrap();
    assert!(toast.is_some());
    assert!(recorder.events().is_empty());
}

#[tokio::test]
async fn long_listings_are_split() {
    let dir = tempfile::tempdir().unwrap();
    let rows: Vec<_> = (0..300)
        .map(|i| {
            json!({
                "id": i,
                "name": format!("service-number-{i}.example.ru"),
                "status": "active",
                "expires_at": "2030-01-01",
            })
        })
        .collect();
    let (state, recorder) = state_with(Arc::new(MemoryStore::with_rows(rows)), dir.path(), ADMIN);

    on_command(&state, ADMIN, ADMIN, Command::List).await.unwrap();
    let texts = recorder.sent_texts();
    assert!(texts.len() > 1);
    assert!(texts.iter().all(|t| t.chars().count() <= 4000));
    assert!(texts.concat().contains("service-number-299.example.ru"));
}

#[tokio::test]
async fn store_failures_surface_as_errors() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    store.fail_reads(true);
    let (state, _) = state_with(store, dir.path(), ADMIN);

    assert!(on_command(&state, ADMIN, ADMIN, Command::Check).await.is_err());
}

#[tokio::test]
async fn unreadable_photo_without_caption_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let (state, recorder) = state_with(Arc::new(MemoryStore::new()), dir.path(), ADMIN);

    on_image(&state, ADMIN, ADMIN, b"not an image", None).await.unwrap();
    assert!(recorder.sent_texts()[0].contains("Не удалось распознать"));

    on_image(&state, ADMIN, ADMIN, b"not an image", Some("site.ru до 01.02.2031")).await.unwrap();
    assert!(recorder.sent_texts()[1].contains("site.ru"));
    assert_eq!(state.pending.len(), 1);
}

#[tokio::test]
async fn lifecycle_notices_go_to_the_operator() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::with_rows([json!({
        "id": 1, "name": "a.ru", "status": "active", "expires_at": "2030-01-01",
        "user_id": 1, "cost": 1000
    })]));
    let (state, recorder) = state_with(store, dir.path(), ADMIN);

    assert!(lifecycle::announce_start(&state).await);
    assert!(lifecycle::announce_stop(&state).await);

    let events = recorder.events();
    assert_eq!(events.len(), 2);
    match &events[0] {
        Event::Sent { chat_id, text, .. } => {
            assert_eq!(*chat_id, ADMIN);
            assert!(text.contains("Бот запущен"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(recorder.sent_texts()[1].contains("Бот остановлен"));
}

#[tokio::test]
async fn lifecycle_notices_are_skipped_without_operator() {
    let dir = tempfile::tempdir().unwrap();
    let (state, recorder) = state_with(Arc::new(MemoryStore::new()), dir.path(), 0);

    assert!(!lifecycle::announce_start(&state).await);
    assert!(!lifecycle::startup_check(&state).await);
    assert!(!lifecycle::announce_stop(&state).await);
    assert!(recorder.events().is_empty());
}

#[tokio::test]
async fn cleanup_mutex_reclaims_a_stale_lock() {
    let dir = tempfile::tempdir().unwrap();
    let (state, recorder) = state_with(Arc::new(MemoryStore::new()), dir.path(), ADMIN);
    let lock_path = state.config.lock_path();
    std::fs::write(&lock_path, "999999999").unwrap();

    on_command(&state, ADMIN, ADMIN, Command::CleanupMutex).await.unwrap();

    let texts = recorder.sent_texts();
    assert!(texts[0].contains("Устаревший lock-файл (pid 999999999) заменён"), "{texts:?}");
    let owner = std::fs::read_to_string(&lock_path).unwrap();
    assert_eq!(owner.trim(), std::process::id().to_string());

    on_command(&state, ADMIN, ADMIN, Command::CleanupMutex).await.unwrap();
    assert!(recorder.sent_texts()[1].contains("Lock-файл в порядке"));
}

#[tokio::test]
async fn cleanup_mutex_is_operator_only() {
    let dir = tempfile::tempdir().unwrap();
    let (state, recorder) = state_with(Arc::new(MemoryStore::new()), dir.path(), ADMIN);

    on_command(&state, 1, 1, Command::CleanupMutex).await.unwrap();

    assert_eq!(recorder.sent_texts(), vec![ACCESS_DENIED.to_string()]);
    assert!(!state.config.lock_path().exists());
}
