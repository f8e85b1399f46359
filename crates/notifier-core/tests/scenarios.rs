//! End-to-end flows across interpreter, pending store, workflow and engine.

mod common;

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use common::{DownCompletion, RecordingMessenger, ScriptedCompletion};
use notifier_core::{
    Clock, ConfirmationWorkflow, DraftSource, InMemoryPendingActions, Intent, Interpreter,
    NotificationEngine, Outcome,
};
use notifier_models::NotificationKind;
use notifier_persistence::CounterFile;
use notifier_store::MemoryStore;
use serde_json::json;

const OPERATOR: i64 = 4242;

fn workflow(store: &Arc<MemoryStore>) -> ConfirmationWorkflow {
    let pending = Arc::new(InMemoryPendingActions::new());
    ConfirmationWorkflow::new(store.clone(), pending, Clock::default())
}

#[tokio::test]
async fn month_reminder_is_sent_once_per_day() {
    let dir = tempfile::tempdir().unwrap();
    let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    let store = Arc::new(MemoryStore::with_rows([json!({
        "id": 1,
        "name": "example.ru",
        "status": "active",
        "expires_at": (today + Duration::days(30)).to_string()
    })]));
    let messenger = RecordingMessenger::new();
    let engine = NotificationEngine::new(
        store.clone(),
        messenger.clone(),
        Arc::new(CounterFile::load(dir.path().join("stats.json"))),
        OPERATOR,
    );

    let first = engine.sweep(today).await.unwrap();
    assert_eq!(first.sent, 1);
    let sent = messenger.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].chat_id, OPERATOR);
    assert!(sent[0].text.contains("За месяц"));
    assert!(sent[0].callbacks.contains(&"notified:1:month".to_string()));

    let row = &store.services()[0];
    assert_eq!(row.notification_date, Some(today));
    assert_eq!(row.last_notification, Some(NotificationKind::Month));

    let second = engine.sweep(today).await.unwrap();
    assert_eq!(second.sent, 0);
    assert_eq!(messenger.sent().len(), 1);
}

#[tokio::test]
async fn budget_phrase_needs_no_completion_call() {
    let completion = DownCompletion::new();
    let interpreter = Interpreter::new(completion.clone());
    let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

    let intent = interpreter.interpret("Хватит 5000 ₽ на 30 дней", today).await;

    let Intent::AddService(draft) = intent else {
        panic!("expected a single service, got {intent:?}");
    };
    assert_eq!(draft.source, DraftSource::Budget);
    assert_eq!(draft.expires_at, today + Duration::days(30));
    assert_eq!(draft.cost, Some(5000.0));
    assert_eq!(completion.calls(), 0);
}

#[tokio::test]
async fn domain_table_confirms_into_one_insert_per_domain() {
    let store = Arc::new(MemoryStore::new());
    let flow = workflow(&store);
    let interpreter = Interpreter::new(DownCompletion::new());
    let today = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
    let text = "ДОМЕН\nпрогрэсс.рф\nprogres82.ru\n\n\
                ИСТЕКАЕТ\n30.03.2025\n27.04.2025\n\nпроект ВЛАДОГРАД";

    let Intent::AddBatch(batch) = interpreter.interpret(text, today).await else {
        panic!("expected a batch");
    };
    assert_eq!(batch.domains().len(), 2);
    assert_eq!(batch.dates().len(), 2);

    let token = flow.stage_batch(batch, OPERATOR);
    let outcome = flow.confirm(&token).await.unwrap();

    let Outcome::AddedBatch { added, failed, project } = outcome else {
        panic!("expected a batch outcome");
    };
    assert_eq!(added.len(), 2);
    assert!(failed.is_empty());
    assert_eq!(project.as_deref(), Some("ВЛАДОГРАД"));
    assert_eq!(store.insert_count(), 2);

    let names: Vec<_> = store.services().into_iter().map(|s| (s.name, s.expires_at)).collect();
    assert_eq!(
        names,
        vec![
            ("прогрэсс.рф".to_string(), NaiveDate::from_ymd_opt(2025, 3, 30)),
            ("progres82.ru".to_string(), NaiveDate::from_ymd_opt(2025, 4, 27)),
        ]
    );
}

#[tokio::test]
async fn completion_batch_repeats_shared_dates_and_repairs_unreadable_ones() {
    let store = Arc::new(MemoryStore::new());
    let flow = workflow(&store);
    let completion = ScriptedCompletion::new(&[
        concat!(
            r#"Вот результат: {"domains": ["a.ru", "b.ru", "c.ru"], "#,
            r#""dates": ["2025-04-30", "2025-04-30", "весной"], "project": "Ромашка"}"#,
        ),
    ]);
    let interpreter = Interpreter::new(completion.clone());
    let today = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();

    let text = "Домены a.ru, b.ru и c.ru оплачены до конца апреля, c.ru уточнить в кабинете";
    let Intent::AddBatch(batch) = interpreter.interpret(text, today).await else {
        panic!("expected a batch");
    };
    assert_eq!(batch.source(), DraftSource::CompletionBatch);
    assert_eq!(batch.domains(), ["a.ru", "b.ru", "c.ru"]);
    assert_eq!(batch.dates().len(), batch.domains().len());
    let april = NaiveDate::from_ymd_opt(2025, 4, 30).unwrap();
    assert_eq!(batch.dates()[..2], [april, april]);
    assert_eq!(batch.dates()[2], today + Duration::days(365));
    assert_eq!(completion.prompts().len(), 1);
    assert!(completion.prompts()[0].contains("список доменов"));

    let token = flow.stage_batch(batch, OPERATOR);
    let Outcome::AddedBatch { added, project, .. } = flow.confirm(&token).await.unwrap() else {
        panic!("expected a batch outcome");
    };
    assert_eq!(added.len(), 3);
    assert_eq!(project.as_deref(), Some("Ромашка"));
    assert_eq!(store.insert_count(), 3);
}

#[tokio::test]
async fn completion_batch_with_mismatched_lists_falls_through() {
    let reply = r#"{"domains": ["a.ru", "b.ru"], "dates": ["2025-04-30"]}"#;
    let completion = ScriptedCompletion::new(&[reply]);
    let interpreter = Interpreter::new(completion.clone());
    let today = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();

    let intent = interpreter.interpret("a.ru и b.ru истекают 30.04.2025", today).await;

    let Intent::AddService(draft) = intent else {
        panic!("expected a single service, got {intent:?}");
    };
    assert_eq!(draft.source, DraftSource::Fallback);
    assert_eq!(draft.name, "a.ru");
    assert_eq!(draft.expires_at, NaiveDate::from_ymd_opt(2025, 4, 30).unwrap());
    // Batch reply rejected, then the single-service call found the queue empty.
    assert_eq!(completion.prompts().len(), 2);
}

#[tokio::test]
async fn renewal_lookalikes_are_added_when_completion_is_down() {
    let interpreter = Interpreter::new(DownCompletion::new());
    let today = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
    let due = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();

    for text in [
        "Продление домена\nsite.ru до 01.01.2026",
        "Extended support plan, site.ru до 01.01.2026",
    ] {
        let intent = interpreter.interpret(text, today).await;
        let Intent::AddService(draft) = intent else {
            panic!("expected a new service for {text:?}, got {intent:?}");
        };
        assert_eq!(draft.name, "site.ru");
        assert_eq!(draft.expires_at, due);
    }

    let intent = interpreter.interpret("продли site.ru на год", today).await;
    let Intent::Renew(request) = intent else {
        panic!("expected a renewal, got {intent:?}");
    };
    assert_eq!(request.targets, vec!["site.ru"]);
    assert_eq!((request.extension_days, request.extension_months), (365, 12));
}

#[tokio::test]
async fn renewal_reports_missing_targets_and_uses_future_base() {
    let today = Clock::default().today();
    let current = today + Duration::days(10);
    let store = Arc::new(MemoryStore::with_rows([json!({
        "id": 1,
        "name": "a.ru",
        "status": "notified",
        "expires_at": current.to_string(),
        "last_notification": "month",
        "notification_date": today.to_string()
    })]));
    let flow = workflow(&store);
    let interpreter = Interpreter::new(DownCompletion::new());

    let intent = interpreter.interpret("a.ru, b.ru - продли на 3 месяца", today).await;
    let Intent::Renew(request) = intent else {
        panic!("expected a renewal");
    };
    assert_eq!(request.targets, vec!["a.ru", "b.ru"]);
    assert_eq!((request.extension_days, request.extension_months), (90, 3));

    let token = flow.stage_renewal(request, OPERATOR);
    let Outcome::Renewed(report) = flow.confirm(&token).await.unwrap() else {
        panic!("expected a renewal outcome");
    };
    assert_eq!(report.extended_count(), 1);
    assert_eq!(report.not_found, vec!["b.ru"]);

    let row = &store.services()[0];
    assert_eq!(row.expires_at, Some(current + Duration::days(90)));
    assert!(row.is_active());
    assert_eq!(row.notification_date, None);
}

#[tokio::test]
async fn renewal_of_lapsed_service_counts_from_today() {
    let today = Clock::default().today();
    let store = Arc::new(MemoryStore::with_rows([json!({
        "id": 1,
        "name": "a.ru",
        "status": "active",
        "expires_at": (today - Duration::days(5)).to_string()
    })]));
    let flow = workflow(&store);
    let interpreter = Interpreter::new(DownCompletion::new());

    let intent = interpreter.interpret("a.ru, b.ru - продли на 3 месяца", today).await;
    let Intent::Renew(request) = intent else {
        panic!("expected a renewal");
    };
    let token = flow.stage_renewal(request, OPERATOR);
    flow.confirm(&token).await.unwrap();

    assert_eq!(store.services()[0].expires_at, Some(today + Duration::days(90)));
}

#[tokio::test]
async fn startup_digest_then_bulk_paid() {
    let dir = tempfile::tempdir().unwrap();
    let today = Clock::default().today();
    let store = Arc::new(MemoryStore::with_rows([
        json!({
            "id": 1,
            "name": "a.ru",
            "status": "active",
            "expires_at": (today - Duration::days(3)).to_string(),
        }),
        json!({
            "id": 2,
            "name": "Figma",
            "status": "active",
            "expires_at": (today + Duration::days(12)).to_string(),
        }),
        json!({
            "id": 3,
            "name": "later.ru",
            "status": "active",
            "expires_at": (today + Duration::days(200)).to_string(),
        }),
    ]));
    let messenger = RecordingMessenger::new();
    let engine = NotificationEngine::new(
        store.clone(),
        messenger.clone(),
        Arc::new(CounterFile::load(dir.path().join("stats.json"))),
        OPERATOR,
    );

    engine.startup_digest(today).await.unwrap();
    let digest = &messenger.sent()[0];
    assert!(digest.text.contains("ПРОВЕРКА ПРИ ЗАПУСКЕ"));
    assert_eq!(digest.callbacks, vec!["all_paid", "extend_hosting"]);

    let change = workflow(&store).mark_all_paid(today).await.unwrap();
    assert_eq!(change, notifier_core::StatusChange::AllPaid { count: 2 });
    assert_eq!(store.services()[2].status, notifier_models::ServiceStatus::Active);
}
