//! Drives the HTTP client, session manager, task store and focus timer
//! against a live server bound to an ephemeral port.

use std::time::Duration;

use taskfocus::app::build_app;
use taskfocus::client::{
    ApiClient, ClientError, FocusPhase, FocusTimer, MemoryStorage, SessionManager, TaskForm,
    TaskStore,
};
use taskfocus::config::ClientConfig;
use taskfocus::domain::{TaskCategory, TaskPriority};
use taskfocus::state::AppState;

async fn spawn_server() -> ApiClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_app(AppState::fake());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    ApiClient::new(ClientConfig::new(format!("http://{addr}/")))
}

fn report_form() -> TaskForm {
    TaskForm {
        title: "Write report".into(),
        description: String::new(),
        category: TaskCategory::Work,
        priority: TaskPriority::High,
        date: "2024-05-01".into(),
        time: String::new(),
    }
}

#[tokio::test]
async fn focus_session_is_recorded_on_the_server() {
    let base = spawn_server().await;
    let mut sessions = SessionManager::restore(MemoryStorage::default()).unwrap();
    let session = sessions
        .sign_up(&base, "ada@example.com", "secret1", "Ada")
        .await
        .unwrap()
        .clone();
    assert_eq!(session.user.full_name, "Ada");

    let mut store = TaskStore::new(session.client(&base));
    store.create(&report_form()).await.unwrap();
    let task = store.tasks()[0].clone();
    assert!(!task.is_completed);
    assert_eq!(task.time_spent, 0);
    assert_eq!(task.category, TaskCategory::Work);

    let timer = FocusTimer::with_tick_interval(Duration::from_millis(20));
    timer.select(task.id).await.unwrap();
    timer.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    let paused = timer.pause().await.unwrap();
    assert!(paused.elapsed > 0);

    let recorded = timer.complete(&mut store).await.unwrap();
    assert_eq!(recorded, paused.elapsed);
    assert_eq!(timer.snapshot().await.phase, FocusPhase::Idle);

    let task = &store.tasks()[0];
    assert!(task.is_completed);
    assert_eq!(task.time_spent, recorded as i64);
    assert_eq!(store.stats().completed, 1);
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let base = spawn_server().await;
    let mut sessions = SessionManager::restore(MemoryStorage::default()).unwrap();
    sessions
        .sign_up(&base, "ada@example.com", "secret1", "")
        .await
        .unwrap();
    sessions.sign_out().unwrap();

    let mut messages = Vec::new();
    for (email, password) in [
        ("ada@example.com", "wrong-1"),
        ("ada@example.com", "wrong-2"),
        ("nobody@example.com", "secret1"),
    ] {
        match sessions.sign_in(&base, email, password).await {
            Err(ClientError::Api { status, message }) => {
                assert_eq!(status, 400);
                messages.push(message);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }
    assert!(messages.iter().all(|m| m == "Invalid credentials"));
    assert!(!sessions.is_authenticated());
}

#[tokio::test]
async fn second_delete_is_not_found_and_cache_survives() {
    let base = spawn_server().await;
    let mut sessions = SessionManager::restore(MemoryStorage::default()).unwrap();
    let client = sessions
        .sign_up(&base, "ada@example.com", "secret1", "")
        .await
        .unwrap()
        .client(&base);

    let mut store = TaskStore::new(client);
    store.create(&report_form()).await.unwrap();
    let id = store.tasks()[0].id;

    store.delete(id).await.unwrap();
    assert!(store.tasks().is_empty());

    match store.delete(id).await {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "Task not found");
        }
        other => panic!("expected not found, got {other:?}"),
    }
}

#[tokio::test]
async fn tasks_are_private_to_their_owner() {
    let base = spawn_server().await;
    let mut sessions = SessionManager::restore(MemoryStorage::default()).unwrap();
    let ada = sessions
        .sign_up(&base, "ada@example.com", "secret1", "")
        .await
        .unwrap()
        .client(&base);
    let bob = sessions
        .sign_up(&base, "bob@example.com", "secret1", "")
        .await
        .unwrap()
        .client(&base);

    let mut ada_store = TaskStore::new(ada);
    ada_store.create(&report_form()).await.unwrap();
    let id = ada_store.tasks()[0].id;

    let mut bob_store = TaskStore::new(bob);
    bob_store.refresh().await.unwrap();
    assert!(bob_store.tasks().is_empty());
    assert!(bob_store.complete(id, 10).await.is_err());

    ada_store.refresh().await.unwrap();
    assert!(!ada_store.tasks()[0].is_completed);
}
