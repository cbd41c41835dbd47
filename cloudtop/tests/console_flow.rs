//! End-to-end flows through the app router against the in-memory backend.
//!
//! Tasks are executed inline and their messages fed back through `update`,
//! mirroring what the runtime does with a real terminal attached.

use std::sync::Arc;

use cloudtop::api::MockApi;
use cloudtop::app::{ActiveScreen, App, AppMsg};
use cloudtop_core::testing::{char_key, key};
use cloudtop_core::{Event, Outcome, Screen};

async fn settle(app: &mut App, mut outcome: Outcome<AppMsg>) {
    while let Some(task) = outcome.task {
        let msg = task.run().await;
        outcome = app.update(Event::Message(msg));
    }
}

async fn press(app: &mut App, k: &str) {
    let outcome = app.update(Event::Key(key(k)));
    settle(app, outcome).await;
}

async fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
        let outcome = app.update(Event::Key(char_key(c)));
        settle(app, outcome).await;
    }
}

async fn started_app(api: Arc<MockApi>) -> App {
    let mut app = App::new(api);
    let outcome = app.init();
    settle(&mut app, outcome).await;
    app
}

#[tokio::test]
async fn repository_create_round_trip() {
    let api = Arc::new(MockApi::with_sample_data());
    let mut app = started_app(api.clone()).await;

    press(&mut app, "3").await;
    assert_eq!(app.active(), ActiveScreen::Repositories);

    press(&mut app, "a").await;
    type_text(&mut app, "teamA").await;
    press(&mut app, "tab").await;
    type_text(&mut app, "https://example.com/teamA").await;
    press(&mut app, "tab").await;
    type_text(&mut app, "75").await;
    press(&mut app, "enter").await;

    let repos = api.repositories.lock().unwrap();
    assert_eq!(repos.len(), 2);
    assert_eq!(repos[1].name, "teamA");
    assert_eq!(repos[1].priority, 75);
    assert!(repos[1].enabled);
}

#[tokio::test]
async fn repository_delete_round_trip() {
    let api = Arc::new(MockApi::with_sample_data());
    let mut app = started_app(api.clone()).await;

    press(&mut app, "3").await;
    press(&mut app, "d").await;
    press(&mut app, "enter").await;

    assert!(api.repositories.lock().unwrap().is_empty());
}

#[tokio::test]
async fn instance_start_round_trip() {
    let api = Arc::new(MockApi::with_sample_data());
    let mut app = started_app(api.clone()).await;

    // second instance is stopped
    press(&mut app, "down").await;
    press(&mut app, "s").await;

    let instances = api.instances.lock().unwrap();
    assert_eq!(instances[1].state.to_string(), "running");
}

#[tokio::test]
async fn backend_failure_is_not_fatal() {
    let api = Arc::new(MockApi::with_sample_data());
    let mut app = started_app(api.clone()).await;

    api.fail_with("connection refused");
    press(&mut app, "r").await;

    // The loop keeps running: a later refresh succeeds again.
    press(&mut app, "r").await;
    let outcome = app.update(Event::Key(key("q")));
    assert!(outcome.quit);
}

#[tokio::test]
async fn policy_create_round_trip() {
    let api = Arc::new(MockApi::with_sample_data());
    let mut app = started_app(api.clone()).await;

    press(&mut app, "4").await;
    assert_eq!(app.active(), ActiveScreen::IdlePolicies);

    press(&mut app, "a").await;
    type_text(&mut app, "weekend").await;
    press(&mut app, "tab").await;
    type_text(&mut app, "240").await;
    press(&mut app, "enter").await;

    let policies = api.idle_policies.lock().unwrap();
    assert_eq!(policies.len(), 2);
    assert_eq!(policies[1].name, "weekend");
    assert_eq!(policies[1].idle_minutes, 240);
}
