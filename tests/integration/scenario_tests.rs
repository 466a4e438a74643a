//! End-to-end flows through the coordinators

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use uuid::Uuid;

use elidune_portal::{
    models::{AdminAction, ComponentStatus},
    services::{
        borrow::{BorrowRequestCoordinator, PendingCheck},
        credentials::{CredentialProvider, MemoryTokenStore},
        health::{ActionOutcome, Confirm, HealthMonitor, MonitorPhase},
        scope::ViewScope,
    },
    AppError,
};

use crate::support::{FakeLibrary, ADMIN_TOKEN};

struct Yes;

#[async_trait]
impl Confirm for Yes {
    async fn confirm(&self, _message: &str) -> bool {
        true
    }
}

fn provider(answers: &[&str]) -> (Arc<CredentialProvider>, Arc<Mutex<VecDeque<String>>>) {
    let queue = Arc::new(Mutex::new(
        answers.iter().map(|s| s.to_string()).collect::<VecDeque<_>>(),
    ));
    let remaining = Arc::clone(&queue);
    let provider = CredentialProvider::new(MemoryTokenStore::default(), move || {
        remaining.lock().unwrap().pop_front()
    });
    (Arc::new(provider), queue)
}

#[tokio::test]
async fn test_borrow_available_book() {
    let user = Uuid::new_v4();
    let fake = FakeLibrary::default();
    let client = Arc::new(fake.spawn(5).await);
    let coordinator = BorrowRequestCoordinator::new(client, ViewScope::new());

    assert!(!coordinator.has_pending_request(Some(user), 21).await);
    assert!(coordinator.view(user, 21).can_borrow());

    coordinator.submit_borrow_request(Some(user), 21).await.unwrap();
    assert_eq!(fake.submit_calls(), 1);

    let view = coordinator.view(user, 21);
    assert!(view.pending);
    assert!(!view.can_borrow());

    // the server now agrees
    assert!(coordinator.has_pending_request(Some(user), 21).await);
}

#[tokio::test]
async fn test_existing_pending_request_detected_and_resubmission_rejected() {
    let user = Uuid::new_v4();
    let fake = FakeLibrary::default().with_pending(user, 5);
    let client = Arc::new(fake.spawn(5).await);
    let coordinator = BorrowRequestCoordinator::new(client, ViewScope::new());

    assert!(coordinator.has_pending_request(Some(user), 5).await);
    assert_eq!(coordinator.view(user, 5).check, PendingCheck::Resolved);

    assert_eq!(
        coordinator.submit_borrow_request(Some(user), 5).await,
        Err(AppError::Validation("You already have a pending request for this book".into()))
    );
}

#[tokio::test]
async fn test_double_click_issues_one_submission() {
    let user = Uuid::new_v4();
    let fake = FakeLibrary::default();
    fake.set_submit_delay(Duration::from_millis(200));
    let client = Arc::new(fake.spawn(5).await);
    let coordinator = BorrowRequestCoordinator::new(client, ViewScope::new());

    let (first, second) = tokio::join!(
        coordinator.submit_borrow_request(Some(user), 9),
        coordinator.submit_borrow_request(Some(user), 9),
    );

    assert_eq!(first, Ok(()));
    assert_eq!(second, Err(AppError::AlreadyInProgress));
    assert_eq!(fake.submit_calls(), 1);
}

#[tokio::test]
async fn test_server_rejection_clears_optimistic_pending() {
    let user = Uuid::new_v4();
    let fake = FakeLibrary::default();
    let client = Arc::new(fake.spawn(5).await);
    let coordinator = BorrowRequestCoordinator::new(client, ViewScope::new());

    coordinator.submit_borrow_request(Some(user), 4).await.unwrap();
    assert!(coordinator.view(user, 4).pending);

    fake.reject(user, 4);
    coordinator.refresh_requests(Some(user)).await.unwrap();
    assert!(!coordinator.view(user, 4).pending);
    assert!(coordinator.view(user, 4).can_borrow());
}

#[tokio::test]
async fn test_pause_ingestion_refreshes_dashboard() {
    let fake = FakeLibrary::default();
    let client = Arc::new(fake.spawn(5).await);
    let (credentials, _) = provider(&[ADMIN_TOKEN]);
    let monitor = HealthMonitor::new(client, credentials, ViewScope::new());

    monitor.load().await.unwrap();
    assert_eq!(
        monitor.view().snapshot.unwrap().system_status.ingestion,
        ComponentStatus::Running
    );
    assert_eq!(fake.health_calls(), 1);

    let outcome = monitor
        .execute_action(AdminAction::PauseIngestion, &Yes)
        .await
        .unwrap();
    assert!(matches!(outcome, ActionOutcome::Executed { follow_up_error: None, .. }));
    assert_eq!(fake.action_calls(), 1);
    assert_eq!(fake.health_calls(), 2);

    let view = monitor.view();
    assert_eq!(view.phase, MonitorPhase::Ready);
    assert_eq!(view.snapshot.unwrap().system_status.ingestion, ComponentStatus::Paused);
    assert_eq!(view.last_action_message.as_deref(), Some("Ingestion paused"));
}

#[tokio::test]
async fn test_unauthorized_fetch_reprompts_before_retry() {
    let fake = FakeLibrary::default();
    let client = Arc::new(fake.spawn(5).await);
    let (credentials, remaining) = provider(&["expired-token", ADMIN_TOKEN]);
    let monitor = HealthMonitor::new(client, credentials, ViewScope::new());

    assert_eq!(monitor.load().await, Err(AppError::Auth));
    assert_eq!(monitor.view().phase, MonitorPhase::Error);
    assert_eq!(remaining.lock().unwrap().len(), 1);

    monitor.refresh().await.unwrap();
    assert!(remaining.lock().unwrap().is_empty());
    assert_eq!(monitor.view().phase, MonitorPhase::Ready);
    assert_eq!(fake.health_calls(), 2);
}

#[tokio::test]
async fn test_declined_token_prompt_never_reaches_network() {
    let fake = FakeLibrary::default();
    let client = Arc::new(fake.spawn(5).await);
    let (credentials, _) = provider(&[]);
    let monitor = HealthMonitor::new(client, credentials, ViewScope::new());

    assert_eq!(monitor.load().await, Err(AppError::NotAuthenticated));
    assert_eq!(
        monitor.execute_action(AdminAction::ClearCache, &Yes).await,
        Err(AppError::NotAuthenticated)
    );
    assert_eq!(fake.health_calls(), 0);
    assert_eq!(fake.action_calls(), 0);
}
