//! Endpoint-level tests of the REST client

use std::time::Duration;

use axum::http::StatusCode;
use uuid::Uuid;

use elidune_portal::{
    api::{AdminApi, PatronApi, SearchHistoryApi},
    models::{AdminAction, ComponentStatus, Credential},
    AppError,
};

use crate::support::{FakeLibrary, ADMIN_TOKEN};

#[tokio::test]
async fn test_list_borrow_requests() {
    let user = Uuid::new_v4();
    let fake = FakeLibrary::default().with_pending(user, 7);
    let client = fake.spawn(5).await;

    let requests = client.list_borrow_requests(user).await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].book_id, 7);

    let other = client.list_borrow_requests(Uuid::new_v4()).await.unwrap();
    assert!(other.is_empty());
}

#[tokio::test]
async fn test_duplicate_submission_rejected_with_reason() {
    let user = Uuid::new_v4();
    let fake = FakeLibrary::default().with_pending(user, 7);
    let client = fake.spawn(5).await;

    assert_eq!(
        client.submit_borrow_request(user, 7).await,
        Err(AppError::Validation("You already have a pending request for this book".into()))
    );
    assert_eq!(client.submit_borrow_request(user, 8).await, Ok(()));
}

#[tokio::test]
async fn test_waitlist_positions_and_ok_status_rejection() {
    let fake = FakeLibrary::default();
    let client = fake.spawn(5).await;
    let (first, second) = (Uuid::new_v4(), Uuid::new_v4());

    assert_eq!(client.join_waitlist(first, 3).await.unwrap().position, 1);
    assert_eq!(client.join_waitlist(second, 3).await.unwrap().position, 2);
    assert_eq!(
        client.join_waitlist(first, 3).await,
        Err(AppError::Validation("You are already on the waitlist".into()))
    );
}

#[tokio::test]
async fn test_health_requires_valid_token() {
    let fake = FakeLibrary::default();
    let client = fake.spawn(5).await;

    let bad = Credential::new("wrong").unwrap();
    assert_eq!(client.fetch_health(&bad).await, Err(AppError::Auth));

    let good = Credential::new(ADMIN_TOKEN).unwrap();
    let snapshot = client.fetch_health(&good).await.unwrap();
    assert_eq!(snapshot.system_status.ingestion, ComponentStatus::Running);
    assert_eq!(snapshot.storage_health.used_mb, 2560);
    assert_eq!(snapshot.response_time_ms, Some(14));
}

#[tokio::test]
async fn test_health_server_error_classified() {
    let fake = FakeLibrary::default();
    fake.fail_health_with(StatusCode::SERVICE_UNAVAILABLE);
    let client = fake.spawn(5).await;

    let good = Credential::new(ADMIN_TOKEN).unwrap();
    assert_eq!(
        client.fetch_health(&good).await,
        Err(AppError::Server {
            status: 503,
            message: "Health check failed".into()
        })
    );
}

#[tokio::test]
async fn test_action_messages() {
    let fake = FakeLibrary::default();
    let client = fake.spawn(5).await;
    let good = Credential::new(ADMIN_TOKEN).unwrap();

    assert_eq!(
        client.execute_action(AdminAction::PauseIngestion, &good).await,
        Ok(Some("Ingestion paused".into()))
    );
    assert_eq!(
        client.execute_action(AdminAction::TriggerMaintenance, &good).await,
        Err(AppError::Validation("Maintenance already running".into()))
    );
}

#[tokio::test]
async fn test_timeout_is_network_error() {
    let fake = FakeLibrary::default();
    fake.set_submit_delay(Duration::from_secs(3));
    let client = fake.spawn(1).await;

    let err = client.submit_borrow_request(Uuid::new_v4(), 1).await.unwrap_err();
    assert!(matches!(err, AppError::Network(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let client = elidune_portal::api::ApiClient::new(&elidune_portal::config::ApiConfig {
        // reserved port, nothing listens there
        base_url: "http://127.0.0.1:9/api".to_string(),
        timeout_secs: 2,
    })
    .unwrap();

    let err = client.list_borrow_requests(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::Network(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_search_history_round_trip() {
    let user = Uuid::new_v4();
    let fake = FakeLibrary::default();
    let client = fake.spawn(5).await;

    client.record_search(user, "le petit prince").await.unwrap();
    let history = client.list_search_history(user).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].query, "le petit prince");
}
