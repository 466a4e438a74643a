//! In-process fake of the library API

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use elidune_portal::{
    api::ApiClient,
    config::ApiConfig,
    models::{
        borrow_request::CreateBorrowRequest, BookId, BorrowRequest, BorrowStatus, SearchHistoryEntry,
        UserId,
    },
};

pub const ADMIN_TOKEN: &str = "secret-admin-token";

#[derive(Default)]
struct Inner {
    requests: Mutex<Vec<BorrowRequest>>,
    waitlist: Mutex<Vec<(UserId, BookId)>>,
    searches: Mutex<Vec<SearchHistoryEntry>>,
    ingestion_paused: Mutex<bool>,
    health_status: Mutex<Option<StatusCode>>,
    submit_delay: Mutex<Option<Duration>>,
    submit_calls: AtomicUsize,
    health_calls: AtomicUsize,
    action_calls: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct FakeLibrary {
    inner: Arc<Inner>,
}

impl FakeLibrary {
    pub fn with_pending(self, user_id: UserId, book_id: BookId) -> Self {
        self.inner.requests.lock().unwrap().push(BorrowRequest {
            id: Uuid::new_v4(),
            user_id,
            book_id,
            status: BorrowStatus::Pending,
            created_at: Utc::now(),
        });
        self
    }

    pub fn set_submit_delay(&self, delay: Duration) {
        *self.inner.submit_delay.lock().unwrap() = Some(delay);
    }

    pub fn fail_health_with(&self, status: StatusCode) {
        *self.inner.health_status.lock().unwrap() = Some(status);
    }

    pub fn reject(&self, user_id: UserId, book_id: BookId) {
        for request in self.inner.requests.lock().unwrap().iter_mut() {
            if request.user_id == user_id && request.book_id == book_id {
                request.status = BorrowStatus::Rejected;
            }
        }
    }

    pub fn submit_calls(&self) -> usize {
        self.inner.submit_calls.load(Ordering::SeqCst)
    }

    pub fn health_calls(&self) -> usize {
        self.inner.health_calls.load(Ordering::SeqCst)
    }

    pub fn action_calls(&self) -> usize {
        self.inner.action_calls.load(Ordering::SeqCst)
    }

    /// Serve on an ephemeral port and return a client pointed at it
    pub async fn spawn(&self, timeout_secs: u64) -> ApiClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake library");
        let addr = listener.local_addr().unwrap();
        let app = router(self.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        ApiClient::new(&ApiConfig {
            base_url: format!("http://{}/api", addr),
            timeout_secs,
        })
        .unwrap()
    }
}

fn router(fake: FakeLibrary) -> Router {
    let api = Router::new()
        .route("/borrow-requests", post(submit_request))
        .route("/borrow-requests/:user_id", get(list_requests))
        .route("/waitlist/join", post(join_waitlist))
        .route("/admin/health", get(health))
        .route("/admin/health/actions", post(health_action))
        .route("/search-history", post(record_search))
        .route("/search-history/:user_id", get(search_history))
        .with_state(fake);

    Router::new().nest("/api", api)
}

async fn list_requests(State(fake): State<FakeLibrary>, Path(user_id): Path<Uuid>) -> Json<Vec<BorrowRequest>> {
    let requests = fake.inner.requests.lock().unwrap();
    Json(requests.iter().filter(|r| r.user_id == user_id).cloned().collect())
}

async fn submit_request(State(fake): State<FakeLibrary>, Json(body): Json<CreateBorrowRequest>) -> Response {
    fake.inner.submit_calls.fetch_add(1, Ordering::SeqCst);
    let delay = *fake.inner.submit_delay.lock().unwrap();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut requests = fake.inner.requests.lock().unwrap();
    let duplicate = requests
        .iter()
        .any(|r| r.user_id == body.user_id && r.book_id == body.book_id && r.status == BorrowStatus::Pending);
    if duplicate {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "success": false, "error": "You already have a pending request for this book" })),
        )
            .into_response();
    }

    requests.push(BorrowRequest {
        id: Uuid::new_v4(),
        user_id: body.user_id,
        book_id: body.book_id,
        status: BorrowStatus::Pending,
        created_at: Utc::now(),
    });
    Json(json!({ "success": true })).into_response()
}

async fn join_waitlist(State(fake): State<FakeLibrary>, Json(body): Json<CreateBorrowRequest>) -> Json<serde_json::Value> {
    let mut waitlist = fake.inner.waitlist.lock().unwrap();
    let pair = (body.user_id, body.book_id);
    if waitlist.contains(&pair) {
        // the real API reports this with a 200
        return Json(json!({ "success": false, "error": "You are already on the waitlist" }));
    }
    waitlist.push(pair);
    let position = waitlist.iter().filter(|(_, book)| *book == body.book_id).count();
    Json(json!({ "success": true, "position": position }))
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", ADMIN_TOKEN))
        .unwrap_or(false)
}

async fn health(State(fake): State<FakeLibrary>, headers: HeaderMap) -> Response {
    fake.inner.health_calls.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Invalid admin token" }))).into_response();
    }
    let forced = *fake.inner.health_status.lock().unwrap();
    if let Some(status) = forced {
        return (status, Json(json!({ "message": "Health check failed" }))).into_response();
    }

    let paused = *fake.inner.ingestion_paused.lock().unwrap();
    let ingestion = if paused { "paused" } else { "running" };
    Json(json!({
        "systemStatus": {
            "api": "healthy",
            "database": "healthy",
            "ingestion": ingestion,
            "storage": "healthy"
        },
        "dailyMetrics": { "booksAdded": 12, "searches": 340, "borrowRequests": 8, "activeUsers": 51 },
        "ingestionProgress": { "processed": 120, "total": 480, "currentSource": "gutenberg" },
        "storageHealth": { "usedMb": 2560, "totalMb": 10240 },
        "errorSummary": { "last24h": 2, "critical": 0, "recent": [] },
        "timestamp": Utc::now(),
        "responseTimeMs": 14
    }))
    .into_response()
}

#[derive(Deserialize)]
struct ActionBody {
    action: String,
}

async fn health_action(State(fake): State<FakeLibrary>, headers: HeaderMap, Json(body): Json<ActionBody>) -> Response {
    fake.inner.action_calls.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Invalid admin token" }))).into_response();
    }

    let message = match body.action.as_str() {
        "pause_ingestion" => {
            *fake.inner.ingestion_paused.lock().unwrap() = true;
            "Ingestion paused"
        }
        "resume_ingestion" => {
            *fake.inner.ingestion_paused.lock().unwrap() = false;
            "Ingestion resumed"
        }
        "trigger_maintenance" => {
            return (StatusCode::CONFLICT, Json(json!({ "message": "Maintenance already running" })))
                .into_response();
        }
        _ => "Action accepted",
    };
    Json(json!({ "success": true, "message": message })).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchBody {
    user_id: Uuid,
    query: String,
}

async fn record_search(State(fake): State<FakeLibrary>, Json(body): Json<SearchBody>) -> Json<serde_json::Value> {
    fake.inner.searches.lock().unwrap().push(SearchHistoryEntry {
        id: Some(Uuid::new_v4()),
        user_id: body.user_id,
        query: body.query,
        created_at: Utc::now(),
    });
    Json(json!({ "success": true }))
}

async fn search_history(State(fake): State<FakeLibrary>, Path(user_id): Path<Uuid>) -> Json<Vec<SearchHistoryEntry>> {
    let searches = fake.inner.searches.lock().unwrap();
    Json(searches.iter().filter(|s| s.user_id == user_id).cloned().collect())
}

