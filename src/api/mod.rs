//! REST client for the library API
//!
//! `ApiClient` wraps one `reqwest::Client` with the configured timeout. The
//! coordinators only see the [`PatronApi`], [`AdminApi`] and
//! [`SearchHistoryApi`] traits, so tests can swap the network out.

pub mod borrow_requests;
pub mod classify;
pub mod health;
pub mod search_history;
pub mod waitlist;

use std::time::Instant;

use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::ApiConfig,
    error::{AppError, AppResult},
    models::{
        AdminAction, BookId, BorrowRequest, Credential, HealthSnapshot, SearchHistoryEntry,
        UserId, WaitlistEntry,
    },
};

/// Patron-facing endpoints used by the borrow coordinator
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PatronApi: Send + Sync {
    async fn list_borrow_requests(&self, user_id: UserId) -> AppResult<Vec<BorrowRequest>>;

    async fn submit_borrow_request(&self, user_id: UserId, book_id: BookId) -> AppResult<()>;

    async fn join_waitlist(&self, user_id: UserId, book_id: BookId) -> AppResult<WaitlistEntry>;
}

/// Admin endpoints; every call carries a bearer credential
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AdminApi: Send + Sync {
    async fn fetch_health(&self, credential: &Credential) -> AppResult<HealthSnapshot>;

    /// Returns the server's optional status message
    async fn execute_action(
        &self,
        action: AdminAction,
        credential: &Credential,
    ) -> AppResult<Option<String>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchHistoryApi: Send + Sync {
    async fn list_search_history(&self, user_id: UserId) -> AppResult<Vec<SearchHistoryEntry>>;

    async fn record_search(&self, user_id: UserId, query: &str) -> AppResult<()>;
}

/// HTTP client bound to one API base URL
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, credential: Option<&Credential>) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match credential {
            Some(credential) => builder.header(AUTHORIZATION, credential.bearer()),
            None => builder,
        }
    }

    /// Send a request, logging latency; transport failures are classified here
    async fn send(&self, builder: RequestBuilder, method: &Method, path: &str) -> AppResult<Response> {
        let started = Instant::now();
        match builder.send().await {
            Ok(response) => {
                let status = response.status();
                let latency_ms = started.elapsed().as_millis() as u64;
                if status.is_success() {
                    tracing::debug!(%method, path, %status, latency_ms, "request completed");
                } else {
                    tracing::warn!(%method, path, %status, latency_ms, "request failed");
                }
                Ok(response)
            }
            Err(e) => {
                tracing::warn!(%method, path, error = %e, "request did not complete");
                Err(classify::classify_transport(&e))
            }
        }
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        credential: Option<&Credential>,
    ) -> AppResult<T> {
        let builder = self.request(Method::GET, path, credential);
        let response = self.send(builder, &Method::GET, path).await?;
        classify::decode(response).await
    }

    pub(crate) async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        credential: Option<&Credential>,
    ) -> AppResult<T> {
        let builder = self.request(Method::POST, path, credential).json(body);
        let response = self.send(builder, &Method::POST, path).await?;
        classify::decode(response).await
    }
}

#[async_trait]
impl PatronApi for ApiClient {
    async fn list_borrow_requests(&self, user_id: UserId) -> AppResult<Vec<BorrowRequest>> {
        self.get_user_borrow_requests(user_id).await
    }

    async fn submit_borrow_request(&self, user_id: UserId, book_id: BookId) -> AppResult<()> {
        self.create_borrow_request(user_id, book_id).await
    }

    async fn join_waitlist(&self, user_id: UserId, book_id: BookId) -> AppResult<WaitlistEntry> {
        self.join_book_waitlist(user_id, book_id).await
    }
}

#[async_trait]
impl AdminApi for ApiClient {
    async fn fetch_health(&self, credential: &Credential) -> AppResult<HealthSnapshot> {
        self.get_health_snapshot(credential).await
    }

    async fn execute_action(
        &self,
        action: AdminAction,
        credential: &Credential,
    ) -> AppResult<Option<String>> {
        self.post_health_action(action, credential).await
    }
}

#[async_trait]
impl SearchHistoryApi for ApiClient {
    async fn list_search_history(&self, user_id: UserId) -> AppResult<Vec<SearchHistoryEntry>> {
        self.get_search_history(user_id).await
    }

    async fn record_search(&self, user_id: UserId, query: &str) -> AppResult<()> {
        self.post_search_history(user_id, query).await
    }
}
