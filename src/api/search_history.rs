//! Search history endpoints

use crate::{
    error::AppResult,
    models::{
        borrow_request::{MutationResponse, UserId},
        search_history::{RecordSearch, SearchHistoryEntry},
    },
};

use super::{borrow_requests::into_result, ApiClient};

impl ApiClient {
    /// `GET /search-history/{userId}`
    pub async fn get_search_history(&self, user_id: UserId) -> AppResult<Vec<SearchHistoryEntry>> {
        self.get_json(&format!("/search-history/{}", user_id), None)
            .await
    }

    /// `POST /search-history`
    pub async fn post_search_history(&self, user_id: UserId, query: &str) -> AppResult<()> {
        let body = RecordSearch {
            user_id,
            query: query.to_string(),
        };
        let response: MutationResponse = self.post_json("/search-history", &body, None).await?;
        into_result(response, "Search could not be recorded")
    }
}
