//! Borrow request endpoints

use crate::{
    error::{AppError, AppResult},
    models::borrow_request::{BookId, BorrowRequest, CreateBorrowRequest, MutationResponse, UserId},
};

use super::ApiClient;

impl ApiClient {
    /// `GET /borrow-requests/{userId}`: every request the user ever made
    pub async fn get_user_borrow_requests(&self, user_id: UserId) -> AppResult<Vec<BorrowRequest>> {
        self.get_json(&format!("/borrow-requests/{}", user_id), None)
            .await
    }

    /// `POST /borrow-requests`
    pub async fn create_borrow_request(&self, user_id: UserId, book_id: BookId) -> AppResult<()> {
        let body = CreateBorrowRequest { user_id, book_id };
        let response: MutationResponse = self.post_json("/borrow-requests", &body, None).await?;
        into_result(response, "Borrow request was rejected")
    }
}

/// A 2xx `{ success: false }` is still a rejection
pub(crate) fn into_result(response: MutationResponse, fallback: &str) -> AppResult<()> {
    if response.success {
        Ok(())
    } else {
        Err(AppError::Validation(
            response.error.unwrap_or_else(|| fallback.to_string()),
        ))
    }
}
