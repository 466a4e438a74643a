//! Waitlist endpoint

use crate::{
    error::{AppError, AppResult},
    models::{
        borrow_request::{BookId, CreateBorrowRequest, UserId},
        waitlist::{JoinWaitlistResponse, WaitlistEntry},
    },
};

use super::ApiClient;

impl ApiClient {
    /// `POST /waitlist/join`
    pub async fn join_book_waitlist(&self, user_id: UserId, book_id: BookId) -> AppResult<WaitlistEntry> {
        let body = CreateBorrowRequest { user_id, book_id };
        let response: JoinWaitlistResponse = self.post_json("/waitlist/join", &body, None).await?;

        match response {
            JoinWaitlistResponse { success: true, position: Some(position), .. } => Ok(WaitlistEntry {
                user_id,
                book_id,
                position,
            }),
            JoinWaitlistResponse { success: true, position: None, .. } => Err(AppError::Server {
                status: 200,
                message: "Waitlist response is missing a position".to_string(),
            }),
            JoinWaitlistResponse { error, .. } => Err(AppError::Validation(
                error.unwrap_or_else(|| "Could not join the waitlist".to_string()),
            )),
        }
    }
}
