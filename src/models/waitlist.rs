//! Waitlist entry model

use serde::{Deserialize, Serialize};

use super::borrow_request::{BookId, UserId};

/// Position on a book's waitlist, assigned by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistEntry {
    pub user_id: UserId,
    pub book_id: BookId,
    pub position: u32,
}

/// `{ success, position, error? }` returned by `POST /waitlist/join`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JoinWaitlistResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub error: Option<String>,
}
