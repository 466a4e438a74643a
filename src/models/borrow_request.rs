//! Borrow request model and related wire types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;
pub type BookId = i32;

/// Status of a borrow request, owned by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorrowStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for BorrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            BorrowStatus::Pending => "pending",
            BorrowStatus::Approved => "approved",
            BorrowStatus::Rejected => "rejected",
        };
        write!(f, "{}", label)
    }
}

/// Borrow request as returned by `GET /borrow-requests/{userId}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
    pub id: Uuid,
    pub user_id: UserId,
    pub book_id: BookId,
    pub status: BorrowStatus,
    pub created_at: DateTime<Utc>,
}

impl BorrowRequest {
    pub fn is_pending_for(&self, book_id: BookId) -> bool {
        self.status == BorrowStatus::Pending && self.book_id == book_id
    }
}

/// Body of `POST /borrow-requests` and `POST /waitlist/join`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBorrowRequest {
    pub user_id: UserId,
    pub book_id: BookId,
}

/// `{ success, error? }` envelope used by the mutation endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MutationResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Whether any of `requests` is a pending request for `book_id`
pub fn has_pending(requests: &[BorrowRequest], book_id: BookId) -> bool {
    requests.iter().any(|r| r.is_pending_for(book_id))
}
