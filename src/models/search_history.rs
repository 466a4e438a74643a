//! Catalog search history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::borrow_request::UserId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryEntry {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub user_id: UserId,
    pub query: String,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /search-history`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSearch {
    pub user_id: UserId,
    pub query: String,
}
