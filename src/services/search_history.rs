//! Patron search history

use std::sync::Arc;

use crate::{
    api::SearchHistoryApi,
    error::{AppError, AppResult},
    models::{SearchHistoryEntry, UserId},
};

#[derive(Clone)]
pub struct SearchHistoryService {
    api: Arc<dyn SearchHistoryApi>,
}

impl SearchHistoryService {
    pub fn new(api: Arc<dyn SearchHistoryApi>) -> Self {
        Self { api }
    }

    /// Record a catalog search; blank queries are ignored
    pub async fn record(&self, user_id: Option<UserId>, query: &str) -> AppResult<()> {
        let user_id = user_id.ok_or(AppError::NotAuthenticated)?;
        let query = query.trim();
        if query.is_empty() {
            return Ok(());
        }
        self.api.record_search(user_id, query).await
    }

    /// Most recent searches first
    pub async fn list(&self, user_id: Option<UserId>) -> AppResult<Vec<SearchHistoryEntry>> {
        let user_id = user_id.ok_or(AppError::NotAuthenticated)?;
        let mut entries = self.api.list_search_history(user_id).await?;
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }
}
