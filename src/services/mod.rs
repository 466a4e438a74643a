//! Request-state coordinators and their supporting pieces

pub mod borrow;
pub mod credentials;
pub mod health;
pub mod scope;
pub mod search_history;
pub mod single_flight;

use std::sync::Arc;

use crate::{api::ApiClient, config::AppConfig, error::AppResult};

use self::credentials::{CredentialProvider, FileTokenStore, TokenPrompt};

/// Container for all coordinators, wired to one API client
#[derive(Clone)]
pub struct Services {
    pub borrow: Arc<borrow::BorrowRequestCoordinator>,
    pub health: Arc<health::HealthMonitor>,
    pub search_history: search_history::SearchHistoryService,
    pub credentials: Arc<CredentialProvider>,
}

impl Services {
    /// Create all coordinators from configuration
    pub fn new(config: &AppConfig, prompt: impl TokenPrompt + 'static) -> AppResult<Self> {
        let client = Arc::new(ApiClient::new(&config.api)?);
        let credentials = Arc::new(CredentialProvider::new(
            FileTokenStore::new(&config.credentials.token_path),
            prompt,
        ));

        Ok(Self {
            borrow: Arc::new(borrow::BorrowRequestCoordinator::new(
                client.clone(),
                scope::ViewScope::new(),
            )),
            health: Arc::new(health::HealthMonitor::new(
                client.clone(),
                credentials.clone(),
                scope::ViewScope::new(),
            )),
            search_history: search_history::SearchHistoryService::new(client),
            credentials,
        })
    }
}
