//! Admin health endpoints

use crate::{
    error::{AppError, AppResult},
    models::{
        admin_action::{ActionRequest, ActionResponse},
        AdminAction, Credential, HealthSnapshot,
    },
};

use super::ApiClient;

impl ApiClient {
    /// `GET /admin/health`
    pub async fn get_health_snapshot(&self, credential: &Credential) -> AppResult<HealthSnapshot> {
        self.get_json("/admin/health", Some(credential)).await
    }

    /// `POST /admin/health/actions`
    pub async fn post_health_action(
        &self,
        action: AdminAction,
        credential: &Credential,
    ) -> AppResult<Option<String>> {
        let response: ActionResponse = self
            .post_json("/admin/health/actions", &ActionRequest { action }, Some(credential))
            .await?;

        if response.success == Some(false) {
            return Err(AppError::Validation(
                response
                    .message
                    .unwrap_or_else(|| format!("Action {} failed", action)),
            ));
        }
        Ok(response.message)
    }
}
