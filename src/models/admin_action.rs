//! Administrative control actions sent to `POST /admin/health/actions`

use serde::{Deserialize, Serialize};

/// A named operation on the library backend.
///
/// Represents intent only; nothing about it is stored client-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    TriggerIngestion,
    PauseIngestion,
    ResumeIngestion,
    TriggerMaintenance,
    ClearCache,
    RebuildSearchIndex,
}

impl AdminAction {
    pub const ALL: [AdminAction; 6] = [
        AdminAction::TriggerIngestion,
        AdminAction::PauseIngestion,
        AdminAction::ResumeIngestion,
        AdminAction::TriggerMaintenance,
        AdminAction::ClearCache,
        AdminAction::RebuildSearchIndex,
    ];

    /// Wire name, as sent in `{ "action": ... }`
    pub fn name(&self) -> &'static str {
        match self {
            AdminAction::TriggerIngestion => "trigger_ingestion",
            AdminAction::PauseIngestion => "pause_ingestion",
            AdminAction::ResumeIngestion => "resume_ingestion",
            AdminAction::TriggerMaintenance => "trigger_maintenance",
            AdminAction::ClearCache => "clear_cache",
            AdminAction::RebuildSearchIndex => "rebuild_search_index",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AdminAction::TriggerIngestion => "Trigger Ingestion",
            AdminAction::PauseIngestion => "Pause Ingestion",
            AdminAction::ResumeIngestion => "Resume Ingestion",
            AdminAction::TriggerMaintenance => "Run Maintenance",
            AdminAction::ClearCache => "Clear Cache",
            AdminAction::RebuildSearchIndex => "Rebuild Search Index",
        }
    }

    /// Question the operator must answer yes to before the action is sent
    pub fn confirm_message(&self) -> &'static str {
        match self {
            AdminAction::TriggerIngestion => {
                "Start a new ingestion run now? This may take several minutes."
            }
            AdminAction::PauseIngestion => {
                "Pause ingestion? New books will not be imported until it is resumed."
            }
            AdminAction::ResumeIngestion => "Resume the paused ingestion pipeline?",
            AdminAction::TriggerMaintenance => {
                "Run maintenance now? Search may be slower while it runs."
            }
            AdminAction::ClearCache => "Clear all caches? The next requests will be slower.",
            AdminAction::RebuildSearchIndex => {
                "Rebuild the search index? Results may be incomplete until it finishes."
            }
        }
    }

    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            AdminAction::PauseIngestion | AdminAction::ClearCache | AdminAction::RebuildSearchIndex
        )
    }
}

impl std::str::FromStr for AdminAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AdminAction::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| format!("unknown admin action: {}", s))
    }
}

impl std::fmt::Display for AdminAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Body of `POST /admin/health/actions`
#[derive(Debug, Clone, Serialize)]
pub struct ActionRequest {
    pub action: AdminAction,
}

/// Response of `POST /admin/health/actions`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}
