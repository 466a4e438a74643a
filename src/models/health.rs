//! Operational health snapshot returned by `GET /admin/health`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// ComponentStatus
// ---------------------------------------------------------------------------

/// Status reported for one subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Down,
    Paused,
    Running,
    Idle,
    #[default]
    Unknown,
}

impl From<&str> for ComponentStatus {
    fn from(v: &str) -> Self {
        match v.to_ascii_lowercase().as_str() {
            "healthy" | "ok" | "up" => ComponentStatus::Healthy,
            "degraded" | "warning" => ComponentStatus::Degraded,
            "down" | "error" | "unhealthy" => ComponentStatus::Down,
            "paused" => ComponentStatus::Paused,
            "running" | "active" => ComponentStatus::Running,
            "idle" => ComponentStatus::Idle,
            _ => ComponentStatus::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for ComponentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ComponentStatus::from(raw.as_str()))
    }
}

impl std::fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ComponentStatus::Healthy => "healthy",
            ComponentStatus::Degraded => "degraded",
            ComponentStatus::Down => "down",
            ComponentStatus::Paused => "paused",
            ComponentStatus::Running => "running",
            ComponentStatus::Idle => "idle",
            ComponentStatus::Unknown => "unknown",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemStatus {
    pub api: ComponentStatus,
    pub database: ComponentStatus,
    pub ingestion: ComponentStatus,
    pub storage: ComponentStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyMetrics {
    pub books_added: u64,
    pub searches: u64,
    pub borrow_requests: u64,
    pub active_users: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IngestionProgress {
    pub processed: u64,
    pub total: u64,
    pub current_source: Option<String>,
    pub last_run_at: Option<DateTime<Utc>>,
}

impl IngestionProgress {
    /// Completion percentage, 0 when nothing is queued
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let pct = self.processed.saturating_mul(100) / self.total;
        pct.min(100) as u8
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageHealth {
    pub used_mb: u64,
    pub total_mb: u64,
    pub free_mb: Option<u64>,
}

impl StorageHealth {
    pub fn usage_percent(&self) -> u8 {
        if self.total_mb == 0 {
            return 0;
        }
        (self.used_mb.saturating_mul(100) / self.total_mb).min(100) as u8
    }

    pub fn free(&self) -> u64 {
        self.free_mb
            .unwrap_or_else(|| self.total_mb.saturating_sub(self.used_mb))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    pub message: String,
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorSummary {
    pub last24h: u64,
    pub critical: u64,
    pub recent: Vec<ErrorEntry>,
}

/// Point-in-time view of the library's operational state.
///
/// Replaced wholesale on every successful fetch, never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    #[serde(default)]
    pub system_status: SystemStatus,
    #[serde(default)]
    pub daily_metrics: DailyMetrics,
    #[serde(default)]
    pub ingestion_progress: IngestionProgress,
    #[serde(default)]
    pub storage_health: StorageHealth,
    #[serde(default)]
    pub error_summary: ErrorSummary,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub response_time_ms: Option<u64>,
}

/// Format a size in megabytes: MB below 1024, GB with one decimal from 1024 up
pub fn format_storage_size(mb: u64) -> String {
    if mb < 1024 {
        format!("{} MB", mb)
    } else {
        format!("{:.1} GB", mb as f64 / 1024.0)
    }
}
