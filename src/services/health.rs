//! Admin health monitoring
//!
//! Drives the dashboard through `Idle → Loading → Ready ⇄ Refreshing`, with
//! `Error` only reachable while nothing has been displayed yet. A failed
//! refresh keeps the last good snapshot on screen and reports the failure as
//! transient. Admin actions need confirmation and are never retried; each
//! success is followed by exactly one snapshot fetch.
//!
//! At most one `GET /admin/health` is outstanding at a time, so snapshots are
//! applied in the order they were requested.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::{
    sync::{watch, Notify},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tokio_stream::wrappers::WatchStream;

use crate::{
    api::AdminApi,
    error::{AppError, AppResult},
    models::{AdminAction, Credential, HealthSnapshot},
    services::{
        credentials::CredentialSource,
        scope::{Liveness, ViewScope},
        single_flight::SingleFlight,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    Refreshing,
    Error,
}

impl std::fmt::Display for MonitorPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            MonitorPhase::Idle => "idle",
            MonitorPhase::Loading => "loading",
            MonitorPhase::Ready => "ready",
            MonitorPhase::Refreshing => "refreshing",
            MonitorPhase::Error => "error",
        };
        write!(f, "{}", label)
    }
}

/// Everything the dashboard renders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthView {
    pub phase: MonitorPhase,
    pub snapshot: Option<Arc<HealthSnapshot>>,
    pub last_refreshed: Option<DateTime<Utc>>,
    /// Failure of the initial load (phase `Error`)
    pub error: Option<AppError>,
    /// Failure of a refresh while a snapshot is displayed
    pub transient_error: Option<AppError>,
    pub action_in_progress: Option<AdminAction>,
    pub last_action_message: Option<String>,
}

/// Yes/no gate the operator answers before an admin action is sent
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshStatus {
    Updated,
    /// Another fetch was already running; this call did nothing
    Coalesced,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// Operator said no; nothing was sent
    Declined,
    Executed {
        message: Option<String>,
        /// The follow-up fetch failed; the action itself still happened
        follow_up_error: Option<AppError>,
    },
}

pub struct HealthMonitor {
    api: Arc<dyn AdminApi>,
    credentials: Arc<dyn CredentialSource>,
    scope: ViewScope,
    fetch_slot: FetchSlot,
    actions: SingleFlight<AdminAction>,
    /// Set when the admin token was refused or declined; scheduled refreshes
    /// wait for a manual one so they never open a prompt on their own
    credential_lost: AtomicBool,
    state: watch::Sender<HealthView>,
}

impl HealthMonitor {
    pub fn new(api: Arc<dyn AdminApi>, credentials: Arc<dyn CredentialSource>, scope: ViewScope) -> Self {
        let (state, _) = watch::channel(HealthView::default());
        Self {
            api,
            credentials,
            scope,
            fetch_slot: FetchSlot::default(),
            actions: SingleFlight::new(),
            credential_lost: AtomicBool::new(false),
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<HealthView> {
        self.state.subscribe()
    }

    pub fn updates(&self) -> WatchStream<HealthView> {
        WatchStream::new(self.state.subscribe())
    }

    pub fn view(&self) -> HealthView {
        self.state.borrow().clone()
    }

    /// Tear down the dashboard; the auto-refresh task stops on its next tick
    pub fn teardown(&self) {
        self.scope.close();
    }

    /// First mount
    pub async fn load(&self) -> AppResult<RefreshStatus> {
        self.refresh().await
    }

    /// Manual or scheduled refresh, coalesced with any fetch already running
    pub async fn refresh(&self) -> AppResult<RefreshStatus> {
        let Some(_slot) = self.fetch_slot.try_claim() else {
            tracing::debug!("refresh already in flight, coalescing");
            return Ok(RefreshStatus::Coalesced);
        };

        let liveness = self.scope.liveness();
        self.begin_fetch(&liveness);
        let result = self.fetch_snapshot().await;
        self.apply_fetch(&result, &liveness);
        result.map(|_| RefreshStatus::Updated)
    }

    /// Fetch a snapshot with the current credential.
    ///
    /// A 401 rejects the credential exactly once; the displayed state is
    /// left to the caller.
    pub async fn fetch_snapshot(&self) -> AppResult<HealthSnapshot> {
        let credential = self.resolve_credential().await?;
        match self.api.fetch_health(&credential).await {
            Err(AppError::Auth) => {
                tracing::warn!("Health fetch unauthorized, invalidating admin token");
                self.reject_credential(&credential);
                Err(AppError::Auth)
            }
            Ok(snapshot) => {
                self.credential_lost.store(false, Ordering::Release);
                Ok(snapshot)
            }
            other => other,
        }
    }

    /// Hold scheduled refreshes until the next manual one, e.g. after the
    /// operator logged out
    pub fn suspend_auto_refresh(&self) {
        self.credential_lost.store(true, Ordering::Release);
    }

    /// Run an admin action after confirmation, then reconcile the dashboard
    pub async fn execute_action(&self, action: AdminAction, confirm: &dyn Confirm) -> AppResult<ActionOutcome> {
        let _flight = self
            .actions
            .try_acquire(action)
            .ok_or(AppError::AlreadyInProgress)?;

        if !confirm.confirm(action.confirm_message()).await {
            tracing::info!(%action, "Admin action declined");
            return Ok(ActionOutcome::Declined);
        }

        let credential = self.resolve_credential().await?;
        let liveness = self.scope.liveness();
        self.update(&liveness, |view| {
            view.action_in_progress = Some(action);
            view.last_action_message = None;
        });

        let message = match self.api.execute_action(action, &credential).await {
            Ok(message) => message,
            Err(e) => {
                if e == AppError::Auth {
                    tracing::warn!(%action, "Admin action unauthorized, invalidating admin token");
                    self.reject_credential(&credential);
                } else {
                    tracing::warn!(%action, "Admin action failed: {}", e);
                }
                self.update(&liveness, |view| {
                    view.action_in_progress = None;
                    view.transient_error = Some(e.clone());
                });
                return Err(e);
            }
        };

        tracing::info!(%action, "Admin action executed");
        self.update(&liveness, |view| {
            view.action_in_progress = None;
            view.last_action_message = Some(
                message
                    .clone()
                    .unwrap_or_else(|| format!("{} completed", action.label())),
            );
        });

        // Exactly one follow-up fetch; a refresh already running is waited
        // out rather than joined, since it may predate the action
        let _slot = self.fetch_slot.claim().await;
        self.begin_fetch(&liveness);
        let follow_up = self.fetch_snapshot().await;
        self.apply_fetch(&follow_up, &liveness);

        Ok(ActionOutcome::Executed {
            message,
            follow_up_error: follow_up.err(),
        })
    }

    /// Refresh every `every` until the handle drops or the scope closes
    pub fn spawn_auto_refresh(self: &Arc<Self>, every: Duration) -> AutoRefresh {
        let monitor = Arc::clone(self);
        let liveness = self.scope.liveness();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // first tick fires immediately; the mount already loaded
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if !liveness.is_live() {
                    tracing::debug!("auto refresh stopped, view closed");
                    break;
                }
                if monitor.credential_lost.load(Ordering::Acquire) {
                    tracing::debug!("auto refresh held until the admin token is re-entered");
                    continue;
                }
                if let Err(e) = monitor.refresh().await {
                    tracing::debug!("Scheduled refresh failed: {}", e);
                }
            }
        });

        AutoRefresh { handle }
    }

    async fn resolve_credential(&self) -> AppResult<Credential> {
        let credentials = Arc::clone(&self.credentials);
        // The prompt may block on the terminal
        let resolved = tokio::task::spawn_blocking(move || credentials.resolve())
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Credential prompt aborted: {}", e);
                None
            });
        resolved.ok_or_else(|| {
            self.credential_lost.store(true, Ordering::Release);
            AppError::NotAuthenticated
        })
    }

    fn reject_credential(&self, credential: &Credential) {
        self.credential_lost.store(true, Ordering::Release);
        self.credentials.reject(credential);
    }

    fn begin_fetch(&self, liveness: &Liveness) {
        self.update(liveness, |view| {
            view.phase = if view.snapshot.is_some() {
                MonitorPhase::Refreshing
            } else {
                MonitorPhase::Loading
            };
        });
    }

    fn apply_fetch(&self, result: &AppResult<HealthSnapshot>, liveness: &Liveness) {
        self.update(liveness, |view| match result {
            Ok(snapshot) => {
                view.phase = MonitorPhase::Ready;
                view.snapshot = Some(Arc::new(snapshot.clone()));
                view.last_refreshed = Some(Utc::now());
                view.error = None;
                view.transient_error = None;
            }
            Err(e) if view.snapshot.is_some() => {
                view.phase = MonitorPhase::Ready;
                view.transient_error = Some(e.clone());
            }
            Err(e) => {
                view.phase = MonitorPhase::Error;
                view.error = Some(e.clone());
            }
        });

        match result {
            Ok(_) => tracing::debug!("Health snapshot updated"),
            Err(e) => tracing::warn!("Health snapshot fetch failed: {}", e),
        }
    }

    fn update(&self, liveness: &Liveness, f: impl FnOnce(&mut HealthView)) {
        if !liveness.is_live() {
            tracing::debug!("discarding stale health result");
            return;
        }
        self.state.send_modify(f);
    }
}

/// One health fetch at a time
#[derive(Default)]
struct FetchSlot {
    busy: AtomicBool,
    released: Notify,
}

impl FetchSlot {
    fn try_claim(&self) -> Option<SlotClaim<'_>> {
        if self.busy.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(SlotClaim(self))
    }

    /// Wait for the running fetch, if any, to settle
    async fn claim(&self) -> SlotClaim<'_> {
        loop {
            let released = self.released.notified();
            if let Some(claim) = self.try_claim() {
                return claim;
            }
            released.await;
        }
    }
}

struct SlotClaim<'a>(&'a FetchSlot);

impl Drop for SlotClaim<'_> {
    fn drop(&mut self) {
        self.0.busy.store(false, Ordering::Release);
        self.0.released.notify_waiters();
    }
}

/// Scheduled refresh task; aborted on drop
pub struct AutoRefresh {
    handle: JoinHandle<()>,
}

impl AutoRefresh {
    pub fn stop(self) {}

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
