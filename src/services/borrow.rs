//! Borrow request coordination
//!
//! Tracks a patron's relationship to each book they look at: whether a
//! pending request already exists, whether a submission is running, and the
//! last waitlist position the server handed out. The server stays
//! authoritative; the local `pending` flag is only a hint until the next
//! full list fetch overwrites it.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use tokio::sync::watch;

use crate::{
    api::PatronApi,
    error::{AppError, AppResult},
    models::{borrow_request::has_pending, BookId, BorrowRequest, UserId, WaitlistEntry},
    services::{
        scope::{Liveness, ViewScope},
        single_flight::SingleFlight,
    },
};

/// Progress of the "does a pending request exist" check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingCheck {
    #[default]
    NotChecked,
    /// Request in flight; the borrow control must stay disabled
    Checking,
    Resolved,
    /// Check failed; treated as "no pending request"
    Unknown,
}

/// Presentation state for one (user, book) pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BorrowView {
    pub check: PendingCheck,
    pub pending: bool,
    pub submitting: bool,
    pub joining_waitlist: bool,
    pub waitlist_position: Option<u32>,
    pub last_error: Option<AppError>,
}

impl BorrowView {
    pub fn can_borrow(&self) -> bool {
        matches!(self.check, PendingCheck::Resolved | PendingCheck::Unknown)
            && !self.pending
            && !self.submitting
            && !self.joining_waitlist
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PairKey {
    user_id: UserId,
    book_id: BookId,
}

struct PairState {
    view: watch::Sender<BorrowView>,
    /// Tick of the last accepted submission; list fetches started earlier
    /// must not clear its optimistic flag
    submitted_at: u64,
}

impl PairState {
    fn new() -> Self {
        Self {
            view: watch::channel(BorrowView::default()).0,
            submitted_at: 0,
        }
    }
}

/// A user's request list as fetched at tick `started`
#[derive(Debug, Clone)]
struct ListOutcome {
    started: u64,
    result: AppResult<Vec<BorrowRequest>>,
}

type ListFlights = Mutex<HashMap<UserId, watch::Receiver<Option<ListOutcome>>>>;

pub struct BorrowRequestCoordinator {
    api: Arc<dyn PatronApi>,
    scope: ViewScope,
    flights: SingleFlight<PairKey>,
    views: Mutex<HashMap<PairKey, PairState>>,
    lists: ListFlights,
    clock: AtomicU64,
}

impl BorrowRequestCoordinator {
    pub fn new(api: Arc<dyn PatronApi>, scope: ViewScope) -> Self {
        Self {
            api,
            scope,
            flights: SingleFlight::new(),
            views: Mutex::new(HashMap::new()),
            lists: Mutex::new(HashMap::new()),
            clock: AtomicU64::new(0),
        }
    }

    /// Tear down: results still in flight are discarded when they land
    pub fn teardown(&self) {
        self.scope.close();
    }

    pub fn subscribe(&self, user_id: UserId, book_id: BookId) -> watch::Receiver<BorrowView> {
        let key = PairKey { user_id, book_id };
        self.views()
            .entry(key)
            .or_insert_with(PairState::new)
            .view
            .subscribe()
    }

    pub fn view(&self, user_id: UserId, book_id: BookId) -> BorrowView {
        let key = PairKey { user_id, book_id };
        self.views()
            .get(&key)
            .map(|pair| pair.view.borrow().clone())
            .unwrap_or_default()
    }

    /// Whether the user has a pending request for the book.
    ///
    /// Failures resolve to `false` without surfacing an error, so a flaky
    /// network never leaves the borrow control stuck. Concurrent checks for
    /// the same user share one list fetch.
    pub async fn has_pending_request(&self, user_id: Option<UserId>, book_id: BookId) -> bool {
        let Some(user_id) = user_id else {
            return false;
        };
        let key = PairKey { user_id, book_id };
        let liveness = self.scope.liveness();

        self.update(key, &liveness, |view| view.check = PendingCheck::Checking);

        let ListOutcome { started, result } = self.list_requests(user_id, &liveness).await;
        match result {
            Ok(requests) => {
                let on_server = has_pending(&requests, book_id);
                let mut pending = on_server;
                self.with_pair(key, &liveness, |pair| {
                    let superseded = pair.submitted_at > started;
                    pair.view.send_modify(|view| {
                        if !superseded {
                            view.pending = on_server;
                        }
                        view.check = PendingCheck::Resolved;
                        pending = view.pending;
                    });
                });
                tracing::debug!(%user_id, book_id, pending, "pending check resolved");
                pending
            }
            Err(e) => {
                tracing::warn!(%user_id, book_id, "Pending request check failed: {}", e);
                self.update(key, &liveness, |view| view.check = PendingCheck::Unknown);
                false
            }
        }
    }

    /// Re-fetch the user's requests and overwrite every local pending flag
    pub async fn refresh_requests(&self, user_id: Option<UserId>) -> AppResult<Vec<BorrowRequest>> {
        let user_id = user_id.ok_or(AppError::NotAuthenticated)?;
        let liveness = self.scope.liveness();

        self.list_requests(user_id, &liveness).await.result
    }

    pub async fn submit_borrow_request(&self, user_id: Option<UserId>, book_id: BookId) -> AppResult<()> {
        let user_id = user_id.ok_or(AppError::NotAuthenticated)?;
        let key = PairKey { user_id, book_id };
        let _flight = self
            .flights
            .try_acquire(key)
            .ok_or(AppError::AlreadyInProgress)?;
        let liveness = self.scope.liveness();

        self.update(key, &liveness, |view| {
            view.submitting = true;
            view.last_error = None;
        });

        let result = self.api.submit_borrow_request(user_id, book_id).await;

        match &result {
            Ok(()) => {
                tracing::info!(%user_id, book_id, "Borrow request submitted");
                let submitted_at = self.tick();
                self.with_pair(key, &liveness, |pair| {
                    pair.submitted_at = submitted_at;
                    pair.view.send_modify(|view| {
                        view.submitting = false;
                        view.pending = true;
                    });
                });
            }
            Err(e) => {
                tracing::warn!(%user_id, book_id, "Borrow request failed: {}", e);
                self.update(key, &liveness, |view| {
                    view.submitting = false;
                    view.last_error = Some(e.clone());
                });
            }
        }

        result
    }

    pub async fn join_waitlist(&self, user_id: Option<UserId>, book_id: BookId) -> AppResult<WaitlistEntry> {
        let user_id = user_id.ok_or(AppError::NotAuthenticated)?;
        let key = PairKey { user_id, book_id };
        let _flight = self
            .flights
            .try_acquire(key)
            .ok_or(AppError::AlreadyInProgress)?;
        let liveness = self.scope.liveness();

        self.update(key, &liveness, |view| {
            view.joining_waitlist = true;
            view.last_error = None;
        });

        let result = self.api.join_waitlist(user_id, book_id).await;

        match &result {
            Ok(entry) => {
                tracing::info!(%user_id, book_id, position = entry.position, "Joined waitlist");
                let position = entry.position;
                self.update(key, &liveness, |view| {
                    view.joining_waitlist = false;
                    view.waitlist_position = Some(position);
                });
            }
            Err(e) => {
                tracing::warn!(%user_id, book_id, "Joining waitlist failed: {}", e);
                self.update(key, &liveness, |view| {
                    view.joining_waitlist = false;
                    view.last_error = Some(e.clone());
                });
            }
        }

        result
    }

    /// Fetch the user's request list, joining a fetch already in flight
    /// for that user instead of issuing a second one
    async fn list_requests(&self, user_id: UserId, liveness: &Liveness) -> ListOutcome {
        loop {
            let joined = {
                let mut lists = lock(&self.lists);
                match lists.get(&user_id) {
                    Some(rx) => Err(rx.clone()),
                    None => {
                        let (tx, rx) = watch::channel(None);
                        lists.insert(user_id, rx);
                        Ok(ListLead {
                            lists: &self.lists,
                            user_id,
                            tx,
                            registered: true,
                        })
                    }
                }
            };

            match joined {
                Ok(lead) => {
                    let started = self.tick();
                    let result = self.api.list_borrow_requests(user_id).await;
                    if let Ok(requests) = &result {
                        self.apply_authoritative(user_id, requests, started, liveness);
                    }
                    let outcome = ListOutcome { started, result };
                    lead.finish(outcome.clone());
                    return outcome;
                }
                Err(mut rx) => {
                    tracing::debug!(%user_id, "joining request list fetch in flight");
                    if let Ok(landed) = rx.wait_for(Option::is_some).await {
                        if let Some(outcome) = &*landed {
                            return outcome.clone();
                        }
                    }
                    // the fetching caller was cancelled; fetch ourselves
                }
            }
        }
    }

    /// Overwrite pending flags of every tracked pair of `user_id`, except
    /// pairs submitted after the list was requested
    fn apply_authoritative(&self, user_id: UserId, requests: &[BorrowRequest], started: u64, liveness: &Liveness) {
        if !liveness.is_live() {
            tracing::debug!(%user_id, "discarding stale request list");
            return;
        }
        for (key, pair) in self.views().iter().filter(|(k, _)| k.user_id == user_id) {
            if pair.submitted_at > started {
                tracing::debug!(%user_id, book_id = key.book_id, "keeping pending flag newer than the list");
                continue;
            }
            let pending = has_pending(requests, key.book_id);
            pair.view.send_modify(|view| {
                view.pending = pending;
                if view.check != PendingCheck::Checking {
                    view.check = PendingCheck::Resolved;
                }
            });
        }
    }

    fn update(&self, key: PairKey, liveness: &Liveness, f: impl FnOnce(&mut BorrowView)) {
        self.with_pair(key, liveness, |pair| pair.view.send_modify(f));
    }

    fn with_pair(&self, key: PairKey, liveness: &Liveness, f: impl FnOnce(&mut PairState)) {
        if !liveness.is_live() {
            tracing::debug!(user_id = %key.user_id, book_id = key.book_id, "discarding stale result");
            return;
        }
        f(self.views().entry(key).or_insert_with(PairState::new));
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn views(&self) -> MutexGuard<'_, HashMap<PairKey, PairState>> {
        lock(&self.views)
    }
}

/// Held by the caller that issued a list fetch. Callers arriving after
/// `finish` or a cancellation start a fresh fetch.
struct ListLead<'a> {
    lists: &'a ListFlights,
    user_id: UserId,
    tx: watch::Sender<Option<ListOutcome>>,
    registered: bool,
}

impl ListLead<'_> {
    /// Unregister, then hand the outcome to every joined caller
    fn finish(mut self, outcome: ListOutcome) {
        lock(self.lists).remove(&self.user_id);
        self.registered = false;
        self.tx.send_replace(Some(outcome));
    }
}

impl Drop for ListLead<'_> {
    fn drop(&mut self) {
        if self.registered {
            lock(self.lists).remove(&self.user_id);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
