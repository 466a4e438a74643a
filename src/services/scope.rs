//! View lifetime tracking
//!
//! A coordinator is bound to the view that renders it. When the view goes
//! away the scope is closed, and any network result that lands afterwards is
//! dropped instead of being written into state nobody renders.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[derive(Debug, Clone)]
pub struct ViewScope {
    alive: Arc<AtomicBool>,
}

impl ViewScope {
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Token captured by a pending operation when it starts
    pub fn liveness(&self) -> Liveness {
        Liveness {
            alive: Arc::clone(&self.alive),
        }
    }

    /// Mark the view as torn down. Irreversible.
    pub fn close(&self) {
        if self.alive.swap(false, Ordering::AcqRel) {
            tracing::debug!("view scope closed");
        }
    }
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct Liveness {
    alive: Arc<AtomicBool>,
}

impl Liveness {
    pub fn is_live(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}
