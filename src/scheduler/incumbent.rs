//! Best schedule shared across search workers.
//!
//! Workers read the bound lock-free on every branch; the mutex is taken only
//! when a strictly better schedule arrives.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::models::Schedule;

#[derive(Debug)]
pub(crate) struct Incumbent {
    best: AtomicUsize,
    version: AtomicU64,
    schedule: Mutex<Option<Schedule>>,
}

impl Incumbent {
    pub(crate) fn new() -> Self {
        Self {
            best: AtomicUsize::new(usize::MAX),
            version: AtomicU64::new(0),
            schedule: Mutex::new(None),
        }
    }

    /// Message count of the best schedule so far (`usize::MAX` if none).
    #[inline]
    pub(crate) fn bound(&self) -> usize {
        self.best.load(Ordering::Acquire)
    }

    /// Number of improvements accepted.
    pub(crate) fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Installs `schedule` if it uses strictly fewer messages than the best.
    pub(crate) fn offer(&self, schedule: Schedule) -> bool {
        let count = schedule.total_messages();
        if count >= self.bound() {
            return false;
        }
        let mut slot = self.lock();
        if count >= self.best.load(Ordering::Acquire) {
            return false;
        }
        *slot = Some(schedule);
        self.best.store(count, Ordering::Release);
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(messages = count, version, "incumbent improved");
        true
    }

    pub(crate) fn into_schedule(self) -> Option<Schedule> {
        match self.schedule.into_inner() {
            Ok(schedule) => schedule,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    // The slot is only ever replaced whole, so a poisoned guard is still usable.
    fn lock(&self) -> MutexGuard<'_, Option<Schedule>> {
        match self.schedule.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
