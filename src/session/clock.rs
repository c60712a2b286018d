//! Time sources.
//!
//! The coordinator reads its clock once per operation and hands that instant
//! to the engine and the timer queue. Tests use [`ManualClock`] so nothing
//! ever sleeps.

use chrono::{DateTime, TimeDelta, Utc};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Source of the current instant.
pub trait Clock {
    /// Current instant. Successive calls never go backwards.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time sampled once, then advanced by a monotonic [`Instant`].
///
/// Adjustments of the system clock after construction do not move the
/// reported time, so timer deadlines stay ordered.
#[derive(Debug, Clone)]
pub struct SystemClock {
    wall_origin: DateTime<Utc>,
    origin: Instant,
}

impl SystemClock {
    /// Clock anchored at the current wall time.
    pub fn new() -> Self {
        Self::anchored_at(Utc::now())
    }

    /// Clock reporting `wall_origin` now and moving forward from there.
    pub fn anchored_at(wall_origin: DateTime<Utc>) -> Self {
        Self {
            wall_origin,
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        TimeDelta::from_std(self.origin.elapsed())
            .ok()
            .and_then(|elapsed| self.wall_origin.checked_add_signed(elapsed))
            .unwrap_or(self.wall_origin)
    }
}

/// Manually advanced clock. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    /// Clock stopped at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    /// Move every clone forward by `by`.
    pub fn advance(&self, by: TimeDelta) {
        self.now.set(self.now.get() + by);
    }

    /// Jump every clone to `to`.
    pub fn set(&self, to: DateTime<Utc>) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}
