//! Single-threaded timer queue.
//!
//! Timers are ordered by due time, then by scheduling order, so two timers
//! due at the same instant fire in the order they were created. Firing is
//! pull-based: the owner calls [`TimerQueue::pop_due`] with the current
//! time. A stalled caller sees each overdue timer once; nothing is queued
//! twice.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

/// Handle of a scheduled timer. Ids increase in scheduling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

/// Pending timers with their payloads.
#[derive(Debug)]
pub struct TimerQueue<T> {
    entries: BTreeMap<(DateTime<Utc>, TimerId), T>,
    due_by_id: HashMap<TimerId, DateTime<Utc>>,
    next_id: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            due_by_id: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<T> TimerQueue<T> {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a timer firing at `due`.
    pub fn schedule(&mut self, due: DateTime<Utc>, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.insert((due, id), payload);
        self.due_by_id.insert(id, due);
        id
    }

    /// Remove a pending timer. Returns its payload if it had not fired.
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let due = self.due_by_id.remove(&id)?;
        self.entries.remove(&(due, id))
    }

    /// Take the earliest timer due at or before `now`.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<(TimerId, T)> {
        let (&(due, id), _) = self.entries.first_key_value()?;
        if due > now {
            return None;
        }
        self.due_by_id.remove(&id);
        self.entries.remove(&(due, id)).map(|payload| (id, payload))
    }

    /// Id the next scheduled timer will get. Every pending timer sorts
    /// below it.
    pub fn horizon(&self) -> TimerId {
        TimerId(self.next_id)
    }

    /// Like [`Self::pop_due`], but skips timers scheduled at or after
    /// `horizon`, so a firing pass never picks up timers it created itself.
    pub fn pop_due_before(
        &mut self,
        now: DateTime<Utc>,
        horizon: TimerId,
    ) -> Option<(TimerId, T)> {
        let key = self
            .entries
            .keys()
            .take_while(|(due, _)| *due <= now)
            .find(|(_, id)| *id < horizon)
            .copied()?;
        self.due_by_id.remove(&key.1);
        self.entries.remove(&key).map(|payload| (key.1, payload))
    }

    /// Earliest pending due time.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.entries.first_key_value().map(|(&(due, _), _)| due)
    }

    /// Whether `id` is still pending.
    pub fn contains(&self, id: TimerId) -> bool {
        self.due_by_id.contains_key(&id)
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
