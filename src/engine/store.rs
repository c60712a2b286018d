//! Explicit per-viewer state store.
//!
//! Owned by the coordinator. States are created and destroyed by explicit
//! calls only; lookups never create.

use super::{EndTimings, TeleprompterState};
use crate::model::ViewerId;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

/// Map from viewer identity to its single shared [`TeleprompterState`].
#[derive(Debug, Default)]
pub struct StateStore {
    states: HashMap<ViewerId, TeleprompterState>,
    timings: EndTimings,
}

impl StateStore {
    /// Empty store; created states use `timings`.
    pub fn new(timings: EndTimings) -> Self {
        Self {
            states: HashMap::new(),
            timings,
        }
    }

    /// Create the viewer's state if absent. Returns whether it was created.
    pub fn create(&mut self, viewer: &ViewerId, now: DateTime<Utc>) -> bool {
        if self.states.contains_key(viewer) {
            return false;
        }
        debug!(viewer = %viewer, "Creating teleprompter state");
        self.states.insert(
            viewer.clone(),
            TeleprompterState::with_timings(now, self.timings),
        );
        true
    }

    /// State of `viewer`, if created.
    pub fn get(&self, viewer: &ViewerId) -> Option<&TeleprompterState> {
        self.states.get(viewer)
    }

    /// Mutable state of `viewer`, if created.
    pub fn get_mut(&mut self, viewer: &ViewerId) -> Option<&mut TeleprompterState> {
        self.states.get_mut(viewer)
    }

    /// Drop the viewer's state. Returns whether anything was removed.
    pub fn destroy(&mut self, viewer: &ViewerId) -> bool {
        let removed = self.states.remove(viewer).is_some();
        if removed {
            debug!(viewer = %viewer, "Destroyed teleprompter state");
        }
        removed
    }

    /// Whether `viewer` has a state.
    pub fn contains(&self, viewer: &ViewerId) -> bool {
        self.states.contains_key(viewer)
    }

    /// Number of viewer states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// True when no viewer has a state.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Drop every state.
    pub fn clear(&mut self) {
        if !self.states.is_empty() {
            debug!(count = self.states.len(), "Destroying all teleprompter states");
        }
        self.states.clear();
    }
}
