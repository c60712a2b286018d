//! Session scroll loop.
//!
//! Owns every timer of every displayed session and bridges engine phase
//! outcomes to real timers:
//!
//! | Frame outcome | Next timer                                   |
//! |---------------|----------------------------------------------|
//! | `Window`      | `Tick` after the viewer's tick interval      |
//! | `Banner`      | `EndRefresh` after the refresh cadence       |
//! | `ReplayDue`   | `ReplayDelay` after the replay delay         |
//! | `Finished`    | none; the banner stays as the last frame     |
//!
//! Scheduling a timer for a session cancels that session's other timers,
//! so a session never has more than one pending. Everything runs on the
//! caller's thread inside [`SessionScrollLoop::fire_due`].

pub mod clock;
pub mod handle;
pub mod timers;

pub use clock::{Clock, ManualClock, SystemClock};
pub use handle::{TimerKind, ViewerSessionHandle};
pub use timers::{TimerId, TimerQueue};

use crate::engine::{millis, FrameOutcome, StateStore};
use crate::model::{SessionId, ViewerId};
use crate::transport::{DisplayOptions, Transport};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Wait before the first tick of a started loop.
pub const DEFAULT_STARTUP_DELAY_MS: u64 = 1_000;
/// Wait between the end banner running out and the replay.
pub const DEFAULT_REPLAY_DELAY_MS: u64 = 5_000;
/// Banner refresh cadence.
pub const DEFAULT_END_REFRESH_MS: u64 = 1_000;
/// Floor for the replay delay, so a replay is never due in the pass that
/// scheduled it.
pub const MIN_REPLAY_DELAY_MS: u64 = 100;
/// Floor for the banner refresh cadence; a zero cadence would refire forever.
pub const MIN_END_REFRESH_MS: u64 = 100;

/// Loop-level delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopTimings {
    /// Before the first tick of a freshly started loop.
    pub startup_delay: TimeDelta,
    /// Between the end banner running out and the replay restart.
    pub replay_delay: TimeDelta,
    /// Re-render cadence while the end banner is up.
    pub end_refresh: TimeDelta,
}

impl LoopTimings {
    /// Delays in milliseconds. Replay delay and refresh cadence are raised
    /// to their floors.
    pub fn from_millis(startup_delay_ms: u64, replay_delay_ms: u64, end_refresh_ms: u64) -> Self {
        Self {
            startup_delay: millis(startup_delay_ms),
            replay_delay: millis(replay_delay_ms.max(MIN_REPLAY_DELAY_MS)),
            end_refresh: millis(end_refresh_ms.max(MIN_END_REFRESH_MS)),
        }
    }
}

impl Default for LoopTimings {
    fn default() -> Self {
        Self::from_millis(
            DEFAULT_STARTUP_DELAY_MS,
            DEFAULT_REPLAY_DELAY_MS,
            DEFAULT_END_REFRESH_MS,
        )
    }
}

/// Timers and handles of every displayed session.
#[derive(Debug, Default)]
pub struct SessionScrollLoop {
    handles: HashMap<SessionId, ViewerSessionHandle>,
    timers: TimerQueue<(SessionId, TimerKind)>,
    timings: LoopTimings,
    next_order: u64,
    /// Instant each viewer's shared state last advanced.
    last_advance: HashMap<ViewerId, DateTime<Utc>>,
}

impl SessionScrollLoop {
    /// Empty loop using `timings` for every session.
    pub fn new(timings: LoopTimings) -> Self {
        Self {
            timings,
            ..Self::default()
        }
    }

    /// Delays in use.
    pub fn timings(&self) -> LoopTimings {
        self.timings
    }

    // ===== Handle lifecycle =====

    /// Register a session. Returns false if it was already registered.
    pub fn open(&mut self, session: SessionId, viewer: ViewerId) -> bool {
        if self.handles.contains_key(&session) {
            return false;
        }
        let order = self.next_order;
        self.next_order += 1;
        self.handles.insert(
            session.clone(),
            ViewerSessionHandle::new(session, viewer, order),
        );
        true
    }

    /// Cancel every timer of the session and forget it.
    pub fn close(&mut self, session: &SessionId) -> Option<ViewerSessionHandle> {
        self.stop(session);
        let mut handle = self.handles.remove(session)?;
        handle.mark_gone();
        if !self.handles.values().any(|h| h.viewer() == handle.viewer()) {
            self.last_advance.remove(handle.viewer());
        }
        Some(handle)
    }

    /// Handle of a registered session.
    pub fn handle(&self, session: &SessionId) -> Option<&ViewerSessionHandle> {
        self.handles.get(session)
    }

    /// The viewer's sessions, oldest first.
    pub fn sessions_for(&self, viewer: &ViewerId) -> Vec<SessionId> {
        let mut handles: Vec<_> = self
            .handles
            .values()
            .filter(|handle| handle.viewer() == viewer)
            .collect();
        handles.sort_by_key(|handle| handle.order());
        handles
            .into_iter()
            .map(|handle| handle.session().clone())
            .collect()
    }

    // ===== Loop control =====

    /// Every registered session with its viewer, oldest first.
    pub fn sessions(&self) -> Vec<(SessionId, ViewerId)> {
        let mut handles: Vec<_> = self.handles.values().collect();
        handles.sort_by_key(|handle| handle.order());
        handles
            .into_iter()
            .map(|handle| (handle.session().clone(), handle.viewer().clone()))
            .collect()
    }

    /// (Re)start ticking after the startup delay. Any running loop for the
    /// session is stopped first. Returns false for unknown or dead sessions.
    pub fn start(&mut self, session: &SessionId, now: DateTime<Utc>) -> bool {
        self.start_at(session, now + self.timings.startup_delay)
    }

    /// (Re)start with the first tick at `due`.
    pub fn start_at(&mut self, session: &SessionId, due: DateTime<Utc>) -> bool {
        match self.handles.get(session) {
            Some(handle) if handle.is_live() => {}
            _ => return false,
        }
        self.stop(session);
        if let Some(handle) = self.handles.get_mut(session) {
            handle.set_active(true);
        }
        self.schedule_exclusive(session, TimerKind::Tick, due);
        debug!(session = %session, due = %due, "Session loop started");
        true
    }

    /// Cancel every timer the session owns. Safe to call repeatedly.
    pub fn stop(&mut self, session: &SessionId) {
        let Some(handle) = self.handles.get_mut(session) else {
            return;
        };
        for id in handle.take_all() {
            self.timers.cancel(id);
        }
        handle.set_active(false);
    }

    /// Cancel pending replays of the viewer's sessions, ending those loops.
    /// Returns how many were cancelled.
    pub fn cancel_replay_for_viewer(&mut self, viewer: &ViewerId) -> usize {
        let pending: Vec<SessionId> = self
            .handles
            .values()
            .filter(|handle| handle.viewer() == viewer && handle.replay.is_some())
            .map(|handle| handle.session().clone())
            .collect();
        for session in &pending {
            self.stop(session);
        }
        pending.len()
    }

    /// Earliest pending timer.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.timers.next_due()
    }

    /// Number of pending timers across all sessions.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    // ===== Firing =====

    /// Fire every timer due at `now`, in due order. Returns how many fired.
    ///
    /// Timers scheduled while firing wait for the next call, even when they
    /// are already due.
    pub fn fire_due<T: Transport + ?Sized>(
        &mut self,
        now: DateTime<Utc>,
        store: &mut StateStore,
        transport: &mut T,
    ) -> usize {
        let horizon = self.timers.horizon();
        let mut fired = 0;
        while let Some((id, (session, kind))) = self.timers.pop_due_before(now, horizon) {
            self.fire(id, &session, kind, now, store, transport);
            fired += 1;
        }
        fired
    }

    fn fire<T: Transport + ?Sized>(
        &mut self,
        id: TimerId,
        session: &SessionId,
        kind: TimerKind,
        now: DateTime<Utc>,
        store: &mut StateStore,
        transport: &mut T,
    ) {
        let Some(handle) = self.handles.get_mut(session) else {
            debug!(session = %session, ?kind, "Timer fired for closed session");
            return;
        };
        if handle.pending(kind) != Some(id) {
            return;
        }
        *handle.slot_mut(kind) = None;
        if !handle.is_live() || !handle.is_active() {
            return;
        }
        let viewer = handle.viewer().clone();

        let Some(state) = store.get_mut(&viewer) else {
            warn!(session = %session, viewer = %viewer, "No state for viewer; stopping loop");
            self.stop(session);
            return;
        };

        // Another session of the same viewer may have reset already. The
        // replay frame itself shows the top; movement resumes on the next tick.
        if kind == TimerKind::ReplayDelay && state.is_awaiting_replay() {
            info!(viewer = %viewer, "Replaying from the top");
            state.reset_position(now);
        }
        // A pacer that failed to display earlier in this pass already moved
        // the shared state for this instant.
        if kind == TimerKind::Tick
            && self.is_pacer(session, &viewer)
            && self.last_advance.get(&viewer) != Some(&now)
        {
            state.advance();
            self.last_advance.insert(viewer.clone(), now);
        }
        let frame = state.render_frame(now);
        let options = match frame.outcome {
            FrameOutcome::Window => DisplayOptions::default(),
            _ => DisplayOptions::for_duration(
                state.timings().end_banner.num_milliseconds().max(0) as u64,
            ),
        };
        let tick_interval = millis(state.tick_interval_ms());

        if let Err(err) = transport.display(session, &frame.text, options) {
            warn!(session = %session, error = %err, "Display failed; stopping session loop");
            self.stop(session);
            if let Some(handle) = self.handles.get_mut(session) {
                handle.mark_gone();
            }
            return;
        }

        match frame.outcome {
            FrameOutcome::Window => {
                self.schedule_exclusive(session, TimerKind::Tick, now + tick_interval);
            }
            FrameOutcome::Banner => {
                let due = now + self.timings.end_refresh;
                self.schedule_exclusive(session, TimerKind::EndRefresh, due);
            }
            FrameOutcome::ReplayDue => {
                debug!(session = %session, "Replay scheduled");
                let due = now + self.timings.replay_delay;
                self.schedule_exclusive(session, TimerKind::ReplayDelay, due);
            }
            FrameOutcome::Finished => {
                info!(session = %session, "End of text reached; loop finished");
                self.stop(session);
            }
        }
    }

    /// Only the viewer's oldest active session advances the shared state;
    /// the others render it.
    fn is_pacer(&self, session: &SessionId, viewer: &ViewerId) -> bool {
        self.handles
            .values()
            .filter(|handle| handle.viewer() == viewer && handle.is_live() && handle.is_active())
            .min_by_key(|handle| handle.order())
            .is_some_and(|handle| handle.session() == session)
    }

    fn schedule_exclusive(&mut self, session: &SessionId, kind: TimerKind, due: DateTime<Utc>) {
        let Some(handle) = self.handles.get_mut(session) else {
            return;
        };
        for id in handle.take_all() {
            self.timers.cancel(id);
        }
        let id = self.timers.schedule(due, (session.clone(), kind));
        *handle.slot_mut(kind) = Some(id);
    }
}

#[cfg(test)]
#[path = "loop_tests.rs"]
mod tests;
