//! Coordinator: the single owner of per-viewer state and session timers.
//!
//! [`Teleprompter`] receives session lifecycle events and settings pushes,
//! keeps the [`StateStore`] and the [`SessionScrollLoop`] consistent with
//! each other, and fires due timers when asked. Every operation samples the
//! clock once and passes that instant down.

use crate::engine::{EndTimings, Phase, StateStore, TeleprompterState, DEFAULT_TICK_INTERVAL_MS};
use crate::model::{InvalidSetting, SessionId, SettingChange, ViewerId, ViewerSettings};
use crate::session::{Clock, LoopTimings, SessionScrollLoop};
use crate::settings::SettingsSource;
use crate::transport::Transport;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The viewer closed the session.
    Closed,
    /// The connection to the display surface dropped.
    Disconnected,
    /// The host is shutting down.
    Shutdown,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StopReason::Closed => "closed",
            StopReason::Disconnected => "disconnected",
            StopReason::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

/// Session lifecycle callbacks. The viewer is always passed explicitly.
pub trait SessionLifecycle {
    /// A display session of `viewer` opened.
    fn on_session_start(&mut self, session: SessionId, viewer: ViewerId);
    /// A display session closed. The last one tears the viewer's state down.
    fn on_session_stop(&mut self, session: &SessionId, viewer: &ViewerId, reason: StopReason);
}

/// Every duration the coordinator hands to the engine and the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorTimings {
    /// End-of-text phase durations for new viewer states.
    pub end: EndTimings,
    /// Session loop delays.
    pub scroll_loop: LoopTimings,
    /// Used for viewers whose settings carry no tick interval.
    pub default_tick_interval_ms: u64,
}

impl Default for CoordinatorTimings {
    fn default() -> Self {
        Self {
            end: EndTimings::default(),
            scroll_loop: LoopTimings::default(),
            default_tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

/// Owner of every viewer state and session timer, generic over the display
/// transport `T`, the settings source `S` and the clock `C`.
pub struct Teleprompter<T, S, C> {
    store: StateStore,
    scroll_loop: SessionScrollLoop,
    /// Settings currently applied to each viewer in the store.
    applied: HashMap<ViewerId, ViewerSettings>,
    transport: T,
    settings: S,
    clock: C,
    default_tick_interval_ms: u64,
}

impl<T: Transport, S: SettingsSource, C: Clock> Teleprompter<T, S, C> {
    /// Coordinator with no viewers and no sessions.
    pub fn new(transport: T, settings: S, clock: C, timings: CoordinatorTimings) -> Self {
        Self {
            store: StateStore::new(timings.end),
            scroll_loop: SessionScrollLoop::new(timings.scroll_loop),
            applied: HashMap::new(),
            transport,
            settings,
            clock,
            default_tick_interval_ms: timings.default_tick_interval_ms,
        }
    }

    // ===== Settings =====

    /// Replace a viewer's settings wholesale.
    ///
    /// Creates the viewer's state if it does not exist yet. Otherwise only
    /// the fields that differ are applied, each with its own restart rule.
    pub fn apply_settings(&mut self, viewer: &ViewerId, settings: ViewerSettings) {
        let now = self.clock.now();
        let Some(previous) = self.applied.get(viewer).cloned() else {
            self.create_state(viewer, settings, now);
            return;
        };
        for change in changes_between(&previous, &settings, self.default_tick_interval_ms) {
            self.push_change(viewer, &change, now);
        }
        self.applied.insert(viewer.clone(), settings);
    }

    /// Apply one pushed setting to every session of the viewer.
    pub fn apply_change(&mut self, viewer: &ViewerId, change: SettingChange) {
        let now = self.clock.now();
        if !self.store.contains(viewer) {
            let settings = self.fetch_settings(viewer);
            self.create_state(viewer, settings, now);
        }
        if let Some(settings) = self.applied.get_mut(viewer) {
            settings.apply(&change);
        }
        self.push_change(viewer, &change, now);
    }

    /// Parse and apply a raw key/value push.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidSetting`] for unknown keys or unparsable values;
    /// nothing is applied in that case.
    pub fn apply_raw(
        &mut self,
        viewer: &ViewerId,
        key: &str,
        value: &str,
    ) -> Result<(), InvalidSetting> {
        let change = SettingChange::parse(key, value)?;
        self.apply_change(viewer, change);
        Ok(())
    }

    /// Settings currently applied to the viewer.
    pub fn settings_for(&self, viewer: &ViewerId) -> Option<&ViewerSettings> {
        self.applied.get(viewer)
    }

    // ===== Timers =====

    /// Fire every timer due now. Returns how many fired.
    pub fn run_due(&mut self) -> usize {
        let now = self.clock.now();
        self.scroll_loop
            .fire_due(now, &mut self.store, &mut self.transport)
    }

    /// When [`Self::run_due`] next has work.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.scroll_loop.next_deadline()
    }

    /// Stop every session and drop all viewer state, including viewers
    /// that only ever received settings pushes.
    pub fn shutdown(&mut self) {
        for (session, viewer) in self.scroll_loop.sessions() {
            self.on_session_stop(&session, &viewer, StopReason::Shutdown);
        }
        let remaining = self.store.len();
        if remaining > 0 {
            info!(viewers = remaining, "Dropping state of viewers without sessions");
        }
        self.store.clear();
        self.applied.clear();
    }

    /// Drop the state of a viewer that has no sessions, such as one that
    /// was only configured. Returns false if the viewer still has sessions
    /// or had no state.
    pub fn forget_viewer(&mut self, viewer: &ViewerId) -> bool {
        if !self.scroll_loop.sessions_for(viewer).is_empty() {
            return false;
        }
        self.applied.remove(viewer);
        let removed = self.store.destroy(viewer);
        if removed {
            info!(viewer = %viewer, "Viewer state destroyed");
        }
        removed
    }

    // ===== Accessors =====

    /// Every viewer state.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// State of one viewer.
    pub fn state(&self, viewer: &ViewerId) -> Option<&TeleprompterState> {
        self.store.get(viewer)
    }

    /// Session timers and handles.
    pub fn scroll_loop(&self) -> &SessionScrollLoop {
        &self.scroll_loop
    }

    /// Display transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Display transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Clock sampled by every operation.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    // ===== Internals =====

    fn fetch_settings(&self, viewer: &ViewerId) -> ViewerSettings {
        match self.settings.fetch(viewer) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(viewer = %viewer, error = %err, "Settings unavailable; using defaults");
                ViewerSettings::default()
            }
        }
    }

    fn create_state(&mut self, viewer: &ViewerId, settings: ViewerSettings, now: DateTime<Utc>) {
        self.store.create(viewer, now);
        if let Some(state) = self.store.get_mut(viewer) {
            configure(state, &settings, self.default_tick_interval_ms, now);
        }
        self.applied.insert(viewer.clone(), settings);
    }

    fn push_change(&mut self, viewer: &ViewerId, change: &SettingChange, now: DateTime<Utc>) {
        let Some(state) = self.store.get_mut(viewer) else {
            return;
        };
        apply_to_state(state, change, now);
        let scrolling = state.phase() == Phase::Scrolling && !state.is_awaiting_replay();
        debug!(viewer = %viewer, ?change, phase = %state.phase(), "Setting applied");

        if let SettingChange::AutoReplay(false) = change {
            let cancelled = self.scroll_loop.cancel_replay_for_viewer(viewer);
            if cancelled > 0 {
                info!(viewer = %viewer, cancelled, "Pending replay cancelled");
            }
            return;
        }

        for session in self.scroll_loop.sessions_for(viewer) {
            let Some(handle) = self.scroll_loop.handle(&session) else {
                continue;
            };
            // Running loops pick in-place changes up on their next tick.
            // Finished ones resume only if the change put the text back in
            // motion.
            let restart = if change.restarts_loop() {
                handle.is_active() || scrolling
            } else {
                !handle.is_active() && scrolling
            };
            if restart && self.scroll_loop.start(&session, now) {
                debug!(session = %session, "Session loop restarted after settings change");
            }
        }
    }
}

impl<T: Transport, S: SettingsSource, C: Clock> SessionLifecycle for Teleprompter<T, S, C> {
    fn on_session_start(&mut self, session: SessionId, viewer: ViewerId) {
        let now = self.clock.now();
        if !self.scroll_loop.open(session.clone(), viewer.clone()) {
            warn!(session = %session, "Session already started; ignoring");
            return;
        }
        if !self.store.contains(&viewer) {
            let settings = self.fetch_settings(&viewer);
            self.create_state(&viewer, settings, now);
        }
        self.scroll_loop.start(&session, now);
        info!(session = %session, viewer = %viewer, "Session started");
    }

    fn on_session_stop(&mut self, session: &SessionId, viewer: &ViewerId, reason: StopReason) {
        match self.scroll_loop.close(session) {
            Some(handle) if handle.viewer() != viewer => {
                warn!(
                    session = %session,
                    expected = %handle.viewer(),
                    given = %viewer,
                    "Stop reported for a different viewer"
                );
            }
            Some(_) => {}
            None => {
                debug!(session = %session, "Stop for unknown session");
                return;
            }
        }
        self.transport.release(session);
        info!(session = %session, viewer = %viewer, %reason, "Session stopped");

        if self.scroll_loop.sessions_for(viewer).is_empty() {
            self.store.destroy(viewer);
            self.applied.remove(viewer);
            info!(viewer = %viewer, "Last session ended; viewer state destroyed");
        }
    }
}

/// Push a full settings record into a state. Text goes last since it
/// resets the position.
fn configure(
    state: &mut TeleprompterState,
    settings: &ViewerSettings,
    default_tick_interval_ms: u64,
    now: DateTime<Utc>,
) {
    state.set_line_width(settings.line_width.columns());
    state.set_visible_line_count(settings.number_of_lines);
    state.set_scroll_rate(settings.scroll_speed);
    state.set_tick_interval(settings.tick_interval_ms.unwrap_or(default_tick_interval_ms));
    state.set_auto_replay(settings.auto_replay);
    state.set_text(settings.custom_text.as_deref().unwrap_or_default(), now);
}

fn apply_to_state(state: &mut TeleprompterState, change: &SettingChange, now: DateTime<Utc>) {
    match change {
        SettingChange::LineWidth(width) => state.set_line_width(width.columns()),
        SettingChange::NumberOfLines(count) => state.set_visible_line_count(*count),
        SettingChange::ScrollSpeed(wpm) => state.set_scroll_rate(*wpm),
        SettingChange::CustomText(text) => {
            state.set_text(text.as_deref().unwrap_or_default(), now);
        }
        SettingChange::AutoReplay(enabled) => state.set_auto_replay(*enabled),
        SettingChange::TickInterval(ms) => state.set_tick_interval(*ms),
    }
}

/// Field-by-field difference, in the order the fields are declared.
fn changes_between(
    old: &ViewerSettings,
    new: &ViewerSettings,
    default_tick_interval_ms: u64,
) -> Vec<SettingChange> {
    let mut changes = Vec::new();
    if old.line_width.columns() != new.line_width.columns() {
        changes.push(SettingChange::LineWidth(new.line_width));
    }
    if old.number_of_lines != new.number_of_lines {
        changes.push(SettingChange::NumberOfLines(new.number_of_lines));
    }
    if old.scroll_speed != new.scroll_speed {
        changes.push(SettingChange::ScrollSpeed(new.scroll_speed));
    }
    if old.custom_text != new.custom_text {
        changes.push(SettingChange::CustomText(new.custom_text.clone()));
    }
    if old.auto_replay != new.auto_replay {
        changes.push(SettingChange::AutoReplay(new.auto_replay));
    }
    if old.tick_interval_ms != new.tick_interval_ms {
        changes.push(SettingChange::TickInterval(
            new.tick_interval_ms.unwrap_or(default_tick_interval_ms),
        ));
    }
    changes
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
