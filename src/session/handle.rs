//! Per-session timer ownership.

use super::timers::TimerId;
use crate::model::{SessionId, ViewerId};

/// The three timers a session may own. At most one of each is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Primary cadence: advance + render.
    Tick,
    /// Re-render of the end banner while it is up.
    EndRefresh,
    /// One-shot delay before replaying from the top.
    ReplayDelay,
}

/// One displayed session of a viewer and the timers driving it.
#[derive(Debug)]
pub struct ViewerSessionHandle {
    session: SessionId,
    viewer: ViewerId,
    /// Registration order; the earliest active session of a viewer paces it.
    order: u64,
    live: bool,
    active: bool,
    pub(super) tick: Option<TimerId>,
    pub(super) end_refresh: Option<TimerId>,
    pub(super) replay: Option<TimerId>,
}

impl ViewerSessionHandle {
    pub(super) fn new(session: SessionId, viewer: ViewerId, order: u64) -> Self {
        Self {
            session,
            viewer,
            order,
            live: true,
            active: false,
            tick: None,
            end_refresh: None,
            replay: None,
        }
    }

    /// Session this handle belongs to.
    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Viewer the session displays.
    pub fn viewer(&self) -> &ViewerId {
        &self.viewer
    }

    /// Start sequence number; lower started earlier.
    pub fn order(&self) -> u64 {
        self.order
    }

    /// False once the transport reported the session gone.
    pub fn is_live(&self) -> bool {
        self.live
    }

    /// True between `start` and `stop`, including the replay delay.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Scheduled timer of `kind`, if any.
    pub fn pending(&self, kind: TimerKind) -> Option<TimerId> {
        match kind {
            TimerKind::Tick => self.tick,
            TimerKind::EndRefresh => self.end_refresh,
            TimerKind::ReplayDelay => self.replay,
        }
    }

    pub(super) fn slot_mut(&mut self, kind: TimerKind) -> &mut Option<TimerId> {
        match kind {
            TimerKind::Tick => &mut self.tick,
            TimerKind::EndRefresh => &mut self.end_refresh,
            TimerKind::ReplayDelay => &mut self.replay,
        }
    }

    /// Take every pending timer id, leaving all slots empty.
    pub(super) fn take_all(&mut self) -> impl Iterator<Item = TimerId> {
        [self.tick.take(), self.end_refresh.take(), self.replay.take()]
            .into_iter()
            .flatten()
    }

    pub(super) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub(super) fn mark_gone(&mut self) {
        self.live = false;
        self.active = false;
    }
}
