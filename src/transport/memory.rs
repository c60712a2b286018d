//! Recording transport.
//!
//! Keeps every frame in memory and can simulate a closed channel per
//! session. Used by tests and by embedders that poll frames themselves.

use super::{DisplayOptions, Transport};
use crate::model::{SessionId, TransportError};
use std::collections::HashSet;

/// One frame pushed through [`MemoryTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayedFrame {
    /// Session the frame was pushed to.
    pub session: SessionId,
    /// Rendered frame text.
    pub text: String,
    /// Presentation hints sent with the frame.
    pub options: DisplayOptions,
}

/// Transport that records frames instead of showing them.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    frames: Vec<DisplayedFrame>,
    closed: HashSet<SessionId>,
    released: Vec<SessionId>,
}

impl MemoryTransport {
    /// Empty recorder with every session open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `display` for `session` fail.
    pub fn close(&mut self, session: &SessionId) {
        self.closed.insert(session.clone());
    }

    /// Accept frames for `session` again.
    pub fn reopen(&mut self, session: &SessionId) {
        self.closed.remove(session);
    }

    /// Every frame pushed so far, in order.
    pub fn frames(&self) -> &[DisplayedFrame] {
        &self.frames
    }

    /// Frames pushed to `session`, oldest first.
    pub fn frames_for<'a>(
        &'a self,
        session: &'a SessionId,
    ) -> impl Iterator<Item = &'a DisplayedFrame> + 'a {
        self.frames.iter().filter(move |frame| &frame.session == session)
    }

    /// Most recent frame pushed to `session`.
    pub fn last_frame_for(&self, session: &SessionId) -> Option<&DisplayedFrame> {
        self.frames.iter().rev().find(|frame| &frame.session == session)
    }

    /// Number of frames pushed to `session`.
    pub fn count_for(&self, session: &SessionId) -> usize {
        self.frames_for(session).count()
    }

    /// Sessions released so far, in order.
    pub fn released(&self) -> &[SessionId] {
        &self.released
    }

    /// Forget recorded frames. Closed sessions stay closed.
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl Transport for MemoryTransport {
    fn display(
        &mut self,
        session: &SessionId,
        text: &str,
        options: DisplayOptions,
    ) -> Result<(), TransportError> {
        if self.closed.contains(session) {
            return Err(TransportError::ConnectionClosed(session.clone()));
        }
        self.frames.push(DisplayedFrame {
            session: session.clone(),
            text: text.to_string(),
            options,
        });
        Ok(())
    }

    fn release(&mut self, session: &SessionId) {
        self.released.push(session.clone());
    }
}
