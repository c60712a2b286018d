//! Display transports (impure shell).
//!
//! A [`Transport`] pushes rendered frames to the surface a session is shown
//! on. It is the one call in the tick path that may fail; the session loop
//! treats any failure as the session being gone.

pub mod jsonl;
pub mod memory;
pub mod terminal;

pub use jsonl::JsonLinesTransport;
pub use memory::{DisplayedFrame, MemoryTransport};
pub use terminal::TerminalTransport;

use crate::model::{SessionId, TransportError};

/// Per-frame presentation hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayOptions {
    /// How long the surface should keep the frame up, if it matters.
    pub duration_ms: Option<u64>,
}

impl DisplayOptions {
    /// Options for a frame that should stay up for `duration_ms`.
    pub fn for_duration(duration_ms: u64) -> Self {
        Self {
            duration_ms: Some(duration_ms),
        }
    }
}

/// Pushes rendered frames to a session's display surface.
pub trait Transport {
    /// Show `text` on `session`'s surface.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectionClosed`] once the channel for
    /// `session` is gone, or another variant for encoding or I/O failures.
    fn display(
        &mut self,
        session: &SessionId,
        text: &str,
        options: DisplayOptions,
    ) -> Result<(), TransportError>;

    /// The session ended; drop anything kept for it.
    fn release(&mut self, _session: &SessionId) {}
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn display(
        &mut self,
        session: &SessionId,
        text: &str,
        options: DisplayOptions,
    ) -> Result<(), TransportError> {
        (**self).display(session, text, options)
    }

    fn release(&mut self, session: &SessionId) {
        (**self).release(session)
    }
}
