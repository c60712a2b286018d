//! Terminal display surface.
//!
//! Every live session gets an equal-height bordered panel; the latest frame
//! of each session is kept and the whole screen is redrawn on each push.
//! Generic over the ratatui backend so tests can draw into a `TestBackend`.

use super::{DisplayOptions, Transport};
use crate::model::{SessionId, TransportError};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::collections::{BTreeMap, HashSet};

const FOOTER_HINT: &str = " q / Esc: quit ";

/// Draws one bordered panel per session; every push redraws the screen.
pub struct TerminalTransport<B: Backend> {
    terminal: Terminal<B>,
    frames: BTreeMap<SessionId, PanelFrame>,
    closed: HashSet<SessionId>,
}

#[derive(Debug, Clone)]
struct PanelFrame {
    text: String,
    timed: bool,
}

impl<B: Backend> TerminalTransport<B> {
    /// Transport drawing into `terminal`.
    pub fn new(terminal: Terminal<B>) -> Self {
        Self {
            terminal,
            frames: BTreeMap::new(),
            closed: HashSet::new(),
        }
    }

    /// The terminal, for inspecting its backend.
    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }

    /// Detach a panel; later pushes for it fail as a closed connection.
    pub fn close(&mut self, session: &SessionId) {
        self.frames.remove(session);
        self.closed.insert(session.clone());
    }

    /// Repaint every panel, e.g. after a resize.
    pub fn redraw(&mut self) -> std::io::Result<()> {
        let frames = &self.frames;
        self.terminal.draw(|frame| draw_panels(frame, frames))?;
        Ok(())
    }
}

impl<B: Backend> Transport for TerminalTransport<B> {
    fn display(
        &mut self,
        session: &SessionId,
        text: &str,
        options: DisplayOptions,
    ) -> Result<(), TransportError> {
        if self.closed.contains(session) {
            return Err(TransportError::ConnectionClosed(session.clone()));
        }
        self.frames.insert(
            session.clone(),
            PanelFrame {
                text: text.to_string(),
                timed: options.duration_ms.is_some(),
            },
        );
        self.redraw()?;
        Ok(())
    }

    fn release(&mut self, session: &SessionId) {
        self.frames.remove(session);
    }
}

fn draw_panels(frame: &mut Frame, frames: &BTreeMap<SessionId, PanelFrame>) {
    let [body, footer] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(frame.area());

    if !frames.is_empty() {
        let count = frames.len() as u32;
        let panels = Layout::vertical(frames.iter().map(|_| Constraint::Ratio(1, count)))
            .split(body);

        for ((session, panel), area) in frames.iter().zip(panels.iter()) {
            // Timed frames are end banners; center them.
            let alignment = if panel.timed {
                Alignment::Center
            } else {
                Alignment::Left
            };
            let paragraph = Paragraph::new(panel.text.as_str())
                .alignment(alignment)
                .block(
                    Block::default()
                        .title(format!(" {session} "))
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::Cyan)),
                );
            frame.render_widget(paragraph, *area);
        }
    }

    let hint = Paragraph::new(Line::from(Span::styled(
        FOOTER_HINT,
        Style::default().add_modifier(Modifier::DIM),
    )))
    .alignment(Alignment::Right);
    frame.render_widget(hint, footer);
}
