//! Local driver for the coordinator (impure shell).
//!
//! Simulates one viewer with a number of concurrent sessions and runs the
//! coordinator's timers in real time, either against the terminal or as a
//! JSON-lines stream.

use crate::coordinator::{SessionLifecycle, StopReason, Teleprompter};
use crate::model::{InvalidSessionId, SessionId, SettingChange, ViewerId};
use crate::session::Clock;
use crate::settings::SettingsSource;
use crate::transport::{TerminalTransport, Transport};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long the terminal loop waits for input when no timer is pending.
const IDLE_POLL: Duration = Duration::from_millis(250);

/// One simulated viewer and its sessions.
#[derive(Debug, Clone)]
pub struct Simulation {
    viewer: ViewerId,
    sessions: Vec<SessionId>,
    changes: Vec<SettingChange>,
}

impl Simulation {
    /// Sessions are named `<viewer>-1`, `<viewer>-2`, ...
    pub fn new(viewer: ViewerId, session_count: usize) -> Result<Self, InvalidSessionId> {
        let sessions = (1..=session_count.max(1))
            .map(|n| SessionId::new(format!("{viewer}-{n}")))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            viewer,
            sessions,
            changes: Vec::new(),
        })
    }

    /// Setting applied on top of the viewer's stored settings before any
    /// session starts.
    pub fn with_change(mut self, change: SettingChange) -> Self {
        self.changes.push(change);
        self
    }

    /// Viewer whose sessions are simulated.
    pub fn viewer(&self) -> &ViewerId {
        &self.viewer
    }

    /// Session ids in start order.
    pub fn sessions(&self) -> &[SessionId] {
        &self.sessions
    }

    /// Apply the overrides, then start every session.
    pub fn install<T: Transport, S: SettingsSource, C: Clock>(
        &self,
        teleprompter: &mut Teleprompter<T, S, C>,
    ) {
        for change in &self.changes {
            teleprompter.apply_change(&self.viewer, change.clone());
        }
        for session in &self.sessions {
            teleprompter.on_session_start(session.clone(), self.viewer.clone());
        }
    }

    /// Stop every simulated session.
    pub fn teardown<T: Transport, S: SettingsSource, C: Clock>(
        &self,
        teleprompter: &mut Teleprompter<T, S, C>,
    ) {
        for session in &self.sessions {
            teleprompter.on_session_stop(session, &self.viewer, StopReason::Shutdown);
        }
    }
}

/// Time until the next timer, zero if it is already due.
fn wait_for<T: Transport, S: SettingsSource, C: Clock>(
    teleprompter: &Teleprompter<T, S, C>,
) -> Option<Duration> {
    let due = teleprompter.next_deadline()?;
    let wait = (due - teleprompter.clock().now())
        .to_std()
        .unwrap_or(Duration::ZERO);
    Some(wait)
}

/// Run timers until none are pending, sleeping between deadlines with
/// `sleep`. Returns how many timers fired.
pub fn run_until_idle<T, S, C>(
    teleprompter: &mut Teleprompter<T, S, C>,
    mut sleep: impl FnMut(Duration),
) -> usize
where
    T: Transport,
    S: SettingsSource,
    C: Clock,
{
    let mut fired = 0;
    while let Some(wait) = wait_for(teleprompter) {
        if !wait.is_zero() {
            sleep(wait);
        }
        fired += teleprompter.run_due();
    }
    debug!(fired, "No timers left");
    fired
}

/// Terminal drawing to stdout.
pub type CrosstermTerminal = Terminal<CrosstermBackend<Stdout>>;

/// Raw mode plus alternate screen.
pub fn setup_terminal() -> io::Result<CrosstermTerminal> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout))
}

/// Undo [`setup_terminal`].
pub fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

/// Whether a key press ends the terminal loop.
pub fn is_quit_key(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Drive the coordinator against the terminal until the user quits.
///
/// Finished sessions keep their last frame on screen.
pub fn run_terminal<S: SettingsSource, C: Clock>(
    teleprompter: &mut Teleprompter<TerminalTransport<CrosstermBackend<Stdout>>, S, C>,
) -> io::Result<()> {
    teleprompter.transport_mut().redraw()?;
    loop {
        let timeout = wait_for(teleprompter).unwrap_or(IDLE_POLL);
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if is_quit_key(&key) => {
                    info!("Quit requested");
                    return Ok(());
                }
                Event::Resize(width, height) => {
                    debug!(width, height, "Terminal resized");
                    if let Err(err) = teleprompter.transport_mut().redraw() {
                        warn!(error = %err, "Redraw after resize failed");
                    }
                }
                _ => {}
            }
            continue;
        }
        teleprompter.run_due();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::CoordinatorTimings;
    use crate::engine::{EndTimings, END_BANNER};
    use crate::model::ViewerSettings;
    use crate::session::{LoopTimings, ManualClock};
    use crate::settings::StaticSettings;
    use crate::transport::MemoryTransport;
    use chrono::{TimeDelta, TimeZone, Utc};

    fn viewer() -> ViewerId {
        ViewerId::new("local").unwrap()
    }

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn sessions_are_named_after_viewer() {
        let simulation = Simulation::new(viewer(), 3).unwrap();
        let names: Vec<_> = simulation.sessions().iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["local-1", "local-2", "local-3"]);
    }

    #[test]
    fn zero_sessions_still_opens_one() {
        let simulation = Simulation::new(viewer(), 0).unwrap();
        assert_eq!(simulation.sessions().len(), 1);
    }

    #[test]
    fn quit_keys() {
        assert!(is_quit_key(&key(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_quit_key(&key(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(is_quit_key(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_quit_key(&key(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!is_quit_key(&key(KeyCode::Enter, KeyModifiers::NONE)));
    }

    #[test]
    fn run_until_idle_plays_text_to_the_end() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap());
        let timings = CoordinatorTimings {
            end: EndTimings::from_millis(1_000, 2_000),
            scroll_loop: LoopTimings::from_millis(500, 1_000, 500),
            default_tick_interval_ms: 500,
        };
        let mut teleprompter = Teleprompter::new(
            MemoryTransport::new(),
            StaticSettings::new(ViewerSettings::default()),
            clock.clone(),
            timings,
        );
        let simulation = Simulation::new(viewer(), 2)
            .unwrap()
            .with_change(SettingChange::CustomText(Some("one two three".to_string())))
            .with_change(SettingChange::ScrollSpeed(500.0));
        simulation.install(&mut teleprompter);

        let sleeper = clock.clone();
        let fired = run_until_idle(&mut teleprompter, |wait| {
            sleeper.advance(TimeDelta::from_std(wait).unwrap());
        });

        assert!(fired > 0);
        assert!(teleprompter.next_deadline().is_none());
        for session in simulation.sessions() {
            assert_eq!(
                teleprompter
                    .transport()
                    .last_frame_for(session)
                    .map(|frame| frame.text.as_str()),
                Some(END_BANNER)
            );
        }

        simulation.teardown(&mut teleprompter);
        assert!(teleprompter.store().is_empty());
    }
}
