//! Scroll state engine (pure core).
//!
//! [`TeleprompterState`] owns everything needed to answer "what should a
//! viewer see right now": the reflowed lines, the scroll position with its
//! fractional carry, and the end-of-text phase machine.
//!
//! The engine never reads a clock. Every time-dependent operation takes the
//! caller's `now`, sampled once per tick, so the phase rules can be driven
//! deterministically in tests.
//!
//! # End-of-text phases
//!
//! ```text
//! Scrolling ──at end──▶ HoldingFinalLine ──hold elapsed──▶ ShowingEndBanner
//!     ▲                                                        │
//!     │ reset_position()              banner elapsed, replay ──┤
//!     └──────────── (awaiting replay) ◀────────────────────────┤
//!                                     banner elapsed, no replay ▼
//!                                                             Idle
//! ```

pub mod store;

pub use store::StateStore;

use crate::reflow::{self, MIN_WORDS_PER_LINE};
use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use std::num::NonZeroUsize;
use tracing::{debug, info};

/// Lowest accepted pacing, words per minute.
pub const MIN_SCROLL_RATE_WPM: f64 = 1.0;
/// Highest accepted pacing, words per minute.
pub const MAX_SCROLL_RATE_WPM: f64 = 500.0;
/// Shortest accepted tick interval.
pub const MIN_TICK_INTERVAL_MS: u64 = 100;
/// Longest accepted tick interval.
pub const MAX_TICK_INTERVAL_MS: u64 = 2000;

/// Pacing of a fresh state.
pub const DEFAULT_SCROLL_RATE_WPM: f64 = 120.0;
/// Tick interval of a fresh state.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 500;
/// Wrap width of a fresh state, the `medium` preset.
pub const DEFAULT_LINE_WIDTH: NonZeroUsize = match NonZeroUsize::new(38) {
    Some(width) => width,
    None => panic!("default line width must be non-zero"),
};
/// Visible lines of a fresh state.
pub const DEFAULT_VISIBLE_LINE_COUNT: usize = 4;

/// How long the final lines stay on screen before the banner.
pub const DEFAULT_HOLD_FINAL_LINE_MS: u64 = 5_000;
/// How long the end banner stays on screen.
pub const DEFAULT_END_BANNER_MS: u64 = 10_000;

/// Shown once the final lines have been held.
pub const END_BANNER: &str = "*** END OF TEXT ***";
/// Shown when there is nothing to scroll.
pub const EMPTY_PLACEHOLDER: &str = "(no text to display)";

/// Substituted whenever empty or absent text is set.
pub const DEFAULT_TEXT: &str = "Welcome to the teleprompter. \
This is the default text, shown because no custom text has been set for you yet. \
Add your own script in the settings and it will replace this message right away. \
The text scrolls at the speed you choose, measured in words per minute, \
and the header above shows how far along you are and how long you have been reading. \
When the end is reached the last lines stay in view for a moment, \
then an end banner appears. Turn on auto replay to start again from the top.";

/// End-of-text sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Normal scrolling.
    Scrolling,
    /// The end was reached; the final lines stay visible.
    HoldingFinalLine,
    /// The end banner is displayed.
    ShowingEndBanner,
    /// Terminal state without replay; ticking should stop.
    Idle,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Scrolling => "scrolling",
            Phase::HoldingFinalLine => "holding-final-line",
            Phase::ShowingEndBanner => "showing-end-banner",
            Phase::Idle => "idle",
        };
        f.write_str(name)
    }
}

/// Durations of the two timed end phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndTimings {
    /// Time in [`Phase::HoldingFinalLine`].
    pub hold_final_line: TimeDelta,
    /// Time in [`Phase::ShowingEndBanner`].
    pub end_banner: TimeDelta,
}

impl EndTimings {
    /// Both durations in milliseconds.
    pub fn from_millis(hold_final_line_ms: u64, end_banner_ms: u64) -> Self {
        Self {
            hold_final_line: millis(hold_final_line_ms),
            end_banner: millis(end_banner_ms),
        }
    }
}

impl Default for EndTimings {
    fn default() -> Self {
        Self::from_millis(DEFAULT_HOLD_FINAL_LINE_MS, DEFAULT_END_BANNER_MS)
    }
}

/// What a rendered frame means for the session loop driving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Header plus visible lines; keep ticking.
    Window,
    /// End banner within its display time.
    Banner,
    /// Banner time is over and replay is on: schedule a reset.
    ReplayDue,
    /// Banner time is over and replay is off: stop ticking.
    Finished,
}

/// A rendered frame plus its meaning for the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFrame {
    /// What the display surface shows.
    pub text: String,
    /// How the loop schedules the next frame.
    pub outcome: FrameOutcome,
}

/// Scrolling state for one viewer.
///
/// Shared by all of the viewer's sessions through the [`StateStore`].
#[derive(Debug, Clone)]
pub struct TeleprompterState {
    source_text: String,
    line_width: NonZeroUsize,
    visible_line_count: usize,
    scroll_rate_wpm: f64,
    tick_interval_ms: u64,
    lines: Vec<String>,
    avg_words_per_line: f64,
    lines_per_tick: f64,
    current_line_offset: usize,
    fractional_accumulator: f64,
    phase: Phase,
    phase_entered_at: Option<DateTime<Utc>>,
    session_started_at: DateTime<Utc>,
    auto_replay: bool,
    awaiting_replay: bool,
    timings: EndTimings,
}

impl TeleprompterState {
    /// Fresh state showing [`DEFAULT_TEXT`] with default pacing.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_timings(now, EndTimings::default())
    }

    /// Fresh state with custom end-phase durations.
    pub fn with_timings(now: DateTime<Utc>, timings: EndTimings) -> Self {
        let mut state = Self {
            source_text: String::new(),
            line_width: DEFAULT_LINE_WIDTH,
            visible_line_count: DEFAULT_VISIBLE_LINE_COUNT,
            scroll_rate_wpm: DEFAULT_SCROLL_RATE_WPM,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            lines: Vec::new(),
            avg_words_per_line: MIN_WORDS_PER_LINE,
            lines_per_tick: 0.0,
            current_line_offset: 0,
            fractional_accumulator: 0.0,
            phase: Phase::Scrolling,
            phase_entered_at: None,
            session_started_at: now,
            auto_replay: false,
            awaiting_replay: false,
            timings,
        };
        state.set_text(DEFAULT_TEXT, now);
        state
    }

    // ===== Reconfiguration =====

    /// Replace the text and restart from the top.
    ///
    /// Empty or whitespace-only text selects [`DEFAULT_TEXT`].
    pub fn set_text(&mut self, text: &str, now: DateTime<Utc>) {
        let text = if text.trim().is_empty() {
            DEFAULT_TEXT
        } else {
            text
        };
        self.source_text = text.to_string();
        self.reflow();
        self.reset_position(now);
        debug!(lines = self.lines.len(), "Text replaced");
    }

    /// Rewrap at a new width, keeping the reader's place.
    ///
    /// A width of 0 is treated as 1. The offset is clamped into the new
    /// valid range rather than reset.
    pub fn set_line_width(&mut self, width: usize) {
        let width = NonZeroUsize::new(width).unwrap_or(NonZeroUsize::MIN);
        if width == self.line_width {
            return;
        }
        self.line_width = width;
        self.reflow();
        self.clamp_offset();
        self.cancel_end_phases();
    }

    /// Change how many lines are visible at once (minimum 1), keeping the
    /// reader's place.
    pub fn set_visible_line_count(&mut self, count: usize) {
        let count = count.max(1);
        if count == self.visible_line_count {
            return;
        }
        self.visible_line_count = count;
        self.clamp_offset();
        self.cancel_end_phases();
    }

    /// Set pacing; clamped into [`MIN_SCROLL_RATE_WPM`]..=[`MAX_SCROLL_RATE_WPM`].
    /// NaN is ignored.
    pub fn set_scroll_rate(&mut self, wpm: f64) {
        if wpm.is_nan() {
            return;
        }
        self.scroll_rate_wpm = wpm.clamp(MIN_SCROLL_RATE_WPM, MAX_SCROLL_RATE_WPM);
        self.recompute_lines_per_tick();
    }

    /// Set the tick interval; clamped into
    /// [`MIN_TICK_INTERVAL_MS`]..=[`MAX_TICK_INTERVAL_MS`].
    pub fn set_tick_interval(&mut self, ms: u64) {
        self.tick_interval_ms = ms.clamp(MIN_TICK_INTERVAL_MS, MAX_TICK_INTERVAL_MS);
        self.recompute_lines_per_tick();
    }

    /// Toggle replay. Disabling while a replay is pending ends in `Idle`.
    ///
    /// Timers belong to the session loop; the caller cancels them.
    pub fn set_auto_replay(&mut self, enabled: bool) {
        self.auto_replay = enabled;
        if !enabled && self.awaiting_replay {
            self.awaiting_replay = false;
            self.phase = Phase::Idle;
        }
    }

    /// Back to the first line with a fresh elapsed-time origin.
    pub fn reset_position(&mut self, now: DateTime<Utc>) {
        self.current_line_offset = 0;
        self.fractional_accumulator = 0.0;
        self.session_started_at = now;
        self.cancel_end_phases();
    }

    // ===== Ticking =====

    /// Move forward by one tick's worth of lines.
    ///
    /// Whole lines are taken out of the accumulator; the remainder carries
    /// into the next tick. No-op for empty text.
    pub fn advance(&mut self) {
        if self.lines.is_empty() {
            return;
        }
        self.fractional_accumulator += self.lines_per_tick;
        if self.fractional_accumulator >= 1.0 {
            let whole = self.fractional_accumulator.floor();
            self.current_line_offset = self.current_line_offset.saturating_add(whole as usize);
            self.fractional_accumulator -= whole;
        }
        self.clamp_offset();
    }

    /// Text for the display surface at `now`.
    ///
    /// Drives phase transitions as a side effect; see [`Self::render_frame`].
    pub fn render(&mut self, now: DateTime<Utc>) -> String {
        self.render_frame(now).text
    }

    /// Advance the end-of-text machine to `now`, then render.
    pub fn render_frame(&mut self, now: DateTime<Utc>) -> RenderedFrame {
        if self.lines.is_empty() {
            return RenderedFrame {
                text: EMPTY_PLACEHOLDER.to_string(),
                outcome: FrameOutcome::Window,
            };
        }

        self.step_phases(now);

        let outcome = match self.phase {
            Phase::Scrolling if self.awaiting_replay => FrameOutcome::ReplayDue,
            Phase::Scrolling | Phase::HoldingFinalLine => FrameOutcome::Window,
            Phase::ShowingEndBanner => FrameOutcome::Banner,
            Phase::Idle => FrameOutcome::Finished,
        };
        let text = match outcome {
            FrameOutcome::Window => self.render_window(now),
            _ => END_BANNER.to_string(),
        };
        RenderedFrame { text, outcome }
    }

    /// True once the last line is visible.
    pub fn is_at_end(&self) -> bool {
        self.current_line_offset >= self.max_offset()
    }

    // ===== Queries =====

    /// Largest valid first-visible-line index.
    pub fn max_offset(&self) -> usize {
        self.lines.len().saturating_sub(self.visible_line_count)
    }

    /// Percentage through the text, 100 when everything fits on screen.
    pub fn progress_percent(&self) -> u8 {
        let max = self.max_offset();
        if max == 0 {
            return 100;
        }
        let percent = (100.0 * self.current_line_offset as f64 / max as f64).round();
        percent.clamp(0.0, 100.0) as u8
    }

    /// Time since the position was last reset, never negative.
    pub fn elapsed(&self, now: DateTime<Utc>) -> TimeDelta {
        (now - self.session_started_at).max(TimeDelta::zero())
    }

    /// Lines the offset moves per tick at the current pacing.
    pub fn lines_per_tick(&self) -> f64 {
        self.lines_per_tick
    }

    /// Text as set, after default substitution.
    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// Wrapped display lines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Wrap width in columns.
    pub fn line_width(&self) -> usize {
        self.line_width.get()
    }

    /// Lines shown at once.
    pub fn visible_line_count(&self) -> usize {
        self.visible_line_count
    }

    /// Pacing in words per minute.
    pub fn scroll_rate_wpm(&self) -> f64 {
        self.scroll_rate_wpm
    }

    /// Tick interval in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
    }

    /// Words per wrapped line, never below 1.
    pub fn avg_words_per_line(&self) -> f64 {
        self.avg_words_per_line
    }

    /// Index of the first visible line.
    pub fn current_line_offset(&self) -> usize {
        self.current_line_offset
    }

    /// Partial line carried into the next tick, in `[0, 1)`.
    pub fn fractional_accumulator(&self) -> f64 {
        self.fractional_accumulator
    }

    /// Current end-of-text phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// When the current end phase began; `None` while scrolling.
    pub fn phase_entered_at(&self) -> Option<DateTime<Utc>> {
        self.phase_entered_at
    }

    /// Origin of the elapsed-time header.
    pub fn session_started_at(&self) -> DateTime<Utc> {
        self.session_started_at
    }

    /// Whether the text restarts after the banner.
    pub fn auto_replay(&self) -> bool {
        self.auto_replay
    }

    /// Banner time ran out with replay on and no reset has happened yet.
    pub fn is_awaiting_replay(&self) -> bool {
        self.awaiting_replay
    }

    /// End-phase durations.
    pub fn timings(&self) -> EndTimings {
        self.timings
    }

    // ===== Internals =====

    fn reflow(&mut self) {
        let reflowed = reflow::reflow(&self.source_text, self.line_width);
        self.lines = reflowed.lines;
        self.avg_words_per_line = reflowed.avg_words_per_line.max(MIN_WORDS_PER_LINE);
        self.recompute_lines_per_tick();
    }

    fn recompute_lines_per_tick(&mut self) {
        let words_per_second = self.scroll_rate_wpm / 60.0;
        let seconds_per_tick = self.tick_interval_ms as f64 / 1000.0;
        self.lines_per_tick = words_per_second * seconds_per_tick / self.avg_words_per_line;
    }

    fn clamp_offset(&mut self) {
        self.current_line_offset = self.current_line_offset.min(self.max_offset());
    }

    fn cancel_end_phases(&mut self) {
        self.phase = Phase::Scrolling;
        self.phase_entered_at = None;
        self.awaiting_replay = false;
    }

    fn phase_elapsed(&self, now: DateTime<Utc>) -> TimeDelta {
        self.phase_entered_at
            .map(|entered| now - entered)
            .unwrap_or_else(TimeDelta::zero)
    }

    /// Apply every transition that is due at `now`, in order.
    fn step_phases(&mut self, now: DateTime<Utc>) {
        loop {
            let next = match self.phase {
                Phase::Scrolling if !self.awaiting_replay && self.is_at_end() => {
                    Phase::HoldingFinalLine
                }
                Phase::HoldingFinalLine
                    if self.phase_elapsed(now) >= self.timings.hold_final_line =>
                {
                    Phase::ShowingEndBanner
                }
                Phase::ShowingEndBanner if self.phase_elapsed(now) >= self.timings.end_banner => {
                    if self.auto_replay {
                        Phase::Scrolling
                    } else {
                        Phase::Idle
                    }
                }
                _ => return,
            };
            self.enter_phase(next, now);
        }
    }

    fn enter_phase(&mut self, next: Phase, now: DateTime<Utc>) {
        info!(from = %self.phase, to = %next, "Phase transition");
        if next == Phase::Scrolling {
            // Only reached from the banner with replay on; position stays
            // until the loop calls reset_position after its delay.
            self.awaiting_replay = true;
            self.phase_entered_at = None;
        } else {
            self.phase_entered_at = Some(now);
        }
        self.phase = next;
    }

    fn render_window(&self, now: DateTime<Utc>) -> String {
        let start = self.current_line_offset.min(self.lines.len());
        let end = (start + self.visible_line_count).min(self.lines.len());

        let mut out = format!(
            "[{}%] | elapsed {}",
            self.progress_percent(),
            format_elapsed(self.elapsed(now))
        );
        for line in &self.lines[start..end] {
            out.push('\n');
            out.push_str(line);
        }
        out
    }
}

/// `mm:ss`; minutes keep growing past 59.
pub fn format_elapsed(elapsed: TimeDelta) -> String {
    let secs = elapsed.num_seconds().max(0);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

pub(crate) fn millis(ms: u64) -> TimeDelta {
    TimeDelta::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX))
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
