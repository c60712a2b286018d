//! Tests for the session scroll loop.

use super::*;
use crate::engine::{EndTimings, Phase, END_BANNER};
use crate::transport::MemoryTransport;
use chrono::TimeZone;

// ===== Test Helpers =====

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap()
}

fn at(ms: i64) -> DateTime<Utc> {
    t0() + TimeDelta::milliseconds(ms)
}

fn viewer() -> ViewerId {
    ViewerId::new("viewer-1").unwrap()
}

fn session(id: &str) -> SessionId {
    SessionId::new(id).unwrap()
}

fn ten_line_text() -> String {
    (1..=10)
        .map(|i| format!("line {i:02} has five words"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One viewer paced at one line per tick (1000 ms), ten lines, four visible,
/// with one registered session `s1`. No startup delay.
fn setup(auto_replay: bool) -> (SessionScrollLoop, StateStore, MemoryTransport) {
    let mut store = StateStore::default();
    store.create(&viewer(), t0());
    let state = store.get_mut(&viewer()).unwrap();
    state.set_line_width(40);
    state.set_text(&ten_line_text(), t0());
    state.set_visible_line_count(4);
    state.set_scroll_rate(300.0);
    state.set_tick_interval(1000);
    state.set_auto_replay(auto_replay);

    let mut scroll_loop = SessionScrollLoop::new(LoopTimings::from_millis(0, 5_000, 1_000));
    scroll_loop.open(session("s1"), viewer());
    (scroll_loop, store, MemoryTransport::new())
}

/// Fire timers in order until the next one is due after `until`.
fn drive(
    scroll_loop: &mut SessionScrollLoop,
    store: &mut StateStore,
    transport: &mut MemoryTransport,
    until: DateTime<Utc>,
) {
    while let Some(due) = scroll_loop.next_deadline() {
        if due > until {
            break;
        }
        scroll_loop.fire_due(due, store, transport);
    }
}

fn offset(store: &StateStore) -> usize {
    store.get(&viewer()).unwrap().current_line_offset()
}

fn phase(store: &StateStore) -> Phase {
    store.get(&viewer()).unwrap().phase()
}

// ===== Start / stop =====

#[test]
fn start_waits_for_startup_delay() {
    let (_, mut store, mut transport) = setup(false);
    let mut scroll_loop = SessionScrollLoop::new(LoopTimings::default());
    scroll_loop.open(session("s1"), viewer());

    assert!(scroll_loop.start(&session("s1"), t0()));
    assert_eq!(scroll_loop.next_deadline(), Some(at(1_000)));
    assert_eq!(scroll_loop.fire_due(at(999), &mut store, &mut transport), 0);
    assert!(transport.frames().is_empty());
    assert_eq!(scroll_loop.fire_due(at(1_000), &mut store, &mut transport), 1);
    assert_eq!(transport.frames().len(), 1);
}

#[test]
fn restart_keeps_a_single_pending_timer() {
    let (mut scroll_loop, _, _) = setup(false);
    scroll_loop.start(&session("s1"), t0());
    scroll_loop.start(&session("s1"), at(300));
    assert_eq!(scroll_loop.pending_timers(), 1);
    assert_eq!(scroll_loop.next_deadline(), Some(at(300)));
}

#[test]
fn start_unknown_session_is_refused() {
    let (mut scroll_loop, _, _) = setup(false);
    assert!(!scroll_loop.start(&session("nope"), t0()));
    assert_eq!(scroll_loop.pending_timers(), 0);
}

#[test]
fn stop_is_idempotent() {
    let (mut scroll_loop, _, _) = setup(false);
    scroll_loop.start(&session("s1"), t0());
    scroll_loop.stop(&session("s1"));
    scroll_loop.stop(&session("s1"));
    scroll_loop.stop(&session("unknown"));
    assert_eq!(scroll_loop.pending_timers(), 0);
    assert!(!scroll_loop.handle(&session("s1")).unwrap().is_active());
}

#[test]
fn closed_session_never_fires_again() {
    let (mut scroll_loop, mut store, mut transport) = setup(false);
    scroll_loop.start(&session("s1"), t0());
    let handle = scroll_loop.close(&session("s1")).unwrap();
    assert!(!handle.is_live());
    assert_eq!(scroll_loop.pending_timers(), 0);
    assert_eq!(scroll_loop.fire_due(at(60_000), &mut store, &mut transport), 0);
    assert!(transport.frames().is_empty());
}

// ===== Ticking =====

#[test]
fn each_tick_advances_and_displays() {
    let (mut scroll_loop, mut store, mut transport) = setup(false);
    scroll_loop.start(&session("s1"), t0());

    drive(&mut scroll_loop, &mut store, &mut transport, at(5_000));

    assert_eq!(offset(&store), 6);
    assert!(store.get(&viewer()).unwrap().is_at_end());
    assert_eq!(transport.count_for(&session("s1")), 6);
    let last = transport.last_frame_for(&session("s1")).unwrap();
    assert!(last.text.starts_with("[100%] | elapsed 00:05"));
    assert!(last.text.ends_with("line 10 has five words"));
    assert_eq!(last.options, DisplayOptions::default());
    assert_eq!(phase(&store), Phase::HoldingFinalLine);
}

#[test]
fn missing_viewer_state_stops_loop() {
    let (mut scroll_loop, mut store, mut transport) = setup(false);
    store.destroy(&viewer());
    scroll_loop.start(&session("s1"), t0());
    scroll_loop.fire_due(t0(), &mut store, &mut transport);
    assert!(transport.frames().is_empty());
    assert_eq!(scroll_loop.pending_timers(), 0);
}

// ===== End of text =====

#[test]
fn without_replay_loop_ends_on_banner() {
    let (mut scroll_loop, mut store, mut transport) = setup(false);
    scroll_loop.start(&session("s1"), t0());

    drive(&mut scroll_loop, &mut store, &mut transport, at(20_000));

    assert_eq!(phase(&store), Phase::Idle);
    assert_eq!(scroll_loop.pending_timers(), 0);
    // 10 window frames, 10 banner frames, 1 final banner frame.
    assert_eq!(transport.count_for(&session("s1")), 21);
    let last = transport.last_frame_for(&session("s1")).unwrap();
    assert_eq!(last.text, END_BANNER);

    drive(&mut scroll_loop, &mut store, &mut transport, at(600_000));
    assert_eq!(transport.count_for(&session("s1")), 21);
}

#[test]
fn banner_frames_carry_banner_duration() {
    let (mut scroll_loop, mut store, mut transport) = setup(false);
    scroll_loop.start(&session("s1"), t0());
    drive(&mut scroll_loop, &mut store, &mut transport, at(10_000));

    let last = transport.last_frame_for(&session("s1")).unwrap();
    assert_eq!(last.text, END_BANNER);
    assert_eq!(last.options.duration_ms, Some(10_000));
    assert!(scroll_loop
        .handle(&session("s1"))
        .unwrap()
        .pending(TimerKind::EndRefresh)
        .is_some());
    assert!(scroll_loop
        .handle(&session("s1"))
        .unwrap()
        .pending(TimerKind::Tick)
        .is_none());
}

#[test]
fn replay_resets_after_delay() {
    let (mut scroll_loop, mut store, mut transport) = setup(true);
    scroll_loop.start(&session("s1"), t0());

    drive(&mut scroll_loop, &mut store, &mut transport, at(20_000));
    assert!(store.get(&viewer()).unwrap().is_awaiting_replay());
    assert_eq!(offset(&store), 6);
    assert!(scroll_loop
        .handle(&session("s1"))
        .unwrap()
        .pending(TimerKind::ReplayDelay)
        .is_some());

    drive(&mut scroll_loop, &mut store, &mut transport, at(24_999));
    assert_eq!(offset(&store), 6);

    drive(&mut scroll_loop, &mut store, &mut transport, at(25_000));
    assert_eq!(offset(&store), 0);
    assert_eq!(phase(&store), Phase::Scrolling);
    assert!(!store.get(&viewer()).unwrap().is_awaiting_replay());
    let last = transport.last_frame_for(&session("s1")).unwrap();
    assert!(last.text.starts_with("[0%] | elapsed 00:00\nline 01 has five words"));

    drive(&mut scroll_loop, &mut store, &mut transport, at(26_000));
    assert_eq!(offset(&store), 1);
}

#[test]
fn cancelling_replay_ends_the_loop() {
    let (mut scroll_loop, mut store, mut transport) = setup(true);
    scroll_loop.start(&session("s1"), t0());
    drive(&mut scroll_loop, &mut store, &mut transport, at(20_000));

    assert_eq!(scroll_loop.cancel_replay_for_viewer(&viewer()), 1);
    assert_eq!(scroll_loop.pending_timers(), 0);
    assert!(!scroll_loop.handle(&session("s1")).unwrap().is_active());
    assert_eq!(scroll_loop.cancel_replay_for_viewer(&viewer()), 0);
}

// ===== Failure handling =====

#[test]
fn transport_failure_stops_only_that_session() {
    let (mut scroll_loop, mut store, mut transport) = setup(false);
    scroll_loop.open(session("s2"), viewer());
    scroll_loop.start(&session("s1"), t0());
    scroll_loop.start(&session("s2"), t0());
    scroll_loop.fire_due(t0(), &mut store, &mut transport);

    transport.close(&session("s1"));
    scroll_loop.fire_due(at(1_000), &mut store, &mut transport);

    let s1 = scroll_loop.handle(&session("s1")).unwrap();
    assert!(!s1.is_live());
    assert!(s1.pending(TimerKind::Tick).is_none());
    assert_eq!(transport.count_for(&session("s1")), 1);

    let s2 = scroll_loop.handle(&session("s2")).unwrap();
    assert!(s2.is_live());
    assert!(s2.pending(TimerKind::Tick).is_some());
    assert_eq!(transport.count_for(&session("s2")), 2);

    // A dead session cannot be restarted.
    assert!(!scroll_loop.start(&session("s1"), at(1_000)));
}

#[test]
fn failing_pacer_does_not_skip_a_line_for_survivors() {
    let (mut scroll_loop, mut store, mut transport) = setup(false);
    scroll_loop.open(session("s2"), viewer());
    scroll_loop.start(&session("s1"), t0());
    scroll_loop.start(&session("s2"), t0());
    scroll_loop.fire_due(t0(), &mut store, &mut transport);
    assert_eq!(offset(&store), 1);

    transport.close(&session("s1"));
    scroll_loop.fire_due(at(1_000), &mut store, &mut transport);
    assert_eq!(offset(&store), 2);
    assert!(transport
        .last_frame_for(&session("s2"))
        .unwrap()
        .text
        .ends_with("line 06 has five words"));

    scroll_loop.fire_due(at(2_000), &mut store, &mut transport);
    assert_eq!(offset(&store), 3);
}

// ===== Shared viewer state =====

#[test]
fn only_oldest_session_paces_the_viewer() {
    let (mut scroll_loop, mut store, mut transport) = setup(false);
    scroll_loop.open(session("s2"), viewer());
    scroll_loop.start(&session("s1"), t0());
    scroll_loop.start(&session("s2"), t0());

    scroll_loop.fire_due(t0(), &mut store, &mut transport);
    assert_eq!(offset(&store), 1);
    assert_eq!(transport.count_for(&session("s1")), 1);
    assert_eq!(transport.count_for(&session("s2")), 1);
    assert_eq!(
        transport.last_frame_for(&session("s1")).unwrap().text,
        transport.last_frame_for(&session("s2")).unwrap().text
    );

    scroll_loop.fire_due(at(1_000), &mut store, &mut transport);
    assert_eq!(offset(&store), 2);

    scroll_loop.close(&session("s1"));
    scroll_loop.fire_due(at(2_000), &mut store, &mut transport);
    assert_eq!(offset(&store), 3);
}

#[test]
fn sessions_for_lists_oldest_first() {
    let (mut scroll_loop, _, _) = setup(false);
    scroll_loop.open(session("b"), viewer());
    scroll_loop.open(session("a"), viewer());
    scroll_loop.open(session("other"), ViewerId::new("viewer-2").unwrap());
    assert_eq!(
        scroll_loop.sessions_for(&viewer()),
        vec![session("s1"), session("b"), session("a")]
    );
}

#[test]
fn open_twice_keeps_original_handle() {
    let (mut scroll_loop, _, _) = setup(false);
    assert!(!scroll_loop.open(session("s1"), ViewerId::new("someone-else").unwrap()));
    assert_eq!(scroll_loop.handle(&session("s1")).unwrap().viewer(), &viewer());
}

#[test]
fn end_refresh_floor_is_enforced() {
    let timings = LoopTimings::from_millis(0, 0, 0);
    assert_eq!(
        timings.end_refresh,
        TimeDelta::milliseconds(MIN_END_REFRESH_MS as i64)
    );
    assert_eq!(
        timings.replay_delay,
        TimeDelta::milliseconds(MIN_REPLAY_DELAY_MS as i64)
    );
}

#[test]
fn zero_end_timings_with_replay_return_from_firing() {
    let mut store = StateStore::new(EndTimings::from_millis(0, 0));
    store.create(&viewer(), t0());
    let state = store.get_mut(&viewer()).unwrap();
    state.set_text("short", t0());
    state.set_auto_replay(true);

    let mut scroll_loop = SessionScrollLoop::new(LoopTimings::from_millis(0, 0, 0));
    let mut transport = MemoryTransport::new();
    scroll_loop.open(session("s1"), viewer());
    scroll_loop.start(&session("s1"), t0());

    assert_eq!(scroll_loop.fire_due(t0(), &mut store, &mut transport), 1);
    assert!(store.get(&viewer()).unwrap().is_awaiting_replay());
    assert_eq!(scroll_loop.next_deadline(), Some(at(MIN_REPLAY_DELAY_MS as i64)));
    assert_eq!(transport.last_frame_for(&session("s1")).unwrap().text, END_BANNER);
}
