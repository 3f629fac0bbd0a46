//! Integration tests for full match flows
//!
//! Drives the engine through complete matches with a hand-advanced clock,
//! checking round progression, golden point and the notifications emitted
//! along the way.

use tkd_engine::{
    ConfigPatch, ManualClock, MatchEngine, MatchStatus, Side, Snapshot, TimerObserver, Winner,
    Zone,
};

#[derive(Default)]
struct Notifications {
    ticks: usize,
    round_ends: Vec<Snapshot>,
}

impl TimerObserver for Notifications {
    fn on_tick(&mut self, _snapshot: &Snapshot) {
        self.ticks += 1;
    }

    fn on_round_end(&mut self, snapshot: &Snapshot) {
        self.round_ends.push(snapshot.clone());
    }
}

/// Tick every 100ms of simulated time until `seconds` have passed
fn run_clock(
    engine: &mut MatchEngine<ManualClock>,
    clock: &ManualClock,
    seconds: u32,
    observer: &mut Notifications,
) {
    for _ in 0..(seconds * 10) {
        clock.advance_ms(100);
        engine.tick(observer);
    }
}

/// Test: two short rounds ending level arm the golden point
#[test]
fn test_two_round_scenario_reaches_golden_point() {
    let clock = ManualClock::starting_now();
    let mut engine = MatchEngine::with_clock(clock.clone());
    engine.configure(&ConfigPatch {
        rounds: Some(2),
        round_duration: Some(1),
        golden_point: Some(true),
        consensus_enabled: Some(false),
        ..Default::default()
    });

    let mut notifications = Notifications::default();
    engine.start_timer();
    run_clock(&mut engine, &clock, 1, &mut notifications);

    assert_eq!(notifications.round_ends.len(), 1);
    let first = &notifications.round_ends[0].state;
    assert_eq!(first.status, MatchStatus::RoundEnd);
    assert_eq!(first.current_round, 2);
    assert_eq!(first.timer, 1.0);

    engine.start_timer();
    run_clock(&mut engine, &clock, 1, &mut notifications);

    assert_eq!(notifications.round_ends.len(), 2);
    let second = &notifications.round_ends[1].state;
    assert_eq!(second.status, MatchStatus::RoundEnd);
    assert!(second.is_golden_point);
    assert_eq!(second.timer, 1.0);
    assert_eq!(second.winner, None);
    assert_eq!(notifications.ticks, 20);
}

/// Test: a full three-round match judged by consensus
#[test]
fn test_full_match_with_consensus() {
    let clock = ManualClock::starting_now();
    let mut engine = MatchEngine::with_clock(clock.clone());
    engine.configure(&ConfigPatch {
        round_duration: Some(2),
        ..Default::default()
    });
    for (conn, seat) in [("phone-1", 1), ("phone-2", 2), ("phone-3", 3)] {
        assert!(engine.register_seat(conn, seat).is_applied());
    }

    let mut notifications = Notifications::default();

    // round 1: judges 1 and 3 agree on a red head kick
    engine.start_timer();
    assert!(!engine.submit_score(1, Side::Red, Zone::Head).is_awarded());
    clock.advance_ms(250);
    assert!(engine.submit_score(3, Side::Red, Zone::Head).is_awarded());
    run_clock(&mut engine, &clock, 2, &mut notifications);
    assert_eq!(engine.state().current_round, 2);

    // operator confirms, then round 2: blue takes a gam-jeom
    assert!(engine.advance_from_round_end().is_applied());
    engine.start_timer();
    engine.submit_penalty(Side::Blue);
    run_clock(&mut engine, &clock, 2, &mut notifications);

    // round 3: a lone judge vote never counts
    engine.start_timer();
    engine.submit_score(2, Side::Blue, Zone::Body);
    run_clock(&mut engine, &clock, 2, &mut notifications);

    let state = engine.state();
    assert_eq!(state.status, MatchStatus::MatchEnd);
    assert_eq!(state.scores.red, 3);
    assert_eq!(state.scores.blue, 0);
    assert_eq!(state.penalty_points.red, 1);
    assert_eq!(state.winner, Some(Winner::Red));
    assert_eq!(notifications.round_ends.len(), 3);

    // terminal until a new match
    engine.start_timer();
    assert_eq!(engine.state().status, MatchStatus::MatchEnd);
    let fresh = engine.new_match();
    assert_eq!(fresh.state.status, MatchStatus::Idle);
    assert_eq!(fresh.judges.len(), 3);
}

/// Test: seat handover after a judge's phone drops
#[test]
fn test_seat_handover_after_disconnect() {
    let mut engine = MatchEngine::new();

    assert!(engine.register_seat("conn-a", 2).is_applied());
    assert!(!engine.register_seat("conn-b", 2).is_applied());

    engine.disconnect_seat("conn-a");
    assert!(engine.register_seat("conn-b", 2).is_applied());

    // the original holder can no longer reclaim it
    assert!(!engine.register_seat("conn-a", 2).is_applied());
}
