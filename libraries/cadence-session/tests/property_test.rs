//! Property-based tests for the playback session
//!
//! Uses proptest to check invariants across random inputs and random
//! interleavings of intents and media events.

mod common;

use cadence_session::{
    LoopMode, MediaFailure, PlaybackStatus, QueueManager, SkipQuotaPolicy, Tier, Track,
};
use chrono::{Duration, TimeZone, Utc};
use common::{create_test_track, create_tracks, Harness};
use proptest::prelude::*;

// ===== Helpers =====

fn any_position() -> impl Strategy<Value = f64> {
    prop_oneof![
        -1_000.0f64..1_000.0,
        Just(f64::NAN),
        Just(f64::INFINITY),
        Just(f64::NEG_INFINITY),
    ]
}

fn any_loop_mode() -> impl Strategy<Value = LoopMode> {
    prop_oneof![Just(LoopMode::None), Just(LoopMode::All), Just(LoopMode::One)]
}

#[derive(Debug, Clone)]
enum Op {
    Next,
    Previous,
    TogglePlayPause,
    Seek(f64),
    ToggleLoop,
    AddTracks(usize),
    ClearQueue,
    PlayAt(usize),
    Metadata(f64),
    TimeUpdate(f64),
    Ended,
    Error,
    StaleMetadata,
}

fn any_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Next),
        Just(Op::Previous),
        Just(Op::TogglePlayPause),
        any_position().prop_map(Op::Seek),
        Just(Op::ToggleLoop),
        (1usize..4).prop_map(Op::AddTracks),
        Just(Op::ClearQueue),
        (0usize..8).prop_map(Op::PlayAt),
        (-10.0f64..600.0).prop_map(Op::Metadata),
        any_position().prop_map(Op::TimeUpdate),
        Just(Op::Ended),
        Just(Op::Error),
        Just(Op::StaleMetadata),
    ]
}

fn apply(h: &mut Harness, op: Op, added: &mut usize) {
    let has_load = !h.recorder.loads().is_empty();
    match op {
        Op::Next => {
            let _ = h.session.next();
        }
        Op::Previous => {
            let _ = h.session.previous();
        }
        Op::TogglePlayPause => {
            let _ = h.session.toggle_play_pause();
        }
        Op::Seek(t) => {
            let _ = h.session.seek(t);
        }
        Op::ToggleLoop => {
            h.session.toggle_loop();
        }
        Op::AddTracks(n) => {
            let tracks: Vec<Track> = (0..n)
                .map(|i| create_test_track(&format!("p{}", *added + i)))
                .collect();
            *added += n;
            let _ = h.session.add_to_queue(tracks);
        }
        Op::ClearQueue => h.session.clear_queue(),
        Op::PlayAt(i) => {
            let _ = h.session.play_at(i);
        }
        Op::Metadata(d) if has_load => h.metadata(d),
        Op::TimeUpdate(t) if has_load => h.time_update(t),
        Op::Ended if has_load => h.ended(),
        Op::Error if has_load => h.error(MediaFailure::Load("random".to_string())),
        Op::StaleMetadata if has_load => {
            h.recorder.sink(0).metadata(1.0);
            h.pump();
        }
        _ => {}
    }
}

// ===== Property Tests =====

proptest! {
    /// Property: seek never leaves the position outside [0, duration]
    #[test]
    fn seek_result_always_within_track(
        duration in 1.0f64..600.0,
        seeks in prop::collection::vec(any_position(), 1..30)
    ) {
        let mut h = Harness::new(Tier::Free);
        h.session.add_to_queue(vec![create_test_track("a")]).unwrap();
        h.metadata(duration);

        for t in seeks {
            h.session.seek(t).unwrap();
            let now = h.session.current_time();
            prop_assert!((0.0..=duration).contains(&now), "position {} outside [0, {}]", now, duration);
        }
    }

    /// Property: seek_percent lands on the same clamp as seek
    #[test]
    fn seek_percent_matches_fraction_of_duration(
        duration in 1.0f64..600.0,
        fraction in -1.0f64..2.0
    ) {
        let mut h = Harness::new(Tier::Premium);
        h.session.add_to_queue(vec![create_test_track("a")]).unwrap();
        h.metadata(duration);

        h.session.seek_percent(fraction).unwrap();
        let expected = duration * fraction.clamp(0.0, 1.0);
        prop_assert!((h.session.current_time() - expected).abs() < 1e-9);
    }

    /// Property: the queue index always points into the queue
    #[test]
    fn queue_index_stays_in_bounds(
        initial in 0usize..10,
        ops in prop::collection::vec((0u8..4, 0usize..12), 1..40),
        loop_mode in any_loop_mode()
    ) {
        let mut queue = QueueManager::new();
        queue.append(create_tracks(initial));

        for (op, n) in ops {
            match op {
                0 => queue.append(create_tracks(n % 3)),
                1 => { queue.remove(n); }
                2 => {
                    if let Some(next) = queue.next_index(loop_mode) {
                        queue.select(next);
                    }
                }
                _ => {
                    if let Some(prev) = queue.previous_index(loop_mode) {
                        queue.select(prev);
                    }
                }
            }

            if let Some(index) = queue.current_index() {
                prop_assert!(index < queue.len());
            }
        }
    }

    /// Property: next then previous returns to the same index away from the edges
    #[test]
    fn next_and_previous_are_inverse_inside_queue(
        len in 3usize..20,
        start in 1usize..18,
        loop_mode in any_loop_mode()
    ) {
        prop_assume!(start + 1 < len);
        let mut queue = QueueManager::new();
        queue.append(create_tracks(len));
        queue.select(start);

        let next = queue.next_index(loop_mode).unwrap();
        prop_assert_eq!(next, start + 1);
        queue.select(next);
        prop_assert_eq!(queue.previous_index(loop_mode), Some(start));
    }

    /// Property: quota never exceeds its limit and consumption inside one
    /// window is monotonic
    #[test]
    fn quota_remaining_bounded_and_monotonic(
        limit in 1u32..20,
        steps in prop::collection::vec((0i64..30, any::<bool>()), 1..60)
    ) {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let window = Duration::hours(1);
        let mut policy = SkipQuotaPolicy::new(limit, window, start);
        let mut now = start;
        let mut last = policy.remaining(Tier::Free, now).unwrap();

        for (minutes, consume) in steps {
            now += Duration::minutes(minutes);
            let window_elapsed = now - policy.quota().window_start >= window;

            if consume && policy.can_skip(Tier::Free, now) {
                policy.consume(Tier::Free, now);
            }

            let remaining = policy.remaining(Tier::Free, now).unwrap();
            prop_assert!(remaining <= limit);
            if !window_elapsed {
                prop_assert!(remaining <= last);
            }
            last = remaining;
        }
    }

    /// Property: random interleavings of intents and media events keep the
    /// session consistent
    #[test]
    fn session_invariants_hold_under_random_ops(
        ops in prop::collection::vec(any_op(), 1..60),
        tier in prop_oneof![Just(Tier::Free), Just(Tier::Premium)]
    ) {
        let mut h = Harness::new(tier);
        let mut added = 0;

        for op in ops {
            apply(&mut h, op, &mut added);

            let snapshot = h.session.snapshot();
            prop_assert!(snapshot.current_time_seconds >= 0.0);
            prop_assert!(snapshot.current_time_seconds <= snapshot.duration_seconds);
            if let Some(index) = snapshot.queue_index {
                prop_assert!(index < snapshot.queue.len());
            }
            if snapshot.status == PlaybackStatus::Error {
                prop_assert!(!snapshot.is_playing);
            }
            if snapshot.status == PlaybackStatus::Idle {
                prop_assert!(snapshot.current_track.is_none());
            }
            if let Some(remaining) = snapshot.skips_remaining {
                prop_assert!(remaining <= 10);
            }
            prop_assert_eq!(snapshot.skips_remaining.is_none(), tier == Tier::Premium);
        }
    }
}
