use std::sync::Arc;

use error_backoff::{
    Entry, Interval, IntervalName, ManualClock, SharedTracker, Tracker, TrackerError,
};

const MINUTE_MS: u64 = 60_000;
const HOUR_MS: u64 = 60 * MINUTE_MS;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn tracker_with(intervals: &[Interval]) -> (Tracker, Arc<ManualClock>) {
    init_logging();

    let clock = Arc::new(ManualClock::new(0));
    let tracker = Tracker::with_clock(intervals.iter().copied(), clock.clone()).unwrap();

    (tracker, clock)
}

fn minute() -> Interval {
    Interval::new(IntervalName::Minute, MINUTE_MS)
}

#[test]
fn total_counts_failures_within_duration_of_latest() {
    let (mut tracker, clock) = tracker_with(&[minute()]);
    let mut recorded = Vec::new();
    let mut now = 0;

    // Irregular gaps so some steps evict several entries at once.
    for step in 0..200u64 {
        now += step * 7_919 % 3_001;
        if step % 50 == 49 {
            now += MINUTE_MS / 2;
        }
        clock.set(now);
        tracker.request_failed_observed(format!("k{}", step % 3)).unwrap();
        recorded.push(now);

        let expected = recorded
            .iter()
            .filter(|t| **t >= now.saturating_sub(MINUTE_MS))
            .count();
        assert_eq!(
            tracker.total_in_interval(IntervalName::Minute),
            Ok(expected),
            "at t={now}"
        );
    }
}

#[test]
fn observed_request_after_duration_evicts_everything() {
    let (mut tracker, _) = tracker_with(&[minute()]);
    let t0 = 5_000;

    tracker.request_failed_observed_at("x", t0).unwrap();
    tracker.request_observed_at(t0 + MINUTE_MS + 1).unwrap();

    assert_eq!(tracker.total_in_interval(IntervalName::Minute), Ok(0));
}

#[test]
fn entry_exactly_at_cutoff_is_retained() {
    let (mut tracker, _) = tracker_with(&[minute()]);
    let now = 100_000;

    tracker
        .request_failed_observed_at("old", now - MINUTE_MS - 1)
        .unwrap();
    tracker.request_failed_observed_at("edge", now - MINUTE_MS).unwrap();
    tracker.request_observed_at(now).unwrap();

    assert_eq!(
        tracker.entries_for_key_in_interval(IntervalName::Minute, "edge"),
        Ok(vec![Entry::new("edge", now - MINUTE_MS)])
    );
    assert_eq!(
        tracker.entries_for_key_in_interval(IntervalName::Minute, "old"),
        Ok(vec![])
    );
    assert_eq!(tracker.total_in_interval(IntervalName::Minute), Ok(1));
}

#[test]
fn keys_are_isolated() {
    let (mut tracker, _) = tracker_with(&[minute()]);

    for (i, key) in ["A", "B", "A", "B", "B"].into_iter().enumerate() {
        tracker.request_failed_observed_at(key, i as u64).unwrap();
    }

    let a = tracker
        .entries_for_key_in_interval(IntervalName::Minute, "A")
        .unwrap();
    assert_eq!(a.len(), 2);
    assert!(a.iter().all(|e| e.key() == "A"));

    let b = tracker
        .entries_for_key_in_interval(IntervalName::Minute, "B")
        .unwrap();
    assert_eq!(b.len(), 3);
    assert!(b.iter().all(|e| e.key() == "B"));
}

#[test]
fn shutdown_empties_every_interval() {
    let (mut tracker, clock) = tracker_with(&[minute(), Interval::canonical(IntervalName::Hour)]);

    for key in ["a", "b", "a"] {
        clock.advance(10);
        tracker.request_failed_observed(key).unwrap();
    }
    tracker.request_observed().unwrap();

    tracker.shutdown();

    for name in [IntervalName::Minute, IntervalName::Hour] {
        assert_eq!(tracker.total_in_interval(name), Ok(0));
        assert_eq!(tracker.entries_in_interval(name), Ok(vec![]));
        assert_eq!(tracker.entries_for_key_in_interval(name, "a"), Ok(vec![]));
    }
    assert_eq!(tracker.request_observed(), Err(TrackerError::ShutDown));
}

#[test]
fn queries_stay_stale_until_next_event() {
    let (mut tracker, clock) = tracker_with(&[minute()]);

    clock.set(0);
    tracker.request_failed_observed("x").unwrap();
    clock.set(30_000);
    tracker.request_failed_observed("x").unwrap();

    clock.set(61_000);
    assert_eq!(tracker.total_in_interval(IntervalName::Minute), Ok(2));

    tracker.request_observed().unwrap();
    assert_eq!(tracker.total_in_interval(IntervalName::Minute), Ok(1));
    assert_eq!(
        tracker.entries_for_key_in_interval(IntervalName::Minute, "x"),
        Ok(vec![Entry::new("x", 30_000)])
    );
}

#[test]
fn stale_failure_event_prunes_before_recording() {
    let (mut tracker, clock) = tracker_with(&[minute()]);

    tracker.request_failed_observed("x").unwrap();
    clock.set(30_000);
    tracker.request_failed_observed("x").unwrap();

    clock.set(61_000);
    tracker.request_failed_observed("x").unwrap();

    assert_eq!(tracker.total_in_interval(IntervalName::Minute), Ok(2));
}

#[test]
fn one_failure_updates_every_interval_at_the_same_instant() {
    let (mut tracker, clock) =
        tracker_with(&[minute(), Interval::new(IntervalName::Hour, HOUR_MS)]);

    clock.set(HOUR_MS);
    tracker.request_failed_observed("early").unwrap();

    clock.set(HOUR_MS + 2 * MINUTE_MS);
    let entry = tracker.request_failed_observed("x").unwrap();

    let minute_entries = tracker.entries_in_interval(IntervalName::Minute).unwrap();
    let hour_entries = tracker.entries_in_interval(IntervalName::Hour).unwrap();

    assert_eq!(minute_entries, vec![entry.clone()]);
    assert_eq!(hour_entries.last(), Some(&entry));
    assert_eq!(hour_entries.len(), 2);
    assert_eq!(tracker.total_in_interval(IntervalName::Minute), Ok(1));
    assert_eq!(tracker.total_in_interval(IntervalName::Hour), Ok(2));
}

#[test]
fn shared_handle_applies_the_same_semantics() {
    init_logging();

    let clock = Arc::new(ManualClock::new(0));
    let tracker = SharedTracker::from(Tracker::with_clock([minute()], clock.clone()).unwrap());

    tracker.request_failed_observed("x").unwrap();
    clock.set(MINUTE_MS + 1);
    assert_eq!(tracker.total_in_interval(IntervalName::Minute), Ok(1));

    tracker.request_observed().unwrap();
    assert_eq!(tracker.snapshot().total(IntervalName::Minute), Some(0));

    tracker.shutdown();
    assert!(tracker.snapshot().shut_down);
    assert_eq!(
        tracker.request_failed_observed("x"),
        Err(TrackerError::ShutDown)
    );
}
