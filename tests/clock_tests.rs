use ring_logger::efficient_clock::{get_timestamp, ticks_since};
use std::thread;
use std::time::Duration;

#[test]
fn test_timestamp_monotonicity() {
    let mut prev = get_timestamp();
    for _ in 0..1000 {
        let current = get_timestamp();
        assert!(current >= prev, "Timestamps should be monotonically increasing");
        prev = current;
    }
}

#[test]
fn test_timestamp_advances_over_sleep() {
    let first = get_timestamp();
    thread::sleep(Duration::from_millis(1));
    let second = get_timestamp();
    assert!(second > first, "Timestamp should advance across a 1ms sleep");
}

#[test]
fn test_ticks_since() {
    let start = get_timestamp();
    thread::sleep(Duration::from_micros(100));
    assert!(ticks_since(start) > 0, "Elapsed ticks should be positive after a sleep");

    // A start value in the future saturates instead of wrapping.
    assert_eq!(ticks_since(u64::MAX), 0);
}

#[test]
fn test_high_frequency_timestamps() {
    let mut timestamps = Vec::with_capacity(10000);
    for _ in 0..10000 {
        timestamps.push(get_timestamp());
    }
    for window in timestamps.windows(2) {
        assert!(window[1] >= window[0], "Timestamps should be monotonic under high frequency");
    }
}
