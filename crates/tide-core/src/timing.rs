//! Round timing helpers shared by the catch-up engine and the CLI.

/// Minimum lead time the ledger demands between "now" and a round's start
/// time when a market is resumed. Resuming with a start time closer than
/// this is rejected as "too early".
pub const START_TIME_BUFFER_MS: u64 = 5_000;

/// Next safe start time for a resumed market.
///
/// Rounds start on interval boundaries. Taking the boundary right after
/// `now + START_TIME_BUFFER_MS` and then stepping one more interval forward
/// keeps the start strictly in the future even when the buffered time lands
/// exactly on a boundary.
///
/// `interval_ms` must be > 0; markets with a zero interval are malformed.
#[must_use]
pub fn align_to_next_interval(now_ms: u64, interval_ms: u64) -> u64 {
    let buffered = now_ms + START_TIME_BUFFER_MS;
    let next_boundary = buffered.div_ceil(interval_ms) * interval_ms;
    next_boundary + interval_ms
}

/// Settlement anchor for a round: its start time in whole seconds. The
/// ledger validates the settlement price against this second.
#[must_use]
pub fn anchor_time_sec(start_time_ms: u64) -> u64 {
    start_time_ms / 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_start_is_on_boundary_and_past_buffer() {
        let interval = 300_000;
        let now = 1_700_000_123_456;

        let start = align_to_next_interval(now, interval);

        assert_eq!(start % interval, 0);
        assert!(start > now + START_TIME_BUFFER_MS);
    }

    #[test]
    fn exact_boundary_still_moves_forward() {
        let interval = 60_000;
        // now + buffer lands exactly on a boundary.
        let now = 10 * interval - START_TIME_BUFFER_MS;

        let start = align_to_next_interval(now, interval);

        assert_eq!(start, 11 * interval);
        assert!(start > now + START_TIME_BUFFER_MS);
    }

    #[test]
    fn skips_at_least_one_full_interval() {
        let interval = 300_000;
        let now = 1_700_000_000_000;

        let start = align_to_next_interval(now, interval);

        // Between one and two intervals of margin past the buffered time.
        let buffered = now + START_TIME_BUFFER_MS;
        assert!(start - buffered >= interval);
        assert!(start - buffered < 2 * interval);
    }

    #[test]
    fn anchor_truncates_to_seconds() {
        assert_eq!(anchor_time_sec(1_700_000_123_999), 1_700_000_123);
        assert_eq!(anchor_time_sec(0), 0);
    }
}
