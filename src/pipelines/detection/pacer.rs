// SPDX-License-Identifier: GPL-3.0-only

//! Cycle pacing

use std::time::{Duration, Instant};

/// Idle time before the next cycle: `max(target - elapsed, 0)`
///
/// A zero target means "as fast as possible" and always yields zero.
pub fn next_delay(target: Duration, elapsed: Duration) -> Duration {
    target.saturating_sub(elapsed)
}

/// Sleep for `delay` in slices of at most `slice`, checking `should_stop`
/// before each slice
///
/// Returns `true` if the full delay elapsed and `false` if it was cut
/// short by a stop request. A delay past the end of the clock waits for
/// the stop request.
pub fn sleep_interruptible(
    delay: Duration,
    slice: Duration,
    should_stop: impl Fn() -> bool,
) -> bool {
    let deadline = Instant::now().checked_add(delay);
    let slice = slice.max(Duration::from_millis(1));

    loop {
        if should_stop() {
            return false;
        }
        let remaining = match deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => slice,
        };
        if remaining.is_zero() {
            return true;
        }
        std::thread::sleep(remaining.min(slice));
    }
}
