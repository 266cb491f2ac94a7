use std::time::Duration;

/// Converts two readings of a byte counter into megabits per second.
///
/// `elapsed` is `None` when there is no baseline yet. No baseline, a
/// non-positive interval, or a counter that went backwards (reset or wrap)
/// all yield `0.0`.
pub fn rate_mbps(previous: u64, current: u64, elapsed: Option<Duration>) -> f64 {
    let Some(elapsed) = elapsed else {
        return 0.0;
    };
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }

    let delta = current.saturating_sub(previous);
    round_to(delta as f64 * 8.0 / (secs * 1_000_000.0), 2)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
