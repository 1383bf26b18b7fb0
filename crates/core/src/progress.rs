//! Progress percentage helpers.

/// Lowest accepted progress value.
pub const PROGRESS_MIN: i16 = 0;

/// Highest accepted progress value.
pub const PROGRESS_MAX: i16 = 100;

/// Clamp an arbitrary reported value into `[0, 100]`.
pub fn clamp_progress(value: i64) -> i16 {
    value.clamp(PROGRESS_MIN as i64, PROGRESS_MAX as i64) as i16
}

/// Percentage reached after `step` of `total` equal steps, rounded down.
///
/// A `total` of zero is treated as already finished.
pub fn step_percent(step: u32, total: u32) -> i16 {
    if total == 0 {
        return PROGRESS_MAX;
    }
    clamp_progress(step as i64 * PROGRESS_MAX as i64 / total as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_keeps_in_range_values() {
        assert_eq!(clamp_progress(0), 0);
        assert_eq!(clamp_progress(42), 42);
        assert_eq!(clamp_progress(100), 100);
    }

    #[test]
    fn clamp_bounds_out_of_range_values() {
        assert_eq!(clamp_progress(-5), 0);
        assert_eq!(clamp_progress(250), 100);
        assert_eq!(clamp_progress(i64::MAX), 100);
    }

    #[test]
    fn step_percent_divides_evenly() {
        assert_eq!(step_percent(0, 10), 0);
        assert_eq!(step_percent(3, 10), 30);
        assert_eq!(step_percent(10, 10), 100);
    }

    #[test]
    fn step_percent_rounds_down() {
        assert_eq!(step_percent(1, 3), 33);
        assert_eq!(step_percent(2, 3), 66);
    }

    #[test]
    fn step_percent_zero_total_is_complete() {
        assert_eq!(step_percent(0, 0), 100);
    }
}
