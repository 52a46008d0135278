//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Round a f64 and clamp it to the i64 range, returning 0 for NaN values.
#[must_use]
pub fn round_f64_to_i64(value: f64) -> i64 {
    if value.is_nan() {
        return 0;
    }
    let min = cast::<i64, f64>(i64::MIN).unwrap_or(f64::MIN);
    let max = cast::<i64, f64>(i64::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max).round();
    // i64::MAX is not representable as f64; the clamp lands one past it.
    cast::<f64, i64>(clamped).unwrap_or(if clamped > 0.0 { i64::MAX } else { i64::MIN })
}

/// Convert a count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Convert an i64 to f64, accepting precision loss for very large values.
#[must_use]
pub fn i64_to_f64(value: i64) -> f64 {
    cast::<i64, f64>(value).unwrap_or(0.0)
}

/// Convert a count to i64, saturating at `i64::MAX`.
#[must_use]
pub fn usize_to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Floor a running total at zero and narrow it to the reported score type.
#[must_use]
pub fn non_negative_score(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

/// Integer percentage of `value` against `max`, floored. A zero or
/// negative `max` yields 0.
#[must_use]
pub fn floor_percent(value: i64, max: i64) -> u32 {
    if max <= 0 {
        return 0;
    }
    let scaled = value.max(0).saturating_mul(crate::constants::PERCENT_SCALE) / max;
    non_negative_score(scaled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounders_cover_ranges() {
        assert_eq!(round_f64_to_i64(1.6), 2);
        assert_eq!(round_f64_to_i64(f64::NAN), 0);
        assert_eq!(round_f64_to_i64(f64::MAX), i64::MAX);
    }

    #[test]
    fn scores_never_go_negative() {
        assert_eq!(non_negative_score(-15), 0);
        assert_eq!(non_negative_score(42), 42);
        assert_eq!(non_negative_score(i64::MAX), u32::MAX);
    }

    #[test]
    fn percent_floors_and_guards_zero_max() {
        assert_eq!(floor_percent(119, 120), 99);
        assert_eq!(floor_percent(120, 120), 100);
        assert_eq!(floor_percent(96, 120), 80);
        assert_eq!(floor_percent(10, 0), 0);
        assert_eq!(floor_percent(-5, 120), 0);
    }
}
