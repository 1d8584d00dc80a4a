//! GPS time-of-week arithmetic.
//!
//! Epoch tags are milliseconds into the GPS week and wrap to zero at the week
//! boundary, so ordering is decided inside a half-week window.

/// Milliseconds in one GPS week.
pub const WEEK_MS: u32 = 604_800_000;

const HALF_WEEK_MS: u32 = WEEK_MS / 2;

/// Milliseconds from `earlier` to `later`, crossing the week boundary if needed.
///
/// Tags at or above [`WEEK_MS`] are out of range on the wire but still accepted;
/// the sum is taken in `u64` so they cannot overflow.
pub fn elapsed_ms(earlier: u32, later: u32) -> u32 {
    if later >= earlier {
        later - earlier
    } else {
        let wrapped = (u64::from(later) + u64::from(WEEK_MS)).saturating_sub(u64::from(earlier));
        u32::try_from(wrapped).unwrap_or(u32::MAX)
    }
}

/// True when `candidate` is a later epoch than `current`.
pub fn is_newer(candidate: u32, current: u32) -> bool {
    candidate != current && elapsed_ms(current, candidate) < HALF_WEEK_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_ordering() {
        assert!(is_newer(1_000, 800));
        assert!(!is_newer(800, 1_000));
        assert!(!is_newer(800, 800));
    }

    #[test]
    fn test_week_rollover() {
        let last = WEEK_MS - 50;
        assert!(is_newer(0, last));
        assert!(is_newer(150, last));
        assert!(!is_newer(last, 150));
        assert_eq!(elapsed_ms(last, 150), 200);
    }

    #[test]
    fn test_elapsed() {
        assert_eq!(elapsed_ms(1_000, 1_250), 250);
        assert_eq!(elapsed_ms(5, 5), 0);
    }

    #[test]
    fn test_out_of_range_tags_do_not_overflow() {
        assert_eq!(elapsed_ms(4_000_000_000, 3_900_000_000), 504_800_000);
        assert_eq!(elapsed_ms(u32::MAX, 0), 0);
        assert_eq!(elapsed_ms(u32::MAX - 1, u32::MAX), 1);
        assert!(!is_newer(3_900_000_000, 4_000_000_000));
        assert!(is_newer(4_000_000_000, 3_900_000_000));
    }
}
