//! RFC 1982 serial-number arithmetic over 32-bit `frame_id`s.
//!
//! `frame_id` wraps around `u32::MAX`; ordering is defined by the sign of
//! the wrapping difference rather than a plain numeric comparison.

/// `true` iff `a` is newer than `b` under wrap-safe serial arithmetic.
pub fn is_newer(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) > 0
}

/// `true` iff `a` is older than `b` under wrap-safe serial arithmetic.
pub fn is_older(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) < 0
}

/// Signed distance `a - b`, positive when `a` is newer.
pub fn distance(a: u32, b: u32) -> i32 {
    a.wrapping_sub(b) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn adjacent_values() {
        assert!(is_newer(11, 10));
        assert!(is_older(9, 10));
        assert!(!is_newer(10, 10));
        assert!(!is_older(10, 10));
    }

    #[test]
    fn wraps_around_u32_max() {
        assert!(is_newer(0, u32::MAX));
        assert!(is_older(u32::MAX, 0));
    }

    proptest! {
        #[test]
        fn newer_and_older_are_inverses(a in any::<u32>(), b in any::<u32>()) {
            if a != b {
                prop_assert_eq!(is_newer(a, b), is_older(b, a));
            }
        }

        #[test]
        fn never_newer_than_self(a in any::<u32>()) {
            prop_assert!(!is_newer(a, a));
            prop_assert!(!is_older(a, a));
        }

        #[test]
        fn stable_across_half_plane(a in any::<u32>(), delta in 1i64..=i32::MAX as i64) {
            let b = a.wrapping_add(delta as u32);
            prop_assert!(is_newer(b, a));
            prop_assert!(is_older(a, b));
        }
    }
}
