//! Numeric utilities: safe and centralized integer conversions.
//!
//! Page numbers and limits arrive as `i64` (callers may pass anything), counts
//! come back from sources as `u64`, and in-memory slicing needs `usize`.
//! Conversions between them clamp instead of wrapping.

#[inline]
#[must_use]
pub fn u64_to_usize_saturating(v: u64) -> usize {
    usize::try_from(v).unwrap_or(usize::MAX)
}

#[inline]
#[must_use]
pub fn i64_to_usize(v: i64) -> Option<usize> {
    usize::try_from(v).ok()
}

#[inline]
#[must_use]
pub fn usize_to_u64(v: usize) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}

#[inline]
#[must_use]
pub fn u128_to_u64_saturating(v: u128) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}

#[inline]
#[must_use]
pub fn i64_to_u64_saturating_nonnegative(v: i64) -> u64 {
    u64::try_from(v).unwrap_or(0)
}

#[inline]
#[must_use]
pub fn u64_to_i64_saturating(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

/// Reads an integral BSON number, accepting whole doubles the way `$skip`/`$limit` do.
#[must_use]
pub fn bson_to_i64(v: &bson::Bson) -> Option<i64> {
    match v {
        bson::Bson::Int32(i) => Some(i64::from(*i)),
        bson::Bson::Int64(i) => Some(*i),
        #[allow(clippy::cast_possible_truncation)]
        bson::Bson::Double(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i64_to_usize_matches_std_try_from() {
        for &v in &[0i64, 1, 42, i64::from(i32::MAX)] {
            assert_eq!(i64_to_usize(v), usize::try_from(v).ok());
        }
        assert_eq!(i64_to_usize(-1), None);
    }

    #[test]
    fn i64_to_u64_nonneg_saturating() {
        assert_eq!(i64_to_u64_saturating_nonnegative(-5), 0);
        assert_eq!(i64_to_u64_saturating_nonnegative(0), 0);
        assert_eq!(i64_to_u64_saturating_nonnegative(7), 7);
    }

    #[test]
    fn u64_to_i64_clamps_at_max() {
        assert_eq!(u64_to_i64_saturating(9), 9);
        assert_eq!(u64_to_i64_saturating(u64::MAX), i64::MAX);
    }

    #[test]
    fn u128_to_u64_saturating_edges() {
        assert_eq!(u128_to_u64_saturating(0), 0);
        assert_eq!(u128_to_u64_saturating(u128::from(u64::MAX)), u64::MAX);
        assert_eq!(u128_to_u64_saturating(u128::MAX), u64::MAX);
    }

    #[test]
    fn bson_numbers_read_as_i64() {
        assert_eq!(bson_to_i64(&bson::Bson::Int32(3)), Some(3));
        assert_eq!(bson_to_i64(&bson::Bson::Double(4.0)), Some(4));
        assert_eq!(bson_to_i64(&bson::Bson::Double(4.5)), None);
        assert_eq!(bson_to_i64(&bson::Bson::String("4".into())), None);
    }
}
