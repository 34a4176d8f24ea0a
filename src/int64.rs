//! The `Int64` helper: a lossless 64-bit signed integer carrier.
//!
//! Hosts whose native number type loses precision beyond 2^53 need a
//! dedicated `high`/`low` integer type to carry a full 64-bit value
//! losslessly. Rust's `i64` has no such limitation, so here `Int64` is a
//! thin, zero-cost newtype: it exists to name the width-selection and
//! integer-policy operations this crate performs, not to work around a host
//! limitation that doesn't apply here.

use num_bigint::BigInt;

/// The largest (and smallest, negated) integer magnitude a host `f64`
/// represents exactly: 2^53 - 1.
const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;
const MIN_SAFE_INTEGER: i64 = -9_007_199_254_740_991;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Int64(i64);

impl Int64 {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(self) -> i64 {
        self.0
    }

    /// The high 32-bit big-endian word of the `INT_64` wire form.
    pub fn high(self) -> i32 {
        (self.0 >> 32) as i32
    }

    /// The low 32-bit big-endian word of the `INT_64` wire form.
    pub fn low(self) -> i32 {
        self.0 as i32
    }

    /// Whether `value` fits in the codec's integer domain. Always true for
    /// `i64` on this host; kept for parity with the source's `isInt`
    /// membership predicate.
    pub fn is_int(_value: i64) -> bool {
        true
    }

    /// The `disable_lossless_integers` conversion: values outside the range
    /// a host double represents exactly saturate to `±INFINITY`, mirroring
    /// the source's `toNumberOrInfinity`.
    pub fn to_f64_saturating(self) -> f64 {
        if self.0 > MAX_SAFE_INTEGER {
            f64::INFINITY
        } else if self.0 < MIN_SAFE_INTEGER {
            f64::NEG_INFINITY
        } else {
            self.0 as f64
        }
    }

    /// The `use_big_integer` conversion: always exact, since `BigInt` has no
    /// upper bound.
    pub fn to_big_integer(self) -> BigInt {
        BigInt::from(self.0)
    }
}

impl From<i64> for Int64 {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Int64> for i64 {
    fn from(value: Int64) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_low_round_trip() {
        let v = Int64::new(i64::from(i32::MAX) + 1);
        let reassembled = (i64::from(v.high()) << 32) | (i64::from(v.low()) & 0xFFFF_FFFF);
        assert_eq!(reassembled, v.value());
    }

    #[test]
    fn saturates_outside_safe_range() {
        assert_eq!(Int64::new(i64::MAX).to_f64_saturating(), f64::INFINITY);
        assert_eq!(Int64::new(i64::MIN).to_f64_saturating(), f64::NEG_INFINITY);
        assert_eq!(Int64::new(MAX_SAFE_INTEGER).to_f64_saturating(), MAX_SAFE_INTEGER as f64);
    }

    #[test]
    fn big_integer_is_always_exact() {
        let v = Int64::new(i64::MIN);
        assert_eq!(v.to_big_integer(), BigInt::from(i64::MIN));
    }
}
