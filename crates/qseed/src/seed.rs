//! Folding measurement counts into an integer.
//!
//! Counts are visited in ascending bitstring order. Each count's decimal
//! representation is appended to a digit string, and that string is read as
//! a base-16 number. Decimal digits are a subset of hex digits, so any
//! non-empty concatenation parses.
//!
//! ```text
//!   {"00": 3, "11": 5}  →  "3" + "5" = "35"  →  0x35 = 53
//! ```
//!
//! The result is not whitened or hashed. Callers that need uniform bits
//! should condition it themselves.

use std::fmt;

use num_bigint::BigUint;
use num_traits::{Num, ToPrimitive};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Serialize, Serializer};

use qseed_hal::Counts;

use crate::error::{SeedError, SeedResult};

/// An arbitrary-precision seed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Seed(BigUint);

impl Seed {
    /// The seed as a big integer.
    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    pub fn into_biguint(self) -> BigUint {
        self.0
    }

    /// Lowercase hexadecimal, no prefix.
    pub fn to_hex(&self) -> String {
        self.0.to_str_radix(16)
    }

    /// The least-significant 64 bits.
    pub fn low_u64(&self) -> u64 {
        self.0.iter_u64_digits().next().unwrap_or(0)
    }

    /// The full value, if it fits in a `u128`.
    pub fn to_u128(&self) -> Option<u128> {
        self.0.to_u128()
    }

    /// Number of significant bits.
    pub fn bits(&self) -> u64 {
        self.0.bits()
    }

    /// The low 256 bits as little-endian bytes, zero padded.
    pub fn to_rng_seed(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (dst, src) in out.iter_mut().zip(self.0.to_bytes_le()) {
            *dst = src;
        }
        out
    }

    /// A standard PRNG seeded from [`Seed::to_rng_seed`].
    pub fn into_rng(self) -> StdRng {
        StdRng::from_seed(self.to_rng_seed())
    }
}

impl From<BigUint> for Seed {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl From<u64> for Seed {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::LowerHex for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Serialized as a decimal string; seeds routinely exceed JSON's safe
/// integer range.
impl Serialize for Seed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

/// The decimal counts, concatenated in ascending bitstring order.
pub fn seed_digits(counts: &Counts) -> String {
    counts.iter().map(|(_, count)| count.to_string()).collect()
}

/// Fold a count histogram into a seed.
pub fn fold_counts(counts: &Counts) -> SeedResult<Seed> {
    let digits = seed_digits(counts);
    if digits.is_empty() {
        return Err(SeedError::EmptyCounts);
    }
    let value = BigUint::from_str_radix(&digits, 16)?;
    tracing::debug!(digits = digits.len(), bits = value.bits(), "folded counts into seed");
    Ok(Seed(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::Rng;

    fn counts(pairs: &[(&str, u64)]) -> Counts {
        pairs.iter().map(|&(k, v)| (k, v)).collect()
    }

    #[test]
    fn test_fold_example() {
        let seed = fold_counts(&counts(&[("11", 5), ("00", 3)])).unwrap();
        assert_eq!(seed_digits(&counts(&[("11", 5), ("00", 3)])), "35");
        assert_eq!(seed.low_u64(), 0x35);
        assert_eq!(seed.to_string(), "53");
        assert_eq!(seed.to_hex(), "35");
    }

    #[test]
    fn test_fold_multi_digit_counts() {
        // "0"→256, "1"→256 gives "256256" read as hex.
        let seed = fold_counts(&counts(&[("0", 256), ("1", 256)])).unwrap();
        assert_eq!(seed.low_u64(), 0x256256);
    }

    #[test]
    fn test_fold_empty_counts() {
        assert!(matches!(
            fold_counts(&Counts::new()),
            Err(SeedError::EmptyCounts)
        ));
    }

    #[test]
    fn test_large_seed_is_exact() {
        let many: Counts = (0..64u32)
            .map(|i| (format!("{i:06b}"), 1000 + u64::from(i)))
            .collect();
        let seed = fold_counts(&many).unwrap();
        assert_eq!(seed.to_hex(), seed_digits(&many).trim_start_matches('0'));
        assert!(seed.bits() > 128);
        assert!(seed.to_u128().is_none());
    }

    #[test]
    fn test_rng_seed_is_little_endian() {
        let seed = Seed::from(0x0102u64);
        let bytes = seed.to_rng_seed();
        assert_eq!(bytes[0], 0x02);
        assert_eq!(bytes[1], 0x01);
        assert!(bytes[2..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_into_rng_is_deterministic() {
        let a: u64 = Seed::from(99u64).into_rng().r#gen();
        let b: u64 = Seed::from(99u64).into_rng().r#gen();
        assert_eq!(a, b);
    }

    #[test]
    fn test_serializes_as_decimal_string() {
        let seed = Seed::from(53u64);
        assert_eq!(serde_json::to_string(&seed).unwrap(), r#""53""#);
    }

    proptest! {
        #[test]
        fn prop_fold_matches_hex_of_digits(values in prop::collection::vec(1u64..100_000, 1..40)) {
            let counts: Counts = values
                .iter()
                .enumerate()
                .map(|(i, &v)| (format!("{i:08b}"), v))
                .collect();
            let seed = fold_counts(&counts).unwrap();

            let digits: String = values.iter().map(u64::to_string).collect();
            prop_assert_eq!(seed.to_hex(), digits.trim_start_matches('0').to_string());
        }

        #[test]
        fn prop_fold_ignores_insertion_order(values in prop::collection::vec(1u64..1_000, 2..16)) {
            let forward: Counts = values
                .iter()
                .enumerate()
                .map(|(i, &v)| (format!("{i:04b}"), v))
                .collect();
            let mut pairs: Vec<_> = forward.iter().map(|(k, v)| (k.to_string(), v)).collect();
            pairs.reverse();
            let backward: Counts = pairs.into_iter().collect();

            prop_assert_eq!(fold_counts(&forward).unwrap(), fold_counts(&backward).unwrap());
        }
    }
}
