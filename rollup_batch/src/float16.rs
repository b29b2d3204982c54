//! The 16-bit decimal float used for amounts in transaction data.
//!
//! Layout, most significant bit first: a 5 bit exponent `e`, a half flag
//! `h` and a 10 bit mantissa `m`. The encoded value is `m * 10^e`, plus
//! `10^e / 2` when `h` is set and `e > 0`.

use ethereum_types::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MANTISSA_MASK: u16 = 0x3FF;
const HALF_BIT: u16 = 0x400;
const EXPONENT_SHIFT: u32 = 11;
const MAX_EXPONENT: u32 = 31;

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Float16Error {
    #[error("{0} is larger than the largest Float16 value")]
    Overflow(U256),
}

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct Float16(pub u16);

impl From<u16> for Float16 {
    fn from(bits: u16) -> Self {
        Self(bits)
    }
}

impl Float16 {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(0xFFFF);

    pub const fn mantissa(self) -> u16 {
        self.0 & MANTISSA_MASK
    }

    pub const fn exponent(self) -> u32 {
        (self.0 >> EXPONENT_SHIFT) as u32
    }

    pub const fn half(self) -> bool {
        self.0 & HALF_BIT != 0
    }

    /// Whether the encoded value is zero. Several encodings are.
    pub const fn is_zero(self) -> bool {
        self.mantissa() == 0 && !(self.half() && self.exponent() > 0)
    }

    /// Expands to the fixed-point value.
    pub fn to_fix(self) -> U256 {
        let exp = U256::from(10).pow(self.exponent().into());
        let mut res = U256::from(self.mantissa()) * exp;
        if self.half() && self.exponent() > 0 {
            res += exp / 2;
        }
        res
    }

    /// Largest float whose half flag is clear and whose value is at most
    /// `value`.
    fn truncate(value: U256) -> Result<Self, Float16Error> {
        let mut m = value;
        let mut e = 0;
        while m > U256::from(MANTISSA_MASK) {
            m /= 10;
            e += 1;
        }
        if e > MAX_EXPONENT {
            return Err(Float16Error::Overflow(value));
        }
        Ok(Self(m.low_u32() as u16 | (e << EXPONENT_SHIFT) as u16))
    }

    /// The truncated float, or its half step when that is still at most
    /// `value`. Truncation keeps at most three mantissa digits whenever the
    /// value has more than 1023, so this is not always the largest float
    /// below `value`.
    pub fn floor_from(value: U256) -> Result<Self, Float16Error> {
        let lower = Self::truncate(value)?;
        let with_half = Self(lower.0 | HALF_BIT);
        Ok(if lower.exponent() > 0 && with_half.to_fix() <= value {
            with_half
        } else {
            lower
        })
    }

    /// Float nearest to `value`. On a tie the smaller candidate wins.
    pub fn round_from(value: U256) -> Result<Self, Float16Error> {
        let lower = Self::truncate(value)?;
        let mut candidates = vec![lower, Self(lower.0 | HALF_BIT)];

        let (mut m, mut e) = (lower.mantissa() + 1, lower.exponent());
        if m == MANTISSA_MASK + 1 {
            // 1024 * 10^e rounds down to 102 * 10^(e + 1).
            m = 102;
            e += 1;
        }
        if e <= MAX_EXPONENT {
            candidates.push(Self(m | (e << EXPONENT_SHIFT) as u16));
        }

        let dist = |f: &Self| {
            let fix = f.to_fix();
            if fix > value {
                fix - value
            } else {
                value - fix
            }
        };
        let mut best = candidates[0];
        let mut best_dist = dist(&best);
        for c in &candidates[1..] {
            let d = dist(c);
            if best_dist > d {
                best = *c;
                best_dist = d;
            }
        }
        Ok(best)
    }

    /// Float with exactly this value, if there is one.
    pub fn exact_from(value: U256) -> Option<Self> {
        Self::floor_from(value)
            .ok()
            .filter(|f| f.to_fix() == value)
    }

    /// Value of [`Float16::floor_from`].
    pub fn floor_fix(value: U256) -> Result<U256, Float16Error> {
        Self::floor_from(value).map(Self::to_fix)
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    fn u(x: u64) -> U256 {
        U256::from(x)
    }

    #[test]
    fn extreme_encodings() {
        assert_eq!(Float16(0x0000).to_fix(), U256::zero());
        let max = U256::from(10235) * U256::from(10).pow(30.into());
        assert_eq!(Float16(0xFFFF).to_fix(), max);
        assert_eq!(Float16::exact_from(max), Some(Float16::MAX));
        assert_eq!(Float16::floor_from(max + 1), Ok(Float16::MAX));
    }

    #[test]
    fn half_flag_is_ignored_without_exponent() {
        assert_eq!(Float16(HALF_BIT | 7).to_fix(), u(7));
        assert_eq!(Float16(HALF_BIT | (1 << 11) | 7).to_fix(), u(75));
    }

    #[test]
    fn small_values_are_exact() {
        for v in [0, 1, 100, 1000, 1023] {
            let f = Float16::floor_from(u(v)).unwrap();
            assert_eq!(f.to_fix(), u(v));
            assert_eq!(Float16::round_from(u(v)).unwrap().to_fix(), u(v));
        }
    }

    #[test]
    fn floor_and_round_around_1024() {
        assert_eq!(Float16::floor_fix(u(1024)).unwrap(), u(1020));
        assert_eq!(Float16::round_from(u(1024)).unwrap().to_fix(), u(1025));
        assert_eq!(Float16::floor_fix(u(1026)).unwrap(), u(1025));
        assert_eq!(Float16::round_from(u(1029)).unwrap().to_fix(), u(1030));
        assert_eq!(Float16::exact_from(u(1025)).map(Float16::to_fix), Some(u(1025)));
        assert_eq!(Float16::exact_from(u(1026)), None);
    }

    #[test]
    fn round_only_looks_next_to_the_truncation() {
        let f = Float16::round_from(u(10239)).unwrap();
        assert_eq!(f.to_fix(), u(10235));
        assert_eq!(f.exponent(), 1);
        // Truncates to 102 * 100, so 1023 * 10 + 5 is not a candidate.
        assert_eq!(Float16::round_from(u(10240)).unwrap().to_fix(), u(10250));
    }

    #[test]
    fn ties_keep_the_lower_value() {
        // Halfway between 1020 * 100 and 1020.5 * 100.
        assert_eq!(Float16::round_from(u(102025)).unwrap().to_fix(), u(102000));
    }

    #[test]
    fn floor_follows_the_truncation() {
        // 1023 * 10 + 5 is below 10245, but 10245 truncates to 102 * 100.
        assert_eq!(Float16::floor_fix(u(10245)).unwrap(), u(10200));
        assert_eq!(Float16::floor_fix(u(10250)).unwrap(), u(10250));
    }

    #[test]
    fn floor_never_sets_half_without_exponent() {
        assert_eq!(Float16::floor_from(u(1023)), Ok(Float16(1023)));
        assert_eq!(Float16::floor_from(U256::zero()), Ok(Float16::ZERO));
    }

    #[test]
    fn overflow_is_an_error() {
        let too_big = U256::from(1024) * U256::from(10).pow(32.into());
        assert_eq!(
            Float16::floor_from(too_big),
            Err(Float16Error::Overflow(too_big))
        );
    }

    #[test]
    fn random_values_bracket_their_encodings() {
        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            let v = U256::from(rng.gen::<u128>() >> rng.gen_range(16..128));
            let floor = Float16::floor_from(v).unwrap().to_fix();
            assert!(floor <= v);
            let round = Float16::round_from(v).unwrap().to_fix();
            let dist = if round > v { round - v } else { v - round };
            assert!(dist <= v - floor, "{v}");
        }
    }

    #[test]
    fn every_encoding_floors_to_itself() {
        for bits in 0..=u16::MAX {
            let f = Float16(bits);
            assert_eq!(Float16::floor_fix(f.to_fix()).unwrap(), f.to_fix(), "{bits:#06x}");
        }
    }
}
