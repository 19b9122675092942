//! Arbitrary-precision decimal numbers (spec §4.3).
//!
//! Grounded on `crates/ouros/src/types/decimal.rs`'s `coefficient * 10^exponent` representation;
//! trimmed of Python `decimal.Decimal`-specific rounding-mode name parsing, `Infinity`/`NaN`
//! special values (CUE numbers are always finite — non-finite results are lattice errors, not
//! representable numbers) and augmented with the int/float/either tag CUE's lattice needs to
//! distinguish `1` from `1.0` from `int & 1`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

/// Truncating-division quotient/remainder adjusted to Euclidean convention: the remainder is
/// always in `[0, |b|)`. Matches the definition Rust's primitive `div_euclid`/`rem_euclid` use,
/// generalized to `BigInt` (which has no such method of its own).
fn euclid_div_rem(a: &BigInt, b: &BigInt) -> (BigInt, BigInt) {
    let q = a / b;
    let r = a - &q * b;
    if r.is_negative() {
        if b.is_positive() {
            (q - 1, r + b)
        } else {
            (q + 1, r - b)
        }
    } else {
        (q, r)
    }
}

/// Which numeric kinds a literal is allowed to unify into.
///
/// `1` is `Either` (unifies into both `int` and `float` positions); `1.0` is `FloatOnly`
/// (the `.0` is syntactically a float literal); `int & 1` narrows `Either` down to `IntOnly`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum NumberTag {
    IntOnly,
    FloatOnly,
    Either,
}

impl NumberTag {
    /// The tag of `unify(self, other)` on two otherwise-equal numbers, or `None` if the tags
    /// are mutually exclusive (`IntOnly` vs `FloatOnly`).
    #[must_use]
    pub fn meet(self, other: Self) -> Option<Self> {
        use NumberTag::{Either, FloatOnly, IntOnly};
        match (self, other) {
            (Either, x) | (x, Either) => Some(x),
            (IntOnly, IntOnly) => Some(IntOnly),
            (FloatOnly, FloatOnly) => Some(FloatOnly),
            (IntOnly, FloatOnly) | (FloatOnly, IntOnly) => None,
        }
    }
}

/// An arbitrary-precision decimal: `coefficient * 10^exponent`, tagged with which numeric
/// kinds it may still unify into.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Number {
    coefficient: BigInt,
    exponent: i32,
    tag: NumberTag,
}

/// The result of narrowing a `Number` to a fixed-width integer or float representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    /// The value fits exactly.
    Exact,
    /// The value is smaller than the target type's minimum representable value.
    RoundedBelow,
    /// The value is larger than the target type's maximum representable value.
    RoundedAbove,
    /// The value has no finite representation in the target type (float overflow to infinity).
    Infinite,
}

impl Number {
    #[must_use]
    pub fn new(coefficient: BigInt, exponent: i32, tag: NumberTag) -> Self {
        Self { coefficient, exponent, tag }
    }

    #[must_use]
    pub fn from_i64(n: i64) -> Self {
        Self::new(BigInt::from(n), 0, NumberTag::Either)
    }

    #[must_use]
    pub fn int_literal(n: i64) -> Self {
        Self::new(BigInt::from(n), 0, NumberTag::IntOnly)
    }

    /// Converts an IEEE-754 float to its exact decimal value (`n / 2^k` as `n * 5^k * 10^-k`),
    /// tagged `FloatOnly`.
    ///
    /// # Panics
    /// Panics on NaN/infinite input; callers must reject those before constructing a `Number`
    /// (spec §3.2: CUE numbers are always finite).
    #[must_use]
    pub fn from_f64(value: f64) -> Self {
        assert!(value.is_finite(), "CUE numbers must be finite");
        if value == 0.0 {
            return Self::new(BigInt::ZERO, 0, NumberTag::FloatOnly);
        }
        let bits = value.to_bits();
        let negative = (bits >> 63) != 0;
        let exponent_bits = i32::try_from((bits >> 52) & 0x7ff).unwrap_or_default();
        let fraction_bits = bits & ((1u64 << 52) - 1);

        let (mut numerator, exponent_two) = if exponent_bits == 0 {
            (BigInt::from(fraction_bits), -1022 - 52)
        } else {
            (BigInt::from(fraction_bits | (1u64 << 52)), exponent_bits - 1023 - 52)
        };

        let mut exponent_ten = 0i32;
        if exponent_two >= 0 {
            numerator <<= usize::try_from(exponent_two).unwrap_or(0);
        } else {
            let power = u32::try_from(-exponent_two).unwrap_or(0);
            numerator *= BigInt::from(5u8).pow(power);
            exponent_ten = -i32::try_from(power).unwrap_or(i32::MAX);
        }
        if negative {
            numerator = -numerator;
        }
        Self::new(numerator, exponent_ten, NumberTag::FloatOnly)
    }

    #[must_use]
    pub fn parse(s: &str, tag: NumberTag) -> Option<Self> {
        let s = s.trim();
        let (negative, rest) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (mantissa, exp_str) = match rest.to_ascii_lowercase().find('e') {
            Some(pos) => (&rest[..pos], &rest[pos + 1..]),
            None => (rest, ""),
        };
        let mut exponent: i32 = 0;
        if !exp_str.is_empty() {
            exponent = exp_str.parse().ok()?;
        }
        let (int_part, frac_part) = match mantissa.find('.') {
            Some(pos) => (&mantissa[..pos], &mantissa[pos + 1..]),
            None => (mantissa, ""),
        };
        let digits = format!("{}{}", int_part, frac_part);
        exponent -= i32::try_from(frac_part.len()).ok()?;
        let digits = digits.trim_start_matches('0');
        let coefficient = if digits.is_empty() {
            BigInt::zero()
        } else {
            BigInt::from_str(digits).ok()?
        };
        let coefficient = if negative { -coefficient } else { coefficient };
        Some(Self::new(coefficient, exponent, tag))
    }

    #[must_use]
    pub fn tag(&self) -> NumberTag {
        self.tag
    }

    #[must_use]
    pub fn with_tag(mut self, tag: NumberTag) -> Self {
        self.tag = tag;
        self
    }

    /// True iff this value, regardless of tag, is a mathematical integer
    /// (i.e. `1.0` is int-valued even though it's tagged `FloatOnly`).
    #[must_use]
    pub fn is_int_valued(&self) -> bool {
        if self.exponent >= 0 {
            return true;
        }
        let scale = BigInt::from(10u8).pow(u32::try_from(-self.exponent).unwrap_or(u32::MAX));
        (&self.coefficient % &scale).is_zero()
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.coefficient.is_zero()
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.coefficient.is_negative()
    }

    fn aligned(a: &Self, b: &Self) -> (BigInt, BigInt, i32) {
        let exponent = a.exponent.min(b.exponent);
        let scale_a = BigInt::from(10u8).pow(u32::try_from(a.exponent - exponent).unwrap_or(0));
        let scale_b = BigInt::from(10u8).pow(u32::try_from(b.exponent - exponent).unwrap_or(0));
        (&a.coefficient * scale_a, &b.coefficient * scale_b, exponent)
    }

    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        let (ca, cb, exponent) = Self::aligned(self, other);
        Self::new(ca + cb, exponent, NumberTag::Either)
    }

    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        let (ca, cb, exponent) = Self::aligned(self, other);
        Self::new(ca - cb, exponent, NumberTag::Either)
    }

    #[must_use]
    pub fn mul(&self, other: &Self) -> Self {
        Self::new(
            &self.coefficient * &other.coefficient,
            self.exponent + other.exponent,
            NumberTag::Either,
        )
    }

    /// Decimal division. CUE's `/` always yields a float-tagged result, matching spec §4.2
    /// ("`%` yields float" and division is not an integer-only operator).
    ///
    /// # Errors
    /// Returns `None` on division by zero.
    pub fn div(&self, other: &Self) -> Option<Self> {
        if other.is_zero() {
            return None;
        }
        // Scale up the numerator enough decimal digits to get a useful quotient, matching the
        // general-decimal-arithmetic convention of picking a working precision rather than
        // truncating to integer division.
        const WORK_DIGITS: u32 = 40;
        let scale = BigInt::from(10u8).pow(WORK_DIGITS);
        let scaled_num = &self.coefficient * &scale;
        let quotient = &scaled_num / &other.coefficient;
        Some(Self::new(
            quotient,
            self.exponent - other.exponent - i32::try_from(WORK_DIGITS).unwrap_or(0),
            NumberTag::FloatOnly,
        ))
    }

    fn as_bigint_pair(&self) -> Option<(BigInt, BigInt)> {
        if self.exponent == 0 {
            return Some((self.coefficient.clone(), BigInt::from(1)));
        }
        None
    }

    /// Go-style truncating integer division (`quo`). Both operands must already be integral;
    /// callers enforce the int-kind requirement via `binop::match_bin_op_kind`.
    ///
    /// # Errors
    /// Returns `None` on division by zero or on a non-integral operand.
    pub fn quo(&self, other: &Self) -> Option<Self> {
        let (a, _) = self.as_bigint_pair()?;
        let (b, _) = other.as_bigint_pair()?;
        if b.is_zero() {
            return None;
        }
        Some(Self::int_result(a / b))
    }

    /// Go-style truncating remainder (`rem`): sign follows the dividend.
    ///
    /// # Errors
    /// Returns `None` on division by zero or a non-integral operand.
    pub fn rem(&self, other: &Self) -> Option<Self> {
        let (a, _) = self.as_bigint_pair()?;
        let (b, _) = other.as_bigint_pair()?;
        if b.is_zero() {
            return None;
        }
        Some(Self::int_result(&a - (&a / &b) * &b))
    }

    /// Euclidean division (`div`): quotient rounded so the remainder is never negative.
    ///
    /// # Errors
    /// Returns `None` on division by zero or a non-integral operand.
    pub fn div_euclid(&self, other: &Self) -> Option<Self> {
        let (a, _) = self.as_bigint_pair()?;
        let (b, _) = other.as_bigint_pair()?;
        if b.is_zero() {
            return None;
        }
        Some(Self::int_result(euclid_div_rem(&a, &b).0))
    }

    /// Euclidean remainder (`mod`): always non-negative, in `[0, |other|)`.
    ///
    /// # Errors
    /// Returns `None` on division by zero or a non-integral operand.
    pub fn mod_euclid(&self, other: &Self) -> Option<Self> {
        let (a, _) = self.as_bigint_pair()?;
        let (b, _) = other.as_bigint_pair()?;
        if b.is_zero() {
            return None;
        }
        Some(Self::int_result(euclid_div_rem(&a, &b).1))
    }

    fn int_result(coefficient: BigInt) -> Self {
        Self::new(coefficient, 0, NumberTag::IntOnly)
    }

    #[must_use]
    pub fn neg(&self) -> Self {
        Self::new(-&self.coefficient, self.exponent, self.tag)
    }

    #[must_use]
    pub fn to_i64(&self) -> (Option<i64>, Overflow) {
        if !self.is_int_valued() {
            return (None, Overflow::RoundedBelow);
        }
        let scale = BigInt::from(10u8).pow(u32::try_from(self.exponent.max(0)).unwrap_or(0));
        let whole = if self.exponent >= 0 {
            &self.coefficient * scale
        } else {
            let divisor = BigInt::from(10u8).pow(u32::try_from(-self.exponent).unwrap_or(0));
            &self.coefficient / divisor
        };
        match whole.to_i64() {
            Some(v) => (Some(v), Overflow::Exact),
            None if whole.is_negative() => (None, Overflow::RoundedBelow),
            None => (None, Overflow::RoundedAbove),
        }
    }

    #[must_use]
    pub fn to_u64(&self) -> (Option<u64>, Overflow) {
        if self.is_negative() {
            return (None, Overflow::RoundedBelow);
        }
        match self.to_i64() {
            (Some(v), Overflow::Exact) => (u64::try_from(v).ok(), Overflow::Exact),
            (_, Overflow::RoundedAbove) => (None, Overflow::RoundedAbove),
            _ => (None, Overflow::RoundedBelow),
        }
    }

    #[must_use]
    pub fn to_f64(&self) -> (f64, Overflow) {
        let coeff = self.coefficient.to_f64().unwrap_or(if self.is_negative() {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
        let value = coeff * 10f64.powi(self.exponent);
        if value.is_infinite() {
            (value, Overflow::Infinite)
        } else {
            (value, Overflow::Exact)
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let (ca, cb, _) = Self::aligned(self, other);
        Some(ca.cmp(&cb))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exponent >= 0 {
            let scale = BigInt::from(10u8).pow(u32::try_from(self.exponent).unwrap_or(0));
            write!(f, "{}", &self.coefficient * scale)
        } else {
            let digits = self.coefficient.abs().to_string();
            let frac_len = usize::try_from(-self.exponent).unwrap_or(0);
            let sign = if self.is_negative() { "-" } else { "" };
            if digits.len() <= frac_len {
                let padded = "0".repeat(frac_len - digits.len() + 1) + &digits;
                let (int_part, frac_part) = padded.split_at(padded.len() - frac_len);
                write!(f, "{sign}{int_part}.{frac_part}")
            } else {
                let (int_part, frac_part) = digits.split_at(digits.len() - frac_len);
                write!(f, "{sign}{int_part}.{frac_part}")
            }
        }
    }
}
