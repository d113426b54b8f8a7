//! Fixed-point numerics shared by the decoder, the PID controller and the
//! command surface.
//!
//! A [`Fixed`] is an `i32` with an implicit scale of `2^FRACT_BITS`.  Any
//! product or quotient is computed in `i64` and saturated back into range,
//! so intermediate overflow never wraps.
//!
//! ```text
//!   bits:  31 ................ 10 9 ........ 0
//!          [ sign + integer part ][ fraction  ]
//! ```

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of fractional bits.
pub const FRACT_BITS: u32 = 10;

/// Largest number of fractional decimal digits honoured by the parser.
const MAX_PARSE_DECIMALS: u32 = 9;

/// Default number of decimals written by `Display` when no precision is given.
const DEFAULT_DECIMALS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fixed(i32);

impl Fixed {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(1 << FRACT_BITS);
    pub const MIN: Self = Self(i32::MIN);
    pub const MAX: Self = Self(i32::MAX);

    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    pub const fn to_bits(self) -> i32 {
        self.0
    }

    /// Integer to fixed, saturating outside the representable range.
    pub const fn from_int(value: i32) -> Self {
        Self::saturate((value as i64) << FRACT_BITS)
    }

    /// `num / den` as a fixed value, truncated toward zero.
    /// A zero denominator saturates toward the sign of `num`.
    pub const fn from_ratio(num: i64, den: i64) -> Self {
        if den == 0 {
            return if num < 0 { Self::MIN } else { Self::MAX };
        }
        Self::saturate((num << FRACT_BITS) / den)
    }

    /// Sensor units arrive in tenths (e.g. `235` = 23.5).
    pub const fn from_tenths(tenths: i32) -> Self {
        Self::from_ratio(tenths as i64, 10)
    }

    /// Milliseconds to seconds.
    pub const fn from_millis(ms: u32) -> Self {
        Self::from_ratio(ms as i64, 1000)
    }

    const fn saturate(wide: i64) -> Self {
        if wide > i32::MAX as i64 {
            Self::MAX
        } else if wide < i32::MIN as i64 {
            Self::MIN
        } else {
            Self(wide as i32)
        }
    }

    /// Integer part, truncated toward zero.
    pub const fn trunc(self) -> i32 {
        if self.0 < 0 {
            -((-(self.0 as i64)) >> FRACT_BITS) as i32
        } else {
            self.0 >> FRACT_BITS
        }
    }

    /// Fractional part magnitude in raw bits (`0..2^FRACT_BITS`).
    pub const fn frac(self) -> u32 {
        (self.0.unsigned_abs()) & ((1 << FRACT_BITS) - 1)
    }

    /// Nearest integer, halves rounded away from zero.
    pub const fn round(self) -> i32 {
        let half = 1i64 << (FRACT_BITS - 1);
        let mag = (self.0 as i64).abs();
        let r = ((mag + half) >> FRACT_BITS) as i32;
        if self.0 < 0 { -r } else { r }
    }

    pub const fn abs(self) -> Self {
        Self::saturate((self.0 as i64).abs())
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Widening multiply, saturating.
    pub const fn mul(self, rhs: Self) -> Self {
        Self::saturate(((self.0 as i64) * (rhs.0 as i64)) >> FRACT_BITS)
    }

    /// Widening divide truncated toward zero; `None` on a zero divisor.
    pub const fn checked_div(self, rhs: Self) -> Option<Self> {
        if rhs.0 == 0 {
            return None;
        }
        Some(Self::saturate(((self.0 as i64) << FRACT_BITS) / rhs.0 as i64))
    }

    /// Like [`checked_div`](Self::checked_div) but saturates on a zero divisor.
    pub const fn saturating_div(self, rhs: Self) -> Self {
        match self.checked_div(rhs) {
            Some(v) => v,
            None => Self::from_ratio(self.0 as i64, 0),
        }
    }
}

impl From<i16> for Fixed {
    fn from(v: i16) -> Self {
        Self::from_int(i32::from(v))
    }
}

// ── Parsing ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFixedError {
    Empty,
    InvalidDigit,
    Overflow,
}

impl fmt::Display for ParseFixedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty number"),
            Self::InvalidDigit => write!(f, "invalid digit"),
            Self::Overflow => write!(f, "number out of range"),
        }
    }
}

/// `[-]digits[.digits]`, rounded to the nearest representable value.
impl FromStr for Fixed {
    type Err = ParseFixedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(ParseFixedError::Empty);
        }

        let mut mantissa: i64 = 0;
        for c in int_part.bytes() {
            mantissa = push_digit(mantissa, c)?;
        }
        let mut divisor: i64 = 1;
        for (n, c) in frac_part.bytes().enumerate() {
            if n as u32 >= MAX_PARSE_DECIMALS {
                if !c.is_ascii_digit() {
                    return Err(ParseFixedError::InvalidDigit);
                }
                continue;
            }
            mantissa = push_digit(mantissa, c)?;
            divisor *= 10;
        }

        // Round half away from zero on the magnitude, then apply the sign.
        let scaled = mantissa
            .checked_mul(1 << FRACT_BITS)
            .ok_or(ParseFixedError::Overflow)?;
        let mag = (scaled + divisor / 2) / divisor;
        let value = if negative { -mag } else { mag };
        i32::try_from(value)
            .map(Fixed)
            .map_err(|_| ParseFixedError::Overflow)
    }
}

fn push_digit(acc: i64, c: u8) -> Result<i64, ParseFixedError> {
    if !c.is_ascii_digit() {
        return Err(ParseFixedError::InvalidDigit);
    }
    acc.checked_mul(10)
        .and_then(|v| v.checked_add(i64::from(c - b'0')))
        .ok_or(ParseFixedError::Overflow)
}

// ── Formatting ────────────────────────────────────────────────

/// Decimal rendering; honours `{:.N}`, otherwise four decimals.
impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decimals = f.precision().unwrap_or(DEFAULT_DECIMALS).min(MAX_PARSE_DECIMALS as usize);
        let pow = 10i64.pow(decimals as u32);
        let mag = (self.0 as i64).abs();
        let half = 1i64 << (FRACT_BITS - 1);
        let scaled = (mag * pow + half) >> FRACT_BITS;
        let sign = if self.0 < 0 && scaled != 0 { "-" } else { "" };
        if decimals == 0 {
            write!(f, "{}{}", sign, scaled)
        } else {
            write!(
                f,
                "{}{}.{:0width$}",
                sign,
                scaled / pow,
                scaled % pow,
                width = decimals
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fx(s: &str) -> Fixed {
        s.parse().unwrap()
    }

    #[test]
    fn parse_and_format_within_one_unit() {
        let v = fx("23.456");
        let exact = 23.456_f64 * f64::from(1u32 << FRACT_BITS);
        assert!((f64::from(v.to_bits()) - exact).abs() <= 0.5);

        let text = format!("{}", v);
        let back = fx(&text);
        assert!((back.to_bits() - v.to_bits()).abs() <= 1, "{} -> {}", v, back);
    }

    #[test]
    fn format_then_parse_is_exact() {
        for bits in [-70_000, -1025, -1, 0, 1, 511, 512, 1024, 24_018, 1 << 20] {
            let v = Fixed::from_bits(bits);
            assert_eq!(fx(&v.to_string()), v, "bits {}", bits);
        }
    }

    #[test]
    fn parse_forms() {
        assert_eq!(fx("5"), Fixed::from_int(5));
        assert_eq!(fx("-5"), Fixed::from_int(-5));
        assert_eq!(fx(".5"), Fixed::from_bits(512));
        assert_eq!(fx("-0.5"), Fixed::from_bits(-512));
        assert_eq!(fx("+2.25"), Fixed::from_bits(2304));
        assert_eq!("".parse::<Fixed>(), Err(ParseFixedError::Empty));
        assert_eq!("-".parse::<Fixed>(), Err(ParseFixedError::Empty));
        assert_eq!("1.2.3".parse::<Fixed>(), Err(ParseFixedError::InvalidDigit));
        assert_eq!("12a".parse::<Fixed>(), Err(ParseFixedError::InvalidDigit));
        assert_eq!("9999999".parse::<Fixed>(), Err(ParseFixedError::Overflow));
    }

    #[test]
    fn display_precision() {
        assert_eq!(format!("{:.1}", Fixed::from_tenths(235)), "23.5");
        assert_eq!(format!("{:.1}", Fixed::from_tenths(-101)), "-10.1");
        assert_eq!(format!("{:.0}", Fixed::from_bits(1536)), "2");
        assert_eq!(format!("{:.2}", Fixed::from_bits(-1)), "0.00");
    }

    #[test]
    fn trunc_and_round_are_sign_symmetric() {
        let a = Fixed::from_bits(2560); // 2.5
        let b = Fixed::from_bits(-2560);
        assert_eq!(a.trunc(), 2);
        assert_eq!(b.trunc(), -2);
        assert_eq!(a.round(), 3);
        assert_eq!(b.round(), -3);
        assert_eq!(Fixed::from_bits(-2559).round(), -2);
        assert_eq!(b.frac(), 512);
    }

    #[test]
    fn mul_and_div_widen() {
        let big = Fixed::from_int(40_000);
        // 40000 * 40000 overflows an i32 product of raw bits but not i64.
        assert_eq!(big.mul(Fixed::from_ratio(1, 2)), Fixed::from_int(20_000));
        assert_eq!(big.mul(big), Fixed::MAX);
        assert_eq!(
            Fixed::from_int(3).checked_div(Fixed::from_int(2)),
            Some(Fixed::from_bits(1536))
        );
        assert_eq!(Fixed::ONE.checked_div(Fixed::ZERO), None);
        assert_eq!(Fixed::from_int(-1).saturating_div(Fixed::ZERO), Fixed::MIN);
    }

    #[test]
    fn conversions() {
        assert_eq!(Fixed::from_millis(2000), Fixed::from_int(2));
        assert_eq!(Fixed::from_millis(500), Fixed::from_bits(512));
        assert_eq!(Fixed::from_tenths(-50), Fixed::from_int(-5));
        assert_eq!(Fixed::from_int(i32::MAX), Fixed::MAX);
    }
}
