//! Integer-micro currency amounts.
//!
//! Every monetary value in the pipeline is an [`Amount`]: a signed count of
//! micros (1 currency unit = 1_000_000 micros). Decimal strings convert without
//! floating point; only spreadsheet float cells go through [`Amount::from_f64`].

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Micros per whole currency unit.
pub const MICROS_SCALE: i64 = 1_000_000;

const FRAC_DIGITS: usize = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

/// Errors produced by [`Amount::parse_decimal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmountParseError {
    Empty,
    Invalid(String),
    Overflow(String),
}

impl fmt::Display for AmountParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountParseError::Empty => write!(f, "amount is empty"),
            AmountParseError::Invalid(raw) => write!(f, "amount could not be parsed: '{raw}'"),
            AmountParseError::Overflow(raw) => write!(f, "amount out of range: '{raw}'"),
        }
    }
}

impl std::error::Error for AmountParseError {}

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_micros(micros: i64) -> Self {
        Amount(micros)
    }

    /// Whole currency units. Saturates instead of overflowing.
    pub const fn from_units(units: i64) -> Self {
        Amount(units.saturating_mul(MICROS_SCALE))
    }

    /// Rounds to the nearest micro. Non-finite input maps to zero.
    pub fn from_f64(value: f64) -> Self {
        if !value.is_finite() {
            return Amount::ZERO;
        }
        // `as` saturates on out-of-range floats.
        Amount((value * MICROS_SCALE as f64).round() as i64)
    }

    pub const fn micros(self) -> i64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / MICROS_SCALE as f64
    }

    pub const fn abs(self) -> Self {
        Amount(self.0.saturating_abs())
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// `count` bills of a `denomination`-unit note.
    pub fn bills(count: i64, denomination: u32) -> Self {
        Amount::from_units(count.saturating_mul(i64::from(denomination)))
    }

    /// Parse a plain decimal string (`"1234"`, `"-12.50"`, `"+.5"`).
    ///
    /// Rules:
    /// - optional leading `+` or `-`
    /// - optional fractional part separated by `.`
    /// - digits beyond the sixth decimal place are truncated
    /// - anything else (thousand separators, currency symbols) is rejected
    pub fn parse_decimal(s: &str) -> Result<Self, AmountParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountParseError::Empty);
        }

        let (negative, digits) = if let Some(rest) = s.strip_prefix('-') {
            (true, rest)
        } else if let Some(rest) = s.strip_prefix('+') {
            (false, rest)
        } else {
            (false, s)
        };

        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };

        let all_digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty())
            || !all_digits(int_part)
            || !all_digits(frac_part)
        {
            return Err(AmountParseError::Invalid(s.to_string()));
        }

        let int_val: i64 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse::<i64>()
                .map_err(|_| AmountParseError::Overflow(s.to_string()))?
        };

        let frac_kept = &frac_part[..frac_part.len().min(FRAC_DIGITS)];
        let frac_val: i64 = if frac_kept.is_empty() {
            0
        } else {
            let padded = format!("{frac_kept:0<width$}", width = FRAC_DIGITS);
            padded
                .parse::<i64>()
                .map_err(|_| AmountParseError::Invalid(s.to_string()))?
        };

        let micros = int_val
            .checked_mul(MICROS_SCALE)
            .and_then(|v| v.checked_add(frac_val))
            .ok_or_else(|| AmountParseError::Overflow(s.to_string()))?;

        Ok(Amount(if negative { -micros } else { micros }))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = MICROS_SCALE as u64;
        let int = abs / scale;
        let frac = abs % scale;
        if frac == 0 {
            return write!(f, "{sign}{int}");
        }
        let frac = format!("{frac:0width$}", width = FRAC_DIGITS);
        write!(f, "{sign}{int}.{}", frac.trim_end_matches('0'))
    }
}

impl Add for Amount {
    type Output = Amount;
    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Amount {
    type Output = Amount;
    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for Amount {
    type Output = Amount;
    fn neg(self) -> Amount {
        Amount(self.0.saturating_neg())
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, |acc, a| acc + *a)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number or a decimal string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        Ok(Amount::from_units(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        let units = i64::try_from(v).map_err(|_| E::custom(format!("amount out of range: {v}")))?;
        Ok(Amount::from_units(units))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        Ok(Amount::from_f64(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::parse_decimal(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}
