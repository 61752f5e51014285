//! Exact parsing of Kubernetes resource quantities.
//!
//! Only what the patcher needs: numeric equality between two spellings of a
//! quantity (`1` and `1000m`) and conversion to an integer count.

use std::str::FromStr;

/// A quantity as `coefficient * 10^scale`, normalized so that equal values
/// compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedQuantity {
    coefficient: i128,
    scale: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display("{value:?} is not a valid quantity")]
pub struct QuantityError {
    pub value: String,
}

impl core::error::Error for QuantityError {}

impl ParsedQuantity {
    /// Strips trailing zeros from the coefficient. `None` when the scale
    /// would leave the `i32` range.
    fn new(coefficient: i128, scale: i32) -> Option<Self> {
        let mut quantity = Self { coefficient, scale };
        if quantity.coefficient == 0 {
            quantity.scale = 0;
            return Some(quantity);
        }
        while quantity.coefficient % 10 == 0 {
            quantity.coefficient /= 10;
            quantity.scale = quantity.scale.checked_add(1)?;
        }
        Some(quantity)
    }

    /// Returns the value as a whole number, `None` when it has a fractional
    /// part or does not fit.
    pub fn to_integer(&self) -> Option<i64> {
        let scale = u32::try_from(self.scale).ok()?;
        let value = 10_i128
            .checked_pow(scale)
            .and_then(|factor| self.coefficient.checked_mul(factor))?;
        i64::try_from(value).ok()
    }
}

fn decimal_suffix(suffix: &str) -> Option<i32> {
    Some(match suffix {
        "" => 0,
        "m" => -3,
        "k" => 3,
        "M" => 6,
        "G" => 9,
        "T" => 12,
        "P" => 15,
        "E" => 18,
        _ => return None,
    })
}

fn binary_suffix(suffix: &str) -> Option<u32> {
    Some(match suffix {
        "Ki" => 1,
        "Mi" => 2,
        "Gi" => 3,
        "Ti" => 4,
        "Pi" => 5,
        "Ei" => 6,
        _ => return None,
    })
}

impl FromStr for ParsedQuantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        let invalid = || QuantityError {
            value: value.to_string(),
        };

        let (negative, rest) = match value.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, value.strip_prefix('+').unwrap_or(value)),
        };

        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, suffix) = rest.split_at(number_len);
        let (int_part, frac_part) = number.split_once('.').unwrap_or((number, ""));
        if (int_part.is_empty() && frac_part.is_empty()) || frac_part.contains('.') {
            return Err(invalid());
        }

        let mut coefficient: i128 = 0;
        for digit in int_part.bytes().chain(frac_part.bytes()) {
            coefficient = coefficient
                .checked_mul(10)
                .and_then(|c| c.checked_add(i128::from(digit - b'0')))
                .ok_or_else(invalid)?;
        }
        let mut scale = i32::try_from(frac_part.len())
            .map(|len| -len)
            .map_err(|_| invalid())?;

        if let Some(exp) = decimal_suffix(suffix) {
            scale = scale.checked_add(exp).ok_or_else(invalid)?;
        } else if let Some(power) = binary_suffix(suffix) {
            coefficient = 1024_i128
                .checked_pow(power)
                .and_then(|factor| coefficient.checked_mul(factor))
                .ok_or_else(invalid)?;
        } else if let Some(exp) = suffix.strip_prefix(['e', 'E']) {
            let exp: i32 = exp.parse().map_err(|_| invalid())?;
            scale = scale.checked_add(exp).ok_or_else(invalid)?;
        } else {
            return Err(invalid());
        }

        if negative {
            coefficient = -coefficient;
        }

        Self::new(coefficient, scale).ok_or_else(invalid)
    }
}
