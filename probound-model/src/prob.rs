//! Exact decimal probabilities.
//!
//! Probabilities enter the system as decimal literals and stay exact
//! (`BigRational`) through the whole symbolic layer. Conversion to `f64`
//! happens only at the optimization oracle boundary, via [`to_f64`].
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use thiserror::Error;

/// Possible errors while parsing a decimal probability literal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecimalParseError {
    #[error("empty probability literal")]
    Empty,
    #[error("invalid decimal probability literal: '{}'", input)]
    InvalidLiteral { input: String },
}

/// Parses a decimal literal like `0.25`, `1` or `-1` into an exact rational.
///
/// The literal is interpreted exactly: `0.3` becomes 3/10, not the nearest
/// double. Exponent notation is not accepted.
pub fn parse_decimal(input: &str) -> Result<BigRational, DecimalParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DecimalParseError::Empty);
    }

    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let (int_digits, frac_digits) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (unsigned, ""),
    };

    if int_digits.is_empty() && frac_digits.is_empty() {
        return Err(DecimalParseError::InvalidLiteral {
            input: input.to_owned(),
        });
    }

    let mut numer = BigInt::zero();
    for digit in int_digits.chars().chain(frac_digits.chars()) {
        match digit.to_digit(10) {
            Some(value) => numer = numer * 10u32 + value,
            None => {
                return Err(DecimalParseError::InvalidLiteral {
                    input: input.to_owned(),
                })
            }
        }
    }

    if negative {
        numer = -numer;
    }

    let denom = BigInt::from(10u32).pow(frac_digits.len() as u32);
    Ok(BigRational::new(numer, denom))
}

/// Formats a rational as an exact decimal string when possible.
///
/// Rationals whose reduced denominator has prime factors other than 2 and 5
/// have no finite decimal expansion and fall back to the `numer/denom` form.
pub fn format_decimal(value: &BigRational) -> String {
    let two = BigInt::from(2u32);
    let five = BigInt::from(5u32);

    let mut rest = value.denom().clone();
    let mut twos = 0u32;
    let mut fives = 0u32;
    while (&rest % &two).is_zero() {
        rest /= &two;
        twos += 1;
    }
    while (&rest % &five).is_zero() {
        rest /= &five;
        fives += 1;
    }
    if !rest.is_one() {
        return value.to_string();
    }

    let scale = twos.max(fives);
    let scaled = value.numer() * two.pow(scale - twos) * five.pow(scale - fives);
    if scale == 0 {
        return scaled.to_string();
    }

    let ten_pow = BigInt::from(10u32).pow(scale);
    let magnitude = scaled.abs();
    let int_part = &magnitude / &ten_pow;
    let frac_part = &magnitude % &ten_pow;
    let sign = if scaled.is_negative() { "-" } else { "" };
    format!(
        "{}{}.{:0>width$}",
        sign,
        int_part,
        frac_part.to_string(),
        width = scale as usize
    )
}

/// Converts an exact probability for handoff to the oracle.
pub fn to_f64(value: &BigRational) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn rational(numer: i64, denom: i64) -> BigRational {
        BigRational::new(numer.into(), denom.into())
    }

    #[test]
    fn parses_integers_and_fractions() {
        assert_eq!(parse_decimal("1").unwrap(), rational(1, 1));
        assert_eq!(parse_decimal("0.5").unwrap(), rational(1, 2));
        assert_eq!(parse_decimal("0.3").unwrap(), rational(3, 10));
        assert_eq!(parse_decimal(".25").unwrap(), rational(1, 4));
        assert_eq!(parse_decimal("-1").unwrap(), rational(-1, 1));
        assert_eq!(parse_decimal(" 0.08 ").unwrap(), rational(2, 25));
    }

    #[test]
    fn parsing_is_exact() {
        // 0.1 is not representable as a double, but stays exact here.
        assert_eq!(parse_decimal("0.1").unwrap(), rational(1, 10));
        let sum = parse_decimal("0.1").unwrap()
            + parse_decimal("0.1").unwrap()
            + parse_decimal("0.1").unwrap();
        assert_eq!(sum, rational(3, 10));
    }

    #[test]
    fn rejects_malformed_literals() {
        assert_eq!(parse_decimal(""), Err(DecimalParseError::Empty));
        assert!(parse_decimal(".").is_err());
        assert!(parse_decimal("0.5.1").is_err());
        assert!(parse_decimal("1e-3").is_err());
        assert!(parse_decimal("abc").is_err());
    }

    #[test]
    fn formats_decimals() {
        assert_eq!(format_decimal(&rational(1, 2)), "0.5");
        assert_eq!(format_decimal(&rational(3, 10)), "0.3");
        assert_eq!(format_decimal(&rational(-1, 1)), "-1");
        assert_eq!(format_decimal(&rational(29, 50)), "0.58");
        assert_eq!(format_decimal(&rational(1, 100)), "0.01");
        assert_eq!(format_decimal(&rational(1, 3)), "1/3");
    }

    proptest! {
        #[test]
        fn format_parse_round_trip(numer in -1_000_000i64..1_000_000, scale in 0u32..7) {
            let value = BigRational::new(numer.into(), BigInt::from(10u32).pow(scale));
            let formatted = format_decimal(&value);
            prop_assert_eq!(parse_decimal(&formatted).unwrap(), value);
        }
    }
}
