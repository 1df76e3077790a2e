use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static SCALED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([-+]?[0-9]*\.?[0-9]+)\*10\^(\d+)").unwrap());
static POWER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([-+]?)10\^(\d+)").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NumberError {
    #[error("empty numeral")]
    Empty,
    #[error("malformed numeral {0:?}")]
    Malformed(String),
    #[error("numeral {0:?} does not fit in a 64-bit integer")]
    OutOfRange(String),
}

/// Parse a numeral as written in statements: `200000`, `2 · 10^5`, `10^9`,
/// `-10^3`, `1,000`, `3.5e2`. Fractions are truncated toward zero.
pub fn parse_number(raw: &str) -> Result<i64, NumberError> {
    let num: String = raw
        .chars()
        .filter(|c| *c != ' ' && *c != ',')
        .map(|c| if c == '·' || c == '⋅' { '*' } else { c })
        .collect();
    if num.is_empty() {
        return Err(NumberError::Empty);
    }

    if num.contains(['e', 'E']) {
        return float_literal(&num);
    }

    if let Some(caps) = SCALED_RE.captures(&num) {
        let mantissa: f64 = caps[1]
            .parse()
            .map_err(|_| NumberError::Malformed(num.clone()))?;
        let exp: i32 = caps[2]
            .parse()
            .map_err(|_| NumberError::OutOfRange(num.clone()))?;
        return truncate(mantissa * 10f64.powi(exp), &num);
    }

    if let Some(caps) = POWER_RE.captures(&num) {
        let exp: u32 = caps[2]
            .parse()
            .map_err(|_| NumberError::OutOfRange(num.clone()))?;
        let value = 10i64
            .checked_pow(exp)
            .ok_or_else(|| NumberError::OutOfRange(num.clone()))?;
        return Ok(if &caps[1] == "-" { -value } else { value });
    }

    float_literal(&num)
}

fn float_literal(num: &str) -> Result<i64, NumberError> {
    let value: f64 = num
        .parse()
        .map_err(|_| NumberError::Malformed(num.to_string()))?;
    truncate(value, num)
}

fn truncate(value: f64, num: &str) -> Result<i64, NumberError> {
    // i64::MAX is not representable as f64; 2^63 is the first value that overflows
    if !value.is_finite() || value.trunc().abs() >= 9_223_372_036_854_775_808.0 {
        return Err(NumberError::OutOfRange(num.to_string()));
    }
    Ok(value.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn written_forms() {
        assert_eq!(parse_number("2 * 10^5"), Ok(200_000));
        assert_eq!(parse_number("2 · 10^5"), Ok(200_000));
        assert_eq!(parse_number("2⋅10^5"), Ok(200_000));
        assert_eq!(parse_number("10^9"), Ok(1_000_000_000));
        assert_eq!(parse_number("-10^3"), Ok(-1000));
        assert_eq!(parse_number("+10^2"), Ok(100));
        assert_eq!(parse_number("1,000"), Ok(1000));
        assert_eq!(parse_number("3.5e2"), Ok(350));
        assert_eq!(parse_number("1E9"), Ok(1_000_000_000));
        assert_eq!(parse_number("42"), Ok(42));
    }

    #[test]
    fn truncates_toward_zero() {
        assert_eq!(parse_number("2.9"), Ok(2));
        assert_eq!(parse_number("-2.9"), Ok(-2));
        assert_eq!(parse_number("1.5 * 10^1"), Ok(15));
        assert_eq!(parse_number("-1.5e0"), Ok(-1));
    }

    #[test]
    fn exponent_marker_wins_over_power_form() {
        // contains 'e', so it is read as a float literal and fails
        assert!(matches!(parse_number("10^e"), Err(NumberError::Malformed(_))));
    }

    #[test]
    fn power_form_only_needs_a_prefix() {
        assert_eq!(parse_number("10^9+7"), Ok(1_000_000_000));
    }

    #[test]
    fn failures() {
        assert_eq!(parse_number(""), Err(NumberError::Empty));
        assert_eq!(parse_number(" , "), Err(NumberError::Empty));
        assert!(matches!(parse_number("abc"), Err(NumberError::Malformed(_))));
        assert!(matches!(parse_number("2^5"), Err(NumberError::Malformed(_))));
        assert!(matches!(parse_number("."), Err(NumberError::Malformed(_))));
    }

    #[test]
    fn overflow_is_reported() {
        assert!(matches!(parse_number("10^19"), Err(NumberError::OutOfRange(_))));
        assert!(matches!(parse_number("1e300"), Err(NumberError::OutOfRange(_))));
        assert!(matches!(parse_number("5 * 10^400"), Err(NumberError::OutOfRange(_))));
        assert_eq!(parse_number("10^18"), Ok(1_000_000_000_000_000_000));
    }
}
