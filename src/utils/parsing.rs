//! Parsing utilities for attribute text and CLI arguments.
//!
//! This module provides reusable parsing functions for the small text formats
//! used by the attribute surface and the command line.

use crate::error::{Result, SenseError};

// =============================================================================
// Color Parsing
// =============================================================================

/// Parse a hex color string into RGB components.
///
/// Accepts formats: `#RRGGBB` or `RRGGBB`
///
/// # Arguments
/// * `hex` - Hex color string
///
/// # Returns
/// Tuple of (red, green, blue) values (0-255 each)
///
/// # Example
/// ```
/// use acer_sense::utils::parsing::parse_hex_color;
///
/// let (r, g, b) = parse_hex_color("#FF5500").unwrap();
/// assert_eq!(r, 255);
/// assert_eq!(g, 85);
/// assert_eq!(b, 0);
/// ```
pub fn parse_hex_color(hex: &str) -> Result<(u8, u8, u8)> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SenseError::invalid(format!(
            "Invalid color '{}', expected RRGGBB",
            hex
        )));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16)
            .map_err(|_| SenseError::invalid(format!("Invalid color hex: {}", hex)))
    };
    Ok((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

// =============================================================================
// Numeric Fields
// =============================================================================

/// Parse a decimal integer in `0..=max`.
///
/// # Arguments
/// * `text` - Decimal text, surrounding whitespace ignored
/// * `what` - Field name used in the error message
/// * `max` - Inclusive upper bound
pub fn parse_bounded(text: &str, what: &str, max: u8) -> Result<u8> {
    let value: i64 = text
        .trim()
        .parse()
        .map_err(|_| SenseError::invalid(format!("Invalid {} value '{}'", what, text.trim())))?;
    if !(0..=i64::from(max)).contains(&value) {
        return Err(SenseError::invalid(format!(
            "{} must be 0-{}, got {}",
            what, max, value
        )));
    }
    Ok(value as u8)
}

/// Parse a percentage (0-100).
pub fn parse_percent(text: &str, what: &str) -> Result<u8> {
    parse_bounded(text, what, 100)
}

/// Parse a single-digit boolean (`0` or `1`).
pub fn parse_flag(text: &str) -> Result<bool> {
    match text.trim() {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(SenseError::invalid(format!(
            "Expected 0 or 1, got '{}'",
            other
        ))),
    }
}

/// Split comma-separated text into exactly `expected` fields.
pub fn split_fields(text: &str, expected: usize) -> Result<Vec<&str>> {
    let fields: Vec<&str> = text.trim().split(',').map(str::trim).collect();
    if fields.len() != expected {
        return Err(SenseError::invalid(format!(
            "Expected {} comma-separated values, got {}",
            expected,
            fields.len()
        )));
    }
    Ok(fields)
}

// =============================================================================
// Fan Speeds
// =============================================================================

/// Parse a `"cpu,gpu"` fan speed pair.
///
/// # Example
/// ```
/// use acer_sense::utils::parsing::parse_fan_pair;
///
/// assert_eq!(parse_fan_pair("30,0").unwrap(), (30, 0));
/// assert!(parse_fan_pair("30").is_err());
/// ```
pub fn parse_fan_pair(text: &str) -> Result<(u8, u8)> {
    let fields = split_fields(text, 2)?;
    Ok((
        parse_percent(fields[0], "CPU fan speed")?,
        parse_percent(fields[1], "GPU fan speed")?,
    ))
}

/// Parse a single fan speed argument: a percentage, `auto` (0) or `max` (100).
pub fn parse_fan_speed_arg(text: &str) -> Result<u8> {
    match text.trim().to_lowercase().as_str() {
        "auto" | "a" => Ok(0),
        "max" => Ok(100),
        other => parse_percent(other, "fan speed"),
    }
}

// =============================================================================
// Raw Bytes
// =============================================================================

/// Parse a hex byte string such as `0801000000000000`.
///
/// Whitespace, `:` separators and a leading `0x` are ignored.
pub fn parse_hex_bytes(text: &str) -> Result<Vec<u8>> {
    let trimmed = text.trim();
    let digits: String = trimmed
        .strip_prefix("0x")
        .unwrap_or(trimmed)
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    if digits.len() % 2 != 0 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SenseError::invalid(format!(
            "Invalid hex bytes '{}'",
            text.trim()
        )));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| SenseError::invalid(format!("Invalid hex byte '{}'", &digits[i..i + 2])))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#FF5500").unwrap(), (255, 85, 0));
        assert_eq!(parse_hex_color("00ff00").unwrap(), (0, 255, 0));
        assert!(parse_hex_color("FFF").is_err());
        assert!(parse_hex_color("GG0000").is_err());
    }

    #[test]
    fn test_parse_bounded() {
        assert_eq!(parse_bounded(" 9 ", "speed", 9).unwrap(), 9);
        assert!(parse_bounded("10", "speed", 9).is_err());
        assert!(parse_bounded("-1", "speed", 9).is_err());
        assert!(parse_bounded("x", "speed", 9).is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1\n").unwrap());
        assert!(!parse_flag("0").unwrap());
        assert!(parse_flag("2").is_err());
        assert!(parse_flag("yes").is_err());
    }

    #[test]
    fn test_parse_fan_pair() {
        assert_eq!(parse_fan_pair("20,60\n").unwrap(), (20, 60));
        assert!(parse_fan_pair("101,0").is_err());
        assert!(parse_fan_pair("1,2,3").is_err());
    }

    #[test]
    fn test_parse_fan_speed_arg() {
        assert_eq!(parse_fan_speed_arg("auto").unwrap(), 0);
        assert_eq!(parse_fan_speed_arg("MAX").unwrap(), 100);
        assert_eq!(parse_fan_speed_arg("45").unwrap(), 45);
        assert!(parse_fan_speed_arg("fast").is_err());
    }

    #[test]
    fn test_parse_hex_bytes() {
        assert_eq!(
            parse_hex_bytes("0x0801 0000:0000 0000").unwrap(),
            vec![8, 1, 0, 0, 0, 0, 0, 0]
        );
        assert!(parse_hex_bytes("080").is_err());
        assert!(parse_hex_bytes("zz").is_err());
    }
}
