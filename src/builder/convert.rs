//! Conversions from scraped attribute text to engine units.

use crate::error::{RosterError, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Feet/inches notation: `6-2`, `6'2"`, `6' 2''`, `6 ft 2 in`
static FEET_INCHES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(\d)\s*(?:-|'|ft)\s*(\d{1,2})\s*(?:"|''|in)?$"#).expect("valid height pattern")
});

/// Height in inches from either plain inches or feet/inches notation
pub fn parse_height(raw: &str) -> Result<u32> {
    let value = raw.trim();

    if let Some(captures) = FEET_INCHES.captures(value) {
        let feet: u32 = captures[1].parse().map_err(|_| invalid_height(raw))?;
        let inches: u32 = captures[2].parse().map_err(|_| invalid_height(raw))?;
        if inches >= 12 {
            return Err(invalid_height(raw));
        }
        return Ok(feet * 12 + inches);
    }

    parse_whole_number(value).ok_or_else(|| invalid_height(raw))
}

/// Stored weight: pounds less the engine's offset
pub fn stored_weight(raw: &str, offset: i32) -> Result<u32> {
    let pounds = parse_whole_number(raw.trim()).ok_or_else(|| RosterError::InvalidValue {
        field: "weight".to_string(),
        value: raw.to_string(),
        reason: "not a whole number of pounds".to_string(),
    })?;

    u32::try_from(pounds as i64 - offset as i64).map_err(|_| RosterError::InvalidValue {
        field: "weight".to_string(),
        value: raw.to_string(),
        reason: format!("below the {} lb minimum", offset),
    })
}

/// Jersey number requested by the CSV
pub fn parse_jersey(raw: &str) -> Result<u8> {
    parse_whole_number(raw.trim())
        .filter(|number| *number <= 99)
        .map(|number| number as u8)
        .ok_or_else(|| RosterError::InvalidValue {
            field: "jersey_number".to_string(),
            value: raw.to_string(),
            reason: "not a number between 0 and 99".to_string(),
        })
}

/// Non-negative integer, accepting integral decimals such as `74.0`
fn parse_whole_number(value: &str) -> Option<u32> {
    if let Ok(number) = value.parse::<u32>() {
        return Some(number);
    }
    let number = value.parse::<f64>().ok()?;
    (number.is_finite() && number >= 0.0 && number.fract() == 0.0 && number <= u32::MAX as f64)
        .then_some(number as u32)
}

fn invalid_height(raw: &str) -> RosterError {
    RosterError::InvalidValue {
        field: "height".to_string(),
        value: raw.to_string(),
        reason: "expected inches or feet-inches".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_notations() {
        assert_eq!(parse_height("74").unwrap(), 74);
        assert_eq!(parse_height("74.0").unwrap(), 74);
        assert_eq!(parse_height("6-2").unwrap(), 74);
        assert_eq!(parse_height("6'2\"").unwrap(), 74);
        assert_eq!(parse_height("6' 5''").unwrap(), 77);
        assert_eq!(parse_height("5 ft 11 in").unwrap(), 71);
    }

    #[test]
    fn test_bad_heights() {
        assert!(parse_height("6-13").is_err());
        assert!(parse_height("tall").is_err());
        assert!(parse_height("-70").is_err());
    }

    #[test]
    fn test_weight_offset() {
        assert_eq!(stored_weight("245", 160).unwrap(), 85);
        assert_eq!(stored_weight("160", 160).unwrap(), 0);
        assert!(stored_weight("150", 160).is_err());
        assert!(stored_weight("heavy", 160).is_err());
    }

    #[test]
    fn test_jersey_range() {
        assert_eq!(parse_jersey("17").unwrap(), 17);
        assert_eq!(parse_jersey("0").unwrap(), 0);
        assert_eq!(parse_jersey("99.0").unwrap(), 99);
        assert!(parse_jersey("100").is_err());
        assert!(parse_jersey("#12").is_err());
    }
}
