//! CLI argument validators.
//!
//! Shared validation functions for CLI argument parsing.

use crate::constants::confidence;

/// Parse and validate confidence value (0.0-1.0).
pub fn parse_confidence(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !(confidence::MIN..=confidence::MAX).contains(&value) {
        return Err(format!(
            "confidence must be between {:.1} and {:.1}, got {value}",
            confidence::MIN,
            confidence::MAX
        ));
    }

    Ok(value)
}

/// Parse a whole number of at least 1.
pub fn parse_positive(s: &str) -> Result<u32, String> {
    let value: u32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid whole number"))?;

    if value == 0 {
        return Err("value must be at least 1".to_string());
    }

    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_confidence_valid() {
        assert_eq!(parse_confidence("0.5").ok(), Some(0.5));
        assert_eq!(parse_confidence("0.0").ok(), Some(0.0));
        assert_eq!(parse_confidence("1.0").ok(), Some(1.0));
    }

    #[test]
    fn test_parse_confidence_invalid() {
        assert!(parse_confidence("1.1").is_err());
        assert!(parse_confidence("-0.1").is_err());
        assert!(parse_confidence("abc").is_err());
        assert!(
            parse_confidence("2")
                .unwrap_err()
                .contains("between 0.0 and 1.0")
        );
    }

    #[test]
    fn test_parse_positive() {
        assert_eq!(parse_positive("224").ok(), Some(224));
        assert_eq!(parse_positive("1").ok(), Some(1));
        assert!(parse_positive("0").is_err());
        assert!(parse_positive("-3").is_err());
        assert!(parse_positive("many").unwrap_err().contains("not a valid"));
    }
}
