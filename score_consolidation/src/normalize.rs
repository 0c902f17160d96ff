//! Normalization of raw spreadsheet values.
//!
//! The source workbooks mix numeric and text cells freely, so every value
//! that participates in a join goes through one of these functions first.

use regex::Regex;
use std::sync::OnceLock;

// Artifact of a numeric-to-text conversion, e.g. "12345678.0".
fn float_artifact_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.0$").unwrap())
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"20\d{2}").unwrap())
}

/// Canonicalizes a raw identifier into a plain digit string.
///
/// Returns None when no digits remain. Any digit string is accepted: no
/// length or checksum validation is performed.
pub fn normalize_identifier(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let s = if float_artifact_re().is_match(s) {
        &s[..s.len() - 2]
    } else {
        s
    };
    let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// Collapses runs of whitespace to a single space and trims the ends.
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Extracts a 4-digit year (20xx) from a period label such as 2024,
/// "2024-I" or "2025-II". Sub-term suffixes are tolerated without being
/// parsed.
pub fn extract_year(label: &str) -> Option<i32> {
    year_re()
        .find(label)
        .and_then(|m| m.as_str().parse::<i32>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_digit_inputs() {
        assert_eq!(normalize_identifier("12345678"), Some("12345678".to_string()));
        assert_eq!(
            normalize_identifier("12345678.0"),
            Some("12345678".to_string())
        );
        assert_eq!(
            normalize_identifier("1234-5678"),
            Some("12345678".to_string())
        );
        assert_eq!(
            normalize_identifier("  12345678  "),
            Some("12345678".to_string())
        );
    }

    #[test]
    fn identifier_no_digits() {
        assert_eq!(normalize_identifier(""), None);
        assert_eq!(normalize_identifier("   "), None);
        assert_eq!(normalize_identifier("N/A"), None);
    }

    #[test]
    fn identifier_float_artifact_only_strips_dot_zero() {
        // ".5" is not a conversion artifact, the digits are kept as they are.
        assert_eq!(normalize_identifier("1234.5"), Some("12345".to_string()));
        assert_eq!(normalize_identifier("1234.0"), Some("1234".to_string()));
    }

    #[test]
    fn whitespace_collapse() {
        assert_eq!(collapse_whitespace("  Ana   María "), "Ana María");
        assert_eq!(collapse_whitespace("Quispe\tRojas"), "Quispe Rojas");
        assert_eq!(collapse_whitespace(""), "");
    }

    #[test]
    fn year_extraction() {
        assert_eq!(extract_year("2024"), Some(2024));
        assert_eq!(extract_year("2025-II"), Some(2025));
        assert_eq!(extract_year("2025 - I"), Some(2025));
        assert_eq!(extract_year("24"), None);
        assert_eq!(extract_year("abc"), None);
        assert_eq!(extract_year(""), None);
    }
}
