//! Locale-formatted number parsing
//!
//! Nutrition tables on the target site use Brazilian formatting: `,` is the
//! decimal separator and `.` groups thousands. Unit suffixes and footnote
//! markers are stripped before parsing.

/// Parse a nutrient value such as `"1.234,56"`, `"0,5 g"` or `"12g"`.
///
/// Empty text, `"-"` and anything unparsable yield `0.0`.
pub fn parse_locale_number(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() || text == "-" {
        return 0.0;
    }

    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    let normalized = if kept.contains(',') {
        kept.replace('.', "").replace(',', ".")
    } else if kept.matches('.').count() > 1 {
        kept.replace('.', "")
    } else {
        kept
    };

    normalized.parse::<f64>().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thousands_and_decimal_comma() {
        assert_eq!(parse_locale_number("1.234,56"), 1234.56);
    }

    #[test]
    fn test_empty_and_dash_are_zero() {
        assert_eq!(parse_locale_number(""), 0.0);
        assert_eq!(parse_locale_number("   "), 0.0);
        assert_eq!(parse_locale_number("-"), 0.0);
    }

    #[test]
    fn test_unit_suffix_stripped() {
        assert_eq!(parse_locale_number("12g"), 12.0);
        assert_eq!(parse_locale_number("0,5 g"), 0.5);
        assert_eq!(parse_locale_number("150 mg"), 150.0);
    }

    #[test]
    fn test_plain_decimal_point() {
        assert_eq!(parse_locale_number("2.5"), 2.5);
        assert_eq!(parse_locale_number("1.000.000"), 1_000_000.0);
    }

    #[test]
    fn test_garbage_is_zero() {
        assert_eq!(parse_locale_number("traces"), 0.0);
        assert_eq!(parse_locale_number(","), 0.0);
        assert_eq!(parse_locale_number("1,2,3"), 0.0);
    }
}
