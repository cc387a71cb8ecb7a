//! Text conversions

use std::str::FromStr;

/// Truthiness of a string: empty (after trimming) or a case-insensitive
/// `false` is false, anything else is true.
pub fn string_to_bool(text: &str) -> bool {
    let trimmed = text.trim();
    !(trimmed.is_empty() || trimmed.eq_ignore_ascii_case("false"))
}

/// Parse the whole of `text`; trailing garbage fails the conversion
pub fn parse_whole<T: FromStr>(text: &str) -> Option<T> {
    text.parse::<T>().ok()
}

/// First character of `text` (`'\0'` when empty)
pub fn string_to_char(text: &str) -> char {
    text.chars().next().unwrap_or('\0')
}

/// Format a floating point value with `digits` significant digits, the way
/// a stream with that precision in general notation prints it.
pub fn format_significant(value: f64, digits: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let digits = digits.max(1);
    // scientific rendering gives the exponent after rounding
    let scientific = format!("{:.*e}", digits - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= digits as i32 {
        let mantissa = strip_trailing_zeros(mantissa);
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    } else {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        strip_trailing_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn strip_trailing_zeros(text: &str) -> &str {
    if !text.contains('.') {
        return text;
    }
    text.trim_end_matches('0').trim_end_matches('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_to_bool() {
        assert!(!string_to_bool("FALSE"));
        assert!(!string_to_bool("  false "));
        assert!(!string_to_bool(""));
        assert!(!string_to_bool("   "));
        assert!(string_to_bool("fdsfsdf"));
        assert!(string_to_bool("true"));
        assert!(string_to_bool("0"));
    }

    #[test]
    fn test_parse_whole() {
        assert_eq!(parse_whole::<i32>("42"), Some(42));
        assert_eq!(parse_whole::<i32>("42abc"), None);
        assert_eq!(parse_whole::<i8>("300"), None);
        assert_eq!(parse_whole::<f64>("2.5"), Some(2.5));
    }

    #[test]
    fn test_string_to_char() {
        assert_eq!(string_to_char("xyz"), 'x');
        assert_eq!(string_to_char(""), '\0');
    }

    #[test]
    fn test_format_significant() {
        assert_eq!(format_significant(1.5, 6), "1.5");
        assert_eq!(format_significant(42.0, 6), "42");
        assert_eq!(format_significant(3.14159265, 6), "3.14159");
        assert_eq!(format_significant(1234567.0, 6), "1.23457e+06");
        assert_eq!(format_significant(0.0001, 6), "0.0001");
        assert_eq!(format_significant(0.00001, 6), "1e-05");
        assert_eq!(format_significant(-2.25, 15), "-2.25");
        assert_eq!(format_significant(0.1, 15), "0.1");
    }
}
