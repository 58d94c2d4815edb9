/// Tag values treated as boolean true by the `[key?]` test.
pub const TRUE_VALUES: [&str; 4] = ["true", "yes", "1", "on"];

pub fn is_true(value: Option<&str>) -> bool {
    value.is_some_and(|v| TRUE_VALUES.contains(&v))
}

/// Parse a float, tolerating surrounding whitespace. Unlike a lenient
/// "leading digits" parse, `"50 mph"` is rejected.
pub fn parse_float(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_tokens() {
        assert!(is_true(Some("yes")));
        assert!(is_true(Some("1")));
        assert!(!is_true(Some("Yes")));
        assert!(!is_true(Some("no")));
        assert!(!is_true(None));
    }

    #[test]
    fn parse_float_rejects_units() {
        assert_eq!(parse_float(" 3.5 "), Some(3.5));
        assert_eq!(parse_float("-2"), Some(-2.0));
        assert_eq!(parse_float("50 mph"), None);
        assert_eq!(parse_float("abc"), None);
    }
}
