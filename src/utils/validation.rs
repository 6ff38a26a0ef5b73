use regex::Regex;

lazy_static::lazy_static! {
    static ref EMAIL_PATTERN: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    static ref PHONE_PATTERN: Regex = Regex::new(r"^\d{10}$").unwrap();
}

pub fn validate_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Phone is optional; when given it must be exactly ten digits.
pub fn validate_phone(phone: &str) -> bool {
    phone.is_empty() || PHONE_PATTERN.is_match(phone)
}

/// Empty form fields are sent as `null`.
pub fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(validate_email("a@b.com"));
        assert!(validate_email("first.last+tag@mail.example.org"));
        assert!(!validate_email("a@b"));
        assert!(!validate_email("no-at-sign.com"));
        assert!(!validate_email("spaces in@b.com"));
    }

    #[test]
    fn test_phone_validation() {
        assert!(validate_phone(""));
        assert!(validate_phone("5551234567"));
        assert!(!validate_phone("555-123-4567"));
        assert!(!validate_phone("12345"));
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(&Some("  ".to_string())), None);
        assert_eq!(non_empty(&None), None);
        assert_eq!(non_empty(&Some(" Main St ".to_string())), Some("Main St".to_string()));
    }
}
