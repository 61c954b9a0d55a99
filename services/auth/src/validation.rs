//! Input validation utilities
//!
//! Password complexity lives in `PasswordService`, which needs identity
//! context; the shape checks here are context-free.

use regex::Regex;
use std::sync::OnceLock;

/// Check that an email address is plausibly shaped. Deliverability is the
/// mail system's problem; this only rejects obvious garbage before it
/// becomes a unique key.
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email address is required".to_string());
    }

    // RFC 5321 caps the address at 254 octets.
    if email.len() > 254 {
        return Err("Email address is too long".to_string());
    }

    static ADDRESS_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = ADDRESS_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email address regex")
    });

    if !regex.is_match(email) {
        return Err("Email address is not valid".to_string());
    }

    Ok(())
}

/// Validate display name
pub fn validate_display_name(name: &str) -> Result<(), String> {
    let name = name.trim();

    if name.is_empty() {
        return Err("Name is required".to_string());
    }

    if name.len() > 64 {
        return Err("Name must be at most 64 characters long".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("reader@example.com").is_ok());
        assert!(validate_email("first.last+tag@sub.example.org").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("missing@tld").is_err());
    }

    #[test]
    fn test_validate_display_name() {
        assert!(validate_display_name("Casey Brook").is_ok());
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name(&"x".repeat(65)).is_err());
    }
}
