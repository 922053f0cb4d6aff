//! Short human-enterable codes that map to one shared file.

use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

use crate::models::errors::AppError;

pub const CODE_LENGTH: usize = 6;
pub const MAX_CODE_LENGTH: usize = 32;

const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

static CODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^[A-Za-z0-9_-]{{1,{}}}$", MAX_CODE_LENGTH))
        .expect("sharing code pattern is valid")
});

/// Generate a random 6-character uppercase alphanumeric code.
pub fn generate() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Codes are entered by hand, so surrounding whitespace and case are ignored.
pub fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Codes double as metadata file names; only a safe alphabet is accepted.
pub fn is_valid(code: &str) -> bool {
    CODE_PATTERN.is_match(code)
}

/// Normalize and validate a caller-supplied code.
pub fn parse(raw: &str) -> Result<String, AppError> {
    let code = normalize(raw);
    if code.is_empty() {
        return Err(AppError::validation_failed("No sharing code provided."));
    }
    if !is_valid(&code) {
        return Err(AppError::validation_failed(format!(
            "Sharing code must be 1-{} letters, digits, '-' or '_'.",
            MAX_CODE_LENGTH
        )));
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_shape() {
        for _ in 0..100 {
            let code = generate();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
            assert!(is_valid(&code));
        }
    }

    #[test]
    fn test_parse_normalizes() {
        assert_eq!(parse("  abc123 ").unwrap(), "ABC123");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(parse(""), Err(AppError::ValidationError { .. })));
        assert!(matches!(parse("   "), Err(AppError::ValidationError { .. })));
        assert!(parse("../etc/passwd").is_err());
        assert!(parse("a b").is_err());
        assert!(parse(&"A".repeat(MAX_CODE_LENGTH + 1)).is_err());
        assert!(parse(&"A".repeat(MAX_CODE_LENGTH)).is_ok());
    }
}
