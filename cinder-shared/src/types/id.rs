use crate::errors::{AppError, AppResult};

/// Maximum accepted identifier length, in bytes.
pub const MAX_ID_LEN: usize = 128;

/// Well-formedness check for opaque identifiers (user ids, match ids).
///
/// Ids are externally assigned and never parsed, so the only constraints are
/// the ones storage keys and URL paths require: non-empty, at most
/// [`MAX_ID_LEN`] bytes, no whitespace or control characters, no `/`.
pub fn is_well_formed(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && !id.chars().any(|c| c.is_whitespace() || c.is_control() || c == '/')
}

/// Validate an identifier at an operation boundary.
///
/// `what` names the field for the error message, e.g. `"user_id"`.
pub fn require_well_formed(id: &str, what: &str) -> AppResult<()> {
    if is_well_formed(id) {
        Ok(())
    } else {
        Err(AppError::invalid_argument(format!("{what} is not a valid identifier")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_ids() {
        assert!(is_well_formed("u1"));
        assert!(is_well_formed("0192c2f3-7b1e-7f7a-b0d4-a5d1c17e29aa"));
        assert!(is_well_formed("firebase:AbC123_xYz"));
    }

    #[test]
    fn rejects_empty() {
        assert!(!is_well_formed(""));
    }

    #[test]
    fn rejects_oversized() {
        let long = "a".repeat(MAX_ID_LEN + 1);
        assert!(!is_well_formed(&long));
        let max = "a".repeat(MAX_ID_LEN);
        assert!(is_well_formed(&max));
    }

    #[test]
    fn rejects_separators_and_controls() {
        assert!(!is_well_formed("a/b"));
        assert!(!is_well_formed("a b"));
        assert!(!is_well_formed("a\tb"));
        assert!(!is_well_formed("a\nb"));
        assert!(!is_well_formed("a\u{0}b"));
    }

    #[test]
    fn require_returns_invalid_argument() {
        let err = require_well_formed("", "user_id").unwrap_err();
        assert_eq!(err.error_code(), crate::errors::ErrorCode::InvalidArgument);
    }
}
