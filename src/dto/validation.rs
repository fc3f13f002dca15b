//! Validation helpers for DTOs.

use validator::ValidationError;

/// Maximum length of a team join code after normalization.
const TEAM_CODE_MAX_LEN: usize = 24;
/// Maximum number of answer options on a question.
const MAX_OPTIONS: usize = 4;

/// Validates a team join code after normalization (trimmed, upper-cased):
/// 1 to 24 characters drawn from `A-Z`, `0-9`, `_` and `-`.
///
/// # Examples
///
/// ```ignore
/// validate_team_code("TEAM_A")  // Ok
/// validate_team_code("")        // Err - empty
/// validate_team_code("TEAM A")  // Err - space
/// ```
pub fn validate_team_code(code: &str) -> Result<(), ValidationError> {
    if code.is_empty() || code.len() > TEAM_CODE_MAX_LEN {
        let mut err = ValidationError::new("team_code_length");
        err.message = Some(
            format!(
                "Team code must be 1 to {TEAM_CODE_MAX_LEN} characters (got {})",
                code.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        let mut err = ValidationError::new("team_code_format");
        err.message = Some("Team code may only contain A-Z, 0-9, underscore and hyphen".into());
        return Err(err);
    }

    Ok(())
}

/// Validates the answer options of a question: one to four entries, none
/// blank.
pub fn validate_options(options: &[String]) -> Result<(), ValidationError> {
    if options.is_empty() || options.len() > MAX_OPTIONS {
        let mut err = ValidationError::new("options_count");
        err.message = Some(
            format!(
                "Questions carry 1 to {MAX_OPTIONS} options (got {})",
                options.len()
            )
            .into(),
        );
        return Err(err);
    }

    if options.iter().any(|option| option.trim().is_empty()) {
        let mut err = ValidationError::new("options_blank");
        err.message = Some("Options must not be blank".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_team_code_valid() {
        assert!(validate_team_code("TEAM_A").is_ok());
        assert!(validate_team_code("B").is_ok());
        assert!(validate_team_code("2ND-SQUAD").is_ok());
    }

    #[test]
    fn test_validate_team_code_invalid_length() {
        assert!(validate_team_code("").is_err()); // empty
        assert!(validate_team_code(&"A".repeat(25)).is_err()); // too long
    }

    #[test]
    fn test_validate_team_code_invalid_format() {
        assert!(validate_team_code("team_a").is_err()); // lowercase (pre-normalization)
        assert!(validate_team_code("TEAM A").is_err()); // space
        assert!(validate_team_code("TÉAM").is_err()); // non-ascii
    }

    #[test]
    fn test_validate_options_count() {
        assert!(validate_options(&["yes".into()]).is_ok());
        assert!(validate_options(&["a".into(), "b".into(), "c".into(), "d".into()]).is_ok());
        assert!(validate_options(&[]).is_err()); // empty
        assert!(
            validate_options(&["a".into(), "b".into(), "c".into(), "d".into(), "e".into()])
                .is_err()
        ); // too many
    }

    #[test]
    fn test_validate_options_blank_entries() {
        assert!(validate_options(&["Paris".into(), "  ".into()]).is_err());
    }
}
