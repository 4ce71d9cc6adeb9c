use crate::{error::ApiError, models::page_offset, password::password_policy_violations};

/// FieldErrors
///
/// Collects every field problem of a payload so they are reported together
/// as a single `ApiError::Validation`.
#[derive(Debug, Default)]
pub struct FieldErrors(Vec<String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    /// Length is counted in characters, bounds inclusive.
    pub fn check_length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min || len > max {
            self.push(format!(
                "{field} must be between {min} and {max} characters (got {len})"
            ));
        }
    }

    pub fn check_max_length(&mut self, field: &str, value: &str, max: usize) {
        let len = value.chars().count();
        if len > max {
            self.push(format!("{field} must be at most {max} characters (got {len})"));
        }
    }

    pub fn check_email(&mut self, value: &str) {
        if !is_valid_email(value) {
            self.push("email must be a valid email address");
        }
    }

    pub fn check_password(&mut self, value: &str) {
        self.0.extend(password_policy_violations(value));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), ApiError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.0))
        }
    }
}

/// Syntactic check only: one `@`, a non-empty local part, and a dotted domain
/// without whitespace.
pub fn is_valid_email(value: &str) -> bool {
    if value.len() < 3 || value.len() > 254 || value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Offset pagination bounds shared by every listing.
pub fn check_page(page: i64, page_size: i64) -> Result<(), ApiError> {
    let mut errors = FieldErrors::new();
    if page < 1 {
        errors.push("page must be at least 1");
    }
    if page_size < 1 {
        errors.push("pageSize must be at least 1");
    }
    if errors.is_empty() && page_offset(page, page_size).is_none() {
        errors.push("page is out of range for the given pageSize");
    }
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("student@plataforma.com"));
        assert!(is_valid_email("a.b+c@sub.example.org"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@localhost"));
        assert!(!is_valid_email("user@@example.com"));
        assert!(!is_valid_email("us er@example.com"));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let mut errors = FieldErrors::new();
        errors.check_length("full name", "Zoë", 3, 200);
        assert!(errors.is_empty());
    }

    #[test]
    fn errors_accumulate() {
        let mut errors = FieldErrors::new();
        errors.check_length("username", "ab", 3, 256);
        errors.check_email("nope");
        match errors.into_result() {
            Err(ApiError::Validation(fields)) => assert_eq!(fields.len(), 2),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn page_bounds() {
        assert!(check_page(1, 10).is_ok());
        assert!(check_page(0, 10).is_err());
        assert!(check_page(1, 0).is_err());
        assert!(check_page(i64::MAX, 1).is_ok());
        assert!(check_page(i64::MAX, 2).is_err());
    }
}
