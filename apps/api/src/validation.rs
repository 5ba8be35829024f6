//! Request-body field checks shared by the handlers. Each returns the
//! normalized value or an `AppError::Validation` naming the field.

use crate::errors::AppError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Trims `value` and rejects it if nothing is left.
pub fn non_empty(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

/// Like [`non_empty`] but for optional fields: `None` stays `None`.
pub fn optional_non_empty(field: &str, value: Option<&str>) -> Result<Option<String>, AppError> {
    value.map(|v| non_empty(field, v)).transpose()
}

/// Lower-cases and trims an email address after a structural check.
pub fn email(value: &str) -> Result<String, AppError> {
    let normalized = value.trim().to_lowercase();
    let valid = match normalized.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !normalized.chars().any(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    };
    if !valid {
        return Err(AppError::Validation(format!("'{value}' is not a valid email")));
    }
    Ok(normalized)
}

pub fn password(value: &str) -> Result<(), AppError> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn non_negative(field: &str, value: Option<i32>) -> Result<(), AppError> {
    match value {
        Some(v) if v < 0 => Err(AppError::Validation(format!("{field} must be >= 0"))),
        _ => Ok(()),
    }
}

pub fn json_object(field: &str, value: Option<&serde_json::Value>) -> Result<(), AppError> {
    match value {
        Some(v) if !v.is_object() => Err(AppError::Validation(format!("{field} must be an object"))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_trims() {
        assert_eq!(non_empty("name", "  Lot Release  ").unwrap(), "Lot Release");
        assert!(non_empty("name", "   ").is_err());
    }

    #[test]
    fn test_optional_non_empty() {
        assert_eq!(optional_non_empty("name", None).unwrap(), None);
        assert!(optional_non_empty("name", Some(" ")).is_err());
    }

    #[test]
    fn test_email_normalized() {
        assert_eq!(email(" Admin@Emkei.co.ke ").unwrap(), "admin@emkei.co.ke");
    }

    #[test]
    fn test_email_rejects_malformed() {
        for bad in ["", "plain", "@example.com", "user@", "user@nodot", "a b@x.org", "u@.org"] {
            assert!(email(bad).is_err(), "accepted {bad}");
        }
    }

    #[test]
    fn test_password_length() {
        assert!(password("short").is_err());
        assert!(password("long-enough").is_ok());
    }

    #[test]
    fn test_json_object() {
        assert!(json_object("settings", Some(&serde_json::json!({"a": 1}))).is_ok());
        assert!(json_object("settings", Some(&serde_json::json!([1]))).is_err());
        assert!(json_object("settings", None).is_ok());
    }
}
