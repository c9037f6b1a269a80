//! Input validation for auth requests.

use crate::error::{AppError, AppResult};

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 64;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 1024;
pub const LINKING_CODE_MAX_LEN: usize = 64;
pub const APP_UUID_MAX_LEN: usize = 128;

/// Trim, check and lowercase a username.
pub fn username(raw: &str) -> AppResult<String> {
    let name = raw.trim();
    let len = name.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(AppError::Validation(format!(
            "Username must be {USERNAME_MIN_LEN}-{USERNAME_MAX_LEN} characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(AppError::Validation(
            "Username may only contain letters, digits, '_', '.' and '-'".into(),
        ));
    }
    Ok(name.to_ascii_lowercase())
}

/// Length policy for a new password. Passwords are never trimmed.
pub fn new_password(password: &str) -> AppResult<()> {
    let len = password.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return Err(AppError::Validation(format!(
            "Password must be {PASSWORD_MIN_LEN}-{PASSWORD_MAX_LEN} characters"
        )));
    }
    Ok(())
}

/// A password presented for verification: only bounded, not policed.
pub fn presented_password(password: &str) -> AppResult<()> {
    if password.is_empty() {
        return Err(AppError::Validation("Password is required".into()));
    }
    if password.chars().count() > PASSWORD_MAX_LEN {
        return Err(AppError::Validation("Password is too long".into()));
    }
    Ok(())
}

pub fn linking_code(code: &str) -> AppResult<()> {
    required("Linking code", code, LINKING_CODE_MAX_LEN)
}

pub fn app_uuid(app_uuid: &str) -> AppResult<()> {
    required("App UUID", app_uuid, APP_UUID_MAX_LEN)
}

fn required(field: &str, value: &str, max: usize) -> AppResult<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_is_trimmed_and_lowercased() {
        assert_eq!(username("  Alice.Smith ").unwrap(), "alice.smith");
    }

    #[test]
    fn username_rejects_bad_shapes() {
        assert!(username("ab").is_err());
        assert!(username(&"a".repeat(65)).is_err());
        assert!(username("has space").is_err());
        assert!(username("émile").is_err());
        assert!(username("ok_name-1").is_ok());
    }

    #[test]
    fn new_password_bounds() {
        assert!(new_password("1234567").is_err());
        assert!(new_password("12345678").is_ok());
        assert!(new_password(&"x".repeat(1024)).is_ok());
        assert!(new_password(&"x".repeat(1025)).is_err());
    }

    #[test]
    fn presented_password_only_needs_content() {
        assert!(presented_password("").is_err());
        assert!(presented_password("short").is_ok());
    }

    #[test]
    fn required_fields() {
        assert!(linking_code("   ").is_err());
        assert!(linking_code("HHT-1234").is_ok());
        assert!(app_uuid(&"u".repeat(129)).is_err());
    }
}
