//! Input validation for request bodies.

use lettre::Address;

pub const USERNAME_MAX_CHARS: usize = 150;
pub const SUBJECT_MAX_CHARS: usize = 30;
pub const TEXT_MAX_CHARS: usize = 4096;

/// Letters, digits and `@ . + - _`, at most 150 characters.
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.chars().count() > USERNAME_MAX_CHARS {
        return Err(format!("Username must be at most {USERNAME_MAX_CHARS} characters long"));
    }

    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if !username.chars().all(allowed) {
        return Err("Username may only contain letters, digits and @/./+/-/_".to_string());
    }

    Ok(())
}

/// Blank is allowed; anything else must parse as an address.
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Ok(());
    }

    email
        .parse::<Address>()
        .map(|_| ())
        .map_err(|_| "Enter a valid email address".to_string())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }
    Ok(())
}

/// Trim surrounding whitespace and enforce a non-empty, length-bounded value.
pub fn bounded_text(field: &str, value: &str, max_chars: usize) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{field} may not be blank"));
    }
    if trimmed.chars().count() > max_chars {
        return Err(format!("{field} must be at most {max_chars} characters long"));
    }
    Ok(trimmed.to_string())
}
