//! Custom validation rules shared across request payloads.

use validator::ValidationError;

const MAX_SERVICE_LENGTH: usize = 60;

/// Validates a normalized phone number: optional leading `+`, 7 to 15 digits.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new("phone_invalid_characters"));
    }
    if !(7..=15).contains(&digits.len()) {
        return Err(ValidationError::new("phone_invalid_length"));
    }
    Ok(())
}

/// Each selected service must be a short, non-empty label.
pub fn validate_services(services: &[String]) -> Result<(), ValidationError> {
    if services
        .iter()
        .any(|s| s.trim().is_empty() || s.chars().count() > MAX_SERVICE_LENGTH)
    {
        return Err(ValidationError::new("service_invalid"));
    }
    Ok(())
}
