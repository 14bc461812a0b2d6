use crate::error::{AppError, AppResult};
use regex::Regex;
use std::sync::LazyLock;

pub const MIN_PHONE_LEN: usize = 7;
pub const MIN_CODE_LEN: usize = 3;
pub const MAX_MESSAGE_LIMIT: u32 = 100;

static API_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").expect("api id regex"));

/// International phone number: leading `+` and at least `MIN_PHONE_LEN` characters.
pub fn validate_phone(phone: &str) -> AppResult<()> {
    let phone = phone.trim();
    if !phone.starts_with('+') {
        return Err(AppError::ValidationError(
            "Phone number must start with + and the country code".to_string(),
        ));
    }
    if phone.chars().count() < MIN_PHONE_LEN {
        return Err(AppError::ValidationError(
            "Phone number is too short".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_login_code(code: &str) -> AppResult<()> {
    if code.trim().chars().count() < MIN_CODE_LEN {
        return Err(AppError::ValidationError(
            "Verification code is too short".to_string(),
        ));
    }
    Ok(())
}

pub fn is_numeric_api_id(api_id: &str) -> bool {
    API_ID_RE.is_match(api_id)
}

/// Strips surrounding whitespace and one leading `@` from a Telegram handle.
pub fn normalize_handle(handle: &str) -> String {
    let trimmed = handle.trim();
    trimmed.strip_prefix('@').unwrap_or(trimmed).trim().to_string()
}

pub fn clamp_message_limit(limit: Option<u32>, default_limit: u32) -> u32 {
    limit.unwrap_or(default_limit).clamp(1, MAX_MESSAGE_LIMIT)
}
