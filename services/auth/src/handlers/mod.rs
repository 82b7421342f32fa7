pub mod login;
pub mod otp;

use test24_core::validation::{FieldErrors, REQUIRED};
use uuid::Uuid;
use validator::ValidationError;

const INVALID_UUID: &str = "Must be a valid UUID.";

/// Rule for session id fields.
fn uuid_format(value: &str) -> Result<(), ValidationError> {
    Uuid::parse_str(value.trim())
        .map(|_| ())
        .map_err(|_| ValidationError::new("uuid").with_message(INVALID_UUID.into()))
}

/// Take a field the `required` rule has already vouched for.
pub(crate) fn required<T>(value: Option<T>, field: &str) -> Result<T, FieldErrors> {
    value.ok_or_else(|| FieldErrors::single(field, REQUIRED))
}

pub(crate) fn session_id(value: Option<String>, field: &str) -> Result<Uuid, FieldErrors> {
    let raw = required(value, field)?;
    Uuid::parse_str(raw.trim()).map_err(|_| FieldErrors::single(field, INVALID_UUID))
}
