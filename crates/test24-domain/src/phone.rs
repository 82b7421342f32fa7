//! Phone-number addresses.
//!
//! Only Uzbekistan mobile numbers in E.164 form are accepted: `+998` followed
//! by exactly nine digits.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// `+998` and nine ASCII digits.
pub static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+998[0-9]{9}$").expect("phone pattern compiles")
});

pub fn is_valid_phone(value: &str) -> bool {
    PHONE_RE.is_match(value)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Address must be a valid Uzbekistan phone number (e.g. +998901234567).")]
pub struct InvalidPhone;

/// A validated phone-number address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(value: impl Into<String>) -> Result<Self, InvalidPhone> {
        let value = value.into();
        if is_valid_phone(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidPhone)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = InvalidPhone;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<PhoneNumber> for String {
    fn from(phone: PhoneNumber) -> Self {
        phone.0
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
