//! Client platform reported at login.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Client platform tag.
///
/// Wire format is the exact variant label (`"ANDROID"`, `"IOS"`, `"WEB"`,
/// `"HarmonyOS"`); matching is case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "ANDROID")]
    Android,
    #[serde(rename = "IOS")]
    Ios,
    #[serde(rename = "WEB")]
    Web,
    #[serde(rename = "HarmonyOS")]
    HarmonyOs,
}

impl Platform {
    pub const ALL: [Platform; 4] = [Self::Android, Self::Ios, Self::Web, Self::HarmonyOs];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Android => "ANDROID",
            Self::Ios => "IOS",
            Self::Web => "WEB",
            Self::HarmonyOs => "HarmonyOS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{0}\" is not a valid choice.")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPlatform(s.to_owned()))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
