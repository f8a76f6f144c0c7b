use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::PresetError;

/// Schema version of a preset document (`major.minor.patch`).
///
/// Presets are compatible when their major versions match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PresetVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl PresetVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Version this crate reads and writes.
    pub const fn current() -> Self {
        Self::new(1, 0, 0)
    }

    pub fn is_compatible_with(&self, other: &PresetVersion) -> bool {
        self.major == other.major
    }
}

impl Default for PresetVersion {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for PresetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for PresetVersion {
    type Err = PresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PresetError::InvalidVersion(s.to_string());
        let mut parts = s.split('.');
        let mut next = || -> Result<u32, PresetError> {
            parts
                .next()
                .filter(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|p| p.parse().ok())
                .ok_or_else(invalid)
        };
        let version = Self::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

impl From<PresetVersion> for String {
    fn from(version: PresetVersion) -> Self {
        version.to_string()
    }
}

impl TryFrom<String> for PresetVersion {
    type Error = PresetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
