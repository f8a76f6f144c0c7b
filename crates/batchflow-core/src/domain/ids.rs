//! Domain identifiers.
//!
//! `JobId` is content-addressed: it is the SHA-256 digest of a canonicalized
//! `JobDefinition` (see `domain::definition`). It is never generated from
//! randomness or time, so the same definition maps to the same id on every
//! machine and in every process.
//!
//! Ordering of `JobId` is lexicographic on the digest bytes, which is the same
//! order as on the lowercase hex rendering. Containers keyed by `JobId`
//! therefore iterate identically everywhere.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::BatchFlowError;

/// Width of a job digest in bytes.
pub const JOB_ID_LEN: usize = 32;

/// Identifier of a job (SHA-256 of its canonical definition).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId([u8; JOB_ID_LEN]);

impl JobId {
    /// Wrap a digest that was computed elsewhere (e.g. read back from a log).
    pub fn from_digest(digest: [u8; JOB_ID_LEN]) -> Self {
        Self(digest)
    }

    pub fn as_bytes(&self) -> &[u8; JOB_ID_LEN] {
        &self.0
    }

    /// Lowercase hex rendering (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 12 hex characters, for log lines.
    pub fn short(&self) -> String {
        let mut s = self.to_hex();
        s.truncate(12);
        s
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JobId({})", self.short())
    }
}

impl FromStr for JobId {
    type Err = BatchFlowError;

    /// Parses exactly 64 lowercase hex characters. Uppercase is rejected so
    /// that the textual form of an id is unique.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let well_formed = s.len() == JOB_ID_LEN * 2
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !well_formed {
            return Err(BatchFlowError::InvalidJobId(s.to_string()));
        }
        let mut digest = [0u8; JOB_ID_LEN];
        hex::decode_to_slice(s, &mut digest)
            .map_err(|_| BatchFlowError::InvalidJobId(s.to_string()))?;
        Ok(Self(digest))
    }
}

impl Serialize for JobId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifier of an input or output artifact.
///
/// Opaque to the core. It takes part in job identity, so it must not contain
/// the canonicalization delimiters (see `ArtifactId::RESERVED`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Characters that the canonical job encoding uses as delimiters.
    pub const RESERVED: [char; 4] = ['|', ',', '[', ']'];

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Does this id contain a reserved delimiter?
    pub fn has_reserved_chars(&self) -> bool {
        self.0.contains(Self::RESERVED)
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArtifactId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ArtifactId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample() -> JobId {
        let mut digest = [0u8; JOB_ID_LEN];
        for (i, b) in digest.iter_mut().enumerate() {
            *b = i as u8;
        }
        JobId::from_digest(digest)
    }

    #[test]
    fn hex_rendering_is_64_lowercase_chars() {
        let id = sample();
        let s = id.to_string();
        assert_eq!(s.len(), 64);
        assert!(s.starts_with("000102030405"));
        assert_eq!(id.short(), "000102030405");
    }

    #[test]
    fn parse_accepts_own_rendering() {
        let id = sample();
        let parsed: JobId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[rstest]
    #[case::empty("")]
    #[case::short("abcd")]
    #[case::uppercase(&"AB".repeat(32))]
    #[case::non_hex(&"zz".repeat(32))]
    #[case::too_long(&"00".repeat(33))]
    fn parse_rejects_malformed(#[case] input: &str) {
        let err = input.parse::<JobId>().unwrap_err();
        assert!(matches!(err, BatchFlowError::InvalidJobId(_)));
    }

    #[test]
    fn ordering_matches_hex_ordering() {
        let low = JobId::from_digest([0x01; JOB_ID_LEN]);
        let high = JobId::from_digest([0xf0; JOB_ID_LEN]);
        assert!(low < high);
        assert!(low.to_string() < high.to_string());
    }

    #[test]
    fn job_id_serializes_as_hex_string() {
        let id = sample();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let back: JobId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[rstest]
    #[case("decoded_stream", false)]
    #[case("a|b", true)]
    #[case("a,b", true)]
    #[case("[a]", true)]
    fn artifact_reserved_chars(#[case] id: &str, #[case] reserved: bool) {
        assert_eq!(ArtifactId::new(id).has_reserved_chars(), reserved);
    }
}
