//! Content-derived ROM identity.
//!
//! A [`RomIdentity`] is the lowercase hex SHA-256 of the full ROM image. It is
//! the only key used to namespace a ROM's files inside the emulator filesystem
//! and its record in the save store, so it must be collision resistant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::GbaError;

/// Length of an identity in hex characters.
pub const IDENTITY_HEX_LEN: usize = 64;

/// Number of hex characters shown in the presentation preview.
pub const PREVIEW_LEN: usize = 12;

/// SHA-256 of the empty input. Sessions never run against it.
const EMPTY_DIGEST: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Deterministic content identifier for a ROM image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RomIdentity(String);

impl RomIdentity {
    /// Computes the identity of `bytes`.
    ///
    /// Pure and side-effect free; empty input is accepted but yields the
    /// degenerate identity (see [`RomIdentity::is_degenerate`]).
    pub fn digest(bytes: &[u8]) -> Self {
        let hash = Sha256::digest(bytes);
        Self(hex::encode(hash))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when this identity was derived from an empty buffer.
    pub fn is_degenerate(&self) -> bool {
        self.0 == EMPTY_DIGEST
    }

    /// Short form used by the presentation layer, e.g. `3f1a09bc77de…`.
    pub fn preview(&self) -> String {
        format!("{}…", &self.0[..PREVIEW_LEN])
    }
}

/// Convenience wrapper over [`RomIdentity::digest`].
pub fn digest(bytes: &[u8]) -> RomIdentity {
    RomIdentity::digest(bytes)
}

impl fmt::Display for RomIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RomIdentity {
    type Err = GbaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = s.len() == IDENTITY_HEX_LEN
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(GbaError::InvalidIdentity(s.to_string()))
        }
    }
}

impl TryFrom<String> for RomIdentity {
    type Error = GbaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RomIdentity> for String {
    fn from(identity: RomIdentity) -> Self {
        identity.0
    }
}

impl AsRef<str> for RomIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_deterministic() {
        let rom = b"\x2e\x00\x00\xeaPOKEMON EMER";
        assert_eq!(RomIdentity::digest(rom), RomIdentity::digest(rom));
    }

    #[test]
    fn test_digest_distinguishes_single_byte_change() {
        let a = vec![0u8; 1024];
        let mut b = a.clone();
        b[512] = 1;
        assert_ne!(RomIdentity::digest(&a), RomIdentity::digest(&b));
    }

    #[test]
    fn test_digest_known_vector() {
        assert_eq!(
            digest(b"abc").as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_identity_is_fixed_length_lowercase_hex() {
        let id = digest(&[0xFF; 4096]);
        assert_eq!(id.as_str().len(), IDENTITY_HEX_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_empty_input_is_degenerate() {
        assert!(digest(&[]).is_degenerate());
        assert!(!digest(&[0]).is_degenerate());
    }

    #[test]
    fn test_parse_rejects_malformed_identities() {
        assert!("abc".parse::<RomIdentity>().is_err());
        let upper = digest(b"rom").as_str().to_uppercase();
        assert!(upper.parse::<RomIdentity>().is_err());
        let ok = digest(b"rom");
        assert_eq!(ok.as_str().parse::<RomIdentity>().unwrap(), ok);
    }

    #[test]
    fn test_preview() {
        let id = digest(b"abc");
        assert_eq!(id.preview(), "ba7816bf8f01…");
    }

    #[test]
    fn test_serde_round_trip_validates() {
        let id = digest(b"rom");
        let json = serde_json::to_string(&id).unwrap();
        let back: RomIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<RomIdentity>("\"not-hex\"").is_err());
    }
}
