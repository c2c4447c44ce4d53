use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Prefix accepted (and stripped) on every external digest representation.
pub const SHA256_PREFIX: &str = "sha256:";

/// Content digest of a blob in the registry store.
///
/// A `Digest` always holds a SHA-256 hash. Its textual form is exactly 64
/// lowercase hex characters; external inputs may carry a `sha256:` prefix,
/// which [`Digest::parse`] strips before validating. Two digests compare equal
/// iff their normalized forms are equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Digest([u8; 32]);

impl Digest {
    /// Length of the normalized hex form.
    pub const HEX_LEN: usize = 64;

    /// Normalize and validate an external digest string.
    ///
    /// Accepts `"<hex>"` or `"sha256:<hex>"`. Uppercase hex, wrong lengths and
    /// non-hex characters are rejected with [`TypeError::MalformedDigest`].
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let hex_part = raw.strip_prefix(SHA256_PREFIX).unwrap_or(raw);
        if !is_normalized_hex(hex_part) {
            return Err(TypeError::MalformedDigest(raw.to_string()));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hex_part, &mut bytes)
            .map_err(|_| TypeError::MalformedDigest(raw.to_string()))?;
        Ok(Self(bytes))
    }

    /// Create a `Digest` from a raw 32-byte hash.
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// Normalized 64-character lowercase hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 12 characters), as registries print it.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..6])
    }

    /// Prefixed form, e.g. `sha256:0123…`.
    pub fn to_prefixed(&self) -> String {
        format!("{SHA256_PREFIX}{}", self.to_hex())
    }
}

fn is_normalized_hex(s: &str) -> bool {
    s.len() == Digest::HEX_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.short_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Digest {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const HEX_A: &str = "0f1e2d3c4b5a69788796a5b4c3d2e1f00f1e2d3c4b5a69788796a5b4c3d2e1f0";

    #[test]
    fn parse_plain_hex() {
        let d = Digest::parse(HEX_A).unwrap();
        assert_eq!(d.to_hex(), HEX_A);
    }

    #[test]
    fn parse_strips_prefix() {
        let prefixed = format!("sha256:{HEX_A}");
        assert_eq!(Digest::parse(&prefixed).unwrap(), Digest::parse(HEX_A).unwrap());
    }

    #[test]
    fn rejects_short_input() {
        let err = Digest::parse("deadbeef").unwrap_err();
        assert_eq!(err, TypeError::MalformedDigest("deadbeef".into()));
    }

    #[test]
    fn rejects_uppercase() {
        assert!(Digest::parse(&HEX_A.to_uppercase()).is_err());
    }

    #[test]
    fn rejects_non_hex() {
        let bad = format!("{}g", &HEX_A[..63]);
        assert!(Digest::parse(&bad).is_err());
    }

    #[test]
    fn rejects_double_prefix_and_other_algorithms() {
        assert!(Digest::parse(&format!("sha256:sha256:{HEX_A}")).is_err());
        assert!(Digest::parse(&format!("sha512:{HEX_A}")).is_err());
        assert!(Digest::parse("").is_err());
        assert!(Digest::parse("sha256:").is_err());
    }

    #[test]
    fn rejects_surrounding_whitespace() {
        assert!(Digest::parse(&format!(" {HEX_A}")).is_err());
        assert!(Digest::parse(&format!("{HEX_A}\n")).is_err());
    }

    #[test]
    fn display_and_prefixed_forms() {
        let d = Digest::parse(HEX_A).unwrap();
        assert_eq!(format!("{d}"), HEX_A);
        assert_eq!(d.to_prefixed(), format!("sha256:{HEX_A}"));
        assert_eq!(d.short_hex(), &HEX_A[..12]);
    }

    #[test]
    fn serde_uses_hex_string() {
        let d = Digest::parse(HEX_A).unwrap();
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, format!("\"{HEX_A}\""));
        let parsed: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, d);
        assert!(serde_json::from_str::<Digest>("\"deadbeef\"").is_err());
    }

    #[test]
    fn ordering_follows_hex_order() {
        let lo = Digest::from_hash([0; 32]);
        let hi = Digest::from_hash([0xff; 32]);
        assert!(lo < hi);
        assert!(lo.to_hex() < hi.to_hex());
    }

    proptest! {
        #[test]
        fn normalization_is_prefix_insensitive(hex in "[0-9a-f]{64}") {
            let bare = Digest::parse(&hex).unwrap();
            let prefixed = Digest::parse(&format!("sha256:{hex}")).unwrap();
            prop_assert_eq!(bare, prefixed);
            prop_assert_eq!(bare.to_hex(), hex);
        }

        #[test]
        fn wrong_length_is_rejected(hex in "[0-9a-f]{0,63}|[0-9a-f]{65,80}") {
            prop_assert!(Digest::parse(&hex).is_err());
        }

        #[test]
        fn uppercase_is_rejected(hex in "[0-9a-f]{63}[A-F]") {
            prop_assert!(Digest::parse(&hex).is_err());
        }
    }
}
