//! Self-authenticating principals.
//!
//! A principal is the Internet Computer's account identifier: an opaque
//! byte sequence of at most 29 bytes. The form this library cares about is
//! the *self-authenticating* principal, derived from a public key as
//!
//! ```text
//! SHA-224(DER(public key)) || 0x02
//! ```
//!
//! which is what makes the identity check at construction possible: anyone
//! holding the public key can recompute the principal the device must
//! report.
//!
//! The canonical textual form prepends a CRC-32 checksum, base32-encodes
//! (RFC 4648 alphabet, no padding, lowercase) and inserts a dash every five
//! characters, e.g. the anonymous principal renders as `2vxsx-fae`.

use core::fmt;
use core::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha224};

use crate::error::{Error, Result};

/// An Internet Computer principal.
///
/// Immutable once constructed. Stored inline as a fixed buffer plus length,
/// so the type is `Copy` and comparison is plain byte equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Principal {
    len: u8,
    bytes: [u8; Self::MAX_LEN],
}

impl Principal {
    /// Maximum principal length in bytes.
    pub const MAX_LEN: usize = 29;

    /// Type tag appended to self-authenticating principals.
    const SELF_AUTHENTICATING_TAG: u8 = 0x02;

    /// The single-byte anonymous principal.
    const ANONYMOUS_TAG: u8 = 0x04;

    /// Builds a principal from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPrincipal`] if `bytes` is longer than
    /// [`Self::MAX_LEN`].
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > Self::MAX_LEN {
            return Err(Error::InvalidPrincipal(format!(
                "expected at most {} bytes, got {}",
                Self::MAX_LEN,
                bytes.len()
            )));
        }

        let mut buf = [0u8; Self::MAX_LEN];
        buf[..bytes.len()].copy_from_slice(bytes);

        Ok(Self {
            len: bytes.len() as u8,
            bytes: buf,
        })
    }

    /// Derives the self-authenticating principal for a DER-encoded public
    /// key.
    ///
    /// # Arguments
    ///
    /// * `der_public_key` - The key in `SubjectPublicKeyInfo` DER form
    ///
    /// # Example
    ///
    /// ```
    /// use ic_identity_ledger::Principal;
    ///
    /// let principal = Principal::self_authenticating(b"example key");
    /// assert_eq!(principal.as_slice().len(), 29);
    /// assert_eq!(principal.as_slice()[28], 0x02);
    /// ```
    #[must_use]
    pub fn self_authenticating(der_public_key: &[u8]) -> Self {
        let hash = Sha224::digest(der_public_key);

        let mut buf = [0u8; Self::MAX_LEN];
        buf[..28].copy_from_slice(&hash);
        buf[28] = Self::SELF_AUTHENTICATING_TAG;

        Self {
            len: Self::MAX_LEN as u8,
            bytes: buf,
        }
    }

    /// Returns the anonymous principal (`2vxsx-fae`).
    #[must_use]
    pub const fn anonymous() -> Self {
        let mut buf = [0u8; Self::MAX_LEN];
        buf[0] = Self::ANONYMOUS_TAG;
        Self { len: 1, bytes: buf }
    }

    /// Returns the principal's bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Renders the canonical dashed-base32 textual form.
    #[must_use]
    pub fn to_text(&self) -> String {
        let checksum = crc32fast::hash(self.as_slice());

        let mut data = Vec::with_capacity(4 + self.as_slice().len());
        data.extend_from_slice(&checksum.to_be_bytes());
        data.extend_from_slice(self.as_slice());

        let encoded = data_encoding::BASE32_NOPAD
            .encode(&data)
            .to_ascii_lowercase();

        let mut out = String::with_capacity(encoded.len() + encoded.len() / 5);
        for (i, ch) in encoded.chars().enumerate() {
            if i > 0 && i % 5 == 0 {
                out.push('-');
            }
            out.push(ch);
        }
        out
    }

    /// Parses the canonical textual form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPrincipal`] if the text is not valid base32,
    /// is too short or too long, or its checksum does not match.
    pub fn from_text(text: &str) -> Result<Self> {
        let compact: String = text
            .chars()
            .filter(|c| *c != '-')
            .collect::<String>()
            .to_ascii_uppercase();

        let data = data_encoding::BASE32_NOPAD
            .decode(compact.as_bytes())
            .map_err(|e| Error::InvalidPrincipal(format!("invalid base32: {e}")))?;

        if data.len() < 4 {
            return Err(Error::InvalidPrincipal(
                "text too short for a checksum".to_string(),
            ));
        }

        let (checksum, body) = data.split_at(4);
        let principal = Self::from_slice(body)?;

        if checksum != crc32fast::hash(body).to_be_bytes() {
            return Err(Error::InvalidPrincipal("checksum mismatch".to_string()));
        }

        Ok(principal)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl FromStr for Principal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_text(s)
    }
}

impl Serialize for Principal {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.serialize_bytes(self.as_slice())
    }
}

struct PrincipalVisitor;

impl Visitor<'_> for PrincipalVisitor {
    type Value = Principal;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "at most 29 principal bytes")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> core::result::Result<Principal, E> {
        Principal::from_slice(v).map_err(E::custom)
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> core::result::Result<Principal, E> {
        Principal::from_slice(&v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Principal {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> core::result::Result<Self, D::Error> {
        deserializer.deserialize_bytes(PrincipalVisitor)
    }
}
