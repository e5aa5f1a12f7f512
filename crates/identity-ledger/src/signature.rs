//! Fixed-size (R,S) signatures.
//!
//! The device returns secp256k1 ECDSA signatures in raw form: `r (32 bytes)
//! || s (32 bytes)`, 64 bytes total, exactly as they are embedded in the
//! `sender_sig` field of a signed request. Anything of a different length
//! indicates a protocol or app-version mismatch and is rejected rather than
//! truncated or padded.
//!
//! # Example
//!
//! ```
//! use ic_identity_ledger::Signature;
//!
//! let sig = Signature::new([1u8; 32], [2u8; 32]);
//! assert_eq!(sig.to_bytes().len(), 64);
//! ```

use core::fmt;

use crate::error::{Error, Result};

/// A 64-byte (R,S) secp256k1 signature.
///
/// Produced fresh per sign operation; never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    /// The R component (32 bytes).
    r: [u8; 32],

    /// The S component (32 bytes).
    s: [u8; 32],
}

impl Signature {
    /// The length of a serialized signature in bytes.
    pub const BYTE_LEN: usize = 64;

    /// Creates a signature from raw components.
    #[must_use]
    pub const fn new(r: [u8; 32], s: [u8; 32]) -> Self {
        Self { r, s }
    }

    /// Creates a signature from a 64-byte slice (`r || s`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedSignature`] if the slice is not exactly
    /// 64 bytes.
    ///
    /// # Example
    ///
    /// ```
    /// use ic_identity_ledger::Signature;
    ///
    /// let sig = Signature::from_bytes(&[0u8; 64]).unwrap();
    /// assert!(Signature::from_bytes(&[0u8; 63]).is_err());
    /// ```
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::BYTE_LEN {
            return Err(Error::MalformedSignature {
                length: bytes.len(),
            });
        }

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);

        Ok(Self::new(r, s))
    }

    /// Serializes the signature to a 64-byte array (`r || s`).
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::BYTE_LEN] {
        let mut bytes = [0u8; Self::BYTE_LEN];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..].copy_from_slice(&self.s);
        bytes
    }

    /// Returns the R component.
    #[must_use]
    pub const fn r(&self) -> &[u8; 32] {
        &self.r
    }

    /// Returns the S component.
    #[must_use]
    pub const fn s(&self) -> &[u8; 32] {
        &self.s
    }

    /// Encodes the signature as a hex string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Parses a signature from a hex string, optionally `0x`-prefixed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HexDecode`] for invalid hex and
    /// [`Error::MalformedSignature`] if the decoded length is not 64 bytes.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_round_trip() {
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(&[1u8; 32]);
        bytes[32..].copy_from_slice(&[2u8; 32]);

        let sig = Signature::from_bytes(&bytes).unwrap();

        assert_eq!(sig.r(), &[1u8; 32]);
        assert_eq!(sig.s(), &[2u8; 32]);
        assert_eq!(sig.to_bytes(), bytes);
    }

    #[test]
    fn from_bytes_rejects_63() {
        let result = Signature::from_bytes(&[0u8; 63]);
        assert!(matches!(result, Err(Error::MalformedSignature { length: 63 })));
    }

    #[test]
    fn from_bytes_rejects_65() {
        let result = Signature::from_bytes(&[0u8; 65]);
        assert!(matches!(result, Err(Error::MalformedSignature { length: 65 })));
    }

    #[test]
    fn hex_round_trip() {
        let sig = Signature::new([5u8; 32], [6u8; 32]);
        let recovered = Signature::from_hex(&sig.to_hex()).unwrap();
        assert_eq!(sig, recovered);
    }

    #[test]
    fn display_is_hex() {
        let sig = Signature::new([0u8; 32], [0u8; 32]);
        assert_eq!(format!("{sig}").len(), 128);
    }
}
