//! Secp256k1 public keys in device-native and DER form.
//!
//! The device reports keys as uncompressed SEC1 points (65 bytes:
//! `0x04 || x || y`). Request envelopes and principal derivation both use
//! the DER `SubjectPublicKeyInfo` form instead, so this module owns the
//! conversion between the two.
//!
//! # Example
//!
//! ```
//! use ic_identity_ledger::Secp256k1PublicKey;
//!
//! // The secp256k1 generator point, as the device would report it.
//! let raw = hex::decode(
//!     "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798\
//!      483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8",
//! )
//! .unwrap();
//! let key = Secp256k1PublicKey::from_raw(&raw).unwrap();
//! assert_eq!(key.to_der().unwrap().len(), 88);
//! ```

use core::fmt;

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::pkcs8::EncodePublicKey;

use crate::error::{Error, Result};

/// An immutable secp256k1 public key.
///
/// Holds a validated curve point; construction rejects byte sequences that
/// do not describe a point on the curve. Equality is point equality, so a
/// key parsed from its compressed form compares equal to the same key
/// parsed from its uncompressed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secp256k1PublicKey {
    key: k256::PublicKey,
}

impl Secp256k1PublicKey {
    /// Length of the uncompressed SEC1 encoding in bytes.
    pub const RAW_LEN: usize = 65;

    /// Length of the DER `SubjectPublicKeyInfo` encoding in bytes.
    pub const DER_LEN: usize = 88;

    /// Parses a key from SEC1 bytes (compressed or uncompressed).
    ///
    /// # Arguments
    ///
    /// * `bytes` - 33-byte compressed or 65-byte uncompressed SEC1 point
    ///
    /// # Returns
    ///
    /// A [`Result`] containing the validated key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPublicKey`] if the bytes do not encode a
    /// point on the secp256k1 curve.
    pub fn from_raw(bytes: &[u8]) -> Result<Self> {
        let key = k256::PublicKey::from_sec1_bytes(bytes)
            .map_err(|e| Error::InvalidPublicKey(e.to_string()))?;
        Ok(Self { key })
    }

    /// Parses a key from a hex string, optionally `0x`-prefixed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HexDecode`] for invalid hex and
    /// [`Error::InvalidPublicKey`] for bytes that are not a curve point.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let bytes = hex::decode(hex_str)?;
        Self::from_raw(&bytes)
    }

    /// Returns the uncompressed SEC1 encoding (`0x04 || x || y`).
    #[must_use]
    pub fn to_raw(&self) -> [u8; Self::RAW_LEN] {
        let point = self.key.to_encoded_point(false);
        let mut out = [0u8; Self::RAW_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Returns the DER `SubjectPublicKeyInfo` encoding.
    ///
    /// This is the form hashed into a self-authenticating principal and the
    /// form placed in the `sender_pubkey` field of signed requests.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPublicKey`] if DER encoding fails.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        let document = self
            .key
            .to_public_key_der()
            .map_err(|e| Error::InvalidPublicKey(e.to_string()))?;
        Ok(document.as_bytes().to_vec())
    }

    /// Returns the uncompressed encoding as a hex string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_raw())
    }

    /// Returns the underlying [`k256::PublicKey`].
    #[must_use]
    pub const fn inner(&self) -> &k256::PublicKey {
        &self.key
    }
}

impl fmt::Display for Secp256k1PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
