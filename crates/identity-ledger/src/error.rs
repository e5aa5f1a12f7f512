//! Error types for the Ledger Internet Computer identity library.
//!
//! This module provides a single error type [`enum@Error`] covering all
//! failure modes of a hardware-backed signing identity.
//!
//! # Error Categories
//!
//! - **Transport errors**: the device cannot be reached at all
//! - **Device errors**: the Internet Computer app on the device returned a
//!   failure status or an ill-formed response
//! - **Identity errors**: the device's claimed principal does not match its
//!   own public key
//! - **Signing errors**: the device declined to sign or produced a signature
//!   in an unexpected encoding
//!
//! # Example
//!
//! ```
//! use ic_identity_ledger::Error;
//!
//! fn example() -> Result<(), Error> {
//!     let err = Error::UserRejected;
//!     assert!(matches!(err, Error::UserRejected));
//!     Ok(())
//! }
//! ```

use core::result::Result as CoreResult;

use hex::FromHexError;
use thiserror::Error;

use crate::principal::Principal;

/// The main error type for the Ledger identity library.
///
/// Callers are expected to branch on the variant, not on the rendered
/// message: [`Error::SigningFailed`] is the one recoverable failure (retry
/// the sign call after the user acts on the device), everything else is
/// fatal to the enclosing operation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// No Ledger device was found.
    #[error("no Ledger device found")]
    DeviceNotFound,

    /// A Ledger device was found but the channel to it could not be opened.
    #[error("failed to connect to Ledger: {0}")]
    ConnectionFailed(String),

    /// The established channel failed mid-operation.
    #[error("transport failure: {0}")]
    Transport(String),

    // =========================================================================
    // Device Application Errors
    // =========================================================================
    /// The Internet Computer app returned a failure status word.
    #[error("device returned status {code:#06x}: {message}")]
    DeviceCommunication {
        /// The APDU status word reported by the device.
        code: u16,
        /// Human-readable description of the status word.
        message: String,
    },

    /// The device's response did not have the documented layout.
    #[error("malformed device response: {0}")]
    MalformedResponse(String),

    /// The user rejected the operation on the device's own screen.
    #[error("request rejected on device")]
    UserRejected,

    // =========================================================================
    // Identity Errors
    // =========================================================================
    /// The principal reported by the device does not match the principal
    /// derivable from its own reported public key.
    #[error("principal returned by device ({reported}) does not match public key (expected {derived})")]
    IdentityMismatch {
        /// The principal the device claimed.
        reported: Principal,
        /// The self-authenticating principal derived from the public key.
        derived: Principal,
    },

    // =========================================================================
    // Signing Errors
    // =========================================================================
    /// The device declined or failed to produce a signature.
    ///
    /// Carries the device's status word and message verbatim so the caller
    /// can present them to the user (commonly "user declined on device").
    #[error("device failed to sign (code {code:#06x}): {message}")]
    SigningFailed {
        /// The APDU status word reported by the device.
        code: u16,
        /// Human-readable description of the status word.
        message: String,
    },

    /// The device produced a signature that is not exactly 64 bytes.
    #[error("signature must be 64 bytes long (is {length})")]
    MalformedSignature {
        /// The actual length of the returned signature.
        length: usize,
    },

    // =========================================================================
    // Input Validation Errors
    // =========================================================================
    /// A derivation path string could not be parsed.
    #[error("invalid derivation path: {0}")]
    InvalidDerivationPath(String),

    /// Public key bytes do not describe a valid secp256k1 point.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Principal bytes or text are not a valid principal.
    #[error("invalid principal: {0}")]
    InvalidPrincipal(String),

    // =========================================================================
    // Serialization Errors
    // =========================================================================
    /// CBOR encoding or decoding failed.
    #[error("CBOR error: {0}")]
    Cbor(String),

    /// Failed to parse hex data.
    #[error("hex decoding failed: {0}")]
    HexDecode(String),
}

impl From<serde_cbor::Error> for Error {
    fn from(err: serde_cbor::Error) -> Self {
        Error::Cbor(err.to_string())
    }
}

impl From<FromHexError> for Error {
    fn from(err: FromHexError) -> Self {
        Error::HexDecode(err.to_string())
    }
}

/// A specialized [`Result`] type for Ledger identity operations.
pub type Result<T> = CoreResult<T, Error>;
