//! Device session for the Internet Computer Ledger app.
//!
//! A [`DeviceSession`] owns a [`Transport`] and speaks the app-level
//! protocol on top of it: derive an address and public key for a path
//! (silently or with on-device display), sign a payload, and query the app
//! version. It maps status words into the error taxonomy but deliberately
//! leaves signature-shape validation to the identity layer.
//!
//! # Protocol
//!
//! The app answers on class `0x11` with three instructions:
//!
//! | INS    | Operation                | Data                       |
//! |--------|--------------------------|----------------------------|
//! | `0x00` | get app version          | none                       |
//! | `0x01` | get address + public key | serialized derivation path |
//! | `0x02` | sign                     | chunked: path, then payload|
//!
//! Payloads larger than one APDU are streamed in chunks: an INIT chunk
//! (P1 = 0) carrying the derivation path, ADD chunks (P1 = 1) carrying up
//! to 250 payload bytes each, and a final LAST chunk (P1 = 2). The
//! signature arrives in the response to the LAST chunk.

use core::fmt;

use crate::apdu::{Apdu, ApduResponse};
use crate::error::{Error, Result};
use crate::path::DerivationPath;
use crate::principal::Principal;
use crate::public_key::Secp256k1PublicKey;
use crate::transport::Transport;

/// CLA for the Internet Computer app.
const CLA: u8 = 0x11;

/// Instruction codes.
mod ins {
    /// Get the app version.
    pub(super) const GET_VERSION: u8 = 0x00;

    /// Derive and report address and public key.
    pub(super) const GET_ADDR_SECP256K1: u8 = 0x01;

    /// Sign a payload.
    pub(super) const SIGN_SECP256K1: u8 = 0x02;
}

/// Chunk markers (P1) for multi-APDU payloads.
mod chunk {
    /// First chunk, carries the derivation path.
    pub(super) const INIT: u8 = 0x00;

    /// Intermediate payload chunk.
    pub(super) const ADD: u8 = 0x01;

    /// Final payload chunk; its response carries the result.
    pub(super) const LAST: u8 = 0x02;
}

/// P1 for `GET_ADDR_SECP256K1`: derive silently.
const P1_SILENT: u8 = 0x00;

/// P1 for `GET_ADDR_SECP256K1`: show on the device screen and wait for the
/// user's verdict.
const P1_SHOW: u8 = 0x01;

/// Maximum payload bytes per sign chunk.
const CHUNK_SIZE: usize = 250;

/// Uncompressed SEC1 public key length in the address response.
const PK_LEN: usize = 65;

/// The address material reported by the device for a derivation path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAddress {
    /// The secp256k1 public key at the path.
    pub public_key: Secp256k1PublicKey,

    /// The principal the device claims is bound to the path.
    pub principal: Principal,
}

/// The outcome of a sign request.
///
/// The device either produces raw signature bytes or reports why it did
/// not; both are ordinary values here, so callers branch on the variant
/// instead of probing an optional field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignResponse {
    /// The device signed; bytes are unvalidated (length policing belongs
    /// to the identity layer).
    Signed(Vec<u8>),

    /// The device declined or failed.
    Failed {
        /// The status word the device answered with.
        code: u16,
        /// Human-readable description of the status word.
        message: String,
    },
}

/// The version of the app running on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
    /// Patch version.
    pub patch: u8,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A session with the Internet Computer app on a Ledger device.
///
/// Owns its transport for the session's lifetime; the channel is released
/// when the session is dropped. One command is in flight at a time, so
/// device-touching methods take `&mut self`.
pub struct DeviceSession {
    /// The underlying transport.
    transport: Box<dyn Transport>,
}

impl fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSession").finish_non_exhaustive()
    }
}

impl DeviceSession {
    /// Creates a session over the given transport.
    #[must_use]
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Queries the app version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceCommunication`] on a failure status word and
    /// [`Error::MalformedResponse`] if the payload is too short.
    pub async fn version(&mut self) -> Result<Version> {
        let apdu = Apdu::new(CLA, ins::GET_VERSION, 0x00, 0x00, vec![]);
        let response = self.transport.exchange(&apdu).await?;
        response.check()?;

        let data = response.data();
        // Byte 0 is the app's debug-mode flag.
        if data.len() < 4 {
            return Err(Error::MalformedResponse(
                "version response too short".to_string(),
            ));
        }

        Ok(Version {
            major: data[1],
            minor: data[2],
            patch: data[3],
        })
    }

    /// Derives and reports the address and public key for a path, without
    /// on-device confirmation.
    ///
    /// # Errors
    ///
    /// - [`Error::DeviceCommunication`] on any failure status word
    /// - [`Error::MalformedResponse`] / [`Error::InvalidPublicKey`] /
    ///   [`Error::InvalidPrincipal`] if the payload does not parse
    pub async fn get_address_and_public_key(
        &mut self,
        path: &DerivationPath,
    ) -> Result<DeviceAddress> {
        tracing::debug!(target: "icp::ledger", path = %path, "requesting address and public key");

        let apdu = Apdu::new(
            CLA,
            ins::GET_ADDR_SECP256K1,
            P1_SILENT,
            0x00,
            path.serialize(),
        );
        let response = self.transport.exchange(&apdu).await?;
        response.check()?;

        parse_address_response(response.data())
    }

    /// Same derivation, but shown on the device screen for the user to
    /// verify; blocks until they accept or reject. The result is
    /// discarded; this is purely a trust-building step.
    ///
    /// # Errors
    ///
    /// - [`Error::UserRejected`] if the user declines on the device
    /// - [`Error::DeviceCommunication`] on any other failure status word
    pub async fn show_address_and_public_key(&mut self, path: &DerivationPath) -> Result<()> {
        tracing::debug!(target: "icp::ledger", path = %path, "showing address on device");

        let apdu = Apdu::new(
            CLA,
            ins::GET_ADDR_SECP256K1,
            P1_SHOW,
            0x00,
            path.serialize(),
        );
        let response = self.transport.exchange(&apdu).await?;
        response.check()?;

        Ok(())
    }

    /// Asks the device to sign `payload` with the key at `path`.
    ///
    /// The payload is streamed in chunks; the device renders it for the
    /// user and answers the final chunk with the signature bytes or a
    /// failure status.
    ///
    /// # Errors
    ///
    /// Only transport failures are `Err`; a device-side refusal is an
    /// ordinary [`SignResponse::Failed`] value.
    pub async fn sign(&mut self, path: &DerivationPath, payload: &[u8]) -> Result<SignResponse> {
        let parts: Vec<&[u8]> = if payload.is_empty() {
            vec![payload]
        } else {
            payload.chunks(CHUNK_SIZE).collect()
        };

        tracing::debug!(
            target: "icp::ledger",
            bytes = payload.len(),
            chunks = parts.len(),
            "streaming sign payload"
        );

        let init = Apdu::new(CLA, ins::SIGN_SECP256K1, chunk::INIT, 0x00, path.serialize());
        let response = self.transport.exchange(&init).await?;
        if !response.is_success() {
            return Ok(failed(&response));
        }

        let total = parts.len();
        let mut last = response;
        for (i, part) in parts.into_iter().enumerate() {
            let marker = if i + 1 == total {
                chunk::LAST
            } else {
                chunk::ADD
            };
            let apdu = Apdu::new(CLA, ins::SIGN_SECP256K1, marker, 0x00, part.to_vec());
            last = self.transport.exchange(&apdu).await?;
            if !last.is_success() {
                return Ok(failed(&last));
            }
        }

        Ok(SignResponse::Signed(last.into_data()))
    }
}

/// Builds the failure variant from a response's status word.
fn failed(response: &ApduResponse) -> SignResponse {
    SignResponse::Failed {
        code: response.status_word(),
        message: response.error_description().to_string(),
    }
}

/// Parses a `GET_ADDR_SECP256K1` response.
///
/// Layout: 65-byte uncompressed SEC1 public key, one principal length
/// byte, principal bytes.
fn parse_address_response(data: &[u8]) -> Result<DeviceAddress> {
    if data.len() < PK_LEN + 1 {
        return Err(Error::MalformedResponse(
            "address response too short".to_string(),
        ));
    }

    let public_key = Secp256k1PublicKey::from_raw(&data[..PK_LEN])?;

    let principal_len = data[PK_LEN] as usize;
    let principal_end = PK_LEN + 1 + principal_len;
    if data.len() < principal_end {
        return Err(Error::MalformedResponse(
            "principal truncated in address response".to_string(),
        ));
    }

    let principal = Principal::from_slice(&data[PK_LEN + 1..principal_end])?;

    Ok(DeviceAddress {
        public_key,
        principal,
    })
}
