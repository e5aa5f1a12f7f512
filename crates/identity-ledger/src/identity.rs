//! The Ledger-backed signing identity.
//!
//! [`LedgerIdentity`] is the adapter the rest of a request pipeline talks
//! to. Construction is where the trust decision happens: the device reports
//! a principal alongside its public key, and the identity only comes into
//! existence if that principal matches the self-authenticating principal
//! recomputed from the key; a compromised transport or device cannot
//! substitute a key it does not actually hold the path for.
//!
//! After construction the identity is a thin orchestrator: encode the
//! signable part of a request canonically, have the device sign those exact
//! bytes, and assemble the signed wire form.
//!
//! # Example
//!
//! ```ignore
//! use ic_identity_ledger::{
//!     DerivationPath, HidTransport, LedgerIdentity, SigningIdentity,
//! };
//!
//! let transport = HidTransport::open()?;
//! let mut identity =
//!     LedgerIdentity::create(Box::new(transport), DerivationPath::default()).await?;
//!
//! println!("principal: {}", identity.principal());
//! let signature = identity.sign(b"payload").await?;
//! ```

use core::fmt;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::path::DerivationPath;
use crate::principal::Principal;
use crate::public_key::Secp256k1PublicKey;
use crate::request::{encode_for_signing, Envelope, HttpAgentRequest, SignedRequest};
use crate::session::{DeviceSession, SignResponse};
use crate::signature::Signature;
use crate::transport::Transport;

/// The capability set a request-signing pipeline needs from an identity.
///
/// Device-touching operations take `&mut self`: one operation is
/// outstanding at a time, and serializing concurrent callers is the
/// caller's responsibility.
#[async_trait]
pub trait SigningIdentity {
    /// Returns the identity's public key.
    fn public_key(&self) -> &Secp256k1PublicKey;

    /// Signs an arbitrary payload, returning the raw 64-byte (R,S)
    /// signature.
    async fn sign(&mut self, payload: &[u8]) -> Result<Signature>;

    /// Transforms a request into its signed wire form.
    async fn transform_request(&mut self, request: HttpAgentRequest) -> Result<SignedRequest>;
}

/// A signing identity backed by a Ledger device.
///
/// Exclusively owns its device session; the path, public key and principal
/// are fixed at construction and never change. No partially-initialized
/// identity is ever observable: every constructor path either returns a
/// ready identity or an error.
pub struct LedgerIdentity {
    session: DeviceSession,
    path: DerivationPath,
    public_key: Secp256k1PublicKey,
    principal: Principal,
}

impl fmt::Debug for LedgerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerIdentity")
            .field("path", &self.path)
            .field("principal", &self.principal)
            .finish_non_exhaustive()
    }
}

impl LedgerIdentity {
    /// Creates an identity for the key at `path`.
    ///
    /// Opens a device session, asks the device for the address and public
    /// key at the path, and verifies that the reported principal equals
    /// `Principal::self_authenticating(DER(public key))` before returning.
    ///
    /// # Errors
    ///
    /// - [`Error::DeviceCommunication`] / [`Error::MalformedResponse`] if
    ///   the device call fails
    /// - [`Error::IdentityMismatch`] if the device's claimed principal does
    ///   not match its own public key; this is a security check and is
    ///   never bypassed
    pub async fn create(transport: Box<dyn Transport>, path: DerivationPath) -> Result<Self> {
        let mut session = DeviceSession::new(transport);

        let address = session.get_address_and_public_key(&path).await?;
        let derived = Principal::self_authenticating(&address.public_key.to_der()?);

        if address.principal != derived {
            return Err(Error::IdentityMismatch {
                reported: address.principal,
                derived,
            });
        }

        tracing::info!(
            target: "icp::ledger",
            principal = %derived,
            path = %path,
            "ledger identity ready"
        );

        Ok(Self {
            session,
            path,
            public_key: address.public_key,
            principal: address.principal,
        })
    }

    /// Returns the derivation path the identity is bound to.
    #[must_use]
    pub const fn path(&self) -> &DerivationPath {
        &self.path
    }

    /// Returns the principal bound to the derivation path.
    #[must_use]
    pub fn principal(&self) -> Principal {
        self.principal
    }

    /// Shows the address and public key on the device's own screen and
    /// waits for the user to verify them.
    ///
    /// A manual trust-building step: the user can compare what their host
    /// claims with what the device itself displays.
    ///
    /// # Errors
    ///
    /// - [`Error::UserRejected`] if the user declines on the device
    /// - [`Error::DeviceCommunication`] on any other device failure
    pub async fn show_address_and_public_key_on_device(&mut self) -> Result<()> {
        self.session.show_address_and_public_key(&self.path).await
    }
}

#[async_trait]
impl SigningIdentity for LedgerIdentity {
    fn public_key(&self) -> &Secp256k1PublicKey {
        &self.public_key
    }

    /// # Errors
    ///
    /// - [`Error::SigningFailed`] with the device's status code and message
    ///   if the device declined or failed to produce a signature; this is
    ///   the one recoverable failure, typically "user declined on device"
    /// - [`Error::MalformedSignature`] if the returned signature is not
    ///   exactly 64 bytes (a protocol or app-version mismatch)
    async fn sign(&mut self, payload: &[u8]) -> Result<Signature> {
        match self.session.sign(&self.path, payload).await? {
            SignResponse::Signed(bytes) => Signature::from_bytes(&bytes),
            SignResponse::Failed { code, message } => {
                Err(Error::SigningFailed { code, message })
            }
        }
    }

    async fn transform_request(&mut self, request: HttpAgentRequest) -> Result<SignedRequest> {
        let HttpAgentRequest {
            endpoint,
            headers,
            body,
        } = request;

        let message = encode_for_signing(&body)?;
        let signature = self.sign(&message).await?;
        let sender_pubkey = self.public_key.to_der()?;

        Ok(SignedRequest {
            endpoint,
            headers,
            body: Envelope::signed(body, sender_pubkey, signature),
        })
    }
}
