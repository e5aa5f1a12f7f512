//! Ledger Hardware Wallet Identity for the Internet Computer
//!
//! This crate adapts a Ledger device running the Internet Computer app into
//! a signing identity usable by a request-signing pipeline. The device is
//! the sole custodian of the key: this library derives a public key and
//! principal from a fixed derivation path, signs canonically-encoded
//! request payloads on demand, and verifies the device's claimed identity
//! against its own public key before trusting it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Request Pipeline                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  LedgerIdentity │ canonical CBOR │ Principal │  Signature    │
//! │   (adapter)     │   encoding     │ derivation│   (R,S)       │
//! ├──────────────────────────────────────────────────────────────┤
//! │                DeviceSession (ICP app, CLA 0x11)             │
//! │     ┌──────────┐   ┌───────────────┐   ┌────────────────┐    │
//! │     │   APDU   │   │ chunked sign  │   │ address / show │    │
//! │     └──────────┘   └───────────────┘   └────────────────┘    │
//! ├──────────────────────────────────────────────────────────────┤
//! │              Transport (USB HID via `hid` feature)           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use ic_identity_ledger::{
//!     DerivationPath, Endpoint, HidTransport, HttpAgentRequest, LedgerIdentity,
//!     Principal, RequestContent, SigningIdentity,
//! };
//!
//! // Open the device and build a verified identity.
//! let transport = HidTransport::open()?;
//! let mut identity =
//!     LedgerIdentity::create(Box::new(transport), DerivationPath::default()).await?;
//!
//! // Sign a call request; the user confirms on the device.
//! let request = HttpAgentRequest {
//!     endpoint: Endpoint::Call,
//!     headers: vec![("content-type".to_string(), "application/cbor".to_string())],
//!     body: RequestContent::Call {
//!         canister_id: "ryjl3-tyaaa-aaaaa-aaaba-cai".parse()?,
//!         method_name: "transfer".to_string(),
//!         arg: candid_blob,
//!         sender: identity.principal(),
//!         ingress_expiry,
//!         nonce: None,
//!     },
//! };
//! let signed = identity.transform_request(request).await?;
//! ```
//!
//! # Feature Flags
//!
//! - `hid`: USB HID transport for physical devices via `hidapi`. Off by
//!   default so the core library (and its tests) build without native USB
//!   dependencies.
//!
//! # Security Considerations
//!
//! - Private keys never leave the device; nothing is persisted host-side
//! - Construction fails with [`Error::IdentityMismatch`] if the device's
//!   claimed principal does not match its reported public key
//! - Signatures of a length other than 64 bytes are rejected, never
//!   truncated or padded
//! - Use [`LedgerIdentity::show_address_and_public_key_on_device`] to let
//!   the user compare the host's view with the device's own screen

// Modules
pub mod apdu;
pub mod error;
pub mod identity;
pub mod path;
pub mod principal;
pub mod public_key;
pub mod request;
pub mod session;
pub mod signature;
pub mod transport;

#[cfg(feature = "hid")]
pub mod hid;

// Re-exports for convenience
pub use error::{Error, Result};
pub use identity::{LedgerIdentity, SigningIdentity};
pub use path::DerivationPath;
pub use principal::Principal;
pub use public_key::Secp256k1PublicKey;
pub use request::{Endpoint, Envelope, HttpAgentRequest, RequestContent, SignedRequest};
pub use session::{DeviceAddress, DeviceSession, SignResponse, Version};
pub use signature::Signature;
pub use transport::Transport;

#[cfg(feature = "hid")]
pub use hid::HidTransport;
