//! Request model and canonical signing encoding.
//!
//! Outgoing requests have two halves: HTTP-level fields (endpoint, headers)
//! that are never signed, and a body ([`RequestContent`]) that is. The body
//! is signed over its *canonical envelope encoding*: the self-describing
//! CBOR serialization of `{content: <body>}`. The verifying party decodes
//! and re-serializes the same structure, so the encoding must be
//! byte-for-byte reproducible: field order is fixed by struct declaration
//! and absent optional fields are omitted entirely rather than encoded as
//! null.
//!
//! Signing replaces the body with an [`Envelope`] carrying the original
//! content, the DER-encoded sender public key and the 64-byte signature.

use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

use crate::error::Result;
use crate::principal::Principal;
use crate::signature::Signature;

/// Endpoints of the HTTP interface a request can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Submit a state-changing call.
    Call,
    /// Execute a non-replicated query.
    Query,
    /// Read a part of the state tree.
    ReadState,
}

impl Endpoint {
    /// Returns the URL path segment for the endpoint.
    #[must_use]
    pub const fn as_path(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Query => "query",
            Self::ReadState => "read_state",
        }
    }
}

/// The signable body of a request.
///
/// Field names and the `request_type` tag follow the wire protocol; the
/// serialized form of each variant is a CBOR map whose keys appear in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "request_type", rename_all = "snake_case")]
pub enum RequestContent {
    /// A state-changing call to a canister method.
    Call {
        /// Target canister.
        canister_id: Principal,
        /// Method to invoke.
        method_name: String,
        /// Candid-encoded argument blob.
        #[serde(with = "serde_bytes")]
        arg: Vec<u8>,
        /// The caller's principal.
        sender: Principal,
        /// Expiry of the request, in nanoseconds since the epoch.
        ingress_expiry: u64,
        /// Optional deduplication nonce.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        nonce: Option<ByteBuf>,
    },

    /// A non-replicated query of a canister method.
    Query {
        /// Target canister.
        canister_id: Principal,
        /// Method to invoke.
        method_name: String,
        /// Candid-encoded argument blob.
        #[serde(with = "serde_bytes")]
        arg: Vec<u8>,
        /// The caller's principal.
        sender: Principal,
        /// Expiry of the request, in nanoseconds since the epoch.
        ingress_expiry: u64,
    },

    /// A read of paths in the state tree.
    ReadState {
        /// State-tree paths, each a list of labels.
        paths: Vec<Vec<ByteBuf>>,
        /// The caller's principal.
        sender: Principal,
        /// Expiry of the request, in nanoseconds since the epoch.
        ingress_expiry: u64,
    },
}

/// The authenticated wire form of a request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// The original request body.
    pub content: RequestContent,

    /// DER-encoded public key of the sender; absent on anonymous requests.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sender_pubkey: Option<ByteBuf>,

    /// 64-byte (R,S) signature over the canonical encoding of
    /// `{content: ...}`; absent on anonymous requests.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sender_sig: Option<ByteBuf>,
}

impl Envelope {
    /// Wraps a body without authentication fields.
    #[must_use]
    pub const fn unsigned(content: RequestContent) -> Self {
        Self {
            content,
            sender_pubkey: None,
            sender_sig: None,
        }
    }

    /// Wraps a body together with the sender's key and signature.
    #[must_use]
    pub fn signed(content: RequestContent, sender_pubkey: Vec<u8>, signature: Signature) -> Self {
        Self {
            content,
            sender_pubkey: Some(ByteBuf::from(sender_pubkey)),
            sender_sig: Some(ByteBuf::from(signature.to_bytes().to_vec())),
        }
    }

    /// Serializes the envelope to self-describing CBOR for submission.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Cbor`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_self_describing(self)
    }
}

/// A request as handed to the identity for signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpAgentRequest {
    /// Target endpoint.
    pub endpoint: Endpoint,

    /// HTTP headers; carried through signing untouched.
    pub headers: Vec<(String, String)>,

    /// The signable body.
    pub body: RequestContent,
}

/// A request after signing: same non-body fields, body replaced by the
/// authenticated envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// Target endpoint, unchanged.
    pub endpoint: Endpoint,

    /// HTTP headers, unchanged.
    pub headers: Vec<(String, String)>,

    /// The authenticated body.
    pub body: Envelope,
}

/// Produces the exact bytes the device signs for a request body: the
/// self-describing CBOR encoding of `{content: <body>}`.
///
/// Deterministic for the same logical body: calling it twice yields
/// identical bytes.
///
/// # Errors
///
/// Returns [`crate::Error::Cbor`] if serialization fails.
///
/// # Example
///
/// ```
/// use ic_identity_ledger::request::{encode_for_signing, RequestContent};
/// use ic_identity_ledger::Principal;
///
/// let body = RequestContent::Query {
///     canister_id: Principal::anonymous(),
///     method_name: "greet".to_string(),
///     arg: vec![],
///     sender: Principal::anonymous(),
///     ingress_expiry: 0,
/// };
/// let bytes = encode_for_signing(&body).unwrap();
/// // Self-describing CBOR tag 55799.
/// assert_eq!(&bytes[..3], &[0xd9, 0xd9, 0xf7]);
/// ```
pub fn encode_for_signing(content: &RequestContent) -> Result<Vec<u8>> {
    #[derive(Serialize)]
    struct SignableMessage<'a> {
        content: &'a RequestContent,
    }

    encode_self_describing(&SignableMessage { content })
}

/// Serializes a value as CBOR prefixed with the self-describing tag.
fn encode_self_describing<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut serializer = serde_cbor::Serializer::new(serde_cbor::ser::IoWrite::new(&mut bytes));
    serializer.self_describe()?;
    value.serialize(&mut serializer)?;
    Ok(bytes)
}
