//! End-to-end identity tests against a scripted device.
//!
//! These drive the full construction → verification → signing →
//! request-transformation flow through a mock transport that replays
//! canned APDU responses, exercising the same code paths a physical
//! Ledger would.

// Silence unused crate dependency warnings for test binary
use byteorder as _;
use crc32fast as _;
use data_encoding as _;
use hex as _;
use k256 as _;
use serde as _;
use serde_bytes as _;
use sha2 as _;
use thiserror as _;
use tracing as _;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hex_literal::hex;

use ic_identity_ledger::apdu::{Apdu, ApduResponse};
use ic_identity_ledger::request::encode_for_signing;
use ic_identity_ledger::{
    DerivationPath, Endpoint, Envelope, Error, HttpAgentRequest, LedgerIdentity, Principal,
    RequestContent, Secp256k1PublicKey, SigningIdentity, Transport,
};

/// The secp256k1 generator point, standing in for the device's key.
const KEY: [u8; 65] = hex!(
    "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
    "483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8"
);

/// A transport that replays scripted responses and records every command.
struct ScriptedTransport {
    sent: Arc<Mutex<Vec<Apdu>>>,
    responses: VecDeque<ApduResponse>,
}

impl ScriptedTransport {
    fn new(responses: Vec<ApduResponse>) -> (Self, Arc<Mutex<Vec<Apdu>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                sent: Arc::clone(&sent),
                responses: responses.into_iter().collect(),
            },
            sent,
        )
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn exchange(&mut self, apdu: &Apdu) -> ic_identity_ledger::Result<ApduResponse> {
        self.sent.lock().unwrap().push(apdu.clone());
        self.responses
            .pop_front()
            .ok_or_else(|| Error::Transport("no scripted response left".to_string()))
    }
}

fn ok() -> ApduResponse {
    ApduResponse::new(vec![0x90, 0x00])
}

fn with_status(mut data: Vec<u8>, sw: u16) -> ApduResponse {
    data.extend_from_slice(&sw.to_be_bytes());
    ApduResponse::new(data)
}

/// The principal the device must report for [`KEY`].
fn device_principal() -> Principal {
    let key = Secp256k1PublicKey::from_raw(&KEY).unwrap();
    Principal::self_authenticating(&key.to_der().unwrap())
}

/// A well-formed address response: key, principal length, principal.
fn address_response(principal: &Principal) -> ApduResponse {
    let mut data = KEY.to_vec();
    data.push(principal.as_slice().len() as u8);
    data.extend_from_slice(principal.as_slice());
    with_status(data, 0x9000)
}

fn call_body(sender: Principal) -> RequestContent {
    RequestContent::Call {
        canister_id: Principal::from_slice(&[0, 0, 0, 0, 0, 0, 0, 7, 1, 1]).unwrap(),
        method_name: "transfer".to_string(),
        arg: vec![0x44, 0x49, 0x44, 0x4c, 0x00, 0x00],
        sender,
        ingress_expiry: 1_700_000_000_000_000_000,
        nonce: None,
    }
}

async fn create_identity(
    responses: Vec<ApduResponse>,
) -> (ic_identity_ledger::Result<LedgerIdentity>, Arc<Mutex<Vec<Apdu>>>) {
    let (transport, sent) = ScriptedTransport::new(responses);
    let result = LedgerIdentity::create(Box::new(transport), DerivationPath::default()).await;
    (result, sent)
}

#[tokio::test]
async fn create_succeeds_when_principal_matches_key() {
    let (result, _) = create_identity(vec![address_response(&device_principal())]).await;

    let identity = result.unwrap();
    assert_eq!(identity.public_key().to_raw(), KEY);
    assert_eq!(identity.principal(), device_principal());
    assert_eq!(identity.path().to_string(), "m/44'/223'/0'/0/0");
}

#[tokio::test]
async fn create_fails_when_principal_does_not_match_key() {
    let wrong = Principal::self_authenticating(b"a key the device does not hold");
    let (result, _) = create_identity(vec![address_response(&wrong)]).await;

    match result {
        Err(Error::IdentityMismatch { reported, derived }) => {
            assert_eq!(reported, wrong);
            assert_eq!(derived, device_principal());
        }
        other => panic!("expected IdentityMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn create_fails_when_device_reports_anonymous() {
    let (result, _) = create_identity(vec![address_response(&Principal::anonymous())]).await;
    assert!(matches!(result, Err(Error::IdentityMismatch { .. })));
}

#[tokio::test]
async fn create_propagates_device_failure() {
    let (result, _) = create_identity(vec![with_status(vec![], 0x6e00)]).await;
    assert!(matches!(
        result,
        Err(Error::DeviceCommunication { code: 0x6e00, .. })
    ));
}

#[tokio::test]
async fn sign_returns_the_device_bytes_unmodified() {
    let rs: Vec<u8> = (0..64).collect();
    let (result, _) = create_identity(vec![
        address_response(&device_principal()),
        ok(),
        with_status(rs.clone(), 0x9000),
    ])
    .await;
    let mut identity = result.unwrap();

    let signature = identity.sign(b"any payload at all").await.unwrap();
    assert_eq!(signature.to_bytes().as_slice(), rs.as_slice());
}

#[tokio::test]
async fn sign_declined_carries_code_and_message() {
    let (result, _) = create_identity(vec![
        address_response(&device_principal()),
        ok(),
        with_status(vec![], 0x6985),
    ])
    .await;
    let mut identity = result.unwrap();

    match identity.sign(b"payload").await {
        Err(Error::SigningFailed { code, message }) => {
            assert_eq!(code, 0x6985);
            assert!(message.contains("declined"));
        }
        other => panic!("expected SigningFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn sign_rejects_63_byte_signature() {
    let (result, _) = create_identity(vec![
        address_response(&device_principal()),
        ok(),
        with_status(vec![0u8; 63], 0x9000),
    ])
    .await;
    let mut identity = result.unwrap();

    let err = identity.sign(b"payload").await.unwrap_err();
    assert!(matches!(err, Error::MalformedSignature { length: 63 }));
}

#[tokio::test]
async fn sign_rejects_65_byte_signature() {
    let (result, _) = create_identity(vec![
        address_response(&device_principal()),
        ok(),
        with_status(vec![0u8; 65], 0x9000),
    ])
    .await;
    let mut identity = result.unwrap();

    let err = identity.sign(b"payload").await.unwrap_err();
    assert!(matches!(err, Error::MalformedSignature { length: 65 }));
}

#[tokio::test]
async fn transform_request_builds_the_signed_envelope() {
    let rs = vec![0x5Au8; 64];
    let (result, sent) = create_identity(vec![
        address_response(&device_principal()),
        ok(),
        with_status(rs.clone(), 0x9000),
    ])
    .await;
    let mut identity = result.unwrap();

    let headers = vec![(
        "content-type".to_string(),
        "application/cbor".to_string(),
    )];
    let body = call_body(identity.principal());
    let request = HttpAgentRequest {
        endpoint: Endpoint::Call,
        headers: headers.clone(),
        body: body.clone(),
    };

    let signed = identity.transform_request(request).await.unwrap();

    // Non-body fields are preserved untouched.
    assert_eq!(signed.endpoint, Endpoint::Call);
    assert_eq!(signed.headers, headers);

    // The body carries the original content, the DER key and the signature.
    assert_eq!(signed.body.content, body);
    assert_eq!(
        signed.body.sender_pubkey.as_ref().map(|b| b.as_slice()),
        Some(identity.public_key().to_der().unwrap().as_slice())
    );
    assert_eq!(
        signed.body.sender_sig.as_ref().map(|b| b.as_slice()),
        Some(rs.as_slice())
    );

    // The device signed exactly the canonical encoding of {content: body}.
    let expected = encode_for_signing(&body).unwrap();
    let sent = sent.lock().unwrap();
    let streamed: Vec<u8> = sent[2..]
        .iter()
        .flat_map(|apdu| apdu.data().to_vec())
        .collect();
    assert_eq!(streamed, expected);
}

#[tokio::test]
async fn transform_request_content_round_trips() {
    let rs = vec![0x21u8; 64];
    let (result, _) = create_identity(vec![
        address_response(&device_principal()),
        ok(),
        with_status(rs, 0x9000),
    ])
    .await;
    let mut identity = result.unwrap();

    let body = call_body(identity.principal());
    let signed = identity
        .transform_request(HttpAgentRequest {
            endpoint: Endpoint::Call,
            headers: vec![],
            body: body.clone(),
        })
        .await
        .unwrap();

    // Decoding the wire envelope reproduces the original body exactly.
    let wire = signed.body.encode().unwrap();
    let decoded: Envelope = serde_cbor::from_slice(&wire).unwrap();
    assert_eq!(decoded.content, body);
}

#[tokio::test]
async fn transform_request_encoding_is_deterministic() {
    let body = call_body(device_principal());
    let query_body = RequestContent::Query {
        canister_id: Principal::from_slice(&[1]).unwrap(),
        method_name: "status".to_string(),
        arg: vec![],
        sender: device_principal(),
        ingress_expiry: 9,
    };

    assert_eq!(
        encode_for_signing(&body).unwrap(),
        encode_for_signing(&body).unwrap()
    );
    assert_eq!(
        encode_for_signing(&query_body).unwrap(),
        encode_for_signing(&query_body).unwrap()
    );
}

#[tokio::test]
async fn transform_request_propagates_signing_failure() {
    let (result, _) = create_identity(vec![
        address_response(&device_principal()),
        ok(),
        with_status(vec![], 0x6985),
    ])
    .await;
    let mut identity = result.unwrap();

    let err = identity
        .transform_request(HttpAgentRequest {
            endpoint: Endpoint::Call,
            headers: vec![],
            body: call_body(identity.principal()),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::SigningFailed { code: 0x6985, .. }));
}

#[tokio::test]
async fn show_address_passes_through_user_rejection() {
    let (result, _) = create_identity(vec![
        address_response(&device_principal()),
        with_status(vec![], 0x6985),
    ])
    .await;
    let mut identity = result.unwrap();

    let err = identity
        .show_address_and_public_key_on_device()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UserRejected));
}

#[tokio::test]
async fn show_address_succeeds_on_confirmation() {
    let (result, _) = create_identity(vec![address_response(&device_principal()), ok()]).await;
    let mut identity = result.unwrap();

    identity
        .show_address_and_public_key_on_device()
        .await
        .unwrap();
}
