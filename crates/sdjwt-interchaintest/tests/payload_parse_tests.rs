// cheqd resource payload fixture
use std::path::PathBuf;

use sdjwt_interchaintest::payload::{read_payload_with_sign_inputs_from_file, MsgCreateResourcePayload};
use sdjwt_interchaintest::sdjwt::OkpJwk;

fn payload_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("artifacts/resource_payload.json")
}

#[test]
fn test_parse_resource_payload() {
    let (payload, _sign_inputs) = read_payload_with_sign_inputs_from_file(payload_path()).unwrap();
    MsgCreateResourcePayload::from_slice(&payload).unwrap();
}

#[test]
fn test_resource_payload_fields() {
    let (payload, sign_inputs) = read_payload_with_sign_inputs_from_file(payload_path()).unwrap();
    let msg = MsgCreateResourcePayload::from_slice(&payload).unwrap();
    msg.validate().unwrap();

    assert_eq!(msg.collection_id, "598ec650-7eb1-59f7-9361-a971e8521361");
    assert_eq!(msg.resource_type, "JSONWebKey2020");
    assert_eq!(msg.also_known_as.len(), 1);
    assert!(msg.also_known_as[0].uri.contains(&msg.id));
    assert!(!msg.data.is_empty());

    assert_eq!(sign_inputs.len(), 1);
    assert!(sign_inputs[0]
        .verification_method_id
        .starts_with(&format!("did:cheqd:testnet:{}#", msg.collection_id)));
}

#[test]
fn test_sign_input_key_is_a_valid_jwk() {
    let (_, sign_inputs) = read_payload_with_sign_inputs_from_file(payload_path()).unwrap();
    let jwk = OkpJwk::from_signing_key(&sign_inputs[0].private_key);
    jwk.validate().unwrap();
    assert_eq!(jwk.public().verifying_key().unwrap(), sign_inputs[0].private_key.verifying_key());
}
