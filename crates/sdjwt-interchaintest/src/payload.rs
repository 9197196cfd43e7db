// cheqd resource payload files: `{"payload": {...}, "signInputs": [...]}`
use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::path::Path;
use tracing::debug;

use crate::error::{HarnessError, Result};
use crate::sdjwt::Binary;

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Key used to sign a payload on behalf of a DID verification method
#[derive(Debug, Clone)]
pub struct SignInput {
    pub verification_method_id: String,
    pub private_key: SigningKey,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PayloadFile {
    payload: Box<RawValue>,
    #[serde(default)]
    sign_inputs: Vec<RawSignInput>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSignInput {
    verification_method_id: String,
    priv_key: String,
}

impl TryFrom<RawSignInput> for SignInput {
    type Error = HarnessError;

    fn try_from(raw: RawSignInput) -> Result<Self> {
        if !raw.verification_method_id.starts_with("did:cheqd:")
            || !raw.verification_method_id.contains('#')
        {
            return Err(HarnessError::InvalidPayload(format!(
                "verification method {} is not a cheqd DID URL",
                raw.verification_method_id
            )));
        }

        let bytes = STANDARD
            .decode(&raw.priv_key)
            .map_err(|e| HarnessError::InvalidKey(format!("privKey: {}", e)))?;
        let keypair: [u8; 64] = bytes.try_into().map_err(|b: Vec<u8>| {
            HarnessError::InvalidKey(format!("privKey: expected 64 bytes, got {}", b.len()))
        })?;
        let private_key = SigningKey::from_keypair_bytes(&keypair)
            .map_err(|e| HarnessError::InvalidKey(format!("privKey: {}", e)))?;

        Ok(Self {
            verification_method_id: raw.verification_method_id,
            private_key,
        })
    }
}

/// Alternative name of a resource
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AlternativeUri {
    pub uri: String,
    #[serde(default)]
    pub description: String,
}

/// Payload of a cheqd `MsgCreateResource`. Every field is optional on the
/// wire and unknown keys are skipped; [`MsgCreateResourcePayload::validate`]
/// enforces what the resource module requires.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct MsgCreateResourcePayload {
    pub data: Binary,
    #[serde(alias = "collectionId")]
    pub collection_id: String,
    pub id: String,
    pub name: String,
    pub version: String,
    #[serde(alias = "resourceType")]
    pub resource_type: String,
    #[serde(alias = "alsoKnownAs")]
    pub also_known_as: Vec<AlternativeUri>,
}

impl MsgCreateResourcePayload {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Field checks applied by the cheqd resource module before signing
    pub fn validate(&self) -> Result<()> {
        if !is_valid_unique_id(&self.collection_id) {
            return Err(HarnessError::InvalidPayload(format!(
                "collection id {} is neither a UUID nor a base58 identifier",
                self.collection_id
            )));
        }
        if uuid::Uuid::parse_str(&self.id).is_err() {
            return Err(HarnessError::InvalidPayload(format!(
                "resource id {} is not a UUID",
                self.id
            )));
        }
        for (field, value) in [("name", &self.name), ("resource_type", &self.resource_type)] {
            if value.trim().is_empty() {
                return Err(HarnessError::InvalidPayload(format!("{} must not be empty", field)));
            }
        }
        if let Some(alias) = self.also_known_as.iter().find(|a| a.uri.is_empty()) {
            return Err(HarnessError::InvalidPayload(format!(
                "alternative uri with description {:?} has no uri",
                alias.description
            )));
        }
        Ok(())
    }
}

/// DID unique ids are UUIDs or base58 strings of 16 or 32 characters
fn is_valid_unique_id(id: &str) -> bool {
    if uuid::Uuid::parse_str(id).is_ok() {
        return true;
    }
    matches!(id.len(), 16 | 32) && id.chars().all(|c| BASE58_ALPHABET.contains(c))
}

/// Read a payload file, returning the payload JSON exactly as written and its sign inputs
pub fn read_payload_with_sign_inputs_from_file<P: AsRef<Path>>(
    path: P,
) -> Result<(Vec<u8>, Vec<SignInput>)> {
    let path = path.as_ref();
    let content = std::fs::read(path)?;
    let file: PayloadFile = serde_json::from_slice(&content)?;

    let sign_inputs = file
        .sign_inputs
        .into_iter()
        .map(SignInput::try_from)
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "Read payload from {} with {} sign inputs",
        path.display(),
        sign_inputs.len()
    );

    Ok((file.payload.get().as_bytes().to_vec(), sign_inputs))
}
