// Octet key pair JWK (RFC 8037) used as route verification key
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};

pub const OKP_KTY: &str = "OKP";
pub const ED25519_CRV: &str = "Ed25519";

/// Ed25519 key in JWK form
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OkpJwk {
    pub kty: String,
    pub crv: String,
    /// Public key, base64url without padding
    pub x: String,
    /// Private key, base64url without padding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

impl OkpJwk {
    /// Public JWK of a signing key
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        Self {
            kty: OKP_KTY.to_string(),
            crv: ED25519_CRV.to_string(),
            x: URL_SAFE_NO_PAD.encode(key.to_bytes()),
            d: None,
        }
    }

    /// Private JWK of a signing key
    pub fn from_signing_key(key: &SigningKey) -> Self {
        Self {
            d: Some(URL_SAFE_NO_PAD.encode(key.to_bytes())),
            ..Self::from_verifying_key(&key.verifying_key())
        }
    }

    /// Fresh random private JWK
    pub fn generate() -> Self {
        let key = SigningKey::generate(&mut rand::rngs::OsRng);
        Self::from_signing_key(&key)
    }

    /// Decode from JSON bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let jwk: Self = serde_json::from_slice(bytes)?;
        jwk.validate()?;
        Ok(jwk)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Same key without the private component
    pub fn public(&self) -> Self {
        Self {
            d: None,
            ..self.clone()
        }
    }

    pub fn verifying_key(&self) -> Result<VerifyingKey> {
        let bytes = decode_32(&self.x, "x")?;
        VerifyingKey::from_bytes(&bytes).map_err(|e| HarnessError::InvalidKey(e.to_string()))
    }

    /// Checks kty/crv and, when present, that `d` derives `x`
    pub fn validate(&self) -> Result<()> {
        if self.kty != OKP_KTY {
            return Err(HarnessError::InvalidKey(format!("unsupported kty {}", self.kty)));
        }
        if self.crv != ED25519_CRV {
            return Err(HarnessError::InvalidKey(format!("unsupported crv {}", self.crv)));
        }

        let public = self.verifying_key()?;
        if let Some(d) = &self.d {
            let secret = SigningKey::from_bytes(&decode_32(d, "d")?);
            if secret.verifying_key() != public {
                return Err(HarnessError::InvalidKey(
                    "private key does not match public key".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn decode_32(encoded: &str, field: &str) -> Result<[u8; 32]> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| HarnessError::InvalidKey(format!("{}: {}", field, e)))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| HarnessError::InvalidKey(format!("{}: expected 32 bytes, got {}", field, b.len())))
}
