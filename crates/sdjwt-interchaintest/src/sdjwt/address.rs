// Bech32 account address checks
use bech32::{FromBase32, ToBase32, Variant};

use crate::error::{HarnessError, Result};

/// Validate a bech32 account address carrying `prefix`
pub fn validate_address(address: &str, prefix: &str) -> Result<()> {
    let invalid = |reason: String| HarnessError::InvalidAddress {
        address: address.to_string(),
        reason,
    };

    let (hrp, data, variant) = bech32::decode(address).map_err(|e| invalid(e.to_string()))?;
    if hrp != prefix {
        return Err(invalid(format!("expected prefix {}, found {}", prefix, hrp)));
    }
    if variant != Variant::Bech32 {
        return Err(invalid("bech32m is not used for account addresses".to_string()));
    }

    let bytes = Vec::<u8>::from_base32(&data).map_err(|e| invalid(e.to_string()))?;
    // 20 bytes for key accounts, 32 for contracts
    if bytes.len() != 20 && bytes.len() != 32 {
        return Err(invalid(format!("unexpected payload length {}", bytes.len())));
    }
    Ok(())
}

/// Encode raw address bytes under `prefix`
pub fn encode_address(prefix: &str, bytes: &[u8]) -> Result<String> {
    bech32::encode(prefix, bytes.to_base32(), Variant::Bech32).map_err(|e| {
        HarnessError::InvalidAddress {
            address: hex::encode(bytes),
            reason: e.to_string(),
        }
    })
}
