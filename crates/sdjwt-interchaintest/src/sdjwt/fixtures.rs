// Per-test inputs of the contract scenario
use std::path::{Path, PathBuf};

use super::address::validate_address;
use super::jwk::OkpJwk;
use super::types::{ExecuteMsg, InitRegistration, InstantiateMsg, RouteRequirement};
use crate::config::HarnessConfig;
use crate::error::Result;

/// Verification key registered by the contract scenario
pub const FIXTURE_JWK: &str =
    r#"{"kty":"OKP","crv":"Ed25519","x":"nYU3g7uNxJKVsIhbRZfUP5DFDEMkoZxllrLMWuPQo8o"}"#;

/// Presentation request of the fixture route, an empty JSON array
pub const EMPTY_PRESENTATION_REQUEST: &[u8] = b"[]";

/// Values a contract test runs against, passed explicitly to each test
#[derive(Debug, Clone)]
pub struct TestFixtures {
    pub app_addr_1: String,
    pub app_addr_2: String,
    /// JSON-encoded key material
    pub jwk: Vec<u8>,
    pub route_id: u64,
    pub max_presentation_len: u64,
    pub user_funds: u64,
    pub contract_path: PathBuf,
    pub payload_path: PathBuf,
    pub instantiate_label: String,
    pub instantiate_gas: u64,
}

impl TestFixtures {
    /// Build fixtures from configuration, resolving paths against `base_dir`
    pub fn from_config(config: &HarnessConfig, base_dir: &Path) -> Result<Self> {
        let fixtures = &config.fixtures;
        let prefix = &config.chain.bech32_prefix;
        validate_address(&fixtures.app_addr_1, prefix)?;
        validate_address(&fixtures.app_addr_2, prefix)?;

        let jwk = OkpJwk::from_slice(FIXTURE_JWK.as_bytes())?;

        Ok(Self {
            app_addr_1: fixtures.app_addr_1.clone(),
            app_addr_2: fixtures.app_addr_2.clone(),
            jwk: jwk.to_vec()?,
            route_id: fixtures.route_id,
            max_presentation_len: fixtures.max_presentation_len,
            user_funds: fixtures.user_funds,
            contract_path: config.resolve_path(&fixtures.contract_path, base_dir),
            payload_path: config.resolve_path(&fixtures.payload_path, base_dir),
            instantiate_label: fixtures.instantiate_label.clone(),
            instantiate_gas: fixtures.instantiate_gas,
        })
    }

    /// Route requiring an empty presentation, verified with the fixture key
    pub fn route_requirement(&self) -> RouteRequirement {
        RouteRequirement::inline(self.route_id, EMPTY_PRESENTATION_REQUEST, &self.jwk)
    }

    /// Instantiation registering the fixture route for `app_addr_1`
    pub fn instantiate_msg(&self) -> InstantiateMsg {
        InstantiateMsg {
            init_registrations: vec![InitRegistration {
                app_admin: self.app_addr_1.clone(),
                app_addr: self.app_addr_1.clone(),
                routes: vec![self.route_requirement()],
            }],
            max_presentation_len: self.max_presentation_len,
        }
    }

    /// Registration of the fixture route for `app_addr_2`
    pub fn register_msg(&self) -> ExecuteMsg {
        ExecuteMsg::Register {
            app_addr: self.app_addr_2.clone(),
            route_criteria: vec![self.route_requirement()],
        }
    }

    pub fn expected_jwk(&self) -> Result<OkpJwk> {
        OkpJwk::from_slice(&self.jwk)
    }
}
