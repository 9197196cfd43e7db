// Chain-related types

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::path::Path;

use crate::error::Result;

pub mod cosmos;
pub mod docker;
pub mod genesis;
pub mod node;
pub mod node_config;
pub mod rpc;
pub mod tx;

#[cfg(test)]
pub mod test_utils;

pub use cosmos::CosmosChain;
pub use docker::{CommandOutput, CommandRunner, DockerCli, ProcessRunner};
pub use node::{ChainNode, NodeRole};
pub use rpc::RpcClient;
pub use tx::TxResponse;

/// Identifier of uploaded contract bytecode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodeId(pub u64);

impl fmt::Display for CodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Flags for `wasm instantiate`
#[derive(Debug, Clone)]
pub struct InstantiateOptions {
    pub label: String,
    /// Fixed gas limit; simulated when unset
    pub gas: Option<u64>,
    pub admin: Option<String>,
    /// Extra flags passed through to the chain CLI
    pub extra_flags: Vec<String>,
}

impl InstantiateOptions {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            gas: None,
            admin: None,
            extra_flags: Vec::new(),
        }
    }

    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = Some(gas);
        self
    }

    pub fn with_admin(mut self, admin: impl Into<String>) -> Self {
        self.admin = Some(admin.into());
        self
    }

    pub fn to_flags(&self) -> Vec<String> {
        let mut flags = vec!["--label".to_string(), self.label.clone()];
        match &self.admin {
            Some(admin) => {
                flags.push("--admin".to_string());
                flags.push(admin.clone());
            }
            None => flags.push("--no-admin".to_string()),
        }
        if let Some(gas) = self.gas {
            flags.push("--gas".to_string());
            flags.push(gas.to_string());
        }
        flags.extend(self.extra_flags.iter().cloned());
        flags
    }
}

impl Default for InstantiateOptions {
    fn default() -> Self {
        Self::new("wasm-contract")
    }
}

/// Contract operations offered by a single node and by a whole chain
#[async_trait]
pub trait Chain: Send + Sync {
    /// Get the chain ID
    fn chain_id(&self) -> &str;

    /// Get the latest block height
    async fn height(&self) -> Result<u64>;

    /// Upload contract bytecode signed by `key_name`
    async fn store_contract(&self, key_name: &str, wasm_path: &Path) -> Result<CodeId>;

    /// Instantiate stored code with a JSON message, returning the contract address
    async fn instantiate_contract(
        &self,
        key_name: &str,
        code_id: CodeId,
        msg: &str,
        options: &InstantiateOptions,
    ) -> Result<String>;

    /// Execute a JSON message against a contract
    async fn execute_contract(
        &self,
        key_name: &str,
        contract: &str,
        msg: &str,
        extra_flags: &[String],
    ) -> Result<TxResponse>;

    /// Smart query, returning the CLI's `{"data": ...}` document
    async fn query_contract_raw(&self, contract: &str, msg: &str) -> Result<Value>;
}

/// Smart query decoded into `T`
pub async fn query_contract<C, T>(chain: &C, contract: &str, msg: &str) -> Result<T>
where
    C: Chain + ?Sized,
    T: DeserializeOwned,
{
    let value = chain.query_contract_raw(contract, msg).await?;
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instantiate_flags() {
        let flags = InstantiateOptions::new("avida-sdjwt").with_gas(2_000_000).to_flags();
        assert_eq!(flags, vec!["--label", "avida-sdjwt", "--no-admin", "--gas", "2000000"]);

        let flags = InstantiateOptions::default()
            .with_admin("juno1admin")
            .to_flags();
        assert_eq!(flags, vec!["--label", "wasm-contract", "--admin", "juno1admin"]);
    }

    #[test]
    fn test_code_id_display() {
        assert_eq!(CodeId(3).to_string(), "3");
    }
}
