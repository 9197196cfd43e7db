// Funded accounts for tests
use tracing::info;

use crate::chain::CosmosChain;
use crate::error::{HarnessError, Result};
use crate::sdjwt::validate_address;

const KEY_SUFFIX_LEN: usize = 3;

/// Account whose key lives in the chain nodes' keyrings
#[derive(Debug, Clone)]
pub struct TestUser {
    pub key_name: String,
    pub address: String,
    pub mnemonic: Option<String>,
}

impl TestUser {
    /// Name to pass as `--from`
    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    pub fn formatted_address(&self) -> &str {
        &self.address
    }
}

/// Create `count` users named after `key_prefix` and send each `amount` from the faucet.
/// Keys are created on the first validator and imported on every other node.
pub async fn get_and_fund_test_users(
    chain: &CosmosChain,
    key_prefix: &str,
    amount: u64,
    count: usize,
) -> Result<Vec<TestUser>> {
    let prefix = &chain.config().chain.bech32_prefix;
    let mut users = Vec::with_capacity(count);

    for _ in 0..count {
        let suffix: String = (0..KEY_SUFFIX_LEN).map(|_| fastrand::lowercase()).collect();
        let key_name = format!("{}-{}", key_prefix, suffix);

        let key = chain.validators()[0].create_key(&key_name).await?;
        validate_address(&key.address, prefix)?;

        for node in chain.nodes().skip(1) {
            let mnemonic = key.mnemonic.as_deref().ok_or_else(|| {
                HarnessError::InvalidKey(format!("no mnemonic printed for key {}", key_name))
            })?;
            node.recover_key(&key_name, mnemonic).await?;
        }

        chain.send_funds(&key.address, amount).await?;
        info!("Funded {} ({}) with {}", key_name, key.address, amount);

        users.push(TestUser {
            key_name,
            address: key.address,
            mnemonic: key.mnemonic,
        });
    }

    Ok(users)
}
