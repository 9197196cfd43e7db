use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{HarnessError, Result};

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "SDJWT";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    pub global: GlobalConfig,
    pub chain: ChainConfig,
    pub fixtures: FixtureConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
    /// How long to wait for a broadcast transaction to land in a block
    pub tx_timeout: String,
    /// Delay between polls of the node (tx lookups, RPC status)
    pub poll_interval: String,
    /// How long to wait for a freshly started chain to produce blocks
    pub startup_timeout: String,
    /// Blocks the chain must produce before it is handed to the caller
    pub blocks_before_ready: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Short chain name, used in container and network names
    pub name: String,
    /// Chain identifier written into genesis
    pub chain_id: String,
    /// Docker image repository
    pub image: String,
    /// Docker image tag
    pub version: String,
    /// Chain daemon binary inside the image
    pub binary: String,
    /// Bech32 account address prefix
    pub bech32_prefix: String,
    /// Staking and fee denom
    pub denom: String,
    /// Gas prices passed to every transaction
    pub gas_prices: String,
    /// Multiplier applied to simulated gas
    pub gas_adjustment: f64,
    /// Node home directory inside the container
    pub home_dir: String,
    /// Self-delegation of every validator
    pub validator_stake: u64,
    /// Genesis balance of validators and the faucet
    pub genesis_funds: u64,
    /// Consensus timeout_commit, controls block time
    pub timeout_commit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureConfig {
    /// Compiled sdjwt verifier contract
    pub contract_path: PathBuf,
    /// cheqd resource payload fixture
    pub payload_path: PathBuf,
    /// Amount sent from the faucet to each test user
    pub user_funds: u64,
    /// Maximum presentation length accepted by the contract
    pub max_presentation_len: u64,
    /// Route registered by the contract scenario
    pub route_id: u64,
    /// Application registered at instantiation
    pub app_addr_1: String,
    /// Application registered through the execute message
    pub app_addr_2: String,
    /// Contract label at instantiation
    pub instantiate_label: String,
    /// Gas limit at instantiation
    pub instantiate_gas: u64,
}

impl HarnessConfig {
    /// Load configuration from a TOML file, with `SDJWT_` environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_env_prefix(path, ENV_PREFIX)
    }

    /// Load configuration from a TOML file, overriding keys from variables
    /// named `<PREFIX>_<SECTION>__<KEY>`
    pub fn load_with_env_prefix<P: AsRef<Path>>(path: P, prefix: &str) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(HarnessError::Config(format!(
                "configuration file {} not found",
                path.display()
            )));
        }

        let settings = config::Config::builder()
            .add_source(config::File::new(
                &path.to_string_lossy(),
                config::FileFormat::Toml,
            ))
            .add_source(
                config::Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Save configuration to TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve a fixture path: expands `~` and anchors relative paths at `base`
    pub fn resolve_path(&self, path: &Path, base: &Path) -> PathBuf {
        let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned());
        if expanded.is_absolute() {
            expanded
        } else {
            base.join(expanded)
        }
    }
}

impl GlobalConfig {
    pub fn tx_timeout(&self) -> Result<Duration> {
        parse_duration("global.tx_timeout", &self.tx_timeout)
    }

    pub fn poll_interval(&self) -> Result<Duration> {
        parse_duration("global.poll_interval", &self.poll_interval)
    }

    pub fn startup_timeout(&self) -> Result<Duration> {
        parse_duration("global.startup_timeout", &self.startup_timeout)
    }
}

impl ChainConfig {
    /// Full image reference, `repository:tag`
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image, self.version)
    }

    /// Amount string with the chain denom, e.g. `100ujuno`
    pub fn coins(&self, amount: u64) -> String {
        format!("{}{}", amount, self.denom)
    }
}

fn parse_duration(key: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value)
        .map_err(|e| HarnessError::Config(format!("{} = {:?}: {}", key, value, e)))
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            global: GlobalConfig {
                log_level: "info".to_string(),
                tx_timeout: "60s".to_string(),
                poll_interval: "500ms".to_string(),
                startup_timeout: "180s".to_string(),
                blocks_before_ready: 2,
            },
            chain: ChainConfig {
                name: "juno".to_string(),
                chain_id: "juno-local-1".to_string(),
                image: "ghcr.io/cosmoscontracts/juno".to_string(),
                version: "v17.0.0".to_string(),
                binary: "junod".to_string(),
                bech32_prefix: "juno".to_string(),
                denom: "ujuno".to_string(),
                gas_prices: "0.0025ujuno".to_string(),
                gas_adjustment: 1.5,
                home_dir: "/var/cosmos-chain/juno".to_string(),
                validator_stake: 1_000_000_000_000,
                genesis_funds: 10_000_000_000_000,
                timeout_commit: "1s".to_string(),
            },
            fixtures: FixtureConfig {
                contract_path: PathBuf::from("artifacts/avida_sdjwt_verifier.wasm"),
                payload_path: PathBuf::from("artifacts/resource_payload.json"),
                user_funds: 10_000_000_000,
                max_presentation_len: 30_000,
                route_id: 1,
                app_addr_1: "juno1urw99c4gjzxjg468c207ngq5sqly0jn2cpahdp".to_string(),
                app_addr_2: "juno16kpy20cjnc7kgfywem4zgm0vwxczttnve4hccc".to_string(),
                instantiate_label: "avida-sdjwt".to_string(),
                instantiate_gas: 2_000_000,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_round_trip() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("harness.toml");

        let mut config = HarnessConfig::default();
        config.chain.version = "v18.0.0".to_string();
        config.fixtures.user_funds = 42;
        config.save(&path).unwrap();

        let loaded = HarnessConfig::load_with_env_prefix(&path, "SDJWT_ROUND_TRIP_UNUSED").unwrap();
        assert_eq!(loaded.chain.version, "v18.0.0");
        assert_eq!(loaded.fixtures.user_funds, 42);
        assert_eq!(loaded.fixtures.instantiate_label, "avida-sdjwt");
        assert_eq!(loaded.fixtures.instantiate_gas, 2_000_000);
    }

    #[test]
    fn test_env_override() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("harness.toml");
        HarnessConfig::default().save(&path).unwrap();

        std::env::set_var("SDJWT_ENV_TEST_CHAIN__VERSION", "v99.0.0");
        let loaded = HarnessConfig::load_with_env_prefix(&path, "SDJWT_ENV_TEST").unwrap();
        std::env::remove_var("SDJWT_ENV_TEST_CHAIN__VERSION");

        assert_eq!(loaded.chain.version, "v99.0.0");
        assert_eq!(loaded.chain.image_ref(), "ghcr.io/cosmoscontracts/juno:v99.0.0");
    }

    #[test]
    fn test_missing_file() {
        let result = HarnessConfig::load("/nonexistent/harness.toml");
        assert!(matches!(result, Err(HarnessError::Config(_))));
    }

    #[test]
    fn test_durations() {
        let config = HarnessConfig::default();
        assert_eq!(config.global.tx_timeout().unwrap(), Duration::from_secs(60));
        assert_eq!(config.global.poll_interval().unwrap(), Duration::from_millis(500));

        let mut bad = config.global.clone();
        bad.tx_timeout = "soon".to_string();
        assert!(bad.tx_timeout().is_err());
    }

    #[test]
    fn test_resolve_path() {
        let config = HarnessConfig::default();
        let base = Path::new("/work/crate");

        let relative = config.resolve_path(&config.fixtures.payload_path, base);
        assert_eq!(relative, PathBuf::from("/work/crate/artifacts/resource_payload.json"));

        let absolute = config.resolve_path(Path::new("/tmp/contract.wasm"), base);
        assert_eq!(absolute, PathBuf::from("/tmp/contract.wasm"));
    }

    #[test]
    fn test_coins() {
        let config = HarnessConfig::default();
        assert_eq!(config.chain.coins(100), "100ujuno");
    }
}
