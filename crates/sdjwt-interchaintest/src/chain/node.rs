// A single validator or full node running in its own container
use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info};

use super::docker::{strings, CommandOutput, ContainerSpec, DockerCli};
use super::node_config::{apply_to_app_toml, NodeConfigEdits};
use super::rpc::RpcClient;
use super::tx::{extract_json, TxResponse};
use super::{Chain, CodeId, InstantiateOptions};
use crate::config::{ChainConfig, HarnessConfig};
use crate::error::{HarnessError, Result};

/// Key every validator signs its gentx with
pub const VALIDATOR_KEY: &str = "validator";
/// Genesis-funded key on the first validator that pays test users
pub const FAUCET_KEY: &str = "faucet";
pub const KEYRING_BACKEND: &str = "test";
pub const RPC_PORT: u16 = 26657;
/// RPC address as seen from inside the node's own container
const LOCAL_NODE: &str = "tcp://localhost:26657";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Validator,
    FullNode,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Validator => write!(f, "val"),
            NodeRole::FullNode => write!(f, "fn"),
        }
    }
}

/// Key created in a node's keyring
#[derive(Debug, Clone)]
pub struct KeyInfo {
    pub name: String,
    pub address: String,
    pub mnemonic: Option<String>,
}

#[derive(Clone)]
pub struct ChainNode {
    pub index: usize,
    pub role: NodeRole,
    pub container: String,
    chain: ChainConfig,
    tx_timeout: Duration,
    poll_interval: Duration,
    docker: DockerCli,
}

impl fmt::Debug for ChainNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainNode")
            .field("container", &self.container)
            .field("role", &self.role)
            .field("index", &self.index)
            .finish()
    }
}

impl ChainNode {
    pub fn new(
        config: &HarnessConfig,
        docker: DockerCli,
        network: &str,
        role: NodeRole,
        index: usize,
    ) -> Result<Self> {
        Ok(Self {
            index,
            role,
            container: Self::container_name(network, &config.chain.name, role, index),
            chain: config.chain.clone(),
            tx_timeout: config.global.tx_timeout()?,
            poll_interval: config.global.poll_interval()?,
            docker,
        })
    }

    pub fn container_name(network: &str, chain: &str, role: NodeRole, index: usize) -> String {
        format!("{}-{}-{}-{}", network, chain, role, index)
    }

    pub fn home(&self) -> &str {
        &self.chain.home_dir
    }

    fn home_path(&self, relative: &str) -> String {
        format!("{}/{}", self.chain.home_dir.trim_end_matches('/'), relative)
    }

    /// Chain binary invocation against this node's home
    fn command(&self, args: Vec<String>) -> Vec<String> {
        let mut cmd = Vec::with_capacity(args.len() + 3);
        cmd.push(self.chain.binary.clone());
        cmd.extend(args);
        cmd.push("--home".to_string());
        cmd.push(self.chain.home_dir.clone());
        cmd
    }

    async fn exec(&self, args: Vec<String>) -> Result<CommandOutput> {
        self.docker.exec(&self.container, &self.command(args)).await
    }

    pub async fn create_container(&self, network: &str, owner: &str) -> Result<()> {
        self.docker
            .run_idle(&ContainerSpec {
                name: self.container.clone(),
                image: self.chain.image_ref(),
                network: network.to_string(),
                published_ports: vec![RPC_PORT],
                owner: owner.to_string(),
            })
            .await
    }

    pub async fn init_home(&self) -> Result<()> {
        self.exec(strings(&["init", &self.container, "--chain-id", &self.chain.chain_id]))
            .await?;
        debug!("Initialized home of {}", self.container);
        Ok(())
    }

    /// Create a key in the test keyring
    pub async fn create_key(&self, name: &str) -> Result<KeyInfo> {
        let output = self
            .exec(strings(&[
                "keys",
                "add",
                name,
                "--keyring-backend",
                KEYRING_BACKEND,
                "--output",
                "json",
            ]))
            .await?;

        // Some SDK versions print the key document on stderr
        let document = extract_json(&output.stdout).or_else(|_| extract_json(&output.stderr))?;
        let address = document
            .get("address")
            .and_then(Value::as_str)
            .ok_or_else(|| HarnessError::UnexpectedOutput(format!("key {} has no address", name)))?;

        Ok(KeyInfo {
            name: name.to_string(),
            address: address.to_string(),
            mnemonic: document
                .get("mnemonic")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    /// Import a key from its mnemonic, read by the CLI from stdin
    pub async fn recover_key(&self, name: &str, mnemonic: &str) -> Result<()> {
        let cmd = self.command(strings(&[
            "keys",
            "add",
            name,
            "--recover",
            "--keyring-backend",
            KEYRING_BACKEND,
        ]));
        self.docker
            .exec_with_stdin(&self.container, &cmd, format!("{}\n", mnemonic).as_bytes())
            .await?;
        Ok(())
    }

    pub async fn key_address(&self, name: &str) -> Result<String> {
        let output = self
            .exec(strings(&["keys", "show", name, "-a", "--keyring-backend", KEYRING_BACKEND]))
            .await?;
        Ok(output.stdout_str().trim().to_string())
    }

    pub async fn add_genesis_account(&self, address: &str, amount: u64) -> Result<()> {
        self.exec(strings(&[
            "genesis",
            "add-genesis-account",
            address,
            &self.chain.coins(amount),
        ]))
        .await?;
        Ok(())
    }

    pub async fn gentx(&self, key: &str, stake: u64) -> Result<()> {
        self.exec(strings(&[
            "genesis",
            "gentx",
            key,
            &self.chain.coins(stake),
            "--chain-id",
            &self.chain.chain_id,
            "--keyring-backend",
            KEYRING_BACKEND,
        ]))
        .await?;
        Ok(())
    }

    /// The gentx this validator produced
    pub async fn read_gentx(&self) -> Result<Vec<u8>> {
        let script = format!("cat {}/*.json", self.home_path("config/gentx"));
        Ok(self
            .docker
            .exec(&self.container, &strings(&["sh", "-c", &script]))
            .await?
            .stdout)
    }

    pub async fn write_gentx(&self, file_name: &str, content: &[u8]) -> Result<()> {
        let path = self.home_path(&format!("config/gentx/{}", file_name));
        self.docker.write_file(&self.container, &path, content).await
    }

    pub async fn collect_gentxs(&self) -> Result<()> {
        self.exec(strings(&["genesis", "collect-gentxs"])).await?;
        Ok(())
    }

    pub async fn read_genesis(&self) -> Result<Value> {
        let content = self
            .docker
            .read_file(&self.container, &self.home_path("config/genesis.json"))
            .await?;
        Ok(serde_json::from_slice(&content)?)
    }

    pub async fn write_genesis(&self, genesis: &Value) -> Result<()> {
        let content = serde_json::to_vec_pretty(genesis)?;
        self.docker
            .write_file(&self.container, &self.home_path("config/genesis.json"), &content)
            .await
    }

    pub async fn node_id(&self) -> Result<String> {
        let output = self.exec(strings(&["tendermint", "show-node-id"])).await?;
        Ok(output.stdout_str().trim().to_string())
    }

    /// Apply peer, consensus and API settings to config.toml and app.toml
    pub async fn apply_config(&self, edits: &NodeConfigEdits) -> Result<()> {
        let config_path = self.home_path("config/config.toml");
        let config = self.docker.read_file(&self.container, &config_path).await?;
        let config = edits.apply_to_config_toml(&String::from_utf8_lossy(&config))?;
        self.docker
            .write_file(&self.container, &config_path, config.as_bytes())
            .await?;

        let app_path = self.home_path("config/app.toml");
        let app = self.docker.read_file(&self.container, &app_path).await?;
        let app = apply_to_app_toml(&String::from_utf8_lossy(&app), &self.chain.gas_prices)?;
        self.docker
            .write_file(&self.container, &app_path, app.as_bytes())
            .await
    }

    pub async fn start(&self) -> Result<()> {
        self.docker
            .exec_detached(&self.container, &self.command(strings(&["start"])))
            .await?;
        info!("Started {} ({})", self.container, self.role);
        Ok(())
    }

    pub async fn rpc_client(&self) -> Result<RpcClient> {
        let port = self.docker.host_port(&self.container, RPC_PORT).await?;
        Ok(RpcClient::new(format!("http://127.0.0.1:{}", port)))
    }

    /// Signing and broadcast flags; `--gas auto` unless the caller fixes gas
    fn tx_flags(&self, key: &str, extra_flags: &[String]) -> Vec<String> {
        let mut flags = strings(&[
            "--from",
            key,
            "--keyring-backend",
            KEYRING_BACKEND,
            "--chain-id",
            &self.chain.chain_id,
            "--node",
            LOCAL_NODE,
            "--gas-prices",
            &self.chain.gas_prices,
            "--gas-adjustment",
            &self.chain.gas_adjustment.to_string(),
            "--broadcast-mode",
            "sync",
            "--output",
            "json",
            "-y",
        ]);
        if !extra_flags.iter().any(|flag| flag == "--gas") {
            flags.push("--gas".to_string());
            flags.push("auto".to_string());
        }
        flags.extend(extra_flags.iter().cloned());
        flags
    }

    /// Broadcast a transaction and wait until it is included in a block
    pub async fn exec_tx(
        &self,
        key: &str,
        mut args: Vec<String>,
        extra_flags: &[String],
    ) -> Result<TxResponse> {
        args.extend(self.tx_flags(key, extra_flags));
        let output = self.exec(args).await?;
        let broadcast = TxResponse::parse(&output.stdout)?.ensure_success()?;
        debug!("Broadcast tx {} from {}", broadcast.txhash, key);

        self.wait_for_tx(&broadcast.txhash).await
    }

    /// Look a transaction up by hash, `None` while it is not in a block yet
    pub async fn query_tx(&self, txhash: &str) -> Result<Option<TxResponse>> {
        let result = self
            .exec(strings(&["query", "tx", txhash, "--node", LOCAL_NODE, "--output", "json"]))
            .await;

        match result {
            Ok(output) => Ok(Some(TxResponse::parse(&output.stdout)?)),
            Err(HarnessError::Command { stderr, .. }) if stderr.contains("not found") => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn wait_for_tx(&self, txhash: &str) -> Result<TxResponse> {
        let start_time = Instant::now();

        while start_time.elapsed() < self.tx_timeout {
            if let Some(tx) = self.query_tx(txhash).await? {
                info!("Tx {} included at height {}", tx.txhash, tx.height);
                return tx.ensure_success();
            }
            sleep(self.poll_interval).await;
        }

        Err(HarnessError::Timeout {
            what: format!("transaction {}", txhash),
            after: self.tx_timeout,
        })
    }

    pub async fn bank_send(&self, from_key: &str, to: &str, amount: u64) -> Result<TxResponse> {
        self.exec_tx(
            from_key,
            strings(&["tx", "bank", "send", from_key, to, &self.chain.coins(amount)]),
            &[],
        )
        .await
    }

    /// Balance of `address` in the chain denom
    pub async fn balance(&self, address: &str) -> Result<u64> {
        let output = self
            .exec(strings(&[
                "query",
                "bank",
                "balances",
                address,
                "--denom",
                &self.chain.denom,
                "--node",
                LOCAL_NODE,
                "--output",
                "json",
            ]))
            .await?;

        let coin = extract_json(&output.stdout)?;
        coin.get("amount")
            .and_then(Value::as_str)
            .ok_or_else(|| HarnessError::UnexpectedOutput(format!("no amount in {}", coin)))?
            .parse()
            .map_err(|e| HarnessError::UnexpectedOutput(format!("balance of {}: {}", address, e)))
    }

    /// Hex checksum the chain recorded for stored code
    pub async fn query_code_checksum(&self, code_id: CodeId) -> Result<String> {
        let output = self
            .exec(strings(&[
                "query",
                "wasm",
                "code-info",
                &code_id.to_string(),
                "--node",
                LOCAL_NODE,
                "--output",
                "json",
            ]))
            .await?;

        let info = extract_json(&output.stdout)?;
        info.get("data_hash")
            .or_else(|| info.get("checksum"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| HarnessError::UnexpectedOutput(format!("no checksum in code info {}", info)))
    }

    /// Smart query decoded into `T`
    pub async fn query_contract<T: serde::de::DeserializeOwned>(
        &self,
        contract: &str,
        msg: &str,
    ) -> Result<T> {
        super::query_contract(self, contract, msg).await
    }
}

#[async_trait]
impl Chain for ChainNode {
    fn chain_id(&self) -> &str {
        &self.chain.chain_id
    }

    async fn height(&self) -> Result<u64> {
        self.rpc_client().await?.latest_height().await
    }

    async fn store_contract(&self, key_name: &str, wasm_path: &Path) -> Result<CodeId> {
        let wasm = tokio::fs::read(wasm_path).await?;
        let local_checksum = hex::encode(Sha256::digest(&wasm));

        let file_name = wasm_path
            .file_name()
            .ok_or_else(|| HarnessError::Config(format!("{} is not a file", wasm_path.display())))?
            .to_string_lossy()
            .into_owned();
        let dest = self.home_path(&file_name);
        self.docker.copy_into(wasm_path, &self.container, &dest).await?;

        let tx = self
            .exec_tx(key_name, strings(&["tx", "wasm", "store", &dest]), &[])
            .await?;
        let code_id = tx
            .require_attribute("store_code", "code_id")?
            .parse::<u64>()
            .map(CodeId)
            .map_err(|e| HarnessError::UnexpectedOutput(format!("code_id: {}", e)))?;

        let on_chain = self.query_code_checksum(code_id).await?;
        if !on_chain.eq_ignore_ascii_case(&local_checksum) {
            return Err(HarnessError::ChecksumMismatch {
                code_id: code_id.0,
                local: local_checksum,
                on_chain,
            });
        }

        info!("Stored {} as code {} ({} bytes)", file_name, code_id, wasm.len());
        Ok(code_id)
    }

    async fn instantiate_contract(
        &self,
        key_name: &str,
        code_id: CodeId,
        msg: &str,
        options: &InstantiateOptions,
    ) -> Result<String> {
        let tx = self
            .exec_tx(
                key_name,
                strings(&["tx", "wasm", "instantiate", &code_id.to_string(), msg]),
                &options.to_flags(),
            )
            .await?;

        let address = tx.require_attribute("instantiate", "_contract_address")?;
        info!("Instantiated code {} at {}", code_id, address);
        Ok(address)
    }

    async fn execute_contract(
        &self,
        key_name: &str,
        contract: &str,
        msg: &str,
        extra_flags: &[String],
    ) -> Result<TxResponse> {
        self.exec_tx(
            key_name,
            strings(&["tx", "wasm", "execute", contract, msg]),
            extra_flags,
        )
        .await
    }

    async fn query_contract_raw(&self, contract: &str, msg: &str) -> Result<Value> {
        let output = self
            .exec(strings(&[
                "query",
                "wasm",
                "contract-state",
                "smart",
                contract,
                msg,
                "--node",
                LOCAL_NODE,
                "--output",
                "json",
            ]))
            .await?;
        extract_json(&output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::test_utils::RecordingRunner;
    use std::sync::Arc;

    fn node_with(runner: Arc<RecordingRunner>, role: NodeRole) -> ChainNode {
        let mut config = HarnessConfig::default();
        config.global.poll_interval = "1ms".to_string();
        config.global.tx_timeout = "50ms".to_string();
        ChainNode::new(&config, DockerCli::new(runner), "juno-start-ab12", role, 0).unwrap()
    }

    const BROADCAST: &str = r#"{"height":"0","txhash":"ABC","code":0,"raw_log":"[]"}"#;

    #[test]
    fn test_container_name() {
        let runner = Arc::new(RecordingRunner::new());
        assert_eq!(node_with(runner.clone(), NodeRole::Validator).container, "juno-start-ab12-juno-val-0");
        assert_eq!(node_with(runner, NodeRole::FullNode).container, "juno-start-ab12-juno-fn-0");
    }

    #[tokio::test]
    async fn test_instantiate_command_line() {
        let runner = Arc::new(RecordingRunner::new());
        runner.push_success(BROADCAST);
        runner.push_success(
            r#"{"height":"5","txhash":"ABC","code":0,"logs":[{"events":[{"type":"instantiate","attributes":[{"key":"_contract_address","value":"juno1contract"}]}]}]}"#,
        );
        let node = node_with(runner.clone(), NodeRole::FullNode);

        let options = InstantiateOptions::new("avida-sdjwt").with_gas(2_000_000);
        let address = node
            .instantiate_contract("user-1", CodeId(1), r#"{"max_presentation_len":30000}"#, &options)
            .await
            .unwrap();
        assert_eq!(address, "juno1contract");

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        let args = &calls[0].args;
        assert_eq!(&args[..3], &["exec", "juno-start-ab12-juno-fn-0", "junod"]);
        assert_eq!(&args[3..7], &["tx", "wasm", "instantiate", "1"]);
        assert_eq!(args[7], r#"{"max_presentation_len":30000}"#);

        let line = calls[0].command_line();
        assert!(line.contains("--label avida-sdjwt --no-admin --gas 2000000"));
        assert!(!line.contains("--gas auto"));
        assert!(line.contains("--from user-1"));
        assert!(line.ends_with("--home /var/cosmos-chain/juno"));
        assert!(calls[1].command_line().contains("query tx ABC"));
    }

    #[tokio::test]
    async fn test_execute_simulates_gas_by_default() {
        let runner = Arc::new(RecordingRunner::new());
        runner.push_success(BROADCAST);
        runner.push_success(r#"{"height":"6","txhash":"ABC","code":0}"#);
        let node = node_with(runner.clone(), NodeRole::FullNode);

        let tx = node
            .execute_contract("user-1", "juno1contract", r#"{"register":{}}"#, &[])
            .await
            .unwrap();
        assert_eq!(tx.height, 6);
        assert!(runner.calls()[0].command_line().contains("--gas auto"));
    }

    #[tokio::test]
    async fn test_check_tx_failure_is_not_polled() {
        let runner = Arc::new(RecordingRunner::new());
        runner.push_success(r#"{"height":"0","txhash":"BAD","code":5,"raw_log":"insufficient funds"}"#);
        let node = node_with(runner.clone(), NodeRole::FullNode);

        let err = node
            .execute_contract("user-1", "juno1contract", "{}", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::TxFailed { code: 5, .. }));
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_wait_for_tx_polls_until_found() {
        let runner = Arc::new(RecordingRunner::new());
        runner.push_failure("Error: tx (ABC) not found");
        runner.push_failure("Error: tx (ABC) not found");
        runner.push_success(r#"{"height":"9","txhash":"ABC","code":0}"#);
        let node = node_with(runner.clone(), NodeRole::Validator);

        let tx = node.wait_for_tx("ABC").await.unwrap();
        assert_eq!(tx.height, 9);
        assert_eq!(runner.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_wait_for_tx_reports_deliver_failure() {
        let runner = Arc::new(RecordingRunner::new());
        runner.push_success(r#"{"height":"9","txhash":"ABC","code":5,"raw_log":"execute wasm contract failed"}"#);
        let node = node_with(runner, NodeRole::Validator);

        let err = node.wait_for_tx("ABC").await.unwrap_err();
        assert!(err.to_string().contains("execute wasm contract failed"));
    }

    #[tokio::test]
    async fn test_wait_for_tx_times_out() {
        let runner = Arc::new(RecordingRunner::new());
        for _ in 0..1000 {
            runner.push_failure("Error: tx (ABC) not found");
        }
        let node = node_with(runner, NodeRole::Validator);

        let err = node.wait_for_tx("ABC").await.unwrap_err();
        assert!(matches!(err, HarnessError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_query_contract_decodes_data() {
        let runner = Arc::new(RecordingRunner::new());
        runner.push_success(r#"{"data":[1]}"#);
        let node = node_with(runner.clone(), NodeRole::FullNode);

        let routes: crate::sdjwt::GetRoutesRes = node
            .query_contract("juno1contract", r#"{"get_routes":{"app_addr":"juno1app"}}"#)
            .await
            .unwrap();
        assert_eq!(routes.data, vec![1]);
        assert!(runner.calls()[0]
            .command_line()
            .contains("query wasm contract-state smart juno1contract"));
    }

    #[tokio::test]
    async fn test_create_key() {
        let runner = Arc::new(RecordingRunner::new());
        runner.push_success("");
        let node = node_with(runner.clone(), NodeRole::Validator);
        assert!(node.create_key("user").await.is_err());

        let runner = Arc::new(RecordingRunner::new());
        runner.push_success(r#"{"name":"user","type":"local","address":"juno1user","mnemonic":"word word"}"#);
        let node = node_with(runner, NodeRole::Validator);
        let key = node.create_key("user").await.unwrap();
        assert_eq!(key.address, "juno1user");
        assert_eq!(key.mnemonic.as_deref(), Some("word word"));
    }

    #[tokio::test]
    async fn test_recover_key_pipes_mnemonic() {
        let runner = Arc::new(RecordingRunner::new());
        let node = node_with(runner.clone(), NodeRole::FullNode);
        node.recover_key("user", "word word").await.unwrap();

        let calls = runner.calls();
        assert!(calls[0]
            .command_line()
            .starts_with("docker exec -i juno-start-ab12-juno-fn-0 junod keys add user --recover"));
        assert_eq!(calls[0].stdin.as_deref(), Some(b"word word\n".as_slice()));
    }

    #[tokio::test]
    async fn test_balance() {
        let runner = Arc::new(RecordingRunner::new());
        runner.push_success(r#"{"denom":"ujuno","amount":"10000000000"}"#);
        let node = node_with(runner, NodeRole::Validator);
        assert_eq!(node.balance("juno1user").await.unwrap(), 10_000_000_000);
    }
}
