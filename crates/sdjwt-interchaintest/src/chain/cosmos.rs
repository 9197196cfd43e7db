// A local Cosmos chain made of validator and full node containers
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

use super::docker::DockerCli;
use super::genesis::{apply_denom, chain_id, shorten_voting_period};
use super::node::{ChainNode, NodeRole, FAUCET_KEY, VALIDATOR_KEY};
use super::node_config::{peer_address, NodeConfigEdits};
use super::rpc::RpcClient;
use super::tx::TxResponse;
use super::{Chain, CodeId, InstantiateOptions};
use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};

/// Governance periods of a test chain
const VOTING_PERIOD: &str = "15s";

pub struct CosmosChain {
    config: HarnessConfig,
    network: String,
    owner: String,
    validators: Vec<ChainNode>,
    full_nodes: Vec<ChainNode>,
}

impl CosmosChain {
    pub fn new(
        config: HarnessConfig,
        docker: DockerCli,
        network: &str,
        owner: &str,
        validators: usize,
        full_nodes: usize,
    ) -> Result<Self> {
        if validators == 0 {
            return Err(HarnessError::Config(
                "a chain needs at least one validator".to_string(),
            ));
        }

        let validators = (0..validators)
            .map(|i| ChainNode::new(&config, docker.clone(), network, NodeRole::Validator, i))
            .collect::<Result<Vec<_>>>()?;
        let full_nodes = (0..full_nodes)
            .map(|i| ChainNode::new(&config, docker.clone(), network, NodeRole::FullNode, i))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            config,
            network: network.to_string(),
            owner: owner.to_string(),
            validators,
            full_nodes,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn validators(&self) -> &[ChainNode] {
        &self.validators
    }

    pub fn full_nodes(&self) -> &[ChainNode] {
        &self.full_nodes
    }

    /// Node that serves transactions and queries: the first full node, else the first validator
    pub fn get_node(&self) -> &ChainNode {
        self.full_nodes.first().unwrap_or(&self.validators[0])
    }

    /// Validators first, then full nodes
    pub fn nodes(&self) -> impl Iterator<Item = &ChainNode> {
        self.validators.iter().chain(self.full_nodes.iter())
    }

    pub fn container_names(&self) -> Vec<String> {
        self.nodes().map(|node| node.container.clone()).collect()
    }

    /// Bring the chain up and wait until it has produced its first blocks
    pub async fn start(&self) -> Result<()> {
        info!(
            "Starting {} with {} validators and {} full nodes",
            self.config.chain.chain_id,
            self.validators.len(),
            self.full_nodes.len()
        );

        let genesis = self.bootstrap_genesis().await?;
        try_join_all(
            self.nodes()
                .skip(1)
                .map(|node| node.write_genesis(&genesis)),
        )
        .await?;

        self.connect_peers().await?;
        try_join_all(self.nodes().map(|node| node.start())).await?;
        self.wait_until_ready().await
    }

    /// Create and initialize every node, then build the shared genesis on
    /// the first validator. Returns the final genesis document.
    pub async fn bootstrap_genesis(&self) -> Result<Value> {
        let chain = &self.config.chain;

        try_join_all(
            self.nodes()
                .map(|node| node.create_container(&self.network, &self.owner)),
        )
        .await?;
        try_join_all(self.nodes().map(|node| node.init_home())).await?;

        // gentx checks the bond denom, so it is fixed before signing
        let validator_addresses = try_join_all(self.validators.iter().map(|validator| async move {
            let mut genesis = validator.read_genesis().await?;
            apply_denom(&mut genesis, &chain.denom);
            validator.write_genesis(&genesis).await?;

            let key = validator.create_key(VALIDATOR_KEY).await?;
            validator
                .add_genesis_account(&key.address, chain.genesis_funds)
                .await?;
            validator.gentx(VALIDATOR_KEY, chain.validator_stake).await?;
            Ok::<_, HarnessError>(key.address)
        }))
        .await?;

        let first = &self.validators[0];
        for (validator, address) in self.validators.iter().zip(&validator_addresses).skip(1) {
            first.add_genesis_account(address, chain.genesis_funds).await?;
            let gentx = validator.read_gentx().await?;
            first
                .write_gentx(&format!("gentx-{}.json", validator.container), &gentx)
                .await?;
        }

        let faucet = first.create_key(FAUCET_KEY).await?;
        first
            .add_genesis_account(&faucet.address, chain.genesis_funds)
            .await?;
        debug!("Faucet account {}", faucet.address);

        first.collect_gentxs().await?;

        let mut genesis = first.read_genesis().await?;
        if chain_id(&genesis) != Some(chain.chain_id.as_str()) {
            return Err(HarnessError::UnexpectedOutput(format!(
                "genesis chain id {:?} differs from {}",
                chain_id(&genesis),
                chain.chain_id
            )));
        }
        apply_denom(&mut genesis, &chain.denom);
        shorten_voting_period(&mut genesis, VOTING_PERIOD);
        first.write_genesis(&genesis).await?;

        Ok(genesis)
    }

    /// Point every node at all the others
    async fn connect_peers(&self) -> Result<()> {
        let node_ids = try_join_all(self.nodes().map(|node| node.node_id())).await?;
        let peers: Vec<String> = self
            .nodes()
            .zip(&node_ids)
            .map(|(node, id)| peer_address(id, &node.container))
            .collect();

        try_join_all(self.nodes().enumerate().map(|(i, node)| {
            let edits = NodeConfigEdits {
                persistent_peers: peers
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, peer)| peer.clone())
                    .collect(),
                timeout_commit: self.config.chain.timeout_commit.clone(),
            };
            async move { node.apply_config(&edits).await }
        }))
        .await?;
        Ok(())
    }

    async fn wait_until_ready(&self) -> Result<()> {
        let global = &self.config.global;
        let timeout = global.startup_timeout()?;
        let poll = global.poll_interval()?;

        let rpc = self.rpc_client().await?;
        rpc.wait_for_ready(timeout, poll).await?;
        let height = rpc
            .wait_for_height(global.blocks_before_ready, timeout, poll)
            .await?;

        info!(
            "Chain {} is producing blocks (height {}), RPC at {}",
            self.config.chain.chain_id,
            height,
            rpc.endpoint()
        );
        Ok(())
    }

    /// RPC client for the node returned by [`CosmosChain::get_node`]
    pub async fn rpc_client(&self) -> Result<RpcClient> {
        self.get_node().rpc_client().await
    }

    /// Send `amount` of the chain denom from the faucet
    pub async fn send_funds(&self, to: &str, amount: u64) -> Result<TxResponse> {
        self.validators[0].bank_send(FAUCET_KEY, to, amount).await
    }

    pub async fn query_contract<T: DeserializeOwned>(&self, contract: &str, msg: &str) -> Result<T> {
        super::query_contract(self, contract, msg).await
    }
}

#[async_trait]
impl Chain for CosmosChain {
    fn chain_id(&self) -> &str {
        &self.config.chain.chain_id
    }

    async fn height(&self) -> Result<u64> {
        self.get_node().height().await
    }

    async fn store_contract(&self, key_name: &str, wasm_path: &Path) -> Result<CodeId> {
        self.get_node().store_contract(key_name, wasm_path).await
    }

    async fn instantiate_contract(
        &self,
        key_name: &str,
        code_id: CodeId,
        msg: &str,
        options: &InstantiateOptions,
    ) -> Result<String> {
        self.get_node()
            .instantiate_contract(key_name, code_id, msg, options)
            .await
    }

    async fn execute_contract(
        &self,
        key_name: &str,
        contract: &str,
        msg: &str,
        extra_flags: &[String],
    ) -> Result<TxResponse> {
        self.get_node()
            .execute_contract(key_name, contract, msg, extra_flags)
            .await
    }

    async fn query_contract_raw(&self, contract: &str, msg: &str) -> Result<Value> {
        self.get_node().query_contract_raw(contract, msg).await
    }
}
