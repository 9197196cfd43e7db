// Bootstrap and teardown of an isolated test chain
use std::sync::Arc;
use tracing::{info, warn};

use crate::chain::docker::{force_remove_blocking, DockerCli, ProcessRunner};
use crate::chain::CosmosChain;
use crate::config::HarnessConfig;
use crate::context::{CancelSignal, ChainContext};
use crate::error::Result;

const NAME_SUFFIX_LEN: usize = 6;
const MAX_NAME_PREFIX_LEN: usize = 40;

/// Docker resources of one test chain. Removed by [`Interchain::close`],
/// or synchronously on drop when `close` was never awaited.
pub struct Interchain {
    context: ChainContext,
    teardown: DockerCli,
    network: String,
    containers: Vec<String>,
    closed: bool,
}

impl Interchain {
    pub(crate) fn new(
        context: ChainContext,
        teardown: DockerCli,
        network: String,
        containers: Vec<String>,
    ) -> Self {
        Self {
            context,
            teardown,
            network,
            containers,
            closed: false,
        }
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn containers(&self) -> &[String] {
        &self.containers
    }

    pub fn signal(&self) -> CancelSignal {
        self.context.signal()
    }

    /// Cancel in-flight commands and remove every container and the network
    pub async fn close(mut self) -> Result<()> {
        self.closed = true;
        self.context.cancel();

        let mut first_error = None;
        for container in &self.containers {
            if let Err(e) = self.teardown.remove_container(container).await {
                warn!("Failed to remove container {}: {}", container, e);
                first_error.get_or_insert(e);
            }
        }
        if let Err(e) = self.teardown.remove_network(&self.network).await {
            warn!("Failed to remove network {}: {}", self.network, e);
            first_error.get_or_insert(e);
        }

        info!("Removed test chain resources of {}", self.network);
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for Interchain {
    fn drop(&mut self) {
        if !self.closed {
            self.context.cancel();
            warn!("Interchain {} dropped without close, removing containers", self.network);
            force_remove_blocking(&self.containers, &self.network);
        }
    }
}

/// Docker-safe unique name derived from a test name
pub fn unique_name(test_name: &str) -> String {
    let mut prefix: String = test_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    prefix.truncate(MAX_NAME_PREFIX_LEN);
    let prefix = prefix.trim_matches('-');
    let prefix = if prefix.is_empty() { "chain" } else { prefix };

    let suffix: String = (0..NAME_SUFFIX_LEN).map(|_| fastrand::lowercase()).collect();
    format!("{}-{}", prefix, suffix)
}

/// Network removal after a failed bootstrap, logged rather than returned
async fn remove_network_after_failure(docker: &DockerCli, network: &str) {
    if let Err(e) = docker.remove_network(network).await {
        warn!("Failed to remove network {} after failed setup: {}", network, e);
    }
}

/// Start a Juno chain with the given node counts. The returned [`Interchain`]
/// owns the docker resources and must outlive every use of the chain.
pub async fn create_juno_chain(
    config: HarnessConfig,
    test_name: &str,
    validators: usize,
    full_nodes: usize,
) -> Result<(Interchain, CosmosChain)> {
    let context = ChainContext::new();
    let docker = DockerCli::new(Arc::new(ProcessRunner::new(context.signal())));
    docker.check_available().await?;

    let network = unique_name(test_name);
    docker.create_network(&network, test_name).await?;

    let chain = match CosmosChain::new(config, docker.clone(), &network, test_name, validators, full_nodes) {
        Ok(chain) => chain,
        Err(e) => {
            remove_network_after_failure(&docker, &network).await;
            return Err(e);
        }
    };

    let interchain = Interchain::new(
        context,
        DockerCli::new(Arc::new(ProcessRunner::detached())),
        network,
        chain.container_names(),
    );

    if let Err(e) = chain.start().await {
        if let Err(cleanup) = interchain.close().await {
            warn!("Cleanup after failed start: {}", cleanup);
        }
        return Err(e);
    }

    Ok((interchain, chain))
}
