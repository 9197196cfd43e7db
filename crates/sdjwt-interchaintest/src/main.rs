use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use sdjwt_interchaintest::chain::{Chain, InstantiateOptions};
use sdjwt_interchaintest::config::HarnessConfig;
use sdjwt_interchaintest::logging::init_tracing;
use sdjwt_interchaintest::payload::{read_payload_with_sign_inputs_from_file, MsgCreateResourcePayload};
use sdjwt_interchaintest::sdjwt::{GetRoutesRes, OkpJwk, QueryMsg, TestFixtures};
use sdjwt_interchaintest::{create_juno_chain, get_and_fund_test_users};

#[derive(Parser)]
#[command(name = "sdjwt-harness")]
#[command(about = "Local Juno chains for the avida sdjwt verifier contract")]
#[command(version)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/harness.toml")]
    pub config: PathBuf,

    /// Log level, overrides the configuration
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a chain and keep it running until Ctrl-C
    Up {
        #[arg(long, default_value_t = 1)]
        validators: usize,
        #[arg(long, default_value_t = 1)]
        fullnodes: usize,
    },
    /// Start a chain, deploy the verifier contract and register the fixture route
    Deploy {
        #[arg(long, default_value_t = 1)]
        validators: usize,
        #[arg(long, default_value_t = 1)]
        fullnodes: usize,
        /// Keep the chain running until Ctrl-C after deploying
        #[arg(long)]
        keep: bool,
    },
    /// Decode and validate a cheqd resource payload file
    ParsePayload {
        file: PathBuf,
    },
    /// Print a fresh Ed25519 JWK
    GenJwk {
        /// Include the private component
        #[arg(long)]
        private: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let loaded = if cli.config.is_file() {
        Some(
            HarnessConfig::load(&cli.config)
                .with_context(|| format!("loading {}", cli.config.display()))?,
        )
    } else {
        None
    };

    let level = cli
        .log_level
        .clone()
        .or_else(|| loaded.as_ref().map(|c| c.global.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    init_tracing(&level);

    let config = loaded.unwrap_or_else(|| {
        warn!("{} not found, using default configuration", cli.config.display());
        HarnessConfig::default()
    });
    info!("Using chain {} ({})", config.chain.chain_id, config.chain.image_ref());

    match cli.command {
        Commands::Up { validators, fullnodes } => up(config, validators, fullnodes).await?,
        Commands::Deploy {
            validators,
            fullnodes,
            keep,
        } => deploy(config, validators, fullnodes, keep).await?,
        Commands::ParsePayload { file } => parse_payload(&file)?,
        Commands::GenJwk { private } => {
            let jwk = OkpJwk::generate();
            let jwk = if private { jwk } else { jwk.public() };
            println!("{}", serde_json::to_string_pretty(&jwk)?);
        }
    }

    Ok(())
}

async fn up(config: HarnessConfig, validators: usize, fullnodes: usize) -> anyhow::Result<()> {
    let (interchain, chain) = create_juno_chain(config, "sdjwt-harness-up", validators, fullnodes)
        .await
        .context("starting chain")?;

    let rpc = chain.rpc_client().await?;
    println!("Chain ID: {}", chain.chain_id());
    println!("RPC:      {}", rpc.endpoint());
    println!("Network:  {}", interchain.network());
    for node in chain.nodes() {
        println!("Node:     {}", node.container);
    }

    wait_for_ctrl_c().await?;
    interchain.close().await?;
    Ok(())
}

async fn deploy(
    config: HarnessConfig,
    validators: usize,
    fullnodes: usize,
    keep: bool,
) -> anyhow::Result<()> {
    let fixtures = TestFixtures::from_config(&config, &std::env::current_dir()?)?;
    anyhow::ensure!(
        fixtures.contract_path.is_file(),
        "contract artifact {} not found",
        fixtures.contract_path.display()
    );

    let (interchain, chain) = create_juno_chain(config, "sdjwt-harness-deploy", validators, fullnodes)
        .await
        .context("starting chain")?;

    let result = async {
        let users = get_and_fund_test_users(&chain, "deployer", fixtures.user_funds, 1).await?;
        let user = &users[0];

        let code_id = chain
            .store_contract(user.key_name(), &fixtures.contract_path)
            .await
            .context("storing contract")?;

        let options = InstantiateOptions::new(&fixtures.instantiate_label).with_gas(fixtures.instantiate_gas);
        let contract = chain
            .instantiate_contract(
                user.key_name(),
                code_id,
                &serde_json::to_string(&fixtures.instantiate_msg())?,
                &options,
            )
            .await
            .context("instantiating contract")?;

        chain
            .execute_contract(
                user.key_name(),
                &contract,
                &serde_json::to_string(&fixtures.register_msg())?,
                &[],
            )
            .await
            .context("registering route")?;

        let routes: GetRoutesRes = chain
            .query_contract(
                &contract,
                &serde_json::to_string(&QueryMsg::GetRoutes {
                    app_addr: fixtures.app_addr_2.clone(),
                })?,
            )
            .await?;

        println!("Code ID:  {}", code_id);
        println!("Contract: {}", contract);
        println!("Routes of {}: {:?}", fixtures.app_addr_2, routes.data);
        anyhow::Ok(())
    }
    .await;

    if result.is_ok() && keep {
        wait_for_ctrl_c().await?;
    }
    interchain.close().await?;
    result
}

fn parse_payload(file: &Path) -> anyhow::Result<()> {
    let (payload, sign_inputs) = read_payload_with_sign_inputs_from_file(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let msg = MsgCreateResourcePayload::from_slice(&payload).context("decoding payload")?;
    msg.validate()?;

    info!("Payload {} is valid", file.display());
    println!("Resource:   {} ({} {})", msg.id, msg.name, msg.version);
    println!("Collection: {}", msg.collection_id);
    println!("Type:       {}", msg.resource_type);
    println!("Data:       {} bytes", msg.data.len());
    for input in &sign_inputs {
        println!("Signer:     {}", input.verification_method_id);
    }
    Ok(())
}

async fn wait_for_ctrl_c() -> anyhow::Result<()> {
    info!("Chain is running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    Ok(())
}
