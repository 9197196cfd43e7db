// sdjwt verifier contract on a local Juno chain (1 validator, 1 full node).
// Runs when docker answers and artifacts/avida_sdjwt_verifier.wasm exists.
// Set SDJWT_SHORT to skip it.
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sdjwt_interchaintest::chain::{Chain, CosmosChain, DockerCli, InstantiateOptions, ProcessRunner};
use sdjwt_interchaintest::logging::init_test_tracing;
use sdjwt_interchaintest::sdjwt::{
    ExecuteMsg, GetRouteVerificationKeyRes, GetRoutesRes, OkpJwk, QueryMsg, TestFixtures,
};
use sdjwt_interchaintest::{create_juno_chain, get_and_fund_test_users, HarnessConfig};

fn manifest_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

const SHORT_MODE_VAR: &str = "SDJWT_SHORT";

/// Route registered for the second app in the instantiate fixture
const REGISTERED_ROUTE_ID: u64 = 1;

fn load_fixtures() -> anyhow::Result<(HarnessConfig, TestFixtures)> {
    let config = HarnessConfig::load(manifest_dir().join("config/harness.toml"))
        .context("loading harness configuration")?;
    let fixtures = TestFixtures::from_config(&config, &manifest_dir())?;
    Ok((config, fixtures))
}

/// Reason to skip the chain scenario in this environment, if any
async fn chain_skip_reason(fixtures: &TestFixtures) -> Option<String> {
    if std::env::var_os(SHORT_MODE_VAR).is_some() {
        return Some(format!("{} is set", SHORT_MODE_VAR));
    }
    if !fixtures.contract_path.is_file() {
        return Some(format!(
            "contract artifact {} not found",
            fixtures.contract_path.display()
        ));
    }
    let docker = DockerCli::new(Arc::new(ProcessRunner::detached()));
    docker.check_available().await.err().map(|e| e.to_string())
}

#[tokio::test]
async fn test_sdjwt_contract_register_and_query() -> anyhow::Result<()> {
    init_test_tracing();
    let (config, fixtures) = load_fixtures()?;
    if let Some(reason) = chain_skip_reason(&fixtures).await {
        println!("Skipping juno contract scenario: {}", reason);
        return Ok(());
    }

    let (interchain, chain) = create_juno_chain(config, "test_sdjwt_contract_register_and_query", 1, 1)
        .await
        .context("starting juno chain")?;

    let result = register_and_query(&chain, &fixtures).await;
    interchain.close().await.context("tearing down juno chain")?;
    result
}

async fn register_and_query(chain: &CosmosChain, fixtures: &TestFixtures) -> anyhow::Result<()> {
    let users = get_and_fund_test_users(chain, "default", fixtures.user_funds, 1)
        .await
        .context("funding test user")?;
    let user = &users[0];

    let code_id = chain
        .store_contract(user.key_name(), &fixtures.contract_path)
        .await
        .context("storing contract")?;

    let init_msg = serde_json::to_string(&fixtures.instantiate_msg())?;
    let options = InstantiateOptions::new(&fixtures.instantiate_label).with_gas(fixtures.instantiate_gas);
    let contract = chain
        .instantiate_contract(user.key_name(), code_id, &init_msg, &options)
        .await
        .context("instantiating contract")?;

    let register_msg = serde_json::to_string(&fixtures.register_msg())?;
    chain
        .execute_contract(user.key_name(), &contract, &register_msg, &[])
        .await
        .context("executing register")?;

    let routes_query = serde_json::to_string(&QueryMsg::GetRoutes {
        app_addr: fixtures.app_addr_2.clone(),
    })?;
    let routes: GetRoutesRes = chain
        .query_contract(&contract, &routes_query)
        .await
        .context("querying routes")?;
    assert_eq!(routes.data, vec![REGISTERED_ROUTE_ID]);

    let key_query = serde_json::to_string(&QueryMsg::GetRouteVerificationKey {
        app_addr: fixtures.app_addr_2.clone(),
        route_id: REGISTERED_ROUTE_ID,
    })?;
    let key: GetRouteVerificationKeyRes = chain
        .query_contract(&contract, &key_query)
        .await
        .context("querying route verification key")?;
    let jwk = OkpJwk::from_slice(key.data.as_bytes()).context("decoding returned key")?;
    assert_eq!(jwk, fixtures.expected_jwk()?);

    Ok(())
}

#[test]
fn test_default_configuration_file_matches_defaults() {
    let (config, fixtures) = load_fixtures().unwrap();
    let defaults = HarnessConfig::default();

    assert_eq!(config.chain.chain_id, defaults.chain.chain_id);
    assert_eq!(config.chain.image_ref(), defaults.chain.image_ref());
    assert_eq!(fixtures.instantiate_label, "avida-sdjwt");
    assert_eq!(fixtures.instantiate_gas, 2_000_000);
    assert_eq!(fixtures.route_id, REGISTERED_ROUTE_ID);
    let ExecuteMsg::Register { route_criteria, .. } = fixtures.register_msg();
    let route_ids: Vec<u64> = route_criteria.iter().map(|r| r.route_id).collect();
    assert_eq!(route_ids, vec![REGISTERED_ROUTE_ID]);
    assert!(fixtures.payload_path.starts_with(Path::new(env!("CARGO_MANIFEST_DIR"))));
}
