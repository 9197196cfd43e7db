// Edits to the node's config.toml and app.toml
use toml::{Table, Value};

use crate::error::Result;

/// Set `key` inside the (possibly nested) `section`, replacing non-table entries on the way
fn set_key(table: &mut Table, section: &[&str], key: &str, value: Value) {
    let mut cursor = table;
    for name in section {
        if !cursor.get(*name).is_some_and(Value::is_table) {
            cursor.insert(name.to_string(), Value::Table(Table::new()));
        }
        let Some(Value::Table(inner)) = cursor.get_mut(*name) else {
            return;
        };
        cursor = inner;
    }
    cursor.insert(key.to_string(), value);
}

/// Consensus and networking settings for a node of a local test chain
#[derive(Debug, Clone)]
pub struct NodeConfigEdits {
    /// `node_id@host:port` of every other node
    pub persistent_peers: Vec<String>,
    pub timeout_commit: String,
}

impl NodeConfigEdits {
    /// Rewrite config.toml: peers, RPC listening on all interfaces, fast blocks
    pub fn apply_to_config_toml(&self, content: &str) -> Result<String> {
        let mut table: Table = toml::from_str(content)?;

        set_key(&mut table, &["p2p"], "persistent_peers", Value::String(self.persistent_peers.join(",")));
        set_key(&mut table, &["p2p"], "allow_duplicate_ip", Value::Boolean(true));
        set_key(&mut table, &["p2p"], "addr_book_strict", Value::Boolean(false));
        set_key(&mut table, &["rpc"], "laddr", Value::String("tcp://0.0.0.0:26657".to_string()));
        set_key(&mut table, &["consensus"], "timeout_commit", Value::String(self.timeout_commit.clone()));
        set_key(&mut table, &["consensus"], "timeout_propose", Value::String(self.timeout_commit.clone()));

        Ok(toml::to_string(&table)?)
    }
}

/// Rewrite app.toml: gas price floor, API and gRPC on all interfaces
pub fn apply_to_app_toml(content: &str, minimum_gas_prices: &str) -> Result<String> {
    let mut table: Table = toml::from_str(content)?;

    set_key(&mut table, &[], "minimum-gas-prices", Value::String(minimum_gas_prices.to_string()));
    set_key(&mut table, &["api"], "enable", Value::Boolean(true));
    set_key(&mut table, &["api"], "address", Value::String("tcp://0.0.0.0:1317".to_string()));
    set_key(&mut table, &["grpc"], "address", Value::String("0.0.0.0:9090".to_string()));

    Ok(toml::to_string(&table)?)
}

/// Peer address for a node reachable under its container name
pub fn peer_address(node_id: &str, host: &str) -> String {
    format!("{}@{}:26656", node_id.trim(), host)
}
