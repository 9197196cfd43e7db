// Genesis edits applied before the chain starts
use serde_json::Value;

/// Set `path` to `value` when every parent exists. Returns whether anything was written.
fn set_existing(genesis: &mut Value, path: &[&str], value: Value) -> bool {
    let Some((last, parents)) = path.split_last() else {
        return false;
    };
    let mut cursor = genesis;
    for key in parents {
        match cursor.get_mut(*key) {
            Some(next) => cursor = next,
            None => return false,
        }
    }
    match cursor.as_object_mut() {
        Some(object) if object.contains_key(*last) => {
            object.insert(last.to_string(), value);
            true
        }
        _ => false,
    }
}

fn set_coin_denoms(coins: Option<&mut Value>, denom: &str) {
    if let Some(Value::Array(coins)) = coins {
        for coin in coins {
            if let Some(object) = coin.as_object_mut() {
                object.insert("denom".to_string(), Value::String(denom.to_string()));
            }
        }
    }
}

/// Replace the default `stake` denom in staking, mint, crisis and gov params
pub fn apply_denom(genesis: &mut Value, denom: &str) {
    let denom_value = Value::String(denom.to_string());
    set_existing(genesis, &["app_state", "staking", "params", "bond_denom"], denom_value.clone());
    set_existing(genesis, &["app_state", "mint", "params", "mint_denom"], denom_value.clone());
    set_existing(genesis, &["app_state", "crisis", "constant_fee", "denom"], denom_value);

    let gov = genesis.pointer_mut("/app_state/gov");
    if let Some(gov) = gov {
        // SDK 0.47 moved min_deposit from deposit_params into params
        set_coin_denoms(gov.pointer_mut("/params/min_deposit"), denom);
        set_coin_denoms(gov.pointer_mut("/deposit_params/min_deposit"), denom);
    }
}

/// Shorten governance periods so proposals resolve within a test
pub fn shorten_voting_period(genesis: &mut Value, period: &str) {
    let period = Value::String(period.to_string());
    for path in [
        ["app_state", "gov", "params", "voting_period"],
        ["app_state", "gov", "params", "max_deposit_period"],
        ["app_state", "gov", "voting_params", "voting_period"],
        ["app_state", "gov", "deposit_params", "max_deposit_period"],
    ] {
        set_existing(genesis, &path, period.clone());
    }
}

pub fn chain_id(genesis: &Value) -> Option<&str> {
    genesis.get("chain_id").and_then(Value::as_str)
}
