// Transaction results as printed by the chain CLI with `--output json`
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{HarnessError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct EventAttribute {
    pub key: String,
    #[serde(default, deserialize_with = "nullable")]
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TxEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "nullable")]
    pub attributes: Vec<EventAttribute>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TxLog {
    #[serde(default, deserialize_with = "nullable")]
    pub events: Vec<TxEvent>,
}

/// Broadcast or query result of a transaction
#[derive(Debug, Clone, Deserialize)]
pub struct TxResponse {
    #[serde(default, deserialize_with = "string_or_number")]
    pub height: u64,
    pub txhash: String,
    #[serde(default)]
    pub code: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub codespace: String,
    #[serde(default, deserialize_with = "nullable")]
    pub raw_log: String,
    #[serde(default, deserialize_with = "nullable")]
    pub logs: Vec<TxLog>,
    #[serde(default, deserialize_with = "nullable")]
    pub events: Vec<TxEvent>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub gas_used: u64,
}

impl TxResponse {
    /// Parse CLI output, tolerating text printed before the JSON document
    pub fn parse(output: &[u8]) -> Result<Self> {
        Ok(serde_json::from_value(extract_json(output)?)?)
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    pub fn ensure_success(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(HarnessError::TxFailed {
                txhash: self.txhash,
                code: self.code,
                raw_log: self.raw_log,
            })
        }
    }

    /// First value of `event.attribute`, searching message logs then block events
    pub fn find_attribute(&self, event: &str, attribute: &str) -> Option<&str> {
        self.logs
            .iter()
            .flat_map(|log| log.events.iter())
            .chain(self.events.iter())
            .filter(|e| e.kind == event)
            .flat_map(|e| e.attributes.iter())
            .find(|a| a.key == attribute)
            .map(|a| a.value.as_str())
    }

    pub fn require_attribute(&self, event: &str, attribute: &str) -> Result<String> {
        self.find_attribute(event, attribute)
            .map(str::to_string)
            .ok_or_else(|| HarnessError::MissingEvent {
                txhash: self.txhash.clone(),
                event: event.to_string(),
                attribute: attribute.to_string(),
            })
    }
}

/// Locate and decode the JSON document in command output
pub fn extract_json(output: &[u8]) -> Result<Value> {
    let text = String::from_utf8_lossy(output);
    let start = text
        .find(|c| c == '{' || c == '[')
        .ok_or_else(|| HarnessError::UnexpectedOutput(format!("no JSON in {:?}", text.trim())))?;
    Ok(serde_json::from_str(text[start..].trim())?)
}

fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom(format!("{} is not a u64", n))),
        Value::String(s) if s.is_empty() => Ok(0),
        Value::String(s) => s.parse().map_err(serde::de::Error::custom),
        other => Err(serde::de::Error::custom(format!("expected integer, got {}", other))),
    }
}
