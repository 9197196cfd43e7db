// Error types for the chain harness
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while driving the test chain or decoding fixtures
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Docker is not available: {0}")]
    DockerUnavailable(String),

    #[error("Command `{program} {args}` failed ({status}): {stderr}")]
    Command {
        program: String,
        args: String,
        status: String,
        stderr: String,
    },

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Timed out after {}s waiting for {what}", .after.as_secs())]
    Timeout { what: String, after: Duration },

    #[error("Transaction {txhash} failed with code {code}: {raw_log}")]
    TxFailed {
        txhash: String,
        code: u32,
        raw_log: String,
    },

    #[error("Event attribute {event}.{attribute} not found in transaction {txhash}")]
    MissingEvent {
        txhash: String,
        event: String,
        attribute: String,
    },

    #[error("Code checksum mismatch for code {code_id}: local {local}, on chain {on_chain}")]
    ChecksumMismatch {
        code_id: u64,
        local: String,
        on_chain: String,
    },

    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected chain output: {0}")]
    UnexpectedOutput(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML decode error: {0}")]
    TomlDecode(#[from] toml::de::Error),

    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<config::ConfigError> for HarnessError {
    fn from(err: config::ConfigError) -> Self {
        HarnessError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;
