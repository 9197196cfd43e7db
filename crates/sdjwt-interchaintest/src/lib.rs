//! Docker-driven Juno test chains and integration tests for the avida
//! sdjwt trust-registry contract.
//!
//! A test boots a chain with [`create_juno_chain`], funds accounts with
//! [`get_and_fund_test_users`] and drives contracts through the [`Chain`]
//! trait. The returned [`Interchain`] owns the containers and removes them
//! on [`Interchain::close`].
//!
//! The contract scenario lives in `tests/juno_contracts_tests.rs`. It runs
//! under a plain `cargo test` whenever docker answers and the compiled
//! verifier contract is in `artifacts/`, and skips itself when `SDJWT_SHORT`
//! is set.

pub mod chain;
pub mod config;
pub mod context;
pub mod error;
pub mod interchain;
pub mod logging;
pub mod payload;
pub mod sdjwt;
pub mod users;

pub use chain::{query_contract, Chain, CodeId, CosmosChain, InstantiateOptions, TxResponse};
pub use config::HarnessConfig;
pub use context::{CancelSignal, ChainContext};
pub use error::{HarnessError, Result};
pub use interchain::{create_juno_chain, Interchain};
pub use payload::{read_payload_with_sign_inputs_from_file, MsgCreateResourcePayload, SignInput};
pub use users::{get_and_fund_test_users, TestUser};
