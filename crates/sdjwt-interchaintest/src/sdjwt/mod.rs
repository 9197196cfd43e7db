// avida sdjwt verifier contract: messages, keys and test fixtures

pub mod address;
pub mod fixtures;
pub mod jwk;
pub mod types;

pub use address::{encode_address, validate_address};
pub use fixtures::{TestFixtures, FIXTURE_JWK};
pub use jwk::OkpJwk;
pub use types::{
    Binary, ExecuteMsg, GetRouteVerificationKeyRes, GetRoutesRes, InitRegistration,
    InstantiateMsg, QueryMsg, RouteRequirement, RouteVerificationRequirements, TrustRegistry,
    VerificationSource,
};
