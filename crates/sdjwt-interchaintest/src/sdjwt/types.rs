// Wire types of the avida sdjwt verifier contract
use serde::{Deserialize, Serialize};

/// Binary data wrapper for CosmWasm compatibility, base64 on the wire
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Binary(#[serde(with = "base64_serde")] Vec<u8>);

impl Binary {
    pub fn from_base64(encoded: &str) -> Result<Self, base64::DecodeError> {
        use base64::{engine::general_purpose::STANDARD, Engine};
        let decoded = STANDARD.decode(encoded)?;
        Ok(Binary(decoded))
    }

    pub fn to_base64(&self) -> String {
        use base64::{engine::general_purpose::STANDARD, Engine};
        STANDARD.encode(&self.0)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn to_vec(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Binary {
    fn from(value: Vec<u8>) -> Self {
        Binary(value)
    }
}

impl From<&[u8]> for Binary {
    fn from(value: &[u8]) -> Self {
        Binary(value.to_vec())
    }
}

mod base64_serde {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(data: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error> {
        STANDARD.encode(data).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(&encoded)
            .map_err(|e| serde::de::Error::custom(e.to_string()))
    }
}

/// Registry a verification key can be resolved from
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrustRegistry {
    Cheqd,
}

/// Where the verifier finds the key for a route
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VerificationSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<TrustRegistry>,
    /// Key material itself, or its location in `source`
    pub data_or_location: Binary,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RouteVerificationRequirements {
    /// JSON-encoded presentation request
    pub presentation_request: Binary,
    pub verification_source: VerificationSource,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RouteRequirement {
    pub route_id: u64,
    pub requirements: RouteVerificationRequirements,
}

impl RouteRequirement {
    /// Route verified against an inline key, no registry lookup
    pub fn inline(route_id: u64, presentation_request: &[u8], key: &[u8]) -> Self {
        Self {
            route_id,
            requirements: RouteVerificationRequirements {
                presentation_request: Binary::from(presentation_request),
                verification_source: VerificationSource {
                    source: None,
                    data_or_location: Binary::from(key),
                },
            },
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InitRegistration {
    pub app_admin: String,
    pub app_addr: String,
    pub routes: Vec<RouteRequirement>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InstantiateMsg {
    pub init_registrations: Vec<InitRegistration>,
    pub max_presentation_len: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteMsg {
    /// Register an application and its routes
    Register {
        app_addr: String,
        route_criteria: Vec<RouteRequirement>,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueryMsg {
    /// Route ids registered for an application
    GetRoutes { app_addr: String },
    /// JSON-encoded verification key of one route
    GetRouteVerificationKey { app_addr: String, route_id: u64 },
}

/// `get_routes` response as printed by the chain CLI
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GetRoutesRes {
    pub data: Vec<u64>,
}

/// `get_route_verification_key` response as printed by the chain CLI
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GetRouteVerificationKeyRes {
    pub data: String,
}
