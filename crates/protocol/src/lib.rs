use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const CAPABILITIES_SCHEMA_VERSION: u32 = 1;
pub const API_VERSION: &str = "v1";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Ok,
    Error,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub hint: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, JsonSchema)]
pub struct ResponseMeta {
    /// Calculator profile that produced the numbers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

/// Envelope for every JSON answer of the site API.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct ApiResponse {
    pub status: ResponseStatus,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
    #[serde(default)]
    pub meta: ResponseMeta,
}

impl ApiResponse {
    pub fn ok<T: Serialize>(data: &T, meta: ResponseMeta) -> Result<Self> {
        Ok(Self {
            status: ResponseStatus::Ok,
            data: serde_json::to_value(data)?,
            error: None,
            meta,
        })
    }

    pub fn error(code: &str, message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            data: serde_json::Value::Null,
            error: Some(ErrorEnvelope {
                code: code.to_string(),
                message: message.into(),
                details: None,
                hint,
            }),
            meta: ResponseMeta::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct CapabilitiesServer {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CalculatorKind {
    BrandSavings,
    CostComparison,
    ProviderEarnings,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct CalculatorEndpoint {
    pub kind: CalculatorKind,
    pub method: String,
    pub path: String,
    /// Earnings variants selectable through the `variant` field.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct GateCapabilities {
    pub login_path: String,
    pub cookie_name: String,
    pub ttl_seconds: u64,
    pub configured: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct Capabilities {
    pub schema_version: u32,
    pub api_version: String,
    pub server: CapabilitiesServer,
    pub profile: String,
    pub calculators: Vec<CalculatorEndpoint>,
    pub gate: GateCapabilities,
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}
