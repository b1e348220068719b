use scopegate_core::Document;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct EntityRequest {
    #[serde(default)]
    pub entity_name: Option<String>,
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub query: Option<Document>,
    #[serde(default)]
    pub data: Option<Document>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub data: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
