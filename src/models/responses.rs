use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Response for the search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// "matched" or "queued".
    pub outcome: String,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
}

/// Response for the reconnect endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectResponse {
    #[serde(rename = "sessionId")]
    pub session_id: Uuid,
}

/// Response for the relay endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayResponse {
    pub outcome: String,
}

/// Generic acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub success: bool,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub waiting: usize,
    #[serde(rename = "activeSessions")]
    pub active_sessions: usize,
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
