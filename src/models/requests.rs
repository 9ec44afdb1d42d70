use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to start searching for a partner.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SearchRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: i64,
    #[validate(length(min = 1))]
    pub mode: String,
    #[serde(default)]
    #[serde(alias = "target_gender", rename = "targetGender")]
    pub target_gender: Option<String>,
}

/// Request carrying only the acting user (stop, skip, reconnect, block).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EventRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: i64,
}

/// Request to report the current chat partner.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReportRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: i64,
    #[validate(length(min = 1, max = 512))]
    pub reason: String,
}

/// Request to relay a message to the current chat partner.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MessageRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: i64,
    #[validate(length(min = 1))]
    #[serde(alias = "content_type", rename = "contentType")]
    pub content_type: String,
    pub body: serde_json::Value,
}
