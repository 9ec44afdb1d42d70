use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Platform user identifier (64-bit, assigned by the messaging platform).
pub type UserId = i64;

/// User profile as stored by the profile store; the engine reads and
/// writes a subset of these fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(rename = "isBanned", default)]
    pub is_banned: bool,
    #[serde(rename = "isOnline", default)]
    pub is_online: bool,
    #[serde(rename = "blockedUsers", default)]
    pub blocked_users: Vec<UserId>,
    #[serde(rename = "reportCount", default)]
    pub report_count: i32,
    #[serde(rename = "reputationScore", default)]
    pub reputation_score: i32,
    #[serde(rename = "premiumUntil", default)]
    pub premium_until: Option<DateTime<Utc>>,
    #[serde(rename = "lastPartnerId", default)]
    pub last_partner_id: Option<UserId>,
    #[serde(rename = "safetyNoticeSent", default)]
    pub safety_notice_sent: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Premium is a timestamp, not a flag: active iff set and in the future.
    pub fn is_premium(&self) -> bool {
        self.premium_until.map_or(false, |until| until > Utc::now())
    }

    /// Directional block check; the reverse direction must be checked
    /// separately since the relation is not mirrored in storage.
    pub fn has_blocked(&self, other: UserId) -> bool {
        self.blocked_users.contains(&other)
    }
}

/// Attribute filter applied to a search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SearchMode {
    Open,
    Gender { target: String },
    City,
    Interests,
}

impl SearchMode {
    /// Filtered modes are a premium feature; open mode is not.
    pub fn requires_premium(&self) -> bool {
        !matches!(self, SearchMode::Open)
    }
}

/// Opaque message payload relayed between partners, content type preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePayload {
    #[serde(rename = "contentType")]
    pub content_type: String,
    pub body: serde_json::Value,
}

/// Partner profile snippet carried by match notifications. Non-premium
/// viewers get the redacted form with every attribute absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartnerSnippet {
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
}

impl PartnerSnippet {
    pub fn full(profile: &UserProfile) -> Self {
        Self {
            gender: profile.gender.clone(),
            city: profile.city.clone(),
            interests: profile.interests.clone(),
        }
    }

    pub fn redacted() -> Self {
        Self::default()
    }
}

/// Outbound event pushed to a user through the messaging transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NotifyEvent {
    MatchFound {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
        partner: PartnerSnippet,
    },
    PartnerDetails {
        partner: PartnerSnippet,
    },
    ChatEnded,
    NoMatchFound,
    SafetyNotice,
    ReportSubmitted,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn profile(id: UserId) -> UserProfile {
        UserProfile {
            user_id: id,
            gender: Some("Female".to_string()),
            city: Some("Delhi".to_string()),
            interests: vec!["music".to_string()],
            is_banned: false,
            is_online: false,
            blocked_users: vec![],
            report_count: 0,
            reputation_score: 0,
            premium_until: None,
            last_partner_id: None,
            safety_notice_sent: false,
            created_at: Some(Utc::now()),
        }
    }

    #[test]
    fn test_premium_requires_future_timestamp() {
        let mut p = profile(1);
        assert!(!p.is_premium());

        p.premium_until = Some(Utc::now() + Duration::hours(1));
        assert!(p.is_premium());

        p.premium_until = Some(Utc::now() - Duration::hours(1));
        assert!(!p.is_premium());
    }

    #[test]
    fn test_block_is_directional() {
        let mut a = profile(1);
        let b = profile(2);

        a.blocked_users.push(2);
        assert!(a.has_blocked(b.user_id));
        assert!(!b.has_blocked(a.user_id));
    }

    #[test]
    fn test_mode_premium_gating() {
        assert!(!SearchMode::Open.requires_premium());
        assert!(SearchMode::Gender { target: "female".into() }.requires_premium());
        assert!(SearchMode::City.requires_premium());
        assert!(SearchMode::Interests.requires_premium());
    }

    #[test]
    fn test_notify_event_kind_tags() {
        let json = serde_json::to_value(&NotifyEvent::NoMatchFound).unwrap();
        assert_eq!(json["kind"], "no-match-found");

        let json = serde_json::to_value(&NotifyEvent::MatchFound {
            session_id: Uuid::new_v4(),
            partner: PartnerSnippet::redacted(),
        })
        .unwrap();
        assert_eq!(json["kind"], "match-found");
        assert!(json["partner"]["gender"].is_null());
    }
}
