//! Data models for the referral record store
//!
//! Field names serialize in camelCase to match the persisted documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Days a campaign runs and a reward stays valid after creation
pub const DEFAULT_VALIDITY_DAYS: i64 = 30;

/// Campaign lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    #[default]
    Active,
    Draft,
    Completed,
}

/// A referral campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: String,
    pub name: String,

    /// Discount percentage, 1-100
    pub discount: u8,

    /// Message shown to referred visitors
    pub message: String,

    #[serde(default)]
    pub status: CampaignStatus,

    /// `<origin>/referral?id=<id>`, fixed at creation
    pub referral_link: String,

    /// Click count; refreshed from the referral events on every read
    #[serde(default)]
    pub referrals: u64,

    /// Conversion count; refreshed from the referral events on every read
    #[serde(default)]
    pub conversions: u64,

    #[serde(default)]
    pub ends_in: i64,
}

impl Campaign {
    /// Create a new active campaign whose link points at `origin`
    pub fn new(id: String, name: String, discount: u8, message: String, origin: &str) -> Self {
        let referral_link = referral_link(origin, &id);
        Self {
            id,
            name,
            discount,
            message,
            status: CampaignStatus::Active,
            referral_link,
            referrals: 0,
            conversions: 0,
            ends_in: DEFAULT_VALIDITY_DAYS,
        }
    }

    /// Overwrite the cached counters from the campaign's event record
    pub fn refresh_counters(&mut self, events: Option<&ReferralEvents>) {
        let (clicks, conversions) = events
            .map(|e| (e.clicks, e.conversions))
            .unwrap_or_default();
        self.referrals = clicks;
        self.conversions = conversions;
    }
}

/// Caller-supplied fields for a new campaign
#[derive(Debug, Clone, Deserialize)]
pub struct NewCampaign {
    pub name: String,
    pub discount: i64,
    #[serde(default)]
    pub message: String,
}

/// Build the shareable link for a campaign
pub fn referral_link(origin: &str, campaign_id: &str) -> String {
    format!("{}/referral?id={}", origin.trim_end_matches('/'), campaign_id)
}

/// A user captured by a converting visit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferredUser {
    pub email: String,
    pub date: DateTime<Utc>,
}

/// Per-campaign click and conversion record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferralEvents {
    #[serde(default)]
    pub clicks: u64,

    #[serde(default)]
    pub conversions: u64,

    #[serde(default)]
    pub users: Vec<ReferredUser>,
}

/// The referral-events document: campaign id to its record
pub type ReferralEventMap = BTreeMap<String, ReferralEvents>;

/// Result of a single referral link visit
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReferralOutcome {
    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub converted: bool,
}

impl ReferralOutcome {
    /// A visit that did not convert
    pub fn click() -> Self {
        Self::default()
    }

    /// A visit that captured an email
    pub fn conversion(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            converted: true,
        }
    }
}

/// Which side of a referral a reward was issued to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    Referred,
    Referrer,
}

/// A redeemable discount code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub id: String,
    pub code: String,
    pub title: String,
    pub description: String,

    /// Display string, e.g. `11/18/2026`
    pub expiry_date: String,

    pub campaign_id: String,

    #[serde(rename = "type")]
    pub kind: RewardKind,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub is_redeemed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redeemed_at: Option<DateTime<Utc>>,
}

/// Caller-supplied fields for a new reward
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReward {
    pub title: String,
    pub description: String,
    pub expiry_date: String,
    pub campaign_id: String,
    #[serde(rename = "type")]
    pub kind: RewardKind,
}

impl NewReward {
    /// Discount reward for `campaign`, valid for the default number of days from `now`
    pub fn discount(campaign: &Campaign, kind: RewardKind, now: DateTime<Utc>) -> Self {
        let expires = now + chrono::Duration::days(DEFAULT_VALIDITY_DAYS);
        Self {
            title: format!("{}% Discount", campaign.discount),
            description: format!("{}% off your next purchase", campaign.discount),
            expiry_date: expires.format("%-m/%-d/%Y").to_string(),
            campaign_id: campaign.id.clone(),
            kind,
        }
    }
}

/// The single "current user" slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub email: String,
}

/// Derived statistics for one campaign
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignStats {
    pub id: String,
    pub clicks: u64,
    pub conversions: u64,
    pub conversion_rate: String,
}

/// Derived statistics across all campaigns and rewards
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub total_clicks: u64,
    pub total_conversions: u64,
    pub total_rewards: usize,
    pub redeemed_rewards: usize,
    pub conversion_rate: String,
    pub campaign_data: Vec<CampaignStats>,
}

/// Counts of available and redeemed rewards
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardSummary {
    pub available: usize,
    pub redeemed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_referral_link_strips_trailing_slash() {
        assert_eq!(
            referral_link("https://example.com/", "abc123"),
            "https://example.com/referral?id=abc123"
        );
    }

    #[test]
    fn test_campaign_serializes_camel_case() {
        let campaign = Campaign::new(
            "abc123".to_string(),
            "Summer".to_string(),
            15,
            "Join us".to_string(),
            "http://localhost:8086",
        );

        let json = serde_json::to_value(&campaign).unwrap();
        assert_eq!(json["referralLink"], "http://localhost:8086/referral?id=abc123");
        assert_eq!(json["status"], "active");
        assert_eq!(json["endsIn"], 30);
    }

    #[test]
    fn test_reward_type_field_and_optional_redeemed_at() {
        let json = serde_json::json!({
            "id": "r1",
            "code": "REWARD42",
            "title": "10% Discount",
            "description": "10% off your next purchase",
            "expiryDate": "1/1/2027",
            "campaignId": "c1",
            "type": "referrer",
            "createdAt": "2026-10-19T12:00:00Z",
            "isRedeemed": false
        });

        let reward: Reward = serde_json::from_value(json).unwrap();
        assert_eq!(reward.kind, RewardKind::Referrer);
        assert!(reward.redeemed_at.is_none());

        let back = serde_json::to_value(&reward).unwrap();
        assert!(back.get("redeemedAt").is_none());
        assert_eq!(back["type"], "referrer");
    }

    #[test]
    fn test_discount_reward_fields() {
        let campaign = Campaign::new(
            "c1".to_string(),
            "Fall".to_string(),
            20,
            String::new(),
            "http://localhost",
        );
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();

        let reward = NewReward::discount(&campaign, RewardKind::Referred, now);
        assert_eq!(reward.title, "20% Discount");
        assert_eq!(reward.description, "20% off your next purchase");
        assert_eq!(reward.expiry_date, "11/18/2026");
        assert_eq!(reward.campaign_id, "c1");
    }
}
