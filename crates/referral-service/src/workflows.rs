//! Campaign, referral and reward workflows
//!
//! Each workflow is a short sequence of repository calls triggered by one
//! user action.

use chrono::Utc;
use referrify_common::{short_id, Error, Result};
use tracing::{info, warn};

use crate::models::{Campaign, NewCampaign, NewReward, ReferralOutcome, Reward, RewardKind};
use crate::repository::Repository;

pub const MIN_NAME_LEN: usize = 2;
pub const MAX_MESSAGE_LEN: usize = 200;

/// Check a new campaign's fields
pub fn validate_campaign(request: &NewCampaign) -> Result<()> {
    if request.name.trim().chars().count() < MIN_NAME_LEN {
        return Err(Error::InvalidCampaign(format!(
            "Campaign name must be at least {} characters",
            MIN_NAME_LEN
        )));
    }

    if !(1..=100).contains(&request.discount) {
        return Err(Error::InvalidCampaign(
            "Discount must be between 1% and 100%".to_string(),
        ));
    }

    if request.message.chars().count() > MAX_MESSAGE_LEN {
        return Err(Error::InvalidCampaign(format!(
            "Message must be at most {} characters",
            MAX_MESSAGE_LEN
        )));
    }

    Ok(())
}

/// Validate and persist a new active campaign linked under `origin`
pub async fn create_campaign(
    repo: &mut Repository,
    origin: &str,
    request: NewCampaign,
) -> Result<Campaign> {
    validate_campaign(&request)?;

    let discount = u8::try_from(request.discount)
        .map_err(|_| Error::InvalidCampaign("Discount out of range".to_string()))?;

    let campaign = Campaign::new(
        short_id(),
        request.name.trim().to_string(),
        discount,
        request.message,
        origin,
    );

    if !repo.save_campaign(&campaign).await {
        return Err(Error::Storage(format!(
            "Failed to save campaign {}",
            campaign.id
        )));
    }

    info!("Created campaign {}: {}", campaign.id, campaign.referral_link);
    Ok(campaign)
}

/// Count a visit to a referral link and resolve its campaign.
///
/// The click is recorded even when no campaign has the id.
pub async fn visit_referral(repo: &mut Repository, campaign_id: &str) -> Result<Campaign> {
    repo.record_referral_click(campaign_id, ReferralOutcome::click())
        .await;

    repo.find_campaign(campaign_id).await.ok_or_else(|| {
        warn!("Referral visit for unknown campaign: {}", campaign_id);
        Error::CampaignNotFound(campaign_id.to_string())
    })
}

/// Convert a referred visitor: store their email, count the conversion and
/// issue their discount reward.
///
/// No reward is issued for an empty email.
pub async fn claim_discount(
    repo: &mut Repository,
    campaign_id: &str,
    email: &str,
) -> Result<Option<Reward>> {
    let campaign = repo
        .find_campaign(campaign_id)
        .await
        .ok_or_else(|| Error::CampaignNotFound(campaign_id.to_string()))?;

    repo.save_user_info(email).await;
    repo.record_referral_click(campaign_id, ReferralOutcome::conversion(email))
        .await;

    if email.is_empty() {
        return Ok(None);
    }

    let fields = NewReward::discount(&campaign, RewardKind::Referred, Utc::now());
    let reward = repo
        .create_reward(fields)
        .await
        .ok_or_else(|| Error::Storage("Failed to save reward".to_string()))?;

    info!("Discount claimed for campaign {}", campaign_id);
    Ok(Some(reward))
}

/// Issue the referrer's side of a campaign's discount
pub async fn issue_referrer_reward(repo: &mut Repository, campaign_id: &str) -> Result<Reward> {
    let campaign = repo
        .find_campaign(campaign_id)
        .await
        .ok_or_else(|| Error::CampaignNotFound(campaign_id.to_string()))?;

    let fields = NewReward::discount(&campaign, RewardKind::Referrer, Utc::now());
    repo.create_reward(fields)
        .await
        .ok_or_else(|| Error::Storage("Failed to save reward".to_string()))
}
