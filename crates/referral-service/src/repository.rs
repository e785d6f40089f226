//! Record repository over the key-value store
//!
//! Every operation reads a whole document, mutates it in memory and writes it
//! back. Reads never fail: an absent or unparsable document decodes to its
//! empty default. Writes report faults as `false`/`None` after logging them.

use chrono::Utc;
use referrify_common::{reward_code, short_id, Result};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info, warn};

use crate::models::{
    Campaign, NewReward, ReferralEventMap, ReferralOutcome, ReferredUser, Reward, UserInfo,
};
use crate::storage::KvStore;

/// Store keys for each document
pub mod keys {
    pub const CAMPAIGNS: &str = "campaigns";
    pub const REFERRALS: &str = "referrify-referrals";
    pub const REWARDS: &str = "referrify-rewards";
    pub const USER_INFO: &str = "referrify-user-info";
}

/// Owner of the campaign, referral, reward and user documents
pub struct Repository {
    store: Box<dyn KvStore>,
}

impl Repository {
    pub fn new(store: impl KvStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Verify the backing store is reachable
    pub async fn ping(&mut self) -> Result<()> {
        self.store.ping().await
    }

    /// Record one visit to a campaign's referral link
    pub async fn record_referral_click(
        &mut self,
        campaign_id: &str,
        outcome: ReferralOutcome,
    ) -> bool {
        let result = self.try_record_referral_click(campaign_id, outcome).await;
        settle("saving referral", result).is_some()
    }

    async fn try_record_referral_click(
        &mut self,
        campaign_id: &str,
        outcome: ReferralOutcome,
    ) -> Result<()> {
        let mut referrals: ReferralEventMap = self.load(keys::REFERRALS).await;

        let entry = referrals.entry(campaign_id.to_string()).or_default();
        entry.clicks += 1;

        if outcome.converted {
            entry.conversions += 1;
            entry.users.push(ReferredUser {
                email: outcome.email.unwrap_or_default(),
                date: Utc::now(),
            });
        }

        self.save(keys::REFERRALS, &referrals).await?;

        debug!(
            "Recorded referral for campaign {} (converted: {})",
            campaign_id, outcome.converted
        );
        Ok(())
    }

    /// All referral event records by campaign id
    pub async fn read_referral_events(&mut self) -> ReferralEventMap {
        self.load(keys::REFERRALS).await
    }

    /// Issue a new reward; `None` if it could not be persisted
    pub async fn create_reward(&mut self, fields: NewReward) -> Option<Reward> {
        let result = self.try_create_reward(fields).await;
        settle("saving reward", result)
    }

    async fn try_create_reward(&mut self, fields: NewReward) -> Result<Reward> {
        let mut rewards: Vec<Reward> = self.load(keys::REWARDS).await;

        let reward = Reward {
            id: short_id(),
            code: reward_code(),
            title: fields.title,
            description: fields.description,
            expiry_date: fields.expiry_date,
            campaign_id: fields.campaign_id,
            kind: fields.kind,
            created_at: Utc::now(),
            is_redeemed: false,
            redeemed_at: None,
        };

        rewards.push(reward.clone());
        self.save(keys::REWARDS, &rewards).await?;

        info!(
            "Created {:?} reward {} ({}) for campaign {}",
            reward.kind, reward.id, reward.code, reward.campaign_id
        );
        Ok(reward)
    }

    /// All rewards in creation order
    pub async fn list_rewards(&mut self) -> Vec<Reward> {
        self.load(keys::REWARDS).await
    }

    /// Mark a reward redeemed.
    ///
    /// Always re-stamps `redeemedAt`, and succeeds even when no reward has
    /// the given id.
    pub async fn redeem_reward(&mut self, reward_id: &str) -> bool {
        let result = self.try_redeem_reward(reward_id).await;
        settle("redeeming reward", result).is_some()
    }

    async fn try_redeem_reward(&mut self, reward_id: &str) -> Result<()> {
        let mut rewards: Vec<Reward> = self.load(keys::REWARDS).await;

        let now = Utc::now();
        let mut matched = false;
        for reward in rewards.iter_mut().filter(|r| r.id == reward_id) {
            reward.is_redeemed = true;
            reward.redeemed_at = Some(now);
            matched = true;
        }

        self.save(keys::REWARDS, &rewards).await?;

        if matched {
            info!("Redeemed reward: {}", reward_id);
        } else {
            debug!("No reward with id {}; rewards rewritten unchanged", reward_id);
        }
        Ok(())
    }

    /// Overwrite the current user slot
    pub async fn save_user_info(&mut self, email: &str) -> bool {
        let info = UserInfo {
            email: email.to_string(),
        };
        let result = self.save(keys::USER_INFO, &info).await;
        settle("saving user info", result).is_some()
    }

    /// The current user, if one was saved
    pub async fn read_user_info(&mut self) -> Option<UserInfo> {
        self.load(keys::USER_INFO).await
    }

    /// All campaigns with their counters refreshed from the referral events
    pub async fn list_campaigns(&mut self) -> Vec<Campaign> {
        let mut campaigns: Vec<Campaign> = self.load(keys::CAMPAIGNS).await;
        let referrals = self.read_referral_events().await;

        for campaign in &mut campaigns {
            campaign.refresh_counters(referrals.get(&campaign.id));
        }

        campaigns
    }

    /// Look up one campaign by id
    pub async fn find_campaign(&mut self, campaign_id: &str) -> Option<Campaign> {
        self.list_campaigns()
            .await
            .into_iter()
            .find(|c| c.id == campaign_id)
    }

    /// Append a campaign to the campaign collection
    pub async fn save_campaign(&mut self, campaign: &Campaign) -> bool {
        let result = self.try_save_campaign(campaign).await;
        settle("saving campaign", result).is_some()
    }

    async fn try_save_campaign(&mut self, campaign: &Campaign) -> Result<()> {
        let mut campaigns: Vec<Campaign> = self.load(keys::CAMPAIGNS).await;
        campaigns.push(campaign.clone());
        self.save(keys::CAMPAIGNS, &campaigns).await?;

        info!("Saved campaign {} ({})", campaign.id, campaign.name);
        Ok(())
    }

    /// Decode the document under `key`, substituting the empty default when
    /// it is absent, unreadable or malformed
    async fn load<T>(&mut self, key: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(e) => {
                warn!("Failed to read {}: {}", key, e);
                return T::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("Discarding unparsable document {}: {}", key, e);
                T::default()
            }
        }
    }

    async fn save<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.store.set(key, json).await
    }
}

fn settle<T>(operation: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            error!("Error {}: {}", operation, e);
            None
        }
    }
}
