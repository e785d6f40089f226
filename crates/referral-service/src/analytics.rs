//! Analytics derived from the referral and reward documents
//!
//! Nothing is cached: every call re-reads both documents and folds them.

use crate::models::{Analytics, CampaignStats, ReferralEventMap, Reward, RewardSummary};
use crate::repository::Repository;

impl Repository {
    /// Totals and conversion rates across all campaigns and rewards
    pub async fn compute_analytics(&mut self) -> Analytics {
        let referrals = self.read_referral_events().await;
        let rewards = self.list_rewards().await;
        summarize(&referrals, &rewards)
    }

    /// Available and redeemed reward counts
    pub async fn reward_summary(&mut self) -> RewardSummary {
        let rewards = self.list_rewards().await;
        let redeemed = rewards.iter().filter(|r| r.is_redeemed).count();
        RewardSummary {
            available: rewards.len() - redeemed,
            redeemed,
        }
    }
}

/// Fold the referral events and rewards into an [`Analytics`] report
pub fn summarize(referrals: &ReferralEventMap, rewards: &[Reward]) -> Analytics {
    let mut total_clicks = 0;
    let mut total_conversions = 0;
    let mut campaign_data = Vec::with_capacity(referrals.len());

    for (campaign_id, events) in referrals {
        total_clicks += events.clicks;
        total_conversions += events.conversions;

        campaign_data.push(CampaignStats {
            id: campaign_id.clone(),
            clicks: events.clicks,
            conversions: events.conversions,
            conversion_rate: conversion_rate(events.conversions, events.clicks),
        });
    }

    Analytics {
        total_clicks,
        total_conversions,
        total_rewards: rewards.len(),
        redeemed_rewards: rewards.iter().filter(|r| r.is_redeemed).count(),
        conversion_rate: conversion_rate(total_conversions, total_clicks),
        campaign_data,
    }
}

/// `conversions / clicks` as a percentage with one decimal, or `"0%"` with no clicks.
///
/// Rounds the exact decimal value of the computed percentage, halves up.
pub fn conversion_rate(conversions: u64, clicks: u64) -> String {
    if clicks == 0 {
        return "0%".to_string();
    }

    let percent = conversions as f64 / clicks as f64 * 100.0;
    format!("{}%", round_one_decimal(percent))
}

/// Round a non-negative finite value to one decimal place from its exact
/// binary value, so `0.1499..` stays `0.1` even though `0.1499.. * 10`
/// would round to `1.5`.
fn round_one_decimal(value: f64) -> String {
    // An f64 has at most 1074 fractional decimal digits
    let exact = format!("{:.1074}", value);
    let (whole, fraction) = exact.split_once('.').unwrap_or((exact.as_str(), "0"));

    let mut digits = fraction.bytes().map(|b| u128::from(b - b'0'));
    let tenths = digits.next().unwrap_or(0);
    let hundredths = digits.next().unwrap_or(0);

    let mut scaled = whole.parse::<u128>().unwrap_or(0) * 10 + tenths;
    if hundredths >= 5 {
        scaled += 1;
    }

    format!("{}.{}", scaled / 10, scaled % 10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewReward, ReferralEvents, ReferralOutcome, RewardKind};
    use crate::storage::MemoryStore;

    fn events(clicks: u64, conversions: u64) -> ReferralEvents {
        ReferralEvents {
            clicks,
            conversions,
            users: vec![],
        }
    }

    #[test]
    fn test_conversion_rate_formatting() {
        assert_eq!(conversion_rate(0, 0), "0%");
        assert_eq!(conversion_rate(3, 0), "0%");
        assert_eq!(conversion_rate(1, 4), "25.0%");
        assert_eq!(conversion_rate(1, 3), "33.3%");
        assert_eq!(conversion_rate(2, 3), "66.7%");
        assert_eq!(conversion_rate(5, 5), "100.0%");
        assert_eq!(conversion_rate(0, 7), "0.0%");
        assert_eq!(conversion_rate(1, 8), "12.5%");
        assert_eq!(conversion_rate(3, 10), "30.0%");
    }

    #[test]
    fn test_conversion_rate_uses_exact_decimal_value() {
        // 3/2000*100 is stored as 0.1499.., 49/400*100 as 12.25 or just above
        assert_eq!(conversion_rate(3, 2000), "0.1%");
        assert_eq!(conversion_rate(9, 2000), "0.4%");
        assert_eq!(conversion_rate(19, 2000), "0.9%");
        assert_eq!(conversion_rate(49, 400), "12.3%");
    }

    #[test]
    fn test_summarize_per_campaign_and_totals() {
        let mut referrals = ReferralEventMap::new();
        referrals.insert("b".to_string(), events(4, 1));
        referrals.insert("a".to_string(), events(0, 0));
        referrals.insert("c".to_string(), events(6, 2));

        let report = summarize(&referrals, &[]);

        assert_eq!(report.total_clicks, 10);
        assert_eq!(report.total_conversions, 3);
        assert_eq!(report.conversion_rate, "30.0%");

        let ids: Vec<&str> = report.campaign_data.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(report.campaign_data[0].conversion_rate, "0%");
        assert_eq!(report.campaign_data[1].conversion_rate, "25.0%");
        assert_eq!(report.campaign_data[2].conversion_rate, "33.3%");
    }

    #[tokio::test]
    async fn test_empty_store_analytics() {
        let mut repo = Repository::new(MemoryStore::new());

        let report = repo.compute_analytics().await;
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({
                "totalClicks": 0,
                "totalConversions": 0,
                "totalRewards": 0,
                "redeemedRewards": 0,
                "conversionRate": "0%",
                "campaignData": []
            })
        );
    }

    #[tokio::test]
    async fn test_analytics_counts_rewards_and_is_idempotent() {
        let mut repo = Repository::new(MemoryStore::new());

        for _ in 0..3 {
            repo.record_referral_click("c1", ReferralOutcome::click()).await;
        }
        repo.record_referral_click("c1", ReferralOutcome::conversion("a@b.com"))
            .await;

        let mut reward_ids = Vec::new();
        for _ in 0..3 {
            let reward = repo
                .create_reward(NewReward {
                    title: "5% Discount".to_string(),
                    description: "5% off your next purchase".to_string(),
                    expiry_date: "1/1/2027".to_string(),
                    campaign_id: "c1".to_string(),
                    kind: RewardKind::Referred,
                })
                .await
                .unwrap();
            reward_ids.push(reward.id);
        }
        repo.redeem_reward(&reward_ids[1]).await;

        let first = repo.compute_analytics().await;
        assert_eq!(first.total_clicks, 4);
        assert_eq!(first.total_conversions, 1);
        assert_eq!(first.total_rewards, 3);
        assert_eq!(first.redeemed_rewards, 1);
        assert_eq!(first.conversion_rate, "25.0%");
        assert_eq!(first.campaign_data.len(), 1);

        let second = repo.compute_analytics().await;
        assert_eq!(first, second);

        let summary = repo.reward_summary().await;
        assert_eq!(summary.available, 2);
        assert_eq!(summary.redeemed, 1);
    }
}
