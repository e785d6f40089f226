//! API request handlers for the Referral Service

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use referrify_common::Error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    models::{Analytics, Campaign, NewCampaign, ReferralEventMap, Reward, RewardSummary, UserInfo},
    repository::Repository,
    workflows,
};

/// Shared application state
pub struct AppState {
    pub repo: Mutex<Repository>,

    /// Origin embedded in new referral links
    pub public_origin: String,
}

impl AppState {
    pub fn new(repo: Repository, public_origin: impl Into<String>) -> Self {
        Self {
            repo: Mutex::new(repo),
            public_origin: public_origin.into(),
        }
    }
}

/// API Error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message
        });

        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match err {
            Error::InvalidCampaign(_) => StatusCode::BAD_REQUEST,
            Error::CampaignNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

/// List of campaigns
#[derive(Debug, Serialize)]
pub struct CampaignsListResponse {
    pub campaigns: Vec<Campaign>,
    pub total: usize,
}

/// Single campaign
#[derive(Debug, Serialize)]
pub struct CampaignResponse {
    pub campaign: Campaign,
}

/// Request to claim a referral discount
#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    #[serde(default)]
    pub email: String,
}

/// Response from claiming a discount
#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<Reward>,
}

/// Reward filter for listings
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardFilter {
    Available,
    Redeemed,
}

#[derive(Debug, Deserialize)]
pub struct RewardsQuery {
    pub status: Option<RewardFilter>,
}

/// List of rewards
#[derive(Debug, Serialize)]
pub struct RewardsListResponse {
    pub rewards: Vec<Reward>,
    pub total: usize,
}

/// Single reward
#[derive(Debug, Serialize)]
pub struct RewardResponse {
    pub reward: Reward,
}

/// Response from a redemption
#[derive(Debug, Serialize)]
pub struct RedeemResponse {
    pub success: bool,
    pub message: String,
}

/// Health check endpoint
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    let mut repo = state.repo.lock().await;

    match repo.ping().await {
        Ok(()) => Json(serde_json::json!({
            "status": "healthy",
            "service": "referral-service"
        }))
        .into_response(),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unhealthy",
                    "service": "referral-service",
                    "error": e.to_string()
                })),
            )
                .into_response()
        }
    }
}

/// List all campaigns
pub async fn list_campaigns_handler(
    State(state): State<Arc<AppState>>,
) -> Json<CampaignsListResponse> {
    let mut repo = state.repo.lock().await;
    let campaigns = repo.list_campaigns().await;
    let total = campaigns.len();

    Json(CampaignsListResponse { campaigns, total })
}

/// Create a campaign
pub async fn create_campaign_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewCampaign>,
) -> Result<(StatusCode, Json<CampaignResponse>), ApiError> {
    info!("Creating campaign: {}", payload.name);

    let mut repo = state.repo.lock().await;
    let campaign = workflows::create_campaign(&mut repo, &state.public_origin, payload).await?;

    Ok((StatusCode::CREATED, Json(CampaignResponse { campaign })))
}

/// Get a campaign by ID
pub async fn get_campaign_handler(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<String>,
) -> Result<Json<CampaignResponse>, ApiError> {
    let mut repo = state.repo.lock().await;

    match repo.find_campaign(&campaign_id).await {
        Some(campaign) => Ok(Json(CampaignResponse { campaign })),
        None => Err(Error::CampaignNotFound(campaign_id).into()),
    }
}

/// Record a referral link visit
pub async fn visit_referral_handler(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<String>,
) -> Result<Json<CampaignResponse>, ApiError> {
    let mut repo = state.repo.lock().await;
    let campaign = workflows::visit_referral(&mut repo, &campaign_id).await?;

    Ok(Json(CampaignResponse { campaign }))
}

/// Claim the discount behind a referral link
pub async fn claim_discount_handler(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<String>,
    Json(payload): Json<ClaimRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    info!("Claiming discount for campaign: {}", campaign_id);

    let mut repo = state.repo.lock().await;
    let reward = workflows::claim_discount(&mut repo, &campaign_id, payload.email.trim()).await?;

    Ok(Json(ClaimResponse {
        success: true,
        reward,
    }))
}

/// Issue a referrer reward for a campaign
pub async fn issue_referrer_reward_handler(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<String>,
) -> Result<(StatusCode, Json<RewardResponse>), ApiError> {
    let mut repo = state.repo.lock().await;
    let reward = workflows::issue_referrer_reward(&mut repo, &campaign_id).await?;

    Ok((StatusCode::CREATED, Json(RewardResponse { reward })))
}

/// Raw referral events by campaign
pub async fn list_referrals_handler(State(state): State<Arc<AppState>>) -> Json<ReferralEventMap> {
    let mut repo = state.repo.lock().await;
    Json(repo.read_referral_events().await)
}

/// List rewards, optionally only available or redeemed ones
pub async fn list_rewards_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RewardsQuery>,
) -> Json<RewardsListResponse> {
    let mut repo = state.repo.lock().await;

    let mut rewards = repo.list_rewards().await;
    match query.status {
        Some(RewardFilter::Available) => rewards.retain(|r| !r.is_redeemed),
        Some(RewardFilter::Redeemed) => rewards.retain(|r| r.is_redeemed),
        None => {}
    }
    let total = rewards.len();

    Json(RewardsListResponse { rewards, total })
}

/// Redeem a reward
pub async fn redeem_reward_handler(
    State(state): State<Arc<AppState>>,
    Path(reward_id): Path<String>,
) -> Result<Json<RedeemResponse>, ApiError> {
    info!("Redeeming reward: {}", reward_id);

    let mut repo = state.repo.lock().await;
    if !repo.redeem_reward(&reward_id).await {
        return Err(ApiError::internal(format!(
            "Failed to redeem reward: {}",
            reward_id
        )));
    }

    Ok(Json(RedeemResponse {
        success: true,
        message: format!("Reward redeemed: {}", reward_id),
    }))
}

/// Available and redeemed reward counts
pub async fn reward_summary_handler(State(state): State<Arc<AppState>>) -> Json<RewardSummary> {
    let mut repo = state.repo.lock().await;
    Json(repo.reward_summary().await)
}

/// The current user
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<UserInfo>, ApiError> {
    let mut repo = state.repo.lock().await;

    repo.read_user_info().await.map(Json).ok_or(ApiError {
        status: StatusCode::NOT_FOUND,
        message: "No user info saved".to_string(),
    })
}

/// Aggregated analytics
pub async fn analytics_handler(State(state): State<Arc<AppState>>) -> Json<Analytics> {
    let mut repo = state.repo.lock().await;
    Json(repo.compute_analytics().await)
}
