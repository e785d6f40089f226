//! Referral Service
//!
//! Stores referral campaigns, per-campaign click/conversion events, discount
//! rewards and the current user as JSON documents in a key-value store, and
//! derives analytics from them on every read.

pub mod analytics;
pub mod config;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod storage;
pub mod workflows;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::{Config, StorageBackend};
pub use handlers::AppState;
pub use models::{Analytics, Campaign, ReferralEvents, Reward, RewardKind, UserInfo};
pub use repository::Repository;
pub use storage::{KvStore, MemoryStore, RedisStore};

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route(
            "/api/campaigns",
            get(handlers::list_campaigns_handler).post(handlers::create_campaign_handler),
        )
        .route("/api/campaigns/{id}", get(handlers::get_campaign_handler))
        .route(
            "/api/campaigns/{id}/referrer-reward",
            post(handlers::issue_referrer_reward_handler),
        )
        .route(
            "/api/referral/{id}/visit",
            post(handlers::visit_referral_handler),
        )
        .route(
            "/api/referral/{id}/claim",
            post(handlers::claim_discount_handler),
        )
        .route("/api/referrals", get(handlers::list_referrals_handler))
        .route("/api/rewards", get(handlers::list_rewards_handler))
        .route("/api/rewards/summary", get(handlers::reward_summary_handler))
        .route(
            "/api/rewards/{id}/redeem",
            post(handlers::redeem_reward_handler),
        )
        .route("/api/user", get(handlers::get_user_handler))
        .route("/api/analytics", get(handlers::analytics_handler))
        .with_state(shared_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
