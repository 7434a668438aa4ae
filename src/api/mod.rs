// src/api/mod.rs

pub mod handlers;
pub mod normalize;
pub mod publica;
pub mod tracking;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

/// 入口路由表：ad-tag / VAST / OpenRTB / SSAI / tracking / sellers.json
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::handle_health))
        .route(
            "/ad/request",
            get(handlers::handle_ad_request).post(handlers::handle_ad_request),
        )
        .route("/vast/:placement_id", get(handlers::handle_vast_request))
        .route("/openrtb2/auction", post(handlers::handle_openrtb_auction))
        .route("/publica/ssai", post(publica::handle_ssai))
        .route("/publica/vast", get(publica::handle_publica_vast))
        .route("/impression/:bid_id", get(tracking::handle_impression))
        .route("/click/:bid_id", get(tracking::handle_click))
        .route("/publica/pixel/:event", get(tracking::handle_publica_pixel))
        .route("/publica/click", get(tracking::handle_publica_click))
        .route("/sellers.json", get(handlers::handle_sellers_json))
        .with_state(state)
}
