// src/api/handlers.rs

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::debug;

use crate::bidding;
use crate::error::SspError;
use crate::openrtb::request::BidRequest;
use crate::openrtb::response::{BidResponse, SeatBid};
use crate::render::vast::{empty_vast, render_vast};
use crate::AppState;

use super::normalize;

/// **Web/移动端 ad-tag 入口**
///
/// 胜出时返回 `{ad, bid_id, price, adomain}`，无填充 204。
pub async fn handle_ad_request(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<Value>, SspError> {
    let ad_req = normalize::adtag_request(&params, &headers, None)?;
    let outcome = bidding::run_ad_auction(&state, &ad_req).await?;
    let winner = &outcome.result.winner;
    Ok(Json(json!({
        "ad": winner.bid.adm,
        "bid_id": winner.bid.id,
        "price": outcome.result.cleared_price,
        "adomain": winner.bid.adomain,
    })))
}

/// **CTV VAST 入口**：无填充时回空广告文档而不是裸 204
pub async fn handle_vast_request(
    State(state): State<Arc<AppState>>,
    Path(placement_id): Path<String>,
    Query(mut params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    params.insert("placement_id".to_string(), placement_id);
    let ad_req = match normalize::adtag_request(&params, &headers, None) {
        Ok(ad_req) => ad_req,
        Err(e) => return e.into_response(),
    };

    match bidding::run_ad_auction(&state, &ad_req).await {
        Ok(outcome) => xml_response(render_vast(
            &outcome.result.winner.bid,
            &state.settings.ssp_endpoint,
            &state.settings.ssp_id,
        )),
        Err(SspError::Internal(e)) => SspError::Internal(e).into_response(),
        Err(e) => {
            debug!(error = %e, "VAST request unfilled");
            xml_response(empty_vast(&state.settings.ssp_id))
        }
    }
}

/// **OpenRTB 2.5 直连入口**
///
/// 胜出时剥掉所有非获胜 seatbid 只回获胜出价；无填充 204 + NBR。
pub async fn handle_openrtb_auction(
    State(state): State<Arc<AppState>>,
    Json(mut bid_request): Json<BidRequest>,
) -> Response {
    normalize::normalize_openrtb(&mut bid_request, state.settings.tmax_ms);

    match bidding::run_openrtb_auction(&state, &bid_request).await {
        Ok(outcome) => {
            let winner = outcome.result.winner;
            let response = BidResponse {
                id: bid_request.id.clone(),
                seatbid: vec![SeatBid {
                    bid: vec![winner.bid],
                    seat: winner.seat,
                    group: None,
                }],
                cur: Some("USD".to_string()),
                ..Default::default()
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e @ SspError::BadRequest(_)) => e.into_response(),
        Err(e @ SspError::Internal(_)) => e.into_response(),
        Err(_) => (
            StatusCode::NO_CONTENT,
            Json(BidResponse {
                id: bid_request.id.clone(),
                cur: Some("USD".to_string()),
                nbr: Some(3), // 无匹配广告（未填充）
                ..Default::default()
            }),
        )
            .into_response(),
    }
}

/// sellers.json 投影（带 TTL 缓存）
pub async fn handle_sellers_json(
    State(state): State<Arc<AppState>>,
) -> Result<Response, SspError> {
    let body = state.sellers.document(&state.catalog.snapshot())?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// 存活探测，GET 与 HEAD 共用
pub async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "ssp" }))
}

fn xml_response(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        body,
    )
        .into_response()
}
