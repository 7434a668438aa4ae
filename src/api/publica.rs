// src/api/publica.rs

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::debug;

use crate::bidding;
use crate::error::SspError;
use crate::render::ssai::{render_ssai, SsaiResponse};
use crate::render::vast::{empty_vast, render_vast};
use crate::AppState;

use super::normalize::PublicaSsaiRequest;

/// **Publica SSAI 决策入口**
///
/// SSAI 请求没有 placement，折算成规范视频 BidRequest 后
/// 走 OpenRTB 竞价路径；胜出回 SSAI JSON 文档，无填充 204。
pub async fn handle_ssai(
    State(state): State<Arc<AppState>>,
    Json(ssai_req): Json<PublicaSsaiRequest>,
) -> Result<Json<SsaiResponse>, SspError> {
    ssai_req.validate()?;
    let bid_request = ssai_req.to_bid_request(state.settings.tmax_ms);
    let outcome = bidding::run_openrtb_auction(&state, &bid_request).await?;
    Ok(Json(render_ssai(
        &outcome.result,
        &state.settings.ssp_endpoint,
        &ssai_req.tracking_params(),
    )))
}

/// **Publica VAST 入口**
///
/// 查询参数携带 pub/site/content/device/ip/ua/floor/deal；
/// Publica 宏未被替换的值（仍是 `$$…$$`）按缺失处理。
pub async fn handle_publica_vast(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let get = |key: &str| publica_param(&params, key).unwrap_or_default();

    let floor = publica_param(&params, "floor")
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|f| *f > 0.0)
        .unwrap_or(0.50);

    let ssai_req = PublicaSsaiRequest {
        publisher_id: get("pub"),
        site_id: get("site"),
        content_id: get("content_id"),
        device_id: get("device_id"),
        ip: get("ip"),
        ua: get("ua"),
        floor_price: floor,
        deal_id: publica_param(&params, "deal"),
        ..Default::default()
    };

    let bid_request = ssai_req.to_bid_request(state.settings.tmax_ms);
    match bidding::run_openrtb_auction(&state, &bid_request).await {
        Ok(outcome) => xml_response(render_vast(
            &outcome.result.winner.bid,
            &state.settings.ssp_endpoint,
            &state.settings.ssp_id,
        )),
        Err(e) => {
            debug!(error = %e, "Publica VAST request unfilled");
            xml_response(empty_vast(&state.settings.ssp_id))
        }
    }
}

/// 过滤掉空值与未替换的 `$$MACRO$$` 占位
fn publica_param(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params
        .get(key)
        .filter(|v| !v.is_empty() && !v.contains("$$"))
        .cloned()
}

fn xml_response(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        body,
    )
        .into_response()
}
