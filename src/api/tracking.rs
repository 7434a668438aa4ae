// src/api/tracking.rs

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use uuid::Uuid;

use crate::analytics::{ClickRecord, ImpressionRecord, TelemetryRecord};
use crate::bidding::notice;
use crate::AppState;

/// 43 字节的 1×1 透明 GIF
pub const PIXEL_GIF: [u8; 43] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0xFF, 0xFF,
    0xFF, 0x00, 0x00, 0x00, 0x21, 0xF9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3B,
];

/// **曝光像素** `GET /impression/{bid_id}`
///
/// 先回像素再异步记账；重复请求重复计数（at-least-once），
/// 去重是遥测仓库的事。曝光到达同时触发挂起的 burl。
pub async fn handle_impression(
    State(state): State<Arc<AppState>>,
    Path(bid_id): Path<String>,
) -> Response {
    track_impression(&state, &bid_id, None).await;
    pixel_response()
}

/// **Publica 曝光/进度像素** `GET /publica/pixel/{event}?bid=…`
pub async fn handle_publica_pixel(
    State(state): State<Arc<AppState>>,
    Path(event): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let bid_id = params.get("bid").cloned().unwrap_or_default();
    track_impression(&state, &bid_id, Some(event)).await;
    pixel_response()
}

/// **点击** `GET /click/{bid_id}`
pub async fn handle_click(
    State(state): State<Arc<AppState>>,
    Path(bid_id): Path<String>,
) -> StatusCode {
    track_click(&state, &bid_id).await;
    StatusCode::OK
}

/// **Publica 点击** `GET /publica/click?bid=…`
pub async fn handle_publica_click(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> StatusCode {
    let bid_id = params.get("bid").cloned().unwrap_or_default();
    track_click(&state, &bid_id).await;
    StatusCode::OK
}

async fn track_impression(state: &AppState, bid_id: &str, event: Option<String>) {
    // 曝光确认才发计费通知；子事件（quartile 等）不再重复发
    let pending = match event.as_deref() {
        None | Some("impression") => state.notices.take(bid_id),
        _ => None,
    };
    if let Some(pending) = &pending {
        notice::fire_notice(&state.http, &pending.burl, pending.price);
    }

    state
        .analytics
        .record(TelemetryRecord::Impression(ImpressionRecord {
            impression_id: Uuid::new_v4().to_string(),
            bid_id: bid_id.to_string(),
            timestamp: Utc::now(),
            event,
            price: pending.as_ref().map(|p| p.price),
            publisher_revenue: None,
        }))
        .await;
}

async fn track_click(state: &AppState, bid_id: &str) {
    state
        .analytics
        .record(TelemetryRecord::Click(ClickRecord {
            click_id: Uuid::new_v4().to_string(),
            bid_id: bid_id.to_string(),
            timestamp: Utc::now(),
        }))
        .await;
}

fn pixel_response() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "image/gif")],
        PIXEL_GIF.to_vec(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_is_exactly_43_bytes() {
        assert_eq!(PIXEL_GIF.len(), 43);
        // GIF89a 魔数
        assert_eq!(&PIXEL_GIF[..6], b"GIF89a");
        assert_eq!(PIXEL_GIF[42], 0x3B);
    }
}
