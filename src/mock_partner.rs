// src/mock_partner.rs

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::serve;
use axum::{Json, Router};
use rand::Rng;
use tokio::net::TcpListener;
use tokio::time::{sleep, Duration};
use tracing::info;

use crate::openrtb::request::BidRequest;
use crate::openrtb::response::{Bid, BidResponse, SeatBid};

/// Mock 需求方的出价行为，集成测试用脚本化配置
#[derive(Debug, Clone)]
pub struct MockPartnerBehavior {
    /// 固定出价；None 时按 bidfloor 乘随机系数
    pub price: Option<f64>,
    /// 模拟处理延迟（毫秒）
    pub delay_ms: u64,
    /// 出价携带的 dealid
    pub deal_id: Option<String>,
    /// true = 一律回 204 no-bid
    pub no_bid: bool,
    pub seat: String,
}

impl Default for MockPartnerBehavior {
    fn default() -> Self {
        Self {
            price: None,
            delay_ms: 0,
            deal_id: None,
            no_bid: false,
            seat: "mock_seat".to_string(),
        }
    }
}

/// 模拟 DSP 竞价响应：按 impression 类型生成创意。
async fn handle_bid(
    State(behavior): State<Arc<MockPartnerBehavior>>,
    Json(request): Json<BidRequest>,
) -> Response {
    if behavior.delay_ms > 0 {
        sleep(Duration::from_millis(behavior.delay_ms)).await;
    }
    if behavior.no_bid {
        return StatusCode::NO_CONTENT.into_response();
    }

    let mut bids = Vec::new();
    for imp in &request.imp {
        let bid_id = format!("bid-{}", imp.id);
        let bidfloor = imp.bidfloor.unwrap_or(0.0);
        let price = behavior.price.unwrap_or_else(|| {
            // 未脚本化时按 bidfloor 乘随机系数出价
            let multiplier = if imp.video.is_some() {
                rand::thread_rng().gen_range(1.0..2.5)
            } else {
                rand::thread_rng().gen_range(1.0..2.0)
            };
            (bidfloor.max(0.1)) * multiplier
        });

        let adm = if imp.video.is_some() {
            format!(
                r#"<VAST version="3.0">
  <Ad id="{bid_id}">
    <InLine>
      <AdSystem>Mock DSP</AdSystem>
      <AdTitle>Mock Video Ad</AdTitle>
      <Creatives>
        <Creative>
          <Linear>
            <Duration>00:00:30</Duration>
            <MediaFiles>
              <MediaFile delivery="progressive" type="video/mp4" width="640" height="360">
                http://example.com/video.mp4
              </MediaFile>
            </MediaFiles>
          </Linear>
        </Creative>
      </Creatives>
    </InLine>
  </Ad>
</VAST>"#,
                bid_id = bid_id
            )
        } else {
            format!(
                "<html><body>Mock Ad<img src=\"http://dsp-tracker.local/impression?bid={}\" style=\"display:none;\" /></body></html>",
                bid_id
            )
        };

        bids.push(Bid {
            id: bid_id,
            impid: imp.id.clone(),
            price,
            adm: Some(adm),
            dealid: behavior.deal_id.clone(),
            ..Default::default()
        });
    }

    let response = BidResponse {
        id: request.id.clone(),
        seatbid: vec![SeatBid {
            bid: bids,
            seat: Some(behavior.seat.clone()),
            group: Some(0),
        }],
        cur: Some("USD".to_string()),
        ..Default::default()
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// 在给定 listener 上启动 mock 需求方，路由为 `/bid`
pub async fn start_mock_partner(listener: TcpListener, behavior: MockPartnerBehavior) {
    let addr = listener.local_addr().expect("mock partner local addr");
    info!("Mock partner running at http://{}", addr);
    let app = Router::new()
        .route("/bid", post(handle_bid))
        .with_state(Arc::new(behavior));
    serve(listener, app).await.expect("mock partner server");
}

/// 绑定随机端口启动 mock 需求方，返回竞价端点 URL
pub async fn spawn_mock_partner(behavior: MockPartnerBehavior) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock partner");
    let addr = listener.local_addr().expect("mock partner local addr");
    tokio::spawn(start_mock_partner(listener, behavior));
    format!("http://{}/bid", addr)
}
