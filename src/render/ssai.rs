// src/render/ssai.rs

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bidding::engine::AuctionResult;

use super::vast::bid_duration_secs;

/// Publica SSAI 决策响应
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SsaiResponse {
    pub vast_url: String,
    pub duration: i32, // 所有广告时长之和（秒）
    pub ad_break_id: String,
    pub ads: Vec<SsaiAd>,
    pub tracking_urls: SsaiTracking,
    pub cache_buster: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SsaiAd {
    pub id: String,
    pub duration: i32,
    pub media_url: String,
    pub click_url: String,
    pub title: String,
    pub advertiser: String,
    pub cpm: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SsaiTracking {
    pub impression: Vec<String>,
    pub click: Vec<String>,
    pub complete: Vec<String>,
    pub quartile_1: Vec<String>,
    pub quartile_2: Vec<String>,
    pub quartile_3: Vec<String>,
}

fn query_string(params: &[(String, String)], extra: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .chain(extra.iter().map(|(k, v)| format!("{}={}", k, v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// 竞价结果 → SSAI 决策文档。
/// 所有生成的 URL 回带原请求的 pub/site/content/deal 查询参数。
pub fn render_ssai(
    result: &AuctionResult,
    origin: &str,
    params: &[(String, String)],
) -> SsaiResponse {
    let cache_buster = Utc::now().timestamp().to_string();
    let winner = &result.winner;
    let bid_id = winner.bid.id.as_str();

    let tracked = |path: &str| {
        format!(
            "{}/{}?{}",
            origin,
            path,
            query_string(params, &[("bid", bid_id), ("cb", &cache_buster)])
        )
    };

    let duration = bid_duration_secs(&winner.bid);
    let ad = SsaiAd {
        id: bid_id.to_string(),
        duration,
        media_url: winner.bid.adm.clone().unwrap_or_default(),
        click_url: tracked("publica/click"),
        title: "Video Ad".to_string(),
        advertiser: winner
            .seat
            .clone()
            .unwrap_or_else(|| winner.partner_name.clone()),
        cpm: result.cleared_price,
    };

    let tracking_urls = SsaiTracking {
        impression: vec![tracked("publica/pixel/impression")],
        click: vec![tracked("publica/click")],
        complete: vec![tracked("publica/pixel/complete")],
        quartile_1: vec![tracked("publica/pixel/q1")],
        quartile_2: vec![tracked("publica/pixel/q2")],
        quartile_3: vec![tracked("publica/pixel/q3")],
    };

    let vast_url = format!(
        "{}/publica/vast?{}",
        origin,
        query_string(params, &[("cb", &cache_buster)])
    );

    SsaiResponse {
        vast_url,
        duration,
        ad_break_id: Uuid::new_v4().to_string(),
        ads: vec![ad],
        tracking_urls,
        cache_buster,
    }
}
