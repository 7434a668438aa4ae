// src/analytics/records.rs

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 遥测事件，按日期分区落盘的 append-only 记录
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryRecord {
    AdRequest(AdRequestRecord),
    Bid(BidRecord),
    Impression(ImpressionRecord),
    Click(ClickRecord),
}

#[derive(Serialize, Debug, Clone)]
pub struct AdRequestRecord {
    pub request_id: String,
    pub placement_id: String,
    pub site_id: String,
    pub publisher_id: String,
    pub timestamp: DateTime<Utc>,
    pub url: Option<String>,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub ad_type: String,
    pub bid_floor: f64,
}

#[derive(Serialize, Debug, Clone)]
pub struct BidRecord {
    pub bid_id: String,
    pub request_id: String,
    pub imp_id: String,
    pub placement_id: String,
    pub site_id: String,
    pub publisher_id: String,
    pub partner_id: String,
    pub partner_name: String,
    pub price: f64,
    pub currency: String,
    pub adomain: Option<Vec<String>>,
    pub timestamp: DateTime<Utc>,
    pub won: bool,
    pub cleared_price: f64,
}

/// 曝光计数是 at-least-once，去重交给下游仓库
#[derive(Serialize, Debug, Clone)]
pub struct ImpressionRecord {
    pub impression_id: String,
    pub bid_id: String,
    pub timestamp: DateTime<Utc>,
    /// 曝光子事件（impression/start/q1/q2/q3/complete）
    pub event: Option<String>,
    pub price: Option<f64>,
    pub publisher_revenue: Option<f64>,
}

#[derive(Serialize, Debug, Clone)]
pub struct ClickRecord {
    pub click_id: String,
    pub bid_id: String,
    pub timestamp: DateTime<Utc>,
}
