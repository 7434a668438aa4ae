// src/model/ad_request.rs

use serde::{Deserialize, Serialize};

/// CTV 内容元数据（SSAI 场景）
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct CtvContent {
    pub content_id: String,
    pub genre: Option<String>,
    pub rating: Option<String>,
    pub language: Option<String>,
}

/// 入口请求的统一投影。
///
/// 三种 ingress（ad-tag / SSAI / OpenRTB）都折算到这个形状；
/// 随请求创建、响应后丢弃。
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct AdRequest {
    pub placement_id: String,
    pub page_url: Option<String>,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    /// 请求侧底价覆盖：只允许抬高广告位底价，不允许压低
    pub floor: Option<f64>,
    pub deal_id: Option<String>,
    pub device_id: Option<String>,
    pub content: Option<CtvContent>,
    pub geo_country: Option<String>,
}

impl AdRequest {
    /// 粗粒度设备分类，用于交易定向（deal.devices）
    pub fn device_class(&self) -> Option<String> {
        if self.device_id.is_some() || self.content.is_some() {
            return Some("ctv".to_string());
        }
        let ua = self.user_agent.as_deref()?;
        if ua.contains("Mobile") || ua.contains("Android") || ua.contains("iPhone") {
            Some("mobile".to_string())
        } else {
            Some("desktop".to_string())
        }
    }
}
