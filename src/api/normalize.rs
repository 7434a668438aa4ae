// src/api/normalize.rs

use std::collections::HashMap;

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::SspError;
use crate::model::ad_request::{AdRequest, CtvContent};
use crate::openrtb::request::{
    BidRequest, Content, Device, Imp, Pmp, PmpDeal, Site, SitePublisher, Video,
};

/// CTV 默认分辨率（SSAI size 解析失败时的兜底）
const CTV_DEFAULT_W: i32 = 1920;
const CTV_DEFAULT_H: i32 = 1080;

/// ad-tag GET/POST 入口 → AdRequest。
///
/// placement_id 缺失是客户端错误；query 里的 w/h/floor/deal
/// 是请求侧覆盖，floor 只会抬高不会压低（builder 保证）。
pub fn adtag_request(
    params: &HashMap<String, String>,
    headers: &HeaderMap,
    peer_ip: Option<String>,
) -> Result<AdRequest, SspError> {
    let placement_id = params
        .get("placement_id")
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SspError::BadRequest("placement_id required".to_string()))?;

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
    };

    Ok(AdRequest {
        placement_id: placement_id.clone(),
        page_url: params.get("url").cloned().or_else(|| header("referer")),
        referer: header("referer"),
        user_agent: header("user-agent"),
        ip: client_ip(headers, peer_ip),
        width: params.get("w").and_then(|v| v.parse().ok()),
        height: params.get("h").and_then(|v| v.parse().ok()),
        floor: params.get("floor").and_then(|v| v.parse().ok()),
        deal_id: params
            .get("deal")
            .or_else(|| params.get("deal_id"))
            .filter(|v| !v.is_empty())
            .cloned(),
        device_id: params.get("device_id").cloned(),
        // CTV ad tag 可以在 query 里带内容元数据
        content: params
            .get("content_id")
            .filter(|v| !v.is_empty())
            .map(|content_id| CtvContent {
                content_id: content_id.clone(),
                genre: params.get("content_genre").cloned(),
                rating: params.get("content_rating").cloned(),
                language: params.get("content_language").cloned(),
            }),
        geo_country: params.get("geo").cloned(),
    })
}

/// 客户端 IP：信任配置的转发头链（X-Forwarded-For 第一跳 →
/// X-Real-IP → 对端地址）。
pub fn client_ip(headers: &HeaderMap, peer_ip: Option<String>) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        if !real_ip.is_empty() {
            return Some(real_ip.to_string());
        }
    }
    peer_ip
}

/// Publica SSAI 决策请求体
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct PublicaSsaiRequest {
    pub publisher_id: String,
    pub site_id: String,
    #[serde(default)]
    pub content_id: String,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub ua: String,
    #[serde(default)]
    pub floor_price: f64,
    #[serde(default)]
    pub deal_id: Option<String>,
    #[serde(default)]
    pub params: HashMap<String, Value>,
    #[serde(default)]
    pub content_genre: Option<String>,
    #[serde(default)]
    pub content_rating: Option<String>,
    #[serde(default)]
    pub content_language: Option<String>,
    #[serde(default)]
    pub duration: Option<i32>,
}

/// `"WxH"` 按十进制解析，失败回落到 CTV Full-HD 1920×1080
pub fn parse_size(size: &str) -> (i32, i32) {
    let mut parts = size.split('x');
    match (
        parts.next().and_then(|p| i32::from_str_radix(p, 10).ok()),
        parts.next().and_then(|p| i32::from_str_radix(p, 10).ok()),
    ) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => (CTV_DEFAULT_W, CTV_DEFAULT_H),
    }
}

impl PublicaSsaiRequest {
    pub fn validate(&self) -> Result<(), SspError> {
        if self.publisher_id.is_empty() {
            return Err(SspError::BadRequest("publisher_id required".to_string()));
        }
        if self.site_id.is_empty() {
            return Err(SspError::BadRequest("site_id required".to_string()));
        }
        Ok(())
    }

    /// SSAI 请求没有 placement，直接折算为规范的视频 BidRequest，
    /// 走 OpenRTB 竞价路径。
    pub fn to_bid_request(&self, tmax_ms: u64) -> BidRequest {
        let (w, h) = self
            .params
            .get("size")
            .and_then(|v| v.as_str())
            .map(parse_size)
            .unwrap_or((CTV_DEFAULT_W, CTV_DEFAULT_H));

        let mut imp = Imp {
            id: "1".to_string(),
            video: Some(Video {
                mimes: vec!["video/mp4".to_string(), "video/webm".to_string()],
                minduration: Some(5),
                maxduration: Some(30),
                protocols: Some(vec![2, 3, 5, 6]),
                w: Some(w),
                h: Some(h),
                linearity: Some(1),
                ..Default::default()
            }),
            bidfloor: Some(self.floor_price),
            bidfloorcur: Some("USD".to_string()),
            secure: Some(1),
            ..Default::default()
        };
        if let Some(deal_id) = &self.deal_id {
            imp.pmp = Some(Pmp {
                private_auction: Some(1),
                deals: Some(vec![PmpDeal {
                    id: deal_id.clone(),
                    bidfloor: Some(self.floor_price),
                    bidfloorcur: Some("USD".to_string()),
                    ..Default::default()
                }]),
            });
        }

        BidRequest {
            id: Uuid::new_v4().to_string(),
            imp: vec![imp],
            site: Some(Site {
                id: Some(self.site_id.clone()),
                publisher: Some(SitePublisher {
                    id: Some(self.publisher_id.clone()),
                    ..Default::default()
                }),
                content: Some(Content {
                    id: Some(self.content_id.clone()),
                    genre: self.content_genre.clone(),
                    contentrating: self.content_rating.clone(),
                    language: self.content_language.clone(),
                }),
                ..Default::default()
            }),
            device: Some(Device {
                ua: empty_to_none(&self.ua),
                ip: empty_to_none(&self.ip),
                ifa: empty_to_none(&self.device_id),
                devicetype: Some(3), // Connected TV
                ..Default::default()
            }),
            at: Some(2),
            tmax: Some(tmax_ms),
            cur: Some(vec!["USD".to_string()]),
            ..Default::default()
        }
    }

    /// 生成的 tracking / VAST URL 上要回带的查询参数
    pub fn tracking_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("pub".to_string(), self.publisher_id.clone()),
            ("site".to_string(), self.site_id.clone()),
        ];
        if !self.content_id.is_empty() {
            params.push(("content_id".to_string(), self.content_id.clone()));
        }
        if let Some(deal) = &self.deal_id {
            params.push(("deal".to_string(), deal.clone()));
        }
        params
    }

}

fn empty_to_none(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// OpenRTB 直连入口只做缺省值规范化：tmax 默认 120ms，at 默认第二价格
pub fn normalize_openrtb(request: &mut BidRequest, default_tmax_ms: u64) {
    if request.tmax.is_none() {
        request.tmax = Some(default_tmax_ms);
    }
    if request.at.is_none() {
        request.at = Some(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn adtag_requires_placement_id() {
        let params = HashMap::new();
        let headers = HeaderMap::new();
        assert!(matches!(
            adtag_request(&params, &headers, None),
            Err(SspError::BadRequest(_))
        ));
    }

    #[test]
    fn adtag_reads_headers_and_overrides() {
        let mut params = HashMap::new();
        params.insert("placement_id".to_string(), "pl-1".to_string());
        params.insert("floor".to_string(), "1.25".to_string());
        params.insert("deal".to_string(), "PMP-2024-001".to_string());
        params.insert("w".to_string(), "300".to_string());
        params.insert("h".to_string(), "250".to_string());

        let mut headers = HeaderMap::new();
        headers.insert("referer", HeaderValue::from_static("https://site.example/p"));
        headers.insert("user-agent", HeaderValue::from_static("Mozilla/5.0"));
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );

        let ad_req = adtag_request(&params, &headers, Some("10.1.1.1".to_string())).unwrap();
        assert_eq!(ad_req.placement_id, "pl-1");
        assert_eq!(ad_req.floor, Some(1.25));
        assert_eq!(ad_req.deal_id.as_deref(), Some("PMP-2024-001"));
        assert_eq!(ad_req.width, Some(300));
        assert_eq!(ad_req.ip.as_deref(), Some("203.0.113.7"));
        assert_eq!(ad_req.referer.as_deref(), Some("https://site.example/p"));
    }

    #[test]
    fn client_ip_falls_back_to_peer() {
        let headers = HeaderMap::new();
        assert_eq!(
            client_ip(&headers, Some("192.0.2.1".to_string())),
            Some("192.0.2.1".to_string())
        );
    }

    #[test]
    fn size_parses_radix_10_or_defaults_full_hd() {
        assert_eq!(parse_size("1280x720"), (1280, 720));
        assert_eq!(parse_size("bogus"), (1920, 1080));
        assert_eq!(parse_size("0x100"), (1920, 1080));
        assert_eq!(parse_size("1920"), (1920, 1080));
    }

    #[test]
    fn ssai_converts_to_video_bid_request() {
        let mut params = HashMap::new();
        params.insert("size".to_string(), Value::String("1280x720".to_string()));
        let req = PublicaSsaiRequest {
            publisher_id: "p1-publica".to_string(),
            site_id: "site-003".to_string(),
            content_id: "content-1".to_string(),
            device_id: "ifa-1".to_string(),
            ip: "203.0.113.9".to_string(),
            ua: "Roku/DVP".to_string(),
            floor_price: 1.0,
            deal_id: Some("PMP-2024-003".to_string()),
            params,
            ..Default::default()
        };
        req.validate().unwrap();
        let bid_request = req.to_bid_request(120);

        let imp = &bid_request.imp[0];
        let video = imp.video.as_ref().unwrap();
        assert_eq!((video.w, video.h), (Some(1280), Some(720)));
        assert_eq!(imp.bidfloor, Some(1.0));
        assert_eq!(
            imp.pmp.as_ref().unwrap().deals.as_ref().unwrap()[0].id,
            "PMP-2024-003"
        );
        assert_eq!(bid_request.tmax, Some(120));
        assert_eq!(bid_request.at, Some(2));
        let device = bid_request.device.as_ref().unwrap();
        assert_eq!(device.devicetype, Some(3));
        assert_eq!(device.ifa.as_deref(), Some("ifa-1"));
    }

    #[test]
    fn ssai_requires_publisher_and_site() {
        let req = PublicaSsaiRequest::default();
        assert!(req.validate().is_err());
    }

    #[test]
    fn openrtb_defaults_fill_in() {
        let mut request = BidRequest::default();
        normalize_openrtb(&mut request, 120);
        assert_eq!(request.tmax, Some(120));
        assert_eq!(request.at, Some(2));

        let mut request = BidRequest {
            tmax: Some(200),
            at: Some(1),
            ..Default::default()
        };
        normalize_openrtb(&mut request, 120);
        assert_eq!(request.tmax, Some(200));
        assert_eq!(request.at, Some(1));
    }
}
