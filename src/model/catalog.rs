// src/model/catalog.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SspError;
use crate::openrtb::request::Format;

/// 发布者（Publisher）目录记录。
///
/// `rev_share` 是发布者保留的分成比例（0.0-1.0），其余归 SSP 与中间方。
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Publisher {
    pub id: String,
    pub name: String,
    pub email: String,
    pub domain: String,
    pub active: bool,
    pub rev_share: f64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// 站点（Site）目录记录，必须归属于一个 Publisher。
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Site {
    pub id: String,
    pub publisher_id: String,
    pub name: String,
    pub domain: String,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub cat: Option<Vec<String>>, // IAB 内容分类
    pub active: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AdType {
    Banner,
    Video,
    Audio,
    Native,
}

/// 视频广告位设置
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct VideoSettings {
    pub mimes: Vec<String>,
    #[serde(default)]
    pub minduration: Option<i32>,
    pub maxduration: i32,
    pub protocols: Vec<i32>,
    #[serde(default)]
    pub linearity: Option<i32>,       // 1 = 线性, 2 = 非线性
    #[serde(default)]
    pub startdelay: Option<i32>,      // -1 = 中贴, 0 = 前贴
    #[serde(default)]
    pub playbackmethod: Option<Vec<i32>>,
    #[serde(default)]
    pub api: Option<Vec<i32>>,
}

/// 广告位（Placement）目录记录。
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Placement {
    pub id: String,
    pub site_id: String,
    pub name: String,
    pub ad_type: AdType,
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
    /// 底价（USD CPM，非负）
    pub floor: f64,
    #[serde(default)]
    pub formats: Option<Vec<Format>>, // 多尺寸 banner
    #[serde(default)]
    pub video: Option<VideoSettings>,
    #[serde(default)]
    pub bcat: Option<Vec<String>>, // 屏蔽的创意分类
    #[serde(default)]
    pub badv: Option<Vec<String>>, // 屏蔽的广告主域名
    pub active: bool,
}

impl Placement {
    /// 校验目录不变量：video 广告位必须有 MIME 且 maxduration > 0；
    /// banner 广告位必须有 W×H 或非空 formats。
    pub fn validate(&self) -> Result<(), SspError> {
        match self.ad_type {
            AdType::Video => {
                let video = self
                    .video
                    .as_ref()
                    .ok_or_else(|| err(&self.id, "video placement missing video settings"))?;
                if video.mimes.is_empty() {
                    return Err(err(&self.id, "video placement requires at least one mime"));
                }
                if video.maxduration <= 0 {
                    return Err(err(&self.id, "video placement requires positive maxduration"));
                }
            }
            AdType::Banner => {
                let has_size = self.width.unwrap_or(0) > 0 && self.height.unwrap_or(0) > 0;
                let has_formats = self.formats.as_ref().map_or(false, |f| !f.is_empty());
                if !has_size && !has_formats {
                    return Err(err(&self.id, "banner placement requires WxH or formats"));
                }
            }
            AdType::Audio | AdType::Native => {}
        }
        if self.floor < 0.0 {
            return Err(err(&self.id, "floor must be non-negative"));
        }
        Ok(())
    }
}

fn err(id: &str, msg: &str) -> SspError {
    SspError::Internal(format!("placement {}: {}", id, msg))
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DealStatus {
    Active,
    Paused,
    Ended,
}

/// PMP 交易（Deal）目录记录。
///
/// 出价被接纳的前提：dealid 匹配、当前时间落在 `[start, end)` 窗口内、
/// 请求命中每一个已配置的定向轴。
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Deal {
    pub id: String,
    pub cpm: f64,
    pub currency: String,
    #[serde(default)]
    pub impression_cap: Option<u64>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub sizes: Option<Vec<Format>>,
    #[serde(default)]
    pub devices: Option<Vec<String>>,
    #[serde(default)]
    pub geos: Option<Vec<String>>,
    pub status: DealStatus,
}

/// 请求侧的交易定向上下文
#[derive(Debug, Clone, Default)]
pub struct DealContext {
    pub size: Option<Format>,
    pub device_class: Option<String>,
    pub geo_country: Option<String>,
}

impl Deal {
    /// 结合有效期窗口折算出的实际状态：
    /// start 在未来视为 paused，end 已过视为 ended（ended 为终态）。
    pub fn effective_status(&self, now: DateTime<Utc>) -> DealStatus {
        if self.status == DealStatus::Ended || now >= self.end {
            return DealStatus::Ended;
        }
        if now < self.start {
            return DealStatus::Paused;
        }
        self.status
    }

    /// 请求必须命中每一个已配置的定向轴；未配置的轴不参与判定。
    pub fn matches(&self, ctx: &DealContext) -> bool {
        if let Some(sizes) = &self.sizes {
            match ctx.size {
                Some(size) if sizes.contains(&size) => {}
                _ => return false,
            }
        }
        if let Some(devices) = &self.devices {
            match &ctx.device_class {
                Some(class) if devices.iter().any(|d| d.eq_ignore_ascii_case(class)) => {}
                _ => return false,
            }
        }
        if let Some(geos) = &self.geos {
            match &ctx.geo_country {
                Some(country) if geos.iter().any(|g| g.eq_ignore_ascii_case(country)) => {}
                _ => return false,
            }
        }
        true
    }

    /// 交易当前是否可参与竞价
    pub fn admissible(&self, now: DateTime<Utc>, ctx: &DealContext) -> bool {
        self.effective_status(now) == DealStatus::Active && self.matches(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn deal(start_offset: i64, end_offset: i64, status: DealStatus) -> Deal {
        let now = Utc::now();
        Deal {
            id: "PMP-2024-001".to_string(),
            cpm: 5.0,
            currency: "USD".to_string(),
            impression_cap: None,
            start: now + Duration::seconds(start_offset),
            end: now + Duration::seconds(end_offset),
            sizes: None,
            devices: None,
            geos: None,
            status,
        }
    }

    #[test]
    fn future_start_is_paused() {
        let d = deal(60, 3600, DealStatus::Active);
        assert_eq!(d.effective_status(Utc::now()), DealStatus::Paused);
    }

    #[test]
    fn past_end_is_ended() {
        let d = deal(-3600, -60, DealStatus::Active);
        assert_eq!(d.effective_status(Utc::now()), DealStatus::Ended);
    }

    #[test]
    fn ended_is_terminal() {
        let d = deal(-60, 3600, DealStatus::Ended);
        assert_eq!(d.effective_status(Utc::now()), DealStatus::Ended);
    }

    #[test]
    fn targeting_requires_every_present_axis() {
        let mut d = deal(-60, 3600, DealStatus::Active);
        d.sizes = Some(vec![Format { w: 1920, h: 1080 }]);
        d.geos = Some(vec!["USA".to_string()]);

        let hit = DealContext {
            size: Some(Format { w: 1920, h: 1080 }),
            device_class: Some("ctv".to_string()),
            geo_country: Some("usa".to_string()),
        };
        assert!(d.matches(&hit));

        let wrong_size = DealContext {
            size: Some(Format { w: 300, h: 250 }),
            ..hit.clone()
        };
        assert!(!d.matches(&wrong_size));

        // 配置了 geo 轴而请求不带 geo，同样不命中
        let no_geo = DealContext {
            geo_country: None,
            ..hit.clone()
        };
        assert!(!d.matches(&no_geo));
    }

    #[test]
    fn placement_invariants() {
        let banner = Placement {
            id: "pl-1".to_string(),
            site_id: "site-1".to_string(),
            name: "Leaderboard".to_string(),
            ad_type: AdType::Banner,
            width: None,
            height: None,
            floor: 0.5,
            formats: None,
            video: None,
            bcat: None,
            badv: None,
            active: true,
        };
        assert!(banner.validate().is_err());

        let mut sized = banner.clone();
        sized.width = Some(728);
        sized.height = Some(90);
        assert!(sized.validate().is_ok());

        let mut video = banner.clone();
        video.ad_type = AdType::Video;
        assert!(video.validate().is_err());
        video.video = Some(VideoSettings {
            mimes: vec!["video/mp4".to_string()],
            maxduration: 30,
            protocols: vec![2, 3],
            ..Default::default()
        });
        assert!(video.validate().is_ok());
    }
}
