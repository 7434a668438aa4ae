// src/bidding/builder.rs

use uuid::Uuid;

use crate::error::SspError;
use crate::model::ad_request::AdRequest;
use crate::model::catalog::{AdType, Placement, Publisher, Site};
use crate::openrtb::request::{
    Audio, Banner, BidRequest, Content, Device, Format, Imp, Native, Pmp, PmpDeal, Site as SiteInfo,
    SitePublisher, Source, Video,
};
use crate::schain::{self, SupplyChainBuilder};

/// 把 AdRequest + 目录记录组装成 OpenRTB 2.5 BidRequest。
///
/// 单 impression；banner/video/audio/native 四选一由广告位 ad_type 决定。
pub struct BidRequestBuilder {
    schain: SupplyChainBuilder,
    tmax_ms: u64,
    global_floor: f64,
}

impl BidRequestBuilder {
    pub fn new(ssp_id: &str, ssp_domain: &str, tmax_ms: u64, global_floor: f64) -> Self {
        Self {
            schain: SupplyChainBuilder::new(ssp_domain, ssp_id, ssp_domain),
            tmax_ms,
            global_floor,
        }
    }

    /// 请求侧底价只能抬高广告位底价，全局兜底底价压在最下面
    fn effective_floor(&self, ad_req: &AdRequest, placement: &Placement) -> f64 {
        placement
            .floor
            .max(ad_req.floor.unwrap_or(0.0))
            .max(self.global_floor)
    }

    pub fn build(
        &self,
        ad_req: &AdRequest,
        placement: &Placement,
        site: &Site,
        publisher: &Publisher,
    ) -> Result<BidRequest, SspError> {
        placement.validate()?;
        let floor = self.effective_floor(ad_req, placement);

        let mut imp = Imp {
            id: Uuid::new_v4().to_string(),
            tagid: Some(placement.id.clone()),
            bidfloor: Some(floor),
            bidfloorcur: Some("USD".to_string()),
            secure: Some(1),
            ..Default::default()
        };

        match placement.ad_type {
            AdType::Banner => imp.banner = Some(self.build_banner(ad_req, placement)),
            AdType::Video => imp.video = Some(self.build_video(ad_req, placement)),
            AdType::Audio => imp.audio = Some(build_audio()),
            AdType::Native => {
                imp.native = Some(Native {
                    request: r#"{"ver":"1.2"}"#.to_string(),
                    ver: Some("1.2".to_string()),
                })
            }
        }

        // 请求带 deal 时挂 PMP，限定私有竞价
        if let Some(deal_id) = &ad_req.deal_id {
            imp.pmp = Some(Pmp {
                private_auction: Some(1),
                deals: Some(vec![PmpDeal {
                    id: deal_id.clone(),
                    bidfloor: Some(floor),
                    bidfloorcur: Some("USD".to_string()),
                    ..Default::default()
                }]),
            });
        }

        let site_info = SiteInfo {
            id: Some(site.id.clone()),
            name: Some(site.name.clone()),
            domain: Some(site.domain.clone()),
            cat: site.cat.clone(),
            page: ad_req.page_url.clone(),
            r#ref: ad_req.referer.clone(),
            publisher: Some(SitePublisher {
                id: Some(publisher.id.clone()),
                name: Some(publisher.name.clone()),
                domain: Some(publisher.domain.clone()),
            }),
            content: ad_req.content.as_ref().map(|c| Content {
                id: Some(c.content_id.clone()),
                genre: c.genre.clone(),
                contentrating: c.rating.clone(),
                language: c.language.clone(),
            }),
        };

        let device = Device {
            ua: ad_req.user_agent.clone(),
            ip: ad_req.ip.clone(),
            ifa: ad_req.device_id.clone(),
            devicetype: ad_req.device_class().map(|class| match class.as_str() {
                "ctv" => 3,
                "mobile" => 1,
                _ => 2,
            }),
            geo: ad_req.geo_country.as_ref().map(|country| {
                crate::openrtb::request::Geo {
                    country: Some(country.clone()),
                }
            }),
        };

        let mut source = Source {
            fd: Some(1),
            tid: Some(Uuid::new_v4().to_string()),
            ext: None,
        };
        let chain = self
            .schain
            .build_for_publisher(&publisher.id, &publisher.domain)?;
        schain::attach_to_source(&mut source, &chain)?;

        Ok(BidRequest {
            id: Uuid::new_v4().to_string(),
            imp: vec![imp],
            site: Some(site_info),
            device: Some(device),
            at: Some(2), // 第二价格拍卖
            tmax: Some(self.tmax_ms),
            cur: Some(vec!["USD".to_string()]),
            bcat: placement.bcat.clone(),
            badv: placement.badv.clone(),
            source: Some(source),
            ..Default::default()
        })
    }

    fn build_banner(&self, ad_req: &AdRequest, placement: &Placement) -> Banner {
        let mut banner = Banner {
            pos: Some(1), // 首屏
            ..Default::default()
        };
        let w = ad_req.width.or(placement.width);
        let h = ad_req.height.or(placement.height);
        if let Some(formats) = placement.formats.as_ref().filter(|f| !f.is_empty()) {
            banner.format = Some(formats.clone());
        } else if let (Some(w), Some(h)) = (w, h) {
            banner.w = Some(w);
            banner.h = Some(h);
            banner.format = Some(vec![Format { w, h }]);
        }
        banner
    }

    fn build_video(&self, ad_req: &AdRequest, placement: &Placement) -> Video {
        let mut video = Video {
            w: ad_req.width.or(placement.width),
            h: ad_req.height.or(placement.height),
            ..Default::default()
        };
        match &placement.video {
            Some(settings) => {
                video.mimes = settings.mimes.clone();
                video.minduration = settings.minduration;
                video.maxduration = Some(settings.maxduration);
                video.protocols = Some(settings.protocols.clone());
                video.linearity = settings.linearity;
                video.startdelay = settings.startdelay;
                video.playbackmethod = settings.playbackmethod.clone();
                video.api = settings.api.clone();
            }
            None => {
                // 默认视频参数：MP4+WebM，5-30 秒，VAST {2,3,5,6}，线性
                video.mimes = vec!["video/mp4".to_string(), "video/webm".to_string()];
                video.minduration = Some(5);
                video.maxduration = Some(30);
                video.protocols = Some(vec![2, 3, 5, 6]);
                video.linearity = Some(1);
            }
        }
        video
    }
}

fn build_audio() -> Audio {
    // 音频广告位暂无专属设置，沿用保守默认
    Audio {
        mimes: vec!["audio/mp3".to_string(), "audio/mp4".to_string()],
        minduration: Some(5),
        maxduration: Some(30),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ad_request::CtvContent;
    use crate::model::catalog::VideoSettings;

    fn publisher() -> Publisher {
        Publisher {
            id: "pub-1".to_string(),
            name: "Test Publisher".to_string(),
            email: "pub@example.com".to_string(),
            domain: "testpub.com".to_string(),
            active: true,
            rev_share: 0.7,
            created_at: None,
            updated_at: None,
        }
    }

    fn site() -> Site {
        Site {
            id: "site-1".to_string(),
            publisher_id: "pub-1".to_string(),
            name: "Test Site".to_string(),
            domain: "testsite.com".to_string(),
            page: None,
            cat: Some(vec!["IAB1".to_string()]),
            active: true,
        }
    }

    fn banner_placement() -> Placement {
        Placement {
            id: "placement-1".to_string(),
            site_id: "site-1".to_string(),
            name: "Test Placement".to_string(),
            ad_type: AdType::Banner,
            width: Some(300),
            height: Some(250),
            floor: 0.50,
            formats: None,
            video: None,
            bcat: None,
            badv: None,
            active: true,
        }
    }

    fn builder() -> BidRequestBuilder {
        BidRequestBuilder::new("test-ssp", "ssp.example.com", 120, 0.01)
    }

    #[test]
    fn banner_request_carries_placement_fields() {
        let ad_req = AdRequest {
            placement_id: "placement-1".to_string(),
            page_url: Some("https://testsite.com/page".to_string()),
            referer: Some("https://google.com".to_string()),
            user_agent: Some("Mozilla/5.0".to_string()),
            ip: Some("192.168.1.1".to_string()),
            ..Default::default()
        };
        let req = builder()
            .build(&ad_req, &banner_placement(), &site(), &publisher())
            .unwrap();

        assert!(!req.id.is_empty());
        assert_eq!(req.imp.len(), 1);
        let imp = &req.imp[0];
        assert_eq!(imp.tagid.as_deref(), Some("placement-1"));
        assert_eq!(imp.bidfloor, Some(0.50));
        assert_eq!(imp.bidfloorcur.as_deref(), Some("USD"));
        assert_eq!(imp.secure, Some(1));

        let banner = imp.banner.as_ref().unwrap();
        assert_eq!(banner.w, Some(300));
        assert_eq!(banner.h, Some(250));

        assert_eq!(req.at, Some(2));
        assert_eq!(req.tmax, Some(120));
        assert_eq!(req.cur.as_deref(), Some(&["USD".to_string()][..]));

        let source = req.source.as_ref().unwrap();
        assert_eq!(source.fd, Some(1));
        assert!(source.tid.is_some());
        assert!(crate::schain::extract_from_source(source).is_ok());

        let site = req.site.as_ref().unwrap();
        assert_eq!(site.domain.as_deref(), Some("testsite.com"));
        assert_eq!(
            site.publisher.as_ref().unwrap().id.as_deref(),
            Some("pub-1")
        );
    }

    #[test]
    fn request_floor_override_never_lowers() {
        let mut ad_req = AdRequest {
            placement_id: "placement-1".to_string(),
            floor: Some(0.20), // 低于广告位底价，应被忽略
            ..Default::default()
        };
        let req = builder()
            .build(&ad_req, &banner_placement(), &site(), &publisher())
            .unwrap();
        assert_eq!(req.imp[0].bidfloor, Some(0.50));

        ad_req.floor = Some(1.25);
        let req = builder()
            .build(&ad_req, &banner_placement(), &site(), &publisher())
            .unwrap();
        assert_eq!(req.imp[0].bidfloor, Some(1.25));
    }

    #[test]
    fn video_defaults_when_placement_has_no_settings() {
        let mut placement = banner_placement();
        placement.ad_type = AdType::Video;
        placement.video = Some(VideoSettings {
            mimes: vec!["video/mp4".to_string()],
            maxduration: 30,
            protocols: vec![2, 3],
            linearity: Some(1),
            ..Default::default()
        });
        let ad_req = AdRequest {
            placement_id: placement.id.clone(),
            ..Default::default()
        };
        let req = builder()
            .build(&ad_req, &placement, &site(), &publisher())
            .unwrap();
        let video = req.imp[0].video.as_ref().unwrap();
        assert_eq!(video.mimes, vec!["video/mp4"]);
        assert_eq!(video.maxduration, Some(30));
        assert!(req.imp[0].banner.is_none());
    }

    #[test]
    fn deal_request_attaches_pmp() {
        let ad_req = AdRequest {
            placement_id: "placement-1".to_string(),
            deal_id: Some("PMP-2024-001".to_string()),
            floor: Some(1.00),
            ..Default::default()
        };
        let req = builder()
            .build(&ad_req, &banner_placement(), &site(), &publisher())
            .unwrap();
        let pmp = req.imp[0].pmp.as_ref().unwrap();
        assert_eq!(pmp.private_auction, Some(1));
        let deals = pmp.deals.as_ref().unwrap();
        assert_eq!(deals[0].id, "PMP-2024-001");
        assert_eq!(deals[0].bidfloor, Some(1.00));
    }

    #[test]
    fn ctv_request_carries_content_and_ifa() {
        let ad_req = AdRequest {
            placement_id: "placement-1".to_string(),
            device_id: Some("ifa-123".to_string()),
            content: Some(CtvContent {
                content_id: "content-9".to_string(),
                genre: Some("drama".to_string()),
                rating: None,
                language: Some("en".to_string()),
            }),
            ..Default::default()
        };
        let req = builder()
            .build(&ad_req, &banner_placement(), &site(), &publisher())
            .unwrap();
        let device = req.device.as_ref().unwrap();
        assert_eq!(device.ifa.as_deref(), Some("ifa-123"));
        assert_eq!(device.devicetype, Some(3));
        let content = req.site.as_ref().unwrap().content.as_ref().unwrap();
        assert_eq!(content.id.as_deref(), Some("content-9"));
    }

    #[test]
    fn unset_fields_stay_off_the_wire() {
        let ad_req = AdRequest {
            placement_id: "placement-1".to_string(),
            ..Default::default()
        };
        let req = builder()
            .build(&ad_req, &banner_placement(), &site(), &publisher())
            .unwrap();
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("app").is_none());
        assert!(json.get("user").is_none());
        assert!(json.get("regs").is_none());
        assert!(json["imp"][0].get("video").is_none());
        assert!(json["imp"][0].get("pmp").is_none());
    }
}
