// src/bidding/mod.rs

pub mod builder;
pub mod dispatcher;
pub mod engine;
pub mod notice;
pub mod transport;

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info};

use crate::analytics::{AdRequestRecord, BidRecord, TelemetryRecord};
use crate::error::SspError;
use crate::model::ad_request::AdRequest;
use crate::model::catalog::{Deal, DealContext, Placement};
use crate::openrtb::request::{BidRequest, Format};
use crate::AppState;

use dispatcher::{PartnerCall, PartnerOutcome};
use engine::{AuctionResult, DealConstraint};

/// 一次完整竞价的产出：规范化请求、竞价结果、发布者分成
pub struct AuctionOutcome {
    pub bid_request: BidRequest,
    pub result: AuctionResult,
    pub publisher_revenue: f64,
}

/// ad-tag / VAST / SSAI 入口共用的完整竞价流程：
/// 目录解析 → 构建 → 扇出 → 清算 → 通知。
pub async fn run_ad_auction(
    state: &AppState,
    ad_req: &AdRequest,
) -> Result<AuctionOutcome, SspError> {
    let started = Instant::now();
    let snapshot = state.catalog.snapshot();
    let (placement, site, publisher) = snapshot.resolve_placement(&ad_req.placement_id)?;
    let bid_request = state.builder.build(ad_req, placement, site, publisher)?;

    state
        .analytics
        .record(TelemetryRecord::AdRequest(AdRequestRecord {
            request_id: bid_request.id.clone(),
            placement_id: placement.id.clone(),
            site_id: site.id.clone(),
            publisher_id: publisher.id.clone(),
            timestamp: Utc::now(),
            url: ad_req.page_url.clone(),
            referer: ad_req.referer.clone(),
            user_agent: ad_req.user_agent.clone(),
            ip: ad_req.ip.clone(),
            width: ad_req.width.or(placement.width),
            height: ad_req.height.or(placement.height),
            ad_type: format!("{:?}", placement.ad_type).to_lowercase(),
            bid_floor: placement.floor,
        }))
        .await;

    let deal = ad_req.deal_id.as_ref().map(|deal_id| DealConstraint {
        deal_id: deal_id.clone(),
        deal_floor: placement.floor.max(ad_req.floor.unwrap_or(0.0)),
        context: DealContext {
            size: size_of(ad_req.width.or(placement.width), ad_req.height.or(placement.height)),
            device_class: ad_req.device_class(),
            geo_country: ad_req.geo_country.clone(),
        },
    });
    let deal_record = ad_req.deal_id.as_deref().and_then(|id| snapshot.deal(id));

    let result = dispatch_and_clear(
        state,
        &bid_request,
        placement,
        deal.as_ref(),
        deal_record,
        started,
        Some((site.id.as_str(), publisher.id.as_str())),
    )
    .await?;

    let publisher_revenue = result.cleared_price * publisher.rev_share;
    fire_win_notices(state, &result);

    info!(
        request_id = %bid_request.id,
        winner = %result.winner.partner_name,
        price = result.cleared_price,
        pub_revenue = publisher_revenue,
        duration_ms = started.elapsed().as_millis() as u64,
        "Auction complete"
    );

    Ok(AuctionOutcome {
        bid_request,
        result,
        publisher_revenue,
    })
}

/// OpenRTB 直连入口：请求已是规范形状，只做目录关联后进扇出。
/// tagid 能在目录中解析就用真实广告位，否则按请求自带的底价合成。
pub async fn run_openrtb_auction(
    state: &AppState,
    bid_request: &BidRequest,
) -> Result<AuctionOutcome, SspError> {
    let started = Instant::now();
    let imp = bid_request
        .imp
        .first()
        .ok_or_else(|| SspError::BadRequest("bid request has no impressions".to_string()))?;
    let snapshot = state.catalog.snapshot();

    let resolved = imp
        .tagid
        .as_deref()
        .and_then(|tagid| snapshot.resolve_placement(tagid).ok());
    let (placement, catalog_refs, rev_share) = match &resolved {
        Some((placement, site, publisher)) => (
            (*placement).clone(),
            Some((site.id.as_str(), publisher.id.as_str())),
            publisher.rev_share,
        ),
        None => {
            // SSAI 等无 placement 的请求按 site.publisher 归集分成
            let rev_share = bid_request
                .site
                .as_ref()
                .and_then(|s| s.publisher.as_ref())
                .and_then(|p| p.id.as_deref())
                .and_then(|id| snapshot.publisher(id))
                .map(|p| p.rev_share)
                .unwrap_or(0.0);
            (synthetic_placement(state, bid_request), None, rev_share)
        }
    };

    let deal = imp.pmp.as_ref().and_then(|pmp| {
        pmp.deals.as_ref().and_then(|deals| deals.first()).map(|d| DealConstraint {
            deal_id: d.id.clone(),
            deal_floor: d
                .bidfloor
                .unwrap_or_else(|| imp.bidfloor.unwrap_or(placement.floor)),
            context: openrtb_deal_context(bid_request),
        })
    });
    let deal_record = deal
        .as_ref()
        .and_then(|constraint| snapshot.deal(&constraint.deal_id));

    let result = dispatch_and_clear(
        state,
        bid_request,
        &placement,
        deal.as_ref(),
        deal_record,
        started,
        catalog_refs,
    )
    .await?;

    let publisher_revenue = result.cleared_price * rev_share;
    fire_win_notices(state, &result);

    Ok(AuctionOutcome {
        bid_request: bid_request.clone(),
        result,
        publisher_revenue,
    })
}

/// 扇出 + 清算 + 出价遥测，两个入口共用
async fn dispatch_and_clear(
    state: &AppState,
    bid_request: &BidRequest,
    placement: &Placement,
    deal: Option<&DealConstraint>,
    deal_record: Option<&Deal>,
    started: Instant,
    catalog_refs: Option<(&str, &str)>,
) -> Result<AuctionResult, SspError> {
    let partners = state.partners.active_partners();
    if partners.is_empty() {
        debug!(request_id = %bid_request.id, "No active demand partners");
        return Err(SspError::NoBid);
    }

    let tmax = Duration::from_millis(bid_request.tmax.unwrap_or(state.settings.tmax_ms));
    let calls = state
        .dispatcher
        .dispatch(bid_request, partners, tmax, started)
        .await;
    log_partner_failures(&bid_request.id, &calls);

    let auction_type = bid_request.at.unwrap_or(2);
    let result = state
        .engine
        .run_auction(&calls, placement, deal, deal_record, auction_type, Utc::now());

    record_bids(state, bid_request, placement, &calls, result.as_ref(), catalog_refs).await;

    result.ok_or(SspError::NoBid)
}

/// nurl 在竞价关闭时立刻发出；burl 暂存，等曝光像素到达再发
fn fire_win_notices(state: &AppState, result: &AuctionResult) {
    let winner = &result.winner;
    if let Some(nurl) = &winner.bid.nurl {
        notice::fire_notice(&state.http, nurl, result.cleared_price);
    }
    if let Some(burl) = &winner.bid.burl {
        state
            .notices
            .register(&winner.bid.id, burl, result.cleared_price, winner.bid.exp);
    }
}

fn log_partner_failures(request_id: &str, calls: &[PartnerCall]) {
    for call in calls {
        match &call.outcome {
            PartnerOutcome::Error(e) => debug!(
                request_id = %request_id,
                partner = %call.partner.partner.id,
                elapsed_ms = call.elapsed_ms as u64,
                error = %e,
                "Partner bid request failed"
            ),
            PartnerOutcome::Timeout => debug!(
                request_id = %request_id,
                partner = %call.partner.partner.id,
                elapsed_ms = call.elapsed_ms as u64,
                "Partner bid request timed out"
            ),
            _ => {}
        }
    }
}

async fn record_bids(
    state: &AppState,
    bid_request: &BidRequest,
    placement: &Placement,
    calls: &[PartnerCall],
    result: Option<&AuctionResult>,
    catalog_refs: Option<(&str, &str)>,
) {
    let (site_id, publisher_id) = catalog_refs.unwrap_or(("", ""));
    // bid id 只在 partner 内唯一，获胜判定要连 partner 一起比
    let (winner_key, cleared_price) = match result {
        Some(r) => (
            Some((r.winner.partner_id.as_str(), r.winner.bid.id.as_str())),
            r.cleared_price,
        ),
        None => (None, 0.0),
    };
    for call in calls {
        let PartnerOutcome::Bid(response) = &call.outcome else {
            continue;
        };
        for seatbid in &response.seatbid {
            for bid in &seatbid.bid {
                let won =
                    winner_key == Some((call.partner.partner.id.as_str(), bid.id.as_str()));
                state
                    .analytics
                    .record(TelemetryRecord::Bid(BidRecord {
                        bid_id: bid.id.clone(),
                        request_id: bid_request.id.clone(),
                        imp_id: bid.impid.clone(),
                        placement_id: placement.id.clone(),
                        site_id: site_id.to_string(),
                        publisher_id: publisher_id.to_string(),
                        partner_id: call.partner.partner.id.clone(),
                        partner_name: call.partner.partner.name.clone(),
                        price: bid.price,
                        currency: "USD".to_string(),
                        adomain: bid.adomain.clone(),
                        timestamp: Utc::now(),
                        won,
                        cleared_price: if won { cleared_price } else { 0.0 },
                    }))
                    .await;
            }
        }
    }
}

fn size_of(w: Option<i32>, h: Option<i32>) -> Option<Format> {
    match (w, h) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Some(Format { w, h }),
        _ => None,
    }
}

/// tagid 不在目录中的 OpenRTB 请求按请求自带的底价合成广告位
fn synthetic_placement(state: &AppState, bid_request: &BidRequest) -> Placement {
    let imp = &bid_request.imp[0];
    let ad_type = if imp.video.is_some() {
        crate::model::catalog::AdType::Video
    } else if imp.audio.is_some() {
        crate::model::catalog::AdType::Audio
    } else if imp.native.is_some() {
        crate::model::catalog::AdType::Native
    } else {
        crate::model::catalog::AdType::Banner
    };
    Placement {
        id: imp.tagid.clone().unwrap_or_else(|| "openrtb".to_string()),
        site_id: String::new(),
        name: "openrtb".to_string(),
        ad_type,
        width: imp.banner.as_ref().and_then(|b| b.w),
        height: imp.banner.as_ref().and_then(|b| b.h),
        floor: imp.bidfloor.unwrap_or(state.settings.auction_floor),
        formats: None,
        video: None,
        bcat: bid_request.bcat.clone(),
        badv: bid_request.badv.clone(),
        active: true,
    }
}

fn openrtb_deal_context(bid_request: &BidRequest) -> DealContext {
    let imp = &bid_request.imp[0];
    let size = imp
        .banner
        .as_ref()
        .and_then(|b| size_of(b.w, b.h))
        .or_else(|| imp.video.as_ref().and_then(|v| size_of(v.w, v.h)));
    let device = bid_request.device.as_ref();
    DealContext {
        size,
        device_class: device.and_then(|d| d.devicetype).map(|t| {
            match t {
                3 | 6 | 7 => "ctv",
                1 | 4 => "mobile",
                _ => "desktop",
            }
            .to_string()
        }),
        geo_country: device
            .and_then(|d| d.geo.as_ref())
            .and_then(|g| g.country.clone()),
    }
}
