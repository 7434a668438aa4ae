// src/bidding/engine.rs

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::model::catalog::{Deal, DealContext, Placement};
use crate::openrtb::response::Bid;

use super::dispatcher::{PartnerCall, PartnerOutcome};

/// 打上来源 partner 标记的出价
#[derive(Debug, Clone)]
pub struct TaggedBid {
    pub bid: Bid,
    pub partner_id: String,
    pub partner_name: String,
    pub seat: Option<String>,
}

/// 竞价结果
#[derive(Debug, Clone)]
pub struct AuctionResult {
    pub winner: TaggedBid,
    /// 全部被接纳的出价，按价格降序
    pub admitted: Vec<TaggedBid>,
    pub auction_type: i32, // 1 = 第一价格, 2 = 第二价格
    pub cleared_price: f64,
}

/// 请求侧的交易约束（由 builder 推导出的 deal 底价 + 定向上下文）
#[derive(Debug, Clone, Default)]
pub struct DealConstraint {
    pub deal_id: String,
    pub deal_floor: f64,
    pub context: DealContext,
}

/// 竞价引擎：展平 → 过滤 → 排序 → 清算。
pub struct AuctionEngine {
    global_floor: f64,
}

impl AuctionEngine {
    pub fn new(global_floor: f64) -> Self {
        Self { global_floor }
    }

    /// 对一轮扇出的结果跑竞价。
    ///
    /// 不变量：cleared_price ≥ 广告位底价 且 cleared_price ≤ winner.price。
    pub fn run_auction(
        &self,
        calls: &[PartnerCall],
        placement: &Placement,
        deal: Option<&DealConstraint>,
        deal_record: Option<&Deal>,
        auction_type: i32,
        now: DateTime<Utc>,
    ) -> Option<AuctionResult> {
        let floor = placement.floor.max(self.global_floor);

        // 请求带 dealid 时先判定交易本身是否可参与：
        // 目录中有记录就校验窗口与定向，没有记录则只按 dealid 匹配
        let deal_admissible = match (deal, deal_record) {
            (Some(constraint), Some(record)) => record.admissible(now, &constraint.context),
            _ => true,
        };

        let mut admitted: Vec<TaggedBid> = Vec::new();
        for call in calls {
            let PartnerOutcome::Bid(response) = &call.outcome else {
                continue;
            };
            for seatbid in &response.seatbid {
                for bid in &seatbid.bid {
                    if !self.admit(bid, placement, floor, deal, deal_admissible) {
                        continue;
                    }
                    admitted.push(TaggedBid {
                        bid: bid.clone(),
                        partner_id: call.partner.partner.id.clone(),
                        partner_name: call.partner.partner.name.clone(),
                        seat: seatbid.seat.clone(),
                    });
                }
            }
        }

        if admitted.is_empty() {
            return None;
        }

        // 价格降序；同价按 partner id 升序、再按 bid id 升序，保证确定性
        admitted.sort_by(|a, b| {
            b.bid
                .price
                .partial_cmp(&a.bid.price)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.partner_id.cmp(&b.partner_id))
                .then_with(|| a.bid.id.cmp(&b.bid.id))
        });

        let winner = admitted[0].clone();
        let cleared_price = match deal {
            // PMP：交易出价按出价清算，下限是交易底价
            // （接纳时已保证 price ≥ deal_floor ≥ 广告位底价）
            Some(constraint) => constraint.deal_floor.max(winner.bid.price),
            None => match auction_type {
                1 => winner.bid.price,
                _ => {
                    if admitted.len() >= 2 {
                        floor.max(admitted[1].bid.price)
                    } else {
                        // 第二价格拍卖里孤家寡人按底价清算
                        floor
                    }
                }
            },
        };

        debug!(
            winner = %winner.partner_id,
            bid = winner.bid.price,
            cleared = cleared_price,
            admitted = admitted.len(),
            "Auction cleared"
        );

        Some(AuctionResult {
            winner,
            admitted,
            auction_type,
            cleared_price,
        })
    }

    fn admit(
        &self,
        bid: &Bid,
        placement: &Placement,
        floor: f64,
        deal: Option<&DealConstraint>,
        deal_admissible: bool,
    ) -> bool {
        // 底价比较必须是包含式（≥），恰好踩线的出价要放进来
        if bid.price < floor {
            return false;
        }

        if let Some(constraint) = deal {
            if !deal_admissible {
                return false;
            }
            if bid.dealid.as_deref() != Some(constraint.deal_id.as_str()) {
                return false;
            }
            if bid.price < constraint.deal_floor {
                return false;
            }
        }

        // 广告位级屏蔽策略，缺省为空列表
        if let (Some(blocked), Some(cats)) = (&placement.bcat, &bid.cat) {
            if cats.iter().any(|c| blocked.contains(c)) {
                return false;
            }
        }
        if let (Some(blocked), Some(domains)) = (&placement.badv, &bid.adomain) {
            if domains.iter().any(|d| blocked.contains(d)) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::model::catalog::{AdType, DealStatus};
    use crate::model::partner::{Partner, PartnerHandle, TransportKind};
    use crate::openrtb::request::Format;
    use crate::openrtb::response::{BidResponse, SeatBid};
    use chrono::Duration;
    use proptest::prelude::*;

    fn placement(floor: f64) -> Placement {
        Placement {
            id: "pl-1".to_string(),
            site_id: "site-1".to_string(),
            name: "Test".to_string(),
            ad_type: AdType::Banner,
            width: Some(300),
            height: Some(250),
            floor,
            formats: None,
            video: None,
            bcat: None,
            badv: None,
            active: true,
        }
    }

    fn call(partner_id: &str, bids: Vec<Bid>) -> PartnerCall {
        let handle = PartnerHandle::new(Partner {
            id: partner_id.to_string(),
            name: partner_id.to_string(),
            transport: TransportKind::Openrtb,
            endpoint: format!("http://{}.local/bid", partner_id),
            api_key: None,
            timeout_ms: 100,
            qps: 0,
            rev_share: 0.2,
            active: true,
        });
        PartnerCall {
            partner: handle,
            outcome: PartnerOutcome::Bid(BidResponse {
                id: "resp".to_string(),
                seatbid: vec![SeatBid {
                    bid: bids,
                    seat: Some(partner_id.to_string()),
                    group: None,
                }],
                ..Default::default()
            }),
            elapsed_ms: 10,
        }
    }

    fn bid(id: &str, price: f64) -> Bid {
        Bid {
            id: id.to_string(),
            impid: "imp-1".to_string(),
            price,
            ..Default::default()
        }
    }

    fn engine() -> AuctionEngine {
        AuctionEngine::new(0.01)
    }

    #[test]
    fn bid_below_floor_is_rejected() {
        // 单 partner 出价 0.40，底价 0.50：零接纳
        let calls = vec![call("a", vec![bid("b1", 0.40)])];
        let result = engine().run_auction(&calls, &placement(0.50), None, None, 2, Utc::now());
        assert!(result.is_none());
    }

    #[test]
    fn bid_exactly_at_floor_is_admitted() {
        let calls = vec![call("a", vec![bid("b1", 0.50)])];
        let result = engine()
            .run_auction(&calls, &placement(0.50), None, None, 2, Utc::now())
            .unwrap();
        assert_eq!(result.admitted.len(), 1);
        assert_eq!(result.cleared_price, 0.50);
    }

    #[test]
    fn second_price_clearing_with_two_bids() {
        // A 出 2.00，B 出 1.50，底价 0.10 → A 胜，清算价 1.50
        let calls = vec![
            call("partner-a", vec![bid("b1", 2.00)]),
            call("partner-b", vec![bid("b2", 1.50)]),
        ];
        let result = engine()
            .run_auction(&calls, &placement(0.10), None, None, 2, Utc::now())
            .unwrap();
        assert_eq!(result.winner.partner_id, "partner-a");
        assert_eq!(result.cleared_price, 1.50);
        assert!(result.cleared_price <= result.winner.bid.price);
    }

    #[test]
    fn single_bid_clears_at_floor_in_second_price() {
        let calls = vec![call("a", vec![bid("b1", 1.00)])];
        let result = engine()
            .run_auction(&calls, &placement(0.10), None, None, 2, Utc::now())
            .unwrap();
        assert_eq!(result.cleared_price, 0.10);
    }

    #[test]
    fn first_price_clears_at_winner_price() {
        let calls = vec![
            call("a", vec![bid("b1", 2.00)]),
            call("b", vec![bid("b2", 1.50)]),
        ];
        let result = engine()
            .run_auction(&calls, &placement(0.10), None, None, 1, Utc::now())
            .unwrap();
        assert_eq!(result.cleared_price, 2.00);
    }

    #[test]
    fn tie_break_is_deterministic_by_partner_then_bid_id() {
        // 三家同价 1.00 → 按 partner id 升序取 a，同价清算 1.00
        let calls = vec![
            call("partner-c", vec![bid("b3", 1.00)]),
            call("partner-a", vec![bid("b1", 1.00)]),
            call("partner-b", vec![bid("b2", 1.00)]),
        ];
        let result = engine()
            .run_auction(&calls, &placement(0.10), None, None, 2, Utc::now())
            .unwrap();
        assert_eq!(result.winner.partner_id, "partner-a");
        assert_eq!(result.cleared_price, 1.00);

        // 同 partner 内再按 bid id 升序
        let calls = vec![call("partner-a", vec![bid("b9", 1.00), bid("b1", 1.00)])];
        let result = engine()
            .run_auction(&calls, &placement(0.10), None, None, 2, Utc::now())
            .unwrap();
        assert_eq!(result.winner.bid.id, "b1");
    }

    #[test]
    fn deal_routing_admits_only_matching_dealid() {
        let mut deal_bid = bid("b1", 3.00);
        deal_bid.dealid = Some("PMP-2024-001".to_string());
        let calls = vec![
            call("partner-a", vec![deal_bid]),
            call("partner-b", vec![bid("b2", 5.00)]), // 无 dealid，出价更高也不接纳
        ];
        let constraint = DealConstraint {
            deal_id: "PMP-2024-001".to_string(),
            deal_floor: 1.00,
            context: DealContext::default(),
        };
        let result = engine()
            .run_auction(
                &calls,
                &placement(0.10),
                Some(&constraint),
                None,
                2,
                Utc::now(),
            )
            .unwrap();
        assert_eq!(result.admitted.len(), 1);
        assert_eq!(result.winner.partner_id, "partner-a");
        // 唯一接纳的交易出价按出价清算
        assert_eq!(result.cleared_price, 3.00);
    }

    #[test]
    fn deal_targeting_must_match_every_axis() {
        let now = Utc::now();
        let record = Deal {
            id: "PMP-2024-001".to_string(),
            cpm: 5.0,
            currency: "USD".to_string(),
            impression_cap: None,
            start: now - Duration::hours(1),
            end: now + Duration::hours(1),
            sizes: Some(vec![Format { w: 1920, h: 1080 }]),
            devices: None,
            geos: None,
            status: DealStatus::Active,
        };
        let mut deal_bid = bid("b1", 3.00);
        deal_bid.dealid = Some("PMP-2024-001".to_string());
        let calls = vec![call("partner-a", vec![deal_bid])];

        let mismatched = DealConstraint {
            deal_id: "PMP-2024-001".to_string(),
            deal_floor: 1.00,
            context: DealContext {
                size: Some(Format { w: 300, h: 250 }),
                ..Default::default()
            },
        };
        assert!(engine()
            .run_auction(&calls, &placement(0.10), Some(&mismatched), Some(&record), 2, now)
            .is_none());

        let matched = DealConstraint {
            deal_id: "PMP-2024-001".to_string(),
            deal_floor: 1.00,
            context: DealContext {
                size: Some(Format { w: 1920, h: 1080 }),
                ..Default::default()
            },
        };
        assert!(engine()
            .run_auction(&calls, &placement(0.10), Some(&matched), Some(&record), 2, now)
            .is_some());
    }

    #[test]
    fn blocked_categories_and_domains_filter_bids() {
        let mut placement = placement(0.10);
        placement.bcat = Some(vec!["IAB25".to_string()]);
        placement.badv = Some(vec!["blocked.example".to_string()]);

        let mut bad_cat = bid("b1", 2.00);
        bad_cat.cat = Some(vec!["IAB25".to_string()]);
        let mut bad_adv = bid("b2", 2.00);
        bad_adv.adomain = Some(vec!["blocked.example".to_string()]);
        let clean = bid("b3", 1.00);

        let calls = vec![call("a", vec![bad_cat, bad_adv, clean])];
        let result = engine()
            .run_auction(&calls, &placement, None, None, 2, Utc::now())
            .unwrap();
        assert_eq!(result.admitted.len(), 1);
        assert_eq!(result.winner.bid.id, "b3");
    }

    #[test]
    fn non_bid_outcomes_are_ignored() {
        let handle = call("a", vec![]).partner;
        let calls = vec![
            PartnerCall {
                partner: Arc::clone(&handle),
                outcome: PartnerOutcome::NoBid,
                elapsed_ms: 5,
            },
            PartnerCall {
                partner: handle,
                outcome: PartnerOutcome::Timeout,
                elapsed_ms: 120,
            },
        ];
        assert!(engine()
            .run_auction(&calls, &placement(0.10), None, None, 2, Utc::now())
            .is_none());
    }

    proptest! {
        // cleared_price 总是夹在底价与获胜出价之间
        #[test]
        fn cleared_price_invariants(
            prices in proptest::collection::vec(0.0f64..10.0, 1..6),
            floor in 0.0f64..5.0,
        ) {
            let calls: Vec<PartnerCall> = prices
                .iter()
                .enumerate()
                .map(|(i, p)| call(&format!("partner-{}", i), vec![bid(&format!("b{}", i), *p)]))
                .collect();
            if let Some(result) =
                engine().run_auction(&calls, &placement(floor), None, None, 2, Utc::now())
            {
                let effective_floor = floor.max(0.01);
                prop_assert!(result.cleared_price >= effective_floor - 1e-9);
                prop_assert!(result.cleared_price <= result.winner.bid.price + 1e-9);
                for tagged in &result.admitted {
                    prop_assert!(tagged.bid.price >= effective_floor - 1e-9);
                }
            }
        }
    }
}
