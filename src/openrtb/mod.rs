pub mod request;
pub mod response;

#[cfg(test)]
mod tests {
    use super::request::*;
    use super::response::{Bid, BidResponse, SeatBid};
    use serde_json::Map;

    fn canonical_request() -> BidRequest {
        let mut source_ext = Map::new();
        source_ext.insert(
            "schain".to_string(),
            serde_json::json!({
                "complete": 1,
                "ver": "1.0",
                "nodes": [{"asi": "ssp-rs.example", "sid": "pub-1", "hp": 0}]
            }),
        );
        BidRequest {
            id: "req-1".to_string(),
            imp: vec![Imp {
                id: "imp-1".to_string(),
                banner: Some(Banner {
                    format: Some(vec![Format { w: 300, h: 250 }]),
                    w: Some(300),
                    h: Some(250),
                    pos: Some(1),
                }),
                pmp: Some(Pmp {
                    private_auction: Some(1),
                    deals: Some(vec![PmpDeal {
                        id: "PMP-2024-001".to_string(),
                        bidfloor: Some(1.0),
                        bidfloorcur: Some("USD".to_string()),
                        at: Some(2),
                        wseat: Some(vec!["seat-1".to_string()]),
                        wadomain: Some(vec!["adv.example".to_string()]),
                    }]),
                }),
                tagid: Some("pl-1".to_string()),
                bidfloor: Some(0.5),
                bidfloorcur: Some("USD".to_string()),
                secure: Some(1),
                ..Default::default()
            }],
            site: Some(Site {
                id: Some("site-1".to_string()),
                domain: Some("site.example".to_string()),
                page: Some("https://site.example/p".to_string()),
                publisher: Some(SitePublisher {
                    id: Some("pub-1".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            device: Some(Device {
                ua: Some("Mozilla/5.0".to_string()),
                ip: Some("203.0.113.1".to_string()),
                ifa: Some("ifa-1".to_string()),
                devicetype: Some(3),
                geo: Some(Geo {
                    country: Some("USA".to_string()),
                }),
            }),
            user: Some(User {
                id: Some("u-1".to_string()),
            }),
            at: Some(2),
            tmax: Some(120),
            cur: Some(vec!["USD".to_string()]),
            bcat: Some(vec!["IAB25".to_string()]),
            badv: Some(vec!["blocked.example".to_string()]),
            source: Some(Source {
                fd: Some(1),
                tid: Some("tid-1".to_string()),
                ext: Some(source_ext),
            }),
            regs: Some(Regs {
                coppa: Some(0),
                gdpr: Some(1),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn request_round_trips_bit_exact() {
        let request = canonical_request();
        let json = serde_json::to_string(&request).unwrap();
        let parsed: BidRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn wire_names_match_openrtb() {
        let value = serde_json::to_value(canonical_request()).unwrap();
        assert_eq!(value["imp"][0]["tagid"], "pl-1");
        assert_eq!(value["imp"][0]["pmp"]["private_auction"], 1);
        assert_eq!(value["imp"][0]["pmp"]["deals"][0]["wadomain"][0], "adv.example");
        assert_eq!(value["site"]["publisher"]["id"], "pub-1");
        assert_eq!(value["source"]["ext"]["schain"]["nodes"][0]["asi"], "ssp-rs.example");
        // 未设置的字段不得以 null 形式上桥
        assert!(value.get("app").is_none());
        assert!(value["imp"][0].get("video").is_none());
    }

    #[test]
    fn response_round_trips() {
        let response = BidResponse {
            id: "req-1".to_string(),
            seatbid: vec![SeatBid {
                bid: vec![Bid {
                    id: "bid-1".to_string(),
                    impid: "imp-1".to_string(),
                    price: 2.5,
                    adid: Some("ad-1".to_string()),
                    nurl: Some("https://dsp.example/win?p=${AUCTION_PRICE}".to_string()),
                    burl: Some("https://dsp.example/bill?p=${AUCTION_PRICE}".to_string()),
                    adm: Some("<div>ad</div>".to_string()),
                    adomain: Some(vec!["adv.example".to_string()]),
                    cid: Some("c-1".to_string()),
                    crid: Some("cr-1".to_string()),
                    dealid: Some("PMP-2024-001".to_string()),
                    w: Some(300),
                    h: Some(250),
                    exp: Some(300),
                    ..Default::default()
                }],
                seat: Some("seat-1".to_string()),
                group: Some(0),
            }],
            bidid: Some("bb-1".to_string()),
            cur: Some("USD".to_string()),
            nbr: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        let parsed: BidResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, response);

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["seatbid"][0]["bid"][0]["impid"], "imp-1");
        assert_eq!(value["seatbid"][0]["bid"][0]["dealid"], "PMP-2024-001");
    }
}
