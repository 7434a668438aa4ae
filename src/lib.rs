// src/lib.rs

pub mod analytics;
pub mod api;
pub mod bidding;
pub mod catalog;
pub mod config;
pub mod error;
pub mod mock_partner;
pub mod model;
pub mod openrtb;
pub mod render;
pub mod schain;
pub mod sellers;

use std::sync::Arc;

use analytics::AnalyticsSink;
use bidding::builder::BidRequestBuilder;
use bidding::dispatcher::Dispatcher;
use bidding::engine::AuctionEngine;
use bidding::notice::NoticeStore;
use catalog::Catalog;
use config::Settings;
use model::partner::PartnerRegistry;
use sellers::SellersJsonProjector;

/// 显式依赖集合，随请求传入各 handler。
/// 除启动时解析的配置外，进程没有其它模块级状态。
pub struct AppState {
    pub settings: Settings,
    pub catalog: Arc<Catalog>,
    pub partners: PartnerRegistry,
    pub builder: BidRequestBuilder,
    pub dispatcher: Dispatcher,
    pub engine: AuctionEngine,
    pub notices: NoticeStore,
    pub analytics: Arc<AnalyticsSink>,
    pub sellers: SellersJsonProjector,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(
        settings: Settings,
        catalog: Arc<Catalog>,
        analytics: Arc<AnalyticsSink>,
    ) -> Arc<Self> {
        let http = reqwest::Client::new();
        let ssp_domain = host_of(&settings.ssp_endpoint);

        let partners = PartnerRegistry::with_partners(settings.partners.clone());
        let builder = BidRequestBuilder::new(
            &settings.ssp_id,
            &ssp_domain,
            settings.tmax_ms,
            settings.auction_floor,
        );
        let dispatcher = Dispatcher::new(http.clone(), &settings.ssp_id);
        let engine = AuctionEngine::new(settings.auction_floor);
        let sellers = SellersJsonProjector::new(
            &settings.sellers_contact_email,
            &settings.sellers_contact_address,
            settings.sellers_ttl_secs,
        );

        Arc::new(Self {
            settings,
            catalog,
            partners,
            builder,
            dispatcher,
            engine,
            notices: NoticeStore::new(),
            analytics,
            sellers,
            http,
        })
    }
}

/// 从公网地址里取出域名（供应链节点的 ASI）
fn host_of(endpoint: &str) -> String {
    endpoint
        .split("://")
        .last()
        .unwrap_or(endpoint)
        .split('/')
        .next()
        .unwrap_or("")
        .split(':')
        .next()
        .unwrap_or("")
        .to_string()
}
