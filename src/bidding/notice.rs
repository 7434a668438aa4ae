// src/bidding/notice.rs

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::debug;

/// OpenRTB 竞价宏，清算后替换为实际清算价
pub const AUCTION_PRICE_MACRO: &str = "${AUCTION_PRICE}";

const DEFAULT_NOTICE_TTL_SECS: u64 = 300;

pub fn substitute_price(url: &str, price: f64) -> String {
    url.replace(AUCTION_PRICE_MACRO, &price.to_string())
}

/// 向获胜 partner 发出通知（nurl / burl），fire-and-forget。
/// 通知失败只记 debug，绝不影响入口响应。
pub fn fire_notice(client: &Client, url: &str, price: f64) {
    let url = substitute_price(url, price);
    let client = client.clone();
    tokio::spawn(async move {
        match client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => debug!(url = %url, status = %resp.status(), "Win notice rejected"),
            Err(e) => debug!(url = %url, error = %e, "Win notice failed"),
        }
    });
}

/// 等待曝光确认的计费通知
#[derive(Debug, Clone)]
pub struct PendingNotice {
    pub burl: String,
    pub price: f64,
    inserted_at: Instant,
    ttl: Duration,
}

impl PendingNotice {
    fn expired(&self) -> bool {
        self.inserted_at.elapsed() > self.ttl
    }
}

/// nurl 在竞价关闭时立即发出；burl 要等曝光像素被请求后再发，
/// 这里按 bid id 暂存到曝光到达或过期。
#[derive(Default)]
pub struct NoticeStore {
    pending: RwLock<HashMap<String, PendingNotice>>,
}

impl NoticeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, bid_id: &str, burl: &str, price: f64, exp_secs: Option<i32>) {
        let ttl = exp_secs
            .filter(|s| *s > 0)
            .map(|s| Duration::from_secs(s as u64))
            .unwrap_or(Duration::from_secs(DEFAULT_NOTICE_TTL_SECS));
        let mut pending = self.pending.write().unwrap();
        // 顺手清掉过期项，避免无曝光的出价堆积
        pending.retain(|_, notice| !notice.expired());
        pending.insert(
            bid_id.to_string(),
            PendingNotice {
                burl: burl.to_string(),
                price,
                inserted_at: Instant::now(),
                ttl,
            },
        );
    }

    /// 曝光到达时取走待发通知；不存在或已过期返回 None
    pub fn take(&self, bid_id: &str) -> Option<PendingNotice> {
        let notice = self.pending.write().unwrap().remove(bid_id)?;
        if notice.expired() {
            return None;
        }
        Some(notice)
    }

    pub fn len(&self) -> usize {
        self.pending.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.read().unwrap().is_empty()
    }
}
