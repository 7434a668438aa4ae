// src/model/partner.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// 需求方的出站传输通道类型
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    Openrtb,
    Whitelabel,
    LegacyAdx,
}

impl TransportKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openrtb" => Some(TransportKind::Openrtb),
            "whitelabel" => Some(TransportKind::Whitelabel),
            "legacy-adx" | "legacy_adx" => Some(TransportKind::LegacyAdx),
            _ => None,
        }
    }
}

/// 需求方（Demand Partner）配置
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Partner {
    pub id: String,
    pub name: String,
    pub transport: TransportKind,
    pub endpoint: String,          // 竞价 API 地址
    pub api_key: Option<String>,
    pub timeout_ms: u64,           // 单请求超时（毫秒）
    pub qps: u32,                  // QPS 上限，0 = 不限
    pub rev_share: f64,            // SSP 侧分成比例（0.0-1.0）
    pub active: bool,
}

/// 每秒滑动窗口的 QPS 计数器。
///
/// 计数允许竞争误差：超限时整轮竞价跳过该 partner（不计为错误），
/// 不会让竞价失败。
#[derive(Debug, Default)]
pub struct QpsGauge {
    epoch: AtomicU64,
    count: AtomicU32,
}

impl QpsGauge {
    pub fn try_acquire(&self, limit: u32) -> bool {
        if limit == 0 {
            return true;
        }
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let seen = self.epoch.load(Ordering::Relaxed);
        if seen != now
            && self
                .epoch
                .compare_exchange(seen, now, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
        {
            self.count.store(0, Ordering::Relaxed);
        }
        self.count.fetch_add(1, Ordering::Relaxed) < limit
    }
}

/// Partner 连同其运行态配额
#[derive(Debug)]
pub struct PartnerHandle {
    pub partner: Partner,
    pub qps: QpsGauge,
}

impl PartnerHandle {
    pub fn new(partner: Partner) -> Arc<Self> {
        Arc::new(Self {
            partner,
            qps: QpsGauge::default(),
        })
    }
}

/// Partner 注册表：竞价开始时一次性快照 active 列表，
/// 竞价过程中不感知成员变更。
#[derive(Debug, Default)]
pub struct PartnerRegistry {
    partners: HashMap<String, Arc<PartnerHandle>>,
}

impl PartnerRegistry {
    pub fn new() -> Self {
        Self {
            partners: HashMap::new(),
        }
    }

    pub fn with_partners(partners: Vec<Partner>) -> Self {
        let mut registry = Self::new();
        for partner in partners {
            registry.add_partner(partner);
        }
        registry
    }

    pub fn add_partner(&mut self, partner: Partner) {
        self.partners
            .insert(partner.id.clone(), PartnerHandle::new(partner));
    }

    pub fn get_partner(&self, id: &str) -> Option<&Arc<PartnerHandle>> {
        self.partners.get(id)
    }

    /// 当前 active 的 partner 快照
    pub fn active_partners(&self) -> Vec<Arc<PartnerHandle>> {
        let mut active: Vec<_> = self
            .partners
            .values()
            .filter(|h| h.partner.active)
            .cloned()
            .collect();
        // 快照排序与竞价结果无关，仅让日志与测试输出稳定
        active.sort_by(|a, b| a.partner.id.cmp(&b.partner.id));
        active
    }

    pub fn len(&self) -> usize {
        self.partners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }
}
