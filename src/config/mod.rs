// src/config/mod.rs

use std::collections::BTreeMap;

use tracing::info;

use crate::model::partner::{Partner, TransportKind};

pub const DEFAULT_TMAX_MS: u64 = 120;
pub const DEFAULT_PARTNER_TIMEOUT_MS: u64 = 100;
pub const DEFAULT_PARTNER_QPS: u32 = 1000;

/// 启动时一次性解析的进程配置。
///
/// 除此之外进程不持有任何模块级可变状态，所有依赖通过 AppState 显式传递。
#[derive(Debug, Clone)]
pub struct Settings {
    /// 供应链节点中使用的 SSP 标识
    pub ssp_id: String,
    /// 生成 tracking URL 时使用的公网地址
    pub ssp_endpoint: String,
    pub port: u16,
    /// 目录数据源（外部存储物化出的目录文档路径）
    pub database_url: String,
    /// 遥测落盘目录
    pub analytics_url: String,
    pub analytics_enabled: bool,
    /// 全局兜底底价，压在广告位底价之下
    pub auction_floor: f64,
    /// 全局竞价截止时间（毫秒）
    pub tmax_ms: u64,
    pub catalog_refresh_secs: u64,
    pub sellers_contact_email: String,
    pub sellers_contact_address: String,
    pub sellers_ttl_secs: u64,
    pub partners: Vec<Partner>,
}

impl Settings {
    pub fn from_env(default_port: u16) -> Self {
        let vars: BTreeMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars, default_port)
    }

    /// 从给定的变量表解析配置（便于测试注入）
    pub fn from_vars(vars: &BTreeMap<String, String>, default_port: u16) -> Self {
        let get = |key: &str, default: &str| -> String {
            vars.get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .unwrap_or_else(|| default.to_string())
        };

        let port = get("PORT", &default_port.to_string())
            .parse()
            .unwrap_or(default_port);
        let partners = parse_partners(vars);

        Settings {
            ssp_id: get("SSP_ID", "ssp-rs"),
            ssp_endpoint: get("SSP_ENDPOINT", "http://localhost:8081"),
            port,
            database_url: get("DATABASE_URL", "static/catalog.json"),
            analytics_url: get("ANALYTICS_URL", "logs/analytics"),
            analytics_enabled: truthy(&get("ANALYTICS_ENABLED", "true")),
            auction_floor: get("AUCTION_FLOOR", "0.01").parse().unwrap_or(0.01),
            tmax_ms: get("AUCTION_TMAX_MS", "120").parse().unwrap_or(DEFAULT_TMAX_MS),
            catalog_refresh_secs: get("CATALOG_REFRESH_SECS", "30").parse().unwrap_or(30),
            sellers_contact_email: get("SELLERS_CONTACT_EMAIL", "ads@ssp-rs.example"),
            sellers_contact_address: get("SELLERS_CONTACT_ADDRESS", ""),
            sellers_ttl_secs: get("SELLERS_JSON_TTL_SECS", "300").parse().unwrap_or(300),
            partners,
        }
    }
}

/// 扫描 `<NAME>_ENDPOINT` 系列变量注册 partner。
///
/// 同前缀下识别 `_API_KEY`、`_REV_SHARE`、`_ENABLED`、`_TYPE`、
/// `_TIMEOUT_MS`、`_QPS`；`_ENABLED` 缺省时端点存在即视为启用。
fn parse_partners(vars: &BTreeMap<String, String>) -> Vec<Partner> {
    let mut partners = Vec::new();
    for (key, endpoint) in vars {
        let Some(prefix) = key.strip_suffix("_ENDPOINT") else {
            continue;
        };
        if prefix.is_empty() || prefix == "SSP" || endpoint.is_empty() {
            continue;
        }
        let sub = |suffix: &str| vars.get(&format!("{}_{}", prefix, suffix));

        let enabled = sub("ENABLED").map(|v| truthy(v)).unwrap_or(true);
        let transport = sub("TYPE")
            .and_then(|v| TransportKind::parse(v))
            .unwrap_or(TransportKind::Openrtb);
        let name = prefix.to_ascii_lowercase().replace('_', "-");

        let partner = Partner {
            id: name.clone(),
            name,
            transport,
            endpoint: endpoint.clone(),
            api_key: sub("API_KEY").filter(|v| !v.is_empty()).cloned(),
            timeout_ms: sub("TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PARTNER_TIMEOUT_MS),
            qps: sub("QPS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PARTNER_QPS),
            rev_share: sub("REV_SHARE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.30),
            active: enabled,
        };
        info!(
            partner = %partner.id,
            endpoint = %partner.endpoint,
            transport = ?partner.transport,
            enabled = partner.active,
            "Configuring demand partner"
        );
        partners.push(partner);
    }
    partners
}

fn truthy(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
