// src/schain/mod.rs

use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::error::SspError;
use crate::openrtb::request::Source;

/// IAB SupplyChain 对象（ads.cert 1.0），挂在 `source.ext.schain`。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SupplyChain {
    pub complete: i32, // 1 = 完整链路, 0 = 不完整
    pub nodes: Vec<SupplyChainNode>,
    pub ver: String,
}

/// 供应链中的单个节点
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct SupplyChainNode {
    pub asi: String,               // Advertising System Identifier（域名）
    pub sid: String,               // Seller ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hp: Option<i32>,           // 1 = reseller, 0 = 直接关系
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rid: Option<String>,       // 请求 ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,      // 商业名称
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,    // 商业域名
}

impl SupplyChain {
    pub fn is_complete(&self) -> bool {
        self.complete == 1
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn has_resellers(&self) -> bool {
        self.nodes.iter().any(|n| n.hp == Some(1))
    }
}

/// 供应链构造器。每次构造与每次解析都要过一遍校验。
pub struct SupplyChainBuilder {
    asi: String,
    name: String,
    domain: String,
}

impl SupplyChainBuilder {
    pub fn new(asi: &str, name: &str, domain: &str) -> Self {
        Self {
            asi: asi.to_string(),
            name: name.to_string(),
            domain: domain.to_string(),
        }
    }

    fn our_node(&self, publisher_id: &str, publisher_domain: &str) -> SupplyChainNode {
        SupplyChainNode {
            asi: self.asi.clone(),
            sid: publisher_id.to_string(),
            hp: Some(0), // 与发布者是直接关系
            rid: None,
            name: Some(self.name.clone()),
            domain: if publisher_domain.is_empty() {
                Some(self.domain.clone())
            } else {
                Some(publisher_domain.to_string())
            },
        }
    }

    /// 直连发布者：单节点完整链路
    pub fn build_for_publisher(
        &self,
        publisher_id: &str,
        publisher_domain: &str,
    ) -> Result<SupplyChain, SspError> {
        if publisher_id.is_empty() {
            return Err(SspError::Internal("publisher id is required".to_string()));
        }
        let schain = SupplyChain {
            complete: 1,
            ver: "1.0".to_string(),
            nodes: vec![self.our_node(publisher_id, publisher_domain)],
        };
        validate(&schain)?;
        Ok(schain)
    }

    /// 经由中间方的链路：调用方提供前缀节点（逐个校验），我们的节点收尾。
    pub fn build_for_intermediary(
        &self,
        publisher_id: &str,
        publisher_domain: &str,
        intermediaries: Vec<SupplyChainNode>,
    ) -> Result<SupplyChain, SspError> {
        if publisher_id.is_empty() {
            return Err(SspError::Internal("publisher id is required".to_string()));
        }
        let mut nodes = intermediaries;
        nodes.push(self.our_node(publisher_id, publisher_domain));
        let schain = SupplyChain {
            complete: 1,
            ver: "1.0".to_string(),
            nodes,
        };
        validate(&schain)?;
        Ok(schain)
    }

    /// 发布者来源无法完整佐证时的降级链路
    pub fn build_incomplete(&self, publisher_id: &str) -> Result<SupplyChain, SspError> {
        if publisher_id.is_empty() {
            return Err(SspError::Internal("publisher id is required".to_string()));
        }
        let schain = SupplyChain {
            complete: 0,
            ver: "1.0".to_string(),
            nodes: vec![SupplyChainNode {
                asi: self.asi.clone(),
                sid: publisher_id.to_string(),
                hp: Some(0),
                ..Default::default()
            }],
        };
        validate(&schain)?;
        Ok(schain)
    }
}

/// 校验规则：ver 非空、至少一个节点、每个节点 asi/sid 非空、hp ∈ {0,1}。
pub fn validate(schain: &SupplyChain) -> Result<(), SspError> {
    if schain.ver.is_empty() {
        return Err(SspError::Internal("schain version is required".to_string()));
    }
    if schain.nodes.is_empty() {
        return Err(SspError::Internal(
            "schain must have at least one node".to_string(),
        ));
    }
    for (i, node) in schain.nodes.iter().enumerate() {
        if node.asi.is_empty() {
            return Err(SspError::Internal(format!("schain node {}: asi is required", i)));
        }
        if node.sid.is_empty() {
            return Err(SspError::Internal(format!("schain node {}: sid is required", i)));
        }
        if let Some(hp) = node.hp {
            if hp != 0 && hp != 1 {
                return Err(SspError::Internal(format!(
                    "schain node {}: hp must be 0 or 1, got {}",
                    i, hp
                )));
            }
        }
    }
    Ok(())
}

/// 把供应链嵌入 `source.ext.schain`，保留 ext 中已有的其它键。
pub fn attach_to_source(source: &mut Source, schain: &SupplyChain) -> Result<(), SspError> {
    validate(schain)?;
    let value = serde_json::to_value(schain)
        .map_err(|e| SspError::Internal(format!("serialize schain: {}", e)))?;
    let ext = source.ext.get_or_insert_with(Map::new);
    ext.insert("schain".to_string(), value);
    Ok(())
}

/// 从 `source.ext.schain` 解析供应链，解析结果同样要过校验。
pub fn extract_from_source(source: &Source) -> Result<SupplyChain, SspError> {
    let ext = source
        .ext
        .as_ref()
        .ok_or_else(|| SspError::Internal("no schain in source".to_string()))?;
    let value = ext
        .get("schain")
        .ok_or_else(|| SspError::Internal("no schain in source.ext".to_string()))?;
    let schain: SupplyChain = serde_json::from_value(value.clone())
        .map_err(|e| SspError::Internal(format!("parse schain: {}", e)))?;
    validate(&schain)?;
    Ok(schain)
}
