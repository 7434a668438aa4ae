// src/sellers/mod.rs

use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogSnapshot;
use crate::error::SspError;

/// IAB sellers.json v1.0 文档
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SellersJson {
    pub contact_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_address: Option<String>,
    pub version: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub identifiers: Vec<Identifier>,
    pub sellers: Vec<Seller>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Seller {
    pub seller_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub seller_type: String, // "PUBLISHER" | "INTERMEDIARY" | "BOTH"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_confidential: Option<i32>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Identifier {
    pub name: String, // 如 "TAG-ID"
    pub value: String,
}

/// 把目录中的 active 发布者投影为 sellers.json。
pub struct SellersJsonProjector {
    contact_email: String,
    contact_address: Option<String>,
    identifiers: Vec<Identifier>,
    cache: RwLock<Option<CachedDoc>>,
    ttl: Duration,
}

struct CachedDoc {
    body: String,
    generated_at: Instant,
}

impl SellersJsonProjector {
    pub fn new(contact_email: &str, contact_address: &str, ttl_secs: u64) -> Self {
        Self {
            contact_email: contact_email.to_string(),
            contact_address: if contact_address.is_empty() {
                None
            } else {
                Some(contact_address.to_string())
            },
            identifiers: Vec::new(),
            cache: RwLock::new(None),
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    pub fn add_identifier(&mut self, name: &str, value: &str) {
        self.identifiers.push(Identifier {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    /// 生成文档：inactive 发布者不出现；域名为空的发布者标记 is_confidential=1。
    pub fn project(&self, snapshot: &CatalogSnapshot) -> SellersJson {
        let mut sellers: Vec<Seller> = snapshot
            .publishers()
            .filter(|p| p.active)
            .map(|p| Seller {
                seller_id: p.id.clone(),
                name: Some(p.name.clone()),
                domain: if p.domain.is_empty() {
                    None
                } else {
                    Some(p.domain.clone())
                },
                seller_type: "PUBLISHER".to_string(),
                is_confidential: if p.domain.is_empty() { Some(1) } else { None },
            })
            .collect();
        sellers.sort_by(|a, b| a.seller_id.cmp(&b.seller_id));

        SellersJson {
            contact_email: self.contact_email.clone(),
            contact_address: self.contact_address.clone(),
            version: "1.0".to_string(),
            identifiers: self.identifiers.clone(),
            sellers,
        }
    }

    /// 带 TTL 缓存的序列化文档
    pub fn document(&self, snapshot: &CatalogSnapshot) -> Result<String, SspError> {
        if let Some(cached) = self.cache.read().unwrap().as_ref() {
            if cached.generated_at.elapsed() < self.ttl {
                return Ok(cached.body.clone());
            }
        }

        let body = serde_json::to_string_pretty(&self.project(snapshot))
            .map_err(|e| SspError::Internal(format!("serialize sellers.json: {}", e)))?;
        *self.cache.write().unwrap() = Some(CachedDoc {
            body: body.clone(),
            generated_at: Instant::now(),
        });
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CatalogAdapter, CatalogDocument};
    use crate::model::catalog::Publisher;

    struct StaticAdapter(CatalogDocument);

    impl CatalogAdapter for StaticAdapter {
        fn load(&self) -> Result<CatalogDocument, SspError> {
            Ok(self.0.clone())
        }
    }

    fn publisher(id: &str, domain: &str, active: bool) -> Publisher {
        Publisher {
            id: id.to_string(),
            name: format!("Publisher {}", id),
            email: "pub@example.com".to_string(),
            domain: domain.to_string(),
            active,
            rev_share: 0.7,
            created_at: None,
            updated_at: None,
        }
    }

    fn snapshot(publishers: Vec<Publisher>) -> std::sync::Arc<CatalogSnapshot> {
        let doc = CatalogDocument {
            publishers,
            ..Default::default()
        };
        Catalog::load(Box::new(StaticAdapter(doc))).unwrap().snapshot()
    }

    #[test]
    fn inactive_publishers_are_omitted() {
        let snapshot = snapshot(vec![
            publisher("pub-1", "one.example.com", true),
            publisher("pub-2", "two.example.com", false),
        ]);
        let projector = SellersJsonProjector::new("ads@ssp-rs.example", "", 300);
        let doc = projector.project(&snapshot);
        assert_eq!(doc.sellers.len(), 1);
        assert_eq!(doc.sellers[0].seller_id, "pub-1");
        assert_eq!(doc.sellers[0].seller_type, "PUBLISHER");
        assert_eq!(doc.sellers[0].is_confidential, None);
    }

    #[test]
    fn empty_domain_is_confidential() {
        let snapshot = snapshot(vec![publisher("pub-1", "", true)]);
        let projector = SellersJsonProjector::new("ads@ssp-rs.example", "", 300);
        let doc = projector.project(&snapshot);
        assert_eq!(doc.sellers[0].is_confidential, Some(1));
        assert_eq!(doc.sellers[0].domain, None);
    }

    #[test]
    fn document_is_cached_within_ttl() {
        let first = snapshot(vec![publisher("pub-1", "one.example.com", true)]);
        let projector = SellersJsonProjector::new("ads@ssp-rs.example", "", 300);
        let body = projector.document(&first).unwrap();

        // TTL 内换了快照也还是旧文档
        let second = snapshot(vec![publisher("pub-2", "two.example.com", true)]);
        assert_eq!(projector.document(&second).unwrap(), body);
        assert!(body.contains("pub-1"));
    }
}
