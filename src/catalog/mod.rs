// src/catalog/mod.rs

use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::SspError;
use crate::model::catalog::{Deal, Placement, Publisher, Site};

/// 目录数据源适配器。外部存储负责持久化，这里只消费只读快照。
pub trait CatalogAdapter: Send + Sync {
    fn load(&self) -> Result<CatalogDocument, SspError>;
}

/// 外部存储物化出的目录文档
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct CatalogDocument {
    #[serde(default)]
    pub publishers: Vec<Publisher>,
    #[serde(default)]
    pub sites: Vec<Site>,
    #[serde(default)]
    pub placements: Vec<Placement>,
    #[serde(default)]
    pub deals: Vec<Deal>,
}

/// 从文件系统读取目录文档（DATABASE_URL 指向的路径）
pub struct FileCatalogAdapter {
    path: String,
}

impl FileCatalogAdapter {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.trim_start_matches("file://").to_string(),
        }
    }
}

impl CatalogAdapter for FileCatalogAdapter {
    fn load(&self) -> Result<CatalogDocument, SspError> {
        let content = fs::read_to_string(&self.path)
            .map_err(|e| SspError::Internal(format!("read catalog {}: {}", self.path, e)))?;
        serde_json::from_str(&content)
            .map_err(|e| SspError::Internal(format!("parse catalog {}: {}", self.path, e)))
    }
}

/// 目录的不可变快照，热路径上的读取全部落在这里。
#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    publishers: HashMap<String, Publisher>,
    sites: HashMap<String, Site>,
    placements: HashMap<String, Placement>,
    deals: HashMap<String, Deal>,
}

impl CatalogSnapshot {
    fn from_document(doc: CatalogDocument) -> Self {
        let mut snapshot = CatalogSnapshot::default();
        for publisher in doc.publishers {
            snapshot.publishers.insert(publisher.id.clone(), publisher);
        }
        for site in doc.sites {
            snapshot.sites.insert(site.id.clone(), site);
        }
        for placement in doc.placements {
            // 不满足目录不变量的广告位直接丢弃，不让坏记录进竞价
            if let Err(e) = placement.validate() {
                warn!(placement = %placement.id, error = %e, "Dropping invalid placement");
                continue;
            }
            snapshot.placements.insert(placement.id.clone(), placement);
        }
        for deal in doc.deals {
            snapshot.deals.insert(deal.id.clone(), deal);
        }
        snapshot
    }

    pub fn publisher(&self, id: &str) -> Option<&Publisher> {
        self.publishers.get(id)
    }

    pub fn site(&self, id: &str) -> Option<&Site> {
        self.sites.get(id)
    }

    pub fn placement(&self, id: &str) -> Option<&Placement> {
        self.placements.get(id)
    }

    pub fn deal(&self, id: &str) -> Option<&Deal> {
        self.deals.get(id)
    }

    pub fn publishers(&self) -> impl Iterator<Item = &Publisher> {
        self.publishers.values()
    }

    /// 广告请求的读通路径：placement → site → publisher，三者都必须 active。
    pub fn resolve_placement(
        &self,
        placement_id: &str,
    ) -> Result<(&Placement, &Site, &Publisher), SspError> {
        let placement = self
            .placement(placement_id)
            .filter(|p| p.active)
            .ok_or_else(|| SspError::NotFound(format!("placement {}", placement_id)))?;
        let site = self
            .site(&placement.site_id)
            .filter(|s| s.active)
            .ok_or_else(|| SspError::NotFound(format!("site {}", placement.site_id)))?;
        let publisher = self
            .publisher(&site.publisher_id)
            .filter(|p| p.active)
            .ok_or_else(|| SspError::NotFound(format!("publisher {}", site.publisher_id)))?;
        Ok((placement, site, publisher))
    }
}

/// 目录缓存。后台任务整体换入新快照（read-copy-update），
/// 读方拿到的要么是旧快照要么是新快照，不会读到撕裂状态。
pub struct Catalog {
    adapter: Box<dyn CatalogAdapter>,
    snapshot: RwLock<Arc<CatalogSnapshot>>,
}

impl Catalog {
    /// 初次加载。失败向上传播——目录不可用是致命的启动错误。
    pub fn load(adapter: Box<dyn CatalogAdapter>) -> Result<Arc<Self>, SspError> {
        let doc = adapter.load()?;
        let snapshot = Arc::new(CatalogSnapshot::from_document(doc));
        info!(
            publishers = snapshot.publishers.len(),
            sites = snapshot.sites.len(),
            placements = snapshot.placements.len(),
            deals = snapshot.deals.len(),
            "Catalog loaded"
        );
        Ok(Arc::new(Self {
            adapter,
            snapshot: RwLock::new(snapshot),
        }))
    }

    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.snapshot.read().unwrap().clone()
    }

    /// 重新加载并换入快照。刷新失败只告警，继续用旧快照。
    pub fn refresh(&self) {
        match self.adapter.load() {
            Ok(doc) => {
                let fresh = Arc::new(CatalogSnapshot::from_document(doc));
                *self.snapshot.write().unwrap() = fresh;
            }
            Err(e) => warn!(error = %e, "Catalog refresh failed, keeping previous snapshot"),
        }
    }

    /// 启动后台刷新任务
    pub fn spawn_refresher(self: &Arc<Self>, interval_secs: u64) {
        let catalog = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            interval.tick().await; // 首次 tick 立即返回，跳过
            loop {
                interval.tick().await;
                catalog.refresh();
            }
        });
    }
}
