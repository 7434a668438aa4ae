// src/bidding/dispatcher.rs

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use reqwest::Client;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::model::partner::PartnerHandle;
use crate::openrtb::request::BidRequest;
use crate::openrtb::response::BidResponse;

use super::transport::{transport_for, Decoded};

/// partner 单次询价的终态，一步到达，竞价内不重试
#[derive(Debug)]
pub enum PartnerOutcome {
    Bid(BidResponse),
    NoBid,
    Error(String),
    Timeout,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// 全局 tmax 剩余额度已耗尽
    DeadlineExhausted,
    /// partner 的 QPS 配额本秒已用完
    QpsExhausted,
}

pub struct PartnerCall {
    pub partner: Arc<PartnerHandle>,
    pub outcome: PartnerOutcome,
    pub elapsed_ms: u128,
}

/// 并发扇出 dispatcher。
///
/// 每个 partner 的有效截止时间取 min(partner.timeout, tmax 剩余额度)，
/// 因此整轮收集必然在 tmax 内关闭；结果不保证任何顺序，
/// 竞价引擎对到达顺序不敏感。
pub struct Dispatcher {
    client: Client,
    ssp_id: String,
}

impl Dispatcher {
    pub fn new(client: Client, ssp_id: &str) -> Self {
        Self {
            client,
            ssp_id: ssp_id.to_string(),
        }
    }

    pub async fn dispatch(
        &self,
        request: &BidRequest,
        partners: Vec<Arc<PartnerHandle>>,
        tmax: Duration,
        auction_start: Instant,
    ) -> Vec<PartnerCall> {
        let request = Arc::new(request.clone());
        let mut results = Vec::with_capacity(partners.len());
        let mut spawned = Vec::new();
        let mut guard = AbortOnDrop::default();

        for handle in partners {
            // 剩余额度 ≤ 0 直接跳过，不计为错误
            let remaining = tmax.saturating_sub(auction_start.elapsed());
            if remaining.is_zero() {
                debug!(partner = %handle.partner.id, "Skipping partner, auction deadline exhausted");
                results.push(PartnerCall {
                    partner: handle,
                    outcome: PartnerOutcome::Skipped(SkipReason::DeadlineExhausted),
                    elapsed_ms: 0,
                });
                continue;
            }
            if !handle.qps.try_acquire(handle.partner.qps) {
                debug!(partner = %handle.partner.id, "Skipping partner, QPS budget exhausted");
                results.push(PartnerCall {
                    partner: handle,
                    outcome: PartnerOutcome::Skipped(SkipReason::QpsExhausted),
                    elapsed_ms: 0,
                });
                continue;
            }

            let effective = remaining.min(Duration::from_millis(handle.partner.timeout_ms));
            let task = tokio::spawn(call_partner(
                self.client.clone(),
                self.ssp_id.clone(),
                Arc::clone(&handle),
                Arc::clone(&request),
                effective,
            ));
            guard.push(task.abort_handle());
            spawned.push((handle, task));
        }

        let (handles, tasks): (Vec<_>, Vec<_>) = spawned.into_iter().unzip();
        for (handle, joined) in handles.into_iter().zip(join_all(tasks).await) {
            match joined {
                Ok(call) => results.push(call),
                // 任务 panic 在此边界被降级为 partner-failure
                Err(e) => results.push(PartnerCall {
                    partner: handle,
                    outcome: PartnerOutcome::Error(format!("partner task failed: {}", e)),
                    elapsed_ms: auction_start.elapsed().as_millis(),
                }),
            }
        }
        guard.defuse();
        results
    }
}

async fn call_partner(
    client: Client,
    ssp_id: String,
    handle: Arc<PartnerHandle>,
    request: Arc<BidRequest>,
    effective: Duration,
) -> PartnerCall {
    let start = Instant::now();
    let transport = transport_for(&handle.partner, &ssp_id);

    let outcome = match transport.encode(&request) {
        Err(e) => PartnerOutcome::Error(e.to_string()),
        Ok(body) => {
            let send = async {
                let mut req = client.post(&handle.partner.endpoint).body(body);
                for (key, value) in transport.headers() {
                    req = req.header(key, value);
                }
                let resp = req.send().await?;
                let status = resp.status().as_u16();
                let bytes = resp.bytes().await?;
                Ok::<_, reqwest::Error>((status, bytes))
            };
            match tokio::time::timeout(effective, send).await {
                Err(_) => PartnerOutcome::Timeout,
                Ok(Err(e)) => PartnerOutcome::Error(format!("transport: {}", e)),
                Ok(Ok((status, bytes))) => match transport.decode(status, &bytes) {
                    Decoded::NoBid => PartnerOutcome::NoBid,
                    Decoded::Error(e) => PartnerOutcome::Error(e),
                    Decoded::Bid(response) => {
                        PartnerOutcome::Bid(transport.transform_response(response))
                    }
                },
            }
        }
    };

    PartnerCall {
        partner: handle,
        outcome,
        elapsed_ms: start.elapsed().as_millis(),
    }
}

/// 入口断连时 dispatcher future 被丢弃，这里把所有在途的
/// partner 任务一并中止；中止后返回的应答直接丢弃，不进竞价。
#[derive(Default)]
struct AbortOnDrop {
    handles: Vec<AbortHandle>,
    defused: bool,
}

impl AbortOnDrop {
    fn push(&mut self, handle: AbortHandle) {
        self.handles.push(handle);
    }

    fn defuse(&mut self) {
        self.defused = true;
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        if !self.defused {
            for handle in &self.handles {
                handle.abort();
            }
        }
    }
}
