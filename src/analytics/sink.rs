// src/analytics/sink.rs

use std::io::Write;
use std::sync::Arc;

use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task;
use tokio::time::{self, Duration};
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::fmt::MakeWriter;
use tracing::warn;

use super::records::TelemetryRecord;

/// 遥测汇。事件经 mpsc 队列交给后台任务批量落盘，
/// 入口任务在队列侧是单写者，append-only，失败只告警不回传。
pub struct AnalyticsSink {
    sender: Option<Sender<String>>,
}

impl AnalyticsSink {
    /// 禁用时的 no-op 汇
    pub fn disabled() -> Arc<Self> {
        Arc::new(Self { sender: None })
    }

    /// 打开指定目录下按日滚动的 JSON-lines 日志。
    /// 目录不可用时降级为 no-op（遥测不可用不是致命错误）。
    pub fn open(dir: &str, buffer_size: usize, batch_size: usize, flush_interval_ms: u64) -> Arc<Self> {
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!(dir = %dir, error = %e, "Analytics sink unavailable, falling back to no-op");
            return Self::disabled();
        }
        let appender = Arc::new(rolling::daily(dir, "events.jsonl"));
        let (sender, receiver) = mpsc::channel(buffer_size);
        tokio::spawn(Self::background_writer(
            appender,
            receiver,
            batch_size,
            flush_interval_ms,
        ));
        Arc::new(Self {
            sender: Some(sender),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// 追加一条遥测记录。队列满或已关闭只告警，绝不让请求失败。
    pub async fn record(&self, record: TelemetryRecord) {
        let Some(sender) = &self.sender else {
            return;
        };
        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to serialize telemetry record");
                return;
            }
        };
        if let Err(e) = sender.try_send(line) {
            warn!(error = %e, "Failed to enqueue telemetry record");
        }
    }

    async fn background_writer(
        appender: Arc<RollingFileAppender>,
        mut receiver: Receiver<String>,
        batch_size: usize,
        flush_interval_ms: u64,
    ) {
        let mut buffer: Vec<String> = Vec::new();
        let mut interval = time::interval(Duration::from_millis(flush_interval_ms.max(1)));
        loop {
            tokio::select! {
                received = receiver.recv() => {
                    match received {
                        Some(line) => {
                            buffer.push(line);
                            if buffer.len() >= batch_size {
                                Self::flush(appender.clone(), &mut buffer).await;
                            }
                        }
                        None => {
                            Self::flush(appender.clone(), &mut buffer).await;
                            break;
                        }
                    }
                }
                _ = interval.tick() => {
                    if !buffer.is_empty() {
                        Self::flush(appender.clone(), &mut buffer).await;
                    }
                }
            }
        }
    }

    async fn flush(appender: Arc<RollingFileAppender>, buffer: &mut Vec<String>) {
        if buffer.is_empty() {
            return;
        }
        let content = buffer.join("\n") + "\n";
        buffer.clear();
        let result = task::spawn_blocking(move || {
            let mut writer = appender.make_writer();
            writer.write_all(content.as_bytes())
        })
        .await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Failed to write telemetry batch"),
            Err(e) => warn!(error = %e, "Telemetry flush task failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::records::ClickRecord;
    use chrono::Utc;

    #[tokio::test]
    async fn disabled_sink_swallows_records() {
        let sink = AnalyticsSink::disabled();
        assert!(!sink.is_enabled());
        sink.record(TelemetryRecord::Click(ClickRecord {
            click_id: "c1".to_string(),
            bid_id: "b1".to_string(),
            timestamp: Utc::now(),
        }))
        .await;
    }

    #[tokio::test]
    async fn open_sink_writes_batches() {
        let dir = tempfile::tempdir().unwrap();
        let sink = AnalyticsSink::open(dir.path().to_str().unwrap(), 16, 1, 10);
        assert!(sink.is_enabled());
        sink.record(TelemetryRecord::Click(ClickRecord {
            click_id: "c1".to_string(),
            bid_id: "b1".to_string(),
            timestamp: Utc::now(),
        }))
        .await;
        // 等后台批量落盘
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut found = false;
        for entry in std::fs::read_dir(dir.path()).unwrap() {
            let content = std::fs::read_to_string(entry.unwrap().path()).unwrap();
            if content.contains(r#""type":"click""#) && content.contains(r#""bid_id":"b1""#) {
                found = true;
            }
        }
        assert!(found);
    }

    #[tokio::test]
    async fn unreachable_dir_degrades_to_noop() {
        let sink = AnalyticsSink::open("/proc/definitely-not-writable/analytics", 16, 1, 10);
        assert!(!sink.is_enabled());
    }
}
