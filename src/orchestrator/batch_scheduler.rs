//! 批次调度器 - 编排层
//!
//! ## 职责
//!
//! 1. **分批**：把排好序的 URL 按 `batch_size` 切成连续批次
//! 2. **资源回收**：每批启动一个新浏览器，批次结束后关闭，避免长时间运行的浏览器占用内存
//! 3. **执行模型**：批内顺序访问，或由 Semaphore 限制为最多 `max_concurrency` 个页面并发
//! 4. **统计**：每个 `Outcome` 立即计入原子计数器
//!
//! 单个 URL 的处理委托给 `SessionRunner`

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::browser::{BrowserLauncher, BrowserSession};
use crate::config::{Config, ExecutionMode};
use crate::error::BatchAborted;
use crate::models::{Outcome, Statistics, StatsCollector, UrlRecord};
use crate::utils::logging::{log_batch_complete, log_batch_start};
use crate::workflow::{SessionRunner, VisitCtx};

/// 批次调度器
pub struct BatchScheduler<L> {
    launcher: L,
    runner: SessionRunner,
    batch_size: usize,
    mode: ExecutionMode,
    max_concurrency: usize,
}

impl<L: BrowserLauncher> BatchScheduler<L> {
    pub fn new(launcher: L, config: &Config) -> Self {
        Self {
            launcher,
            runner: SessionRunner::new(config),
            batch_size: config.batch_size.max(1),
            mode: config.execution_mode,
            max_concurrency: config.max_concurrency.max(1),
        }
    }

    /// 预热所有记录并返回统计
    ///
    /// # 参数
    /// - `records`: 已排序截断的 URL 记录
    ///
    /// # 返回
    /// 返回本站点的统计；某个批次无法启动浏览器时返回 `BatchAborted`，
    /// 其中包含已完成批次的结果，剩余 URL 计为失败
    pub async fn run(&self, records: &[UrlRecord]) -> Result<Statistics, BatchAborted> {
        let total = records.len();
        let collector = StatsCollector::new(total);
        let total_batches = total.div_ceil(self.batch_size);

        for (batch_idx, batch) in records.chunks(self.batch_size).enumerate() {
            let batch_num = batch_idx + 1;
            let offset = batch_idx * self.batch_size;
            log_batch_start(batch_num, total_batches, offset + 1, offset + batch.len(), total);

            let session = match self.launcher.launch().await {
                Ok(session) => session,
                Err(source) => {
                    collector.record_skipped(total - offset);
                    return Err(BatchAborted {
                        batch: batch_num,
                        partial: collector.snapshot(),
                        source,
                    });
                }
            };
            let before = collector.snapshot();

            match self.mode {
                ExecutionMode::Sequential => {
                    self.run_sequential(&session, batch, batch_num, offset, total, &collector)
                        .await
                }
                ExecutionMode::WorkerPool => {
                    self.run_pool(&session, batch, batch_num, offset, total, &collector)
                        .await
                }
            }

            if let Err(e) = session.close().await {
                warn!("关闭浏览器失败: {}", e);
            }
            info!("浏览器已在批次 {} 结束后关闭", batch_num);

            let after = collector.snapshot();
            log_batch_complete(batch_num, after.success - before.success, batch.len());
        }

        Ok(collector.snapshot())
    }

    /// 批内逐个访问
    async fn run_sequential<S: BrowserSession>(
        &self,
        session: &S,
        batch: &[UrlRecord],
        batch_num: usize,
        offset: usize,
        total: usize,
        collector: &StatsCollector,
    ) {
        for (idx, record) in batch.iter().enumerate() {
            let ctx = VisitCtx::new(batch_num, offset + idx + 1, total);
            let outcome = self.runner.visit(session, record, &ctx).await;
            collector.record(&outcome);
        }
    }

    /// worker 池：Semaphore 限制同时打开的页面数，URL 按顺序获取许可
    async fn run_pool<S: BrowserSession>(
        &self,
        session: &S,
        batch: &[UrlRecord],
        batch_num: usize,
        offset: usize,
        total: usize,
        collector: &StatsCollector,
    ) {
        let semaphore = Semaphore::new(self.max_concurrency);
        let semaphore = &semaphore;
        let runner = &self.runner;

        let visits = batch.iter().enumerate().map(move |(idx, record)| async move {
            let ctx = VisitCtx::new(batch_num, offset + idx + 1, total);
            let outcome = match semaphore.acquire().await {
                Ok(_permit) => runner.visit(session, record, &ctx).await,
                // Semaphore 在本函数内不会被关闭
                Err(_) => Outcome::network_error(&record.url),
            };
            collector.record(&outcome);
        });

        // 所有 URL 完成后才返回
        join_all(visits).await;
    }
}
