//! 运行协调器 - 编排层
//!
//! 状态：Idle → Locked → Idle。
//! 只有拿到 lock 之后才进入 Locked；已有未过期的 lock 时直接返回 `RunReport::Skipped`。
//! 对每个站点：sitemap → 排序截断 → 批次调度，最后输出一次 `STATS:` 行。
//! lock 由 guard 持有，正常结束、出错或 panic 都会删除且只删除一次。

use std::time::Instant;

use anyhow::Result;
use tracing::{error, info};

use crate::browser::BrowserLauncher;
use crate::config::Config;
use crate::error::AppError;
use crate::infrastructure::{LockStatus, RunLock, SitemapFetcher};
use crate::models::{RunReport, SiteSummary, Statistics};
use crate::orchestrator::batch_scheduler::BatchScheduler;
use crate::services::{SitemapResolver, UrlPrioritizer};
use crate::utils::logging::{log_site_summary, log_stats};

/// 站点根地址对应的 sitemap 地址
pub fn sitemap_url_for(site: &str) -> String {
    format!("{}/sitemap.xml", site.trim_end_matches('/'))
}

/// 运行协调器
pub struct RunCoordinator<F, L> {
    sites: Vec<String>,
    lock: RunLock,
    resolver: SitemapResolver<F>,
    prioritizer: UrlPrioritizer,
    scheduler: BatchScheduler<L>,
}

impl<F: SitemapFetcher, L: BrowserLauncher> RunCoordinator<F, L> {
    pub fn new(config: &Config, fetcher: F, launcher: L) -> Self {
        Self {
            sites: config.sites.clone(),
            lock: RunLock::new(config.lock_file.clone(), config.lock_stale_after()),
            resolver: SitemapResolver::new(fetcher, config.exclude_patterns.clone()),
            prioritizer: UrlPrioritizer::from_config(config),
            scheduler: BatchScheduler::new(launcher, config),
        }
    }

    /// 执行一次完整的预热
    ///
    /// 只有 lock 文件无法读写时返回错误
    pub async fn run(&self) -> Result<RunReport, AppError> {
        let guard = match self.lock.acquire()? {
            LockStatus::AlreadyHeld { age } => {
                return Ok(RunReport::Skipped {
                    lock_age_hours: age.as_secs_f64() / 3600.0,
                });
            }
            LockStatus::Acquired(guard) => guard,
        };

        let started = Instant::now();
        let mut statistics = Statistics::default();
        let mut sites = Vec::with_capacity(self.sites.len());

        if let Err(e) = self.warm_sites(&mut statistics, &mut sites).await {
            error!("预热过程中发生错误 - {:#}", e);
        }

        statistics.execution_time_seconds = (started.elapsed().as_secs_f64() * 100.0).round() / 100.0;
        log_stats(&statistics);

        if let Err(e) = guard.release() {
            error!("{}", e);
        }
        info!("预热完成");

        Ok(RunReport::Completed { statistics, sites })
    }

    async fn warm_sites(&self, statistics: &mut Statistics, sites: &mut Vec<SiteSummary>) -> Result<()> {
        for site in &self.sites {
            info!("解析站点: {}", site);
            let records = self.resolver.resolve(&sitemap_url_for(site)).await;
            let discovered = records.len();

            if records.is_empty() {
                info!("没有需要预热的 URL: {}", site);
                sites.push(SiteSummary {
                    site: site.clone(),
                    discovered,
                    selected: 0,
                    statistics: None,
                });
                continue;
            }

            let prioritized = self.prioritizer.prioritize(records);
            info!("选中 URL: {} / {}", prioritized.len(), discovered);

            match self.scheduler.run(&prioritized).await {
                Ok(site_stats) => {
                    record_site(site, discovered, prioritized.len(), site_stats, statistics, sites)
                }
                Err(aborted) => {
                    let partial = aborted.partial.clone();
                    record_site(site, discovered, prioritized.len(), partial, statistics, sites);
                    return Err(anyhow::Error::new(aborted).context(format!("站点 {} 预热中断", site)));
                }
            }
        }
        Ok(())
    }
}

/// 记录一个站点的结果并计入总统计
fn record_site(
    site: &str,
    discovered: usize,
    selected: usize,
    site_stats: Statistics,
    statistics: &mut Statistics,
    sites: &mut Vec<SiteSummary>,
) {
    statistics.merge(&site_stats);
    let summary = SiteSummary {
        site: site.to_string(),
        discovered,
        selected,
        statistics: Some(site_stats),
    };
    log_site_summary(&summary);
    sites.push(summary);
}
