//! 运行统计

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::outcome::Outcome;

/// 一次运行（或一个站点）的统计结果，序列化后写到 `STATS:` 行
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total: usize,
    /// 2xx/3xx 的数量，包含 `cache_generated`
    pub success: usize,
    pub cache_generated: usize,
    pub failed: usize,
    pub execution_time_seconds: f64,
}

impl Statistics {
    /// 合并另一份统计（用于跨站点累计）
    pub fn merge(&mut self, other: &Statistics) {
        self.total += other.total;
        self.success += other.success;
        self.cache_generated += other.cache_generated;
        self.failed += other.failed;
        self.execution_time_seconds += other.execution_time_seconds;
    }
}

/// 并发安全的统计累加器
///
/// worker 池模式下多个 worker 同时写入，计数器全部使用原子操作
#[derive(Debug)]
pub struct StatsCollector {
    total: usize,
    success: AtomicUsize,
    cache_generated: AtomicUsize,
    failed: AtomicUsize,
    started: Instant,
}

impl StatsCollector {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            success: AtomicUsize::new(0),
            cache_generated: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            started: Instant::now(),
        }
    }

    /// 计入一条访问结果
    pub fn record(&self, outcome: &Outcome) {
        if outcome.status.is_success() {
            self.success.fetch_add(1, Ordering::Relaxed);
            if outcome.cache_generated {
                self.cache_generated.fetch_add(1, Ordering::Relaxed);
            }
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// 把未访问的记录计为失败（浏览器无法启动时剩余的 URL）
    pub fn record_skipped(&self, count: usize) {
        self.failed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Statistics {
        let secs = self.started.elapsed().as_secs_f64();
        Statistics {
            total: self.total,
            success: self.success.load(Ordering::Relaxed),
            cache_generated: self.cache_generated.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            execution_time_seconds: (secs * 100.0).round() / 100.0,
        }
    }
}

/// 单个站点的处理摘要
#[derive(Debug, Clone, PartialEq)]
pub struct SiteSummary {
    pub site: String,
    /// sitemap 中解析出的 URL 数（已排除）
    pub discovered: usize,
    /// 排序截断后实际预热的 URL 数
    pub selected: usize,
    pub statistics: Option<Statistics>,
}

/// RunCoordinator 的运行结果
#[derive(Debug, Clone, PartialEq)]
pub enum RunReport {
    /// 已有未过期的 lock，本次什么都没做
    Skipped { lock_age_hours: f64 },
    /// 正常完成（包括中途出错后释放 lock 的情况）
    Completed {
        statistics: Statistics,
        sites: Vec<SiteSummary>,
    },
}

impl RunReport {
    pub fn statistics(&self) -> Option<&Statistics> {
        match self {
            RunReport::Skipped { .. } => None,
            RunReport::Completed { statistics, .. } => Some(statistics),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_record_counts_each_status() {
        let collector = StatsCollector::new(4);
        collector.record(&Outcome::success("https://a.test/1", true));
        collector.record(&Outcome::success("https://a.test/2", false));
        collector.record(&Outcome::http_error("https://a.test/3", 404));
        collector.record(&Outcome::network_error("https://a.test/4"));

        let stats = collector.snapshot();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.success, 2);
        assert_eq!(stats.cache_generated, 1);
        assert_eq!(stats.failed, 2);
    }

    #[test]
    fn test_concurrent_records_are_not_lost() {
        let collector = Arc::new(StatsCollector::new(800));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let collector = collector.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        collector.record(&Outcome::success(format!("https://a.test/{}", i), i % 2 == 0));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let stats = collector.snapshot();
        assert_eq!(stats.success, 800);
        assert_eq!(stats.cache_generated, 400);
        assert_eq!(stats.failed, 0);
    }

    #[test]
    fn test_stats_json_field_names() {
        let stats = Statistics {
            total: 2,
            success: 1,
            cache_generated: 1,
            failed: 1,
            execution_time_seconds: 1.5,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["cacheGenerated"], 1);
        assert_eq!(json["executionTimeSeconds"], 1.5);
    }

    #[test]
    fn test_merge() {
        let mut total = Statistics::default();
        total.merge(&Statistics {
            total: 3,
            success: 2,
            cache_generated: 1,
            failed: 1,
            execution_time_seconds: 1.0,
        });
        total.merge(&Statistics {
            total: 1,
            success: 1,
            cache_generated: 0,
            failed: 0,
            execution_time_seconds: 0.5,
        });
        assert_eq!(total.total, 4);
        assert_eq!(total.success, 3);
        assert_eq!(total.failed, 1);
        assert_eq!(total.execution_time_seconds, 1.5);
    }
}
