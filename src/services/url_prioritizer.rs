//! URL 排序服务 - 业务能力层
//!
//! 纯函数：按优先匹配规则和 `<priority>` 排序，并按站点上限截断

use std::cmp::Ordering;

use crate::config::Config;
use crate::models::UrlRecord;

/// URL 排序服务
#[derive(Debug, Clone, Default)]
pub struct UrlPrioritizer {
    priority_patterns: Vec<String>,
    max_per_site: usize,
}

impl UrlPrioritizer {
    pub fn new(priority_patterns: Vec<String>, max_per_site: usize) -> Self {
        Self {
            priority_patterns,
            max_per_site,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.priority_patterns.clone(), config.max_urls_per_site)
    }

    pub fn prioritize(&self, records: Vec<UrlRecord>) -> Vec<UrlRecord> {
        prioritize(records, &self.priority_patterns, self.max_per_site)
    }
}

/// 稳定排序：
/// 1. 依次比较每个优先规则，只有一方命中时命中方在前
/// 2. 规则无法区分时按 priority 降序
///
/// # 参数
/// - `records`: 站点的全部 URL 记录
/// - `priority_patterns`: 优先匹配的 URL 子串，越靠前越优先
/// - `max_per_site`: 大于 0 时截断到前 `max_per_site` 条
///
/// # 返回
/// 排好序的记录，相同优先级保持原有顺序
pub fn prioritize(
    mut records: Vec<UrlRecord>,
    priority_patterns: &[String],
    max_per_site: usize,
) -> Vec<UrlRecord> {
    records.sort_by(|a, b| compare(a, b, priority_patterns));
    if max_per_site > 0 {
        records.truncate(max_per_site);
    }
    records
}

fn compare(a: &UrlRecord, b: &UrlRecord, priority_patterns: &[String]) -> Ordering {
    for pattern in priority_patterns {
        match (a.url.contains(pattern.as_str()), b.url.contains(pattern.as_str())) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
    }
    b.priority.total_cmp(&a.priority)
}
