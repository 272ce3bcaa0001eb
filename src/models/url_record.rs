//! sitemap 中的一条 URL 记录

use serde::{Deserialize, Serialize};

/// sitemap 未给出 `<priority>` 时的默认优先级
pub const DEFAULT_PRIORITY: f64 = 0.5;

/// 一条待预热的 URL
///
/// 由 sitemap 解析产生，之后只会被排序/截断，不会再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// 绝对地址（http/https）
    pub url: String,
    /// `<lastmod>` 原始文本
    pub last_modified: Option<String>,
    /// `<priority>`，范围 [0, 1]
    pub priority: f64,
}

impl UrlRecord {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            last_modified: None,
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = clamp_priority(priority);
        self
    }

    pub fn with_last_modified(mut self, last_modified: impl Into<String>) -> Self {
        self.last_modified = Some(last_modified.into());
        self
    }

    /// 解析 `<priority>` 文本；缺失或无法解析时取默认值，超出范围时截断到 [0, 1]
    pub fn parse_priority(raw: Option<&str>) -> f64 {
        raw.and_then(|s| s.trim().parse::<f64>().ok())
            .map(clamp_priority)
            .unwrap_or(DEFAULT_PRIORITY)
    }
}

fn clamp_priority(value: f64) -> f64 {
    if value.is_nan() {
        DEFAULT_PRIORITY
    } else {
        value.clamp(0.0, 1.0)
    }
}
