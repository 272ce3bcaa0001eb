//! 请求拦截策略
//!
//! 纯函数式的策略值：`should_abort(kind, url)`，由页面实现对每个请求调用

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// 请求的资源类型（CDP ResourceType 的子集）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Document,
    Stylesheet,
    Script,
    Image,
    Media,
    Font,
    Xhr,
    Fetch,
    Other,
}

/// 拦截策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPolicy {
    blocked_kinds: Vec<ResourceKind>,
    blocked_url_substrings: Vec<String>,
}

impl RequestPolicy {
    pub fn new(blocked_kinds: Vec<ResourceKind>, blocked_url_substrings: Vec<String>) -> Self {
        Self {
            blocked_kinds,
            blocked_url_substrings,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.blocked_resource_kinds.clone(),
            config.blocked_url_substrings.clone(),
        )
    }

    /// 是否中止该请求
    pub fn should_abort(&self, kind: ResourceKind, request_url: &str) -> bool {
        self.blocked_kinds.contains(&kind)
            || self
                .blocked_url_substrings
                .iter()
                .any(|s| request_url.contains(s.as_str()))
    }
}
