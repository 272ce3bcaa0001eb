//! 单个 URL 的访问结果

use std::fmt;

/// 访问状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitStatus {
    /// 2xx/3xx 且探针为 true
    Success,
    /// 2xx/3xx 但页面没有缓存标记
    SuccessNoCache,
    /// 非 2xx/3xx 响应
    HttpError(u16),
    /// 导航两次失败或其他未处理错误
    NetworkError,
}

impl VisitStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, VisitStatus::Success | VisitStatus::SuccessNoCache)
    }
}

impl fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisitStatus::Success => write!(f, "缓存已生成"),
            VisitStatus::SuccessNoCache => write!(f, "OK (无组合缓存)"),
            VisitStatus::HttpError(code) => write!(f, "状态 {}", code),
            VisitStatus::NetworkError => write!(f, "网络错误"),
        }
    }
}

/// 访问结果，由 SessionRunner 产生，BatchScheduler 立即计入统计
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// 原始 URL（不含缓存参数）
    pub url: String,
    pub status: VisitStatus,
    pub cache_generated: bool,
}

impl Outcome {
    pub fn success(url: impl Into<String>, cache_generated: bool) -> Self {
        Self {
            url: url.into(),
            status: if cache_generated {
                VisitStatus::Success
            } else {
                VisitStatus::SuccessNoCache
            },
            cache_generated,
        }
    }

    pub fn http_error(url: impl Into<String>, status: u16) -> Self {
        Self {
            url: url.into(),
            status: VisitStatus::HttpError(status),
            cache_generated: false,
        }
    }

    pub fn network_error(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: VisitStatus::NetworkError,
            cache_generated: false,
        }
    }
}
