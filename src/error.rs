use std::fmt;

use thiserror::Error;

use crate::models::Statistics;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// sitemap 获取或解析错误
    Sitemap(SitemapError),
    /// 浏览器会话错误
    Session(SessionError),
    /// lock 文件错误
    Lock(LockError),
    /// 配置错误
    Config(ConfigError),
    /// 启动失败（日志目录、lock 基础设施等），会终止进程
    Startup(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Sitemap(e) => write!(f, "sitemap错误: {}", e),
            AppError::Session(e) => write!(f, "浏览器错误: {}", e),
            AppError::Lock(e) => write!(f, "lock文件错误: {}", e),
            AppError::Config(e) => write!(f, "配置错误: {}", e),
            AppError::Startup(msg) => write!(f, "启动失败: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Sitemap(e) => Some(e),
            AppError::Session(e) => Some(e),
            AppError::Lock(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Startup(_) => None,
        }
    }
}

/// sitemap 相关错误
#[derive(Debug, Error)]
pub enum SitemapError {
    /// 请求失败或超时
    #[error("获取 {url} 失败: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// 服务器返回非 2xx 状态
    #[error("获取 {url} 返回状态 {status}")]
    HttpStatus { url: String, status: u16 },
    /// XML 格式错误
    #[error("解析 {url} 失败: {source}")]
    Parse {
        url: String,
        #[source]
        source: quick_xml::Error,
    },
}

/// 浏览器会话相关错误
#[derive(Debug, Error)]
pub enum SessionError {
    /// 启动或连接浏览器失败
    #[error("启动浏览器失败: {0}")]
    Launch(String),
    /// 创建页面失败
    #[error("创建页面失败: {0}")]
    PageCreation(String),
    /// 设置 UA / Cookie / 请求拦截失败
    #[error("配置页面失败: {0}")]
    Configure(String),
    /// 导航失败
    #[error("导航到 {url} 失败: {reason}")]
    Navigation { url: String, reason: String },
    /// 导航超时
    #[error("导航到 {url} 超时 ({timeout_ms}ms)")]
    NavigationTimeout { url: String, timeout_ms: u64 },
    /// 导航完成但没有拿到主文档响应
    #[error("导航到 {url} 没有返回响应")]
    MissingResponse { url: String },
    /// 页面内执行探针失败（按 false 处理，不算失败）
    #[error("执行探针失败: {0}")]
    Probe(String),
    /// 关闭页面或浏览器失败
    #[error("关闭失败: {0}")]
    Close(String),
}

/// 批次中途无法启动浏览器，预热提前结束
///
/// `partial` 包含已访问的结果，未访问的 URL 计为失败
#[derive(Debug, Error)]
#[error("批次 {batch} 无法启动浏览器: {source}")]
pub struct BatchAborted {
    pub batch: usize,
    pub partial: Statistics,
    #[source]
    pub source: SessionError,
}

/// lock 文件相关错误
#[derive(Debug, Error)]
pub enum LockError {
    #[error("读取 lock 文件 {path} 失败: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("写入 lock 文件 {path} 失败: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("删除 lock 文件 {path} 失败: {source}")]
    Remove {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 字段取值不合法
    #[error("配置项 {field} 不合法: {reason}")]
    Invalid { field: String, reason: String },
}

// ========== 从常见错误类型转换 ==========

impl From<SitemapError> for AppError {
    fn from(err: SitemapError) -> Self {
        AppError::Sitemap(err)
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Session(err)
    }
}

impl From<LockError> for AppError {
    fn from(err: LockError) -> Self {
        AppError::Lock(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<chromiumoxide::error::CdpError> for SessionError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        SessionError::Configure(err.to_string())
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建启动失败错误
    pub fn startup(msg: impl Into<String>) -> Self {
        AppError::Startup(msg.into())
    }

    /// 是否属于需要终止进程的启动错误
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Startup(_) | AppError::Config(_) | AppError::Lock(_))
    }
}

impl SessionError {
    /// 创建导航失败错误
    pub fn navigation(url: impl Into<String>, reason: impl fmt::Display) -> Self {
        SessionError::Navigation {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
