//! 程序配置
//!
//! 配置的加载顺序：默认值 → TOML 文件（`CACHE_WARMER_CONFIG`）→ 环境变量覆盖 → 校验

use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::browser::ResourceKind;
use crate::error::ConfigError;

/// 指定 TOML 配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "CACHE_WARMER_CONFIG";

/// 批次内的执行模型
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// 每批一个浏览器，批内逐个访问
    #[default]
    Sequential,
    /// 每批一个共享浏览器，`max_concurrency` 个 worker 从共享队列取 URL
    WorkerPool,
}

impl ExecutionMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sequential" => Some(Self::Sequential),
            "worker_pool" | "pool" => Some(Self::WorkerPool),
            _ => None,
        }
    }
}

/// 两次访问之间的随机延迟区间（毫秒）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for DelayRange {
    fn default() -> Self {
        Self {
            min_ms: 500,
            max_ms: 2000,
        }
    }
}

/// 注入到页面的 Cookie（域名在访问时按目标 URL 设置）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieSpec {
    pub name: String,
    pub value: String,
}

impl CookieSpec {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// 追加到预热 URL 的查询参数
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParam {
    pub name: String,
    pub value: String,
}

impl QueryParam {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// 浏览器相关配置
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    /// 浏览器可执行文件，未设置时由 chromiumoxide 自动查找
    pub chrome_executable: Option<PathBuf>,
    /// 设置后连接到该调试端口上已运行的浏览器，而不是启动新的无头浏览器
    pub debug_port: Option<u16>,
    /// 启动参数
    pub extra_args: Vec<String>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            chrome_executable: None,
            debug_port: None,
            extra_args: vec![
                "--no-sandbox".to_string(),
                "--disable-setuid-sandbox".to_string(),
                "--disable-gpu".to_string(),
                "--disable-dev-shm-usage".to_string(),
            ],
        }
    }
}

/// 程序配置
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 待预热的站点根地址
    pub sites: Vec<String>,
    /// 批内执行模型
    pub execution_mode: ExecutionMode,
    /// worker 池模式下同时打开的页面数量
    pub max_concurrency: usize,
    /// 每批 URL 数量（每批重新启动一次浏览器）
    pub batch_size: usize,
    /// 每个站点最多预热的 URL 数量，0 表示不限制
    pub max_urls_per_site: usize,
    /// 页面导航超时（毫秒）
    pub page_timeout_ms: u64,
    /// sitemap 请求超时（毫秒）
    pub request_timeout_ms: u64,
    pub user_agent: String,
    pub delay: DelayRange,
    /// 优先匹配的 URL 子串，按顺序比较
    pub priority_patterns: Vec<String>,
    /// 排除的 URL 子串
    pub exclude_patterns: Vec<String>,
    pub cookies: Vec<CookieSpec>,
    pub query_params: Vec<QueryParam>,
    /// 在页面中执行的布尔表达式，为 true 时表示缓存已生成
    pub success_probe: String,
    /// URL 包含这些子串的请求会被拦截
    pub blocked_url_substrings: Vec<String>,
    /// 被拦截的资源类型
    pub blocked_resource_kinds: Vec<ResourceKind>,
    pub lock_file: PathBuf,
    /// lock 文件的过期时间（秒）
    pub lock_stale_after_secs: u64,
    pub log_dir: PathBuf,
    pub browser: BrowserOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sites: Vec::new(),
            execution_mode: ExecutionMode::Sequential,
            max_concurrency: 3,
            batch_size: 50,
            max_urls_per_site: 0,
            page_timeout_ms: 60_000,
            request_timeout_ms: 20_000,
            user_agent: "Mozilla/5.0 (compatible; CacheWarmer/1.0)".to_string(),
            delay: DelayRange::default(),
            priority_patterns: Vec::new(),
            exclude_patterns: [
                "/bitrix/", "/admin/", "/auth/", "/?login=", "/?logout=", "/ajax/", ".php",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
            cookies: default_cookies(),
            query_params: vec![QueryParam::new("clear_cache", "Y")],
            success_probe: DEFAULT_SUCCESS_PROBE.to_string(),
            blocked_url_substrings: [
                "yandex", "google", "vk.com", "facebook", "gstat", "ya.", "tag",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
            blocked_resource_kinds: vec![ResourceKind::Image, ResourceKind::Media, ResourceKind::Font],
            lock_file: PathBuf::from("/tmp/cache_warmer.lock"),
            lock_stale_after_secs: 3 * 60 * 60,
            log_dir: default_log_dir(),
            browser: BrowserOptions::default(),
        }
    }
}

/// 默认探针：组合缓存初始化后会把页面标记为已缓存
pub const DEFAULT_SUCCESS_PROBE: &str = "typeof window.BX !== 'undefined' \
    && typeof BX.getCacheFlag === 'function' \
    && BX.getCacheFlag() === true";

fn default_log_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join("logs").join("cache_warmer")
}

fn default_cookies() -> Vec<CookieSpec> {
    vec![
        CookieSpec::new("BITRIX_SM_GUEST_ID", random_hex_id(10)),
        CookieSpec::new(
            "BITRIX_SM_LAST_VISIT",
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        ),
    ]
}

/// 生成 `bytes` 个随机字节的十六进制字符串
pub fn random_hex_id(bytes: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..bytes).map(|_| format!("{:02x}", rng.gen::<u8>())).collect()
}

impl Config {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn lock_stale_after(&self) -> Duration {
        Duration::from_secs(self.lock_stale_after_secs)
    }

    /// 按默认值 → TOML 文件 → 环境变量的顺序加载并校验
    pub fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_toml_file(Path::new(&path))?,
            _ => Self::default(),
        };
        let config = base.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载，未出现的字段使用默认值
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::TomlParse { source, .. } => ConfigError::TomlParse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::TomlParse {
            path: String::new(),
            source,
        })
    }

    /// 用 `CACHE_WARMER_*` 环境变量覆盖标量字段
    pub fn apply_env_overrides(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(v) = lookup("CACHE_WARMER_SITES") {
            self.sites = split_list(&v);
        }
        if let Some(v) = lookup("CACHE_WARMER_EXECUTION_MODE") {
            self.execution_mode = ExecutionMode::parse(&v).ok_or_else(|| ConfigError::EnvVarParseFailed {
                var_name: "CACHE_WARMER_EXECUTION_MODE".to_string(),
                value: v.clone(),
                expected_type: "sequential | worker_pool".to_string(),
            })?;
        }
        if let Some(v) = lookup("CACHE_WARMER_MAX_CONCURRENCY") {
            self.max_concurrency = parse_var("CACHE_WARMER_MAX_CONCURRENCY", &v)?;
        }
        if let Some(v) = lookup("CACHE_WARMER_BATCH_SIZE") {
            self.batch_size = parse_var("CACHE_WARMER_BATCH_SIZE", &v)?;
        }
        if let Some(v) = lookup("CACHE_WARMER_MAX_URLS_PER_SITE") {
            self.max_urls_per_site = parse_var("CACHE_WARMER_MAX_URLS_PER_SITE", &v)?;
        }
        if let Some(v) = lookup("CACHE_WARMER_PAGE_TIMEOUT_MS") {
            self.page_timeout_ms = parse_var("CACHE_WARMER_PAGE_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("CACHE_WARMER_REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = parse_var("CACHE_WARMER_REQUEST_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("CACHE_WARMER_USER_AGENT") {
            self.user_agent = v;
        }
        if let Some(v) = lookup("CACHE_WARMER_DELAY_MIN_MS") {
            self.delay.min_ms = parse_var("CACHE_WARMER_DELAY_MIN_MS", &v)?;
        }
        if let Some(v) = lookup("CACHE_WARMER_DELAY_MAX_MS") {
            self.delay.max_ms = parse_var("CACHE_WARMER_DELAY_MAX_MS", &v)?;
        }
        if let Some(v) = lookup("CACHE_WARMER_PRIORITY_PATTERNS") {
            self.priority_patterns = split_list(&v);
        }
        if let Some(v) = lookup("CACHE_WARMER_LOCK_FILE") {
            self.lock_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("CACHE_WARMER_LOG_DIR") {
            self.log_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("CACHE_WARMER_BROWSER_DEBUG_PORT") {
            self.browser.debug_port = Some(parse_var("CACHE_WARMER_BROWSER_DEBUG_PORT", &v)?);
        }
        if let Some(v) = lookup("CACHE_WARMER_CHROME_EXECUTABLE") {
            self.browser.chrome_executable = Some(PathBuf::from(v));
        }
        Ok(self)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sites.is_empty() {
            return Err(ConfigError::Invalid {
                field: "sites".to_string(),
                reason: "至少需要一个站点".to_string(),
            });
        }
        for site in &self.sites {
            match url::Url::parse(site) {
                Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
                _ => {
                    return Err(ConfigError::Invalid {
                        field: "sites".to_string(),
                        reason: format!("不是合法的 http(s) 地址: {}", site),
                    })
                }
            }
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "batch_size".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "max_concurrency".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        if self.delay.min_ms > self.delay.max_ms {
            return Err(ConfigError::Invalid {
                field: "delay".to_string(),
                reason: format!("min_ms ({}) 大于 max_ms ({})", self.delay.min_ms, self.delay.max_ms),
            });
        }
        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_var<T: std::str::FromStr>(var_name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::EnvVarParseFailed {
        var_name: var_name.to_string(),
        value: value.to_string(),
        expected_type: std::any::type_name::<T>().to_string(),
    })
}
