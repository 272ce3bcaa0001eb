//! 单个 URL 的预热流程 - 流程层
//!
//! 流程顺序：
//! 1. 构造带缓存参数的预热 URL
//! 2. 打开页面，设置 UA / Cookie / 请求拦截
//! 3. 导航（失败重试一次）
//! 4. 按状态码分类，2xx/3xx 时执行缓存探针
//! 5. 关闭页面，随机等待
//!
//! `visit` 永远返回 `Outcome`，任何错误（包括 panic）都转换为 `NetworkError`

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use rand::Rng;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::browser::{BrowserSession, PageHandle, RequestPolicy};
use crate::config::{Config, CookieSpec, DelayRange, QueryParam};
use crate::error::SessionError;
use crate::models::{Outcome, UrlRecord};
use crate::services::add_cache_params;
use crate::workflow::visit_ctx::VisitCtx;

/// 单个 URL 的预热流程
///
/// 不持有浏览器，页面来自调用方传入的 session
#[derive(Debug, Clone)]
pub struct SessionRunner {
    user_agent: String,
    cookies: Vec<CookieSpec>,
    query_params: Vec<QueryParam>,
    policy: RequestPolicy,
    success_probe: String,
    page_timeout: Duration,
    delay: DelayRange,
}

impl SessionRunner {
    pub fn new(config: &Config) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            cookies: config.cookies.clone(),
            query_params: config.query_params.clone(),
            policy: RequestPolicy::from_config(config),
            success_probe: config.success_probe.clone(),
            page_timeout: config.page_timeout(),
            delay: config.delay,
        }
    }

    /// 访问一个 URL，结束后按配置随机等待
    ///
    /// # 参数
    /// - `session`: 本批次的浏览器，页面在访问结束时关闭
    /// - `record`: 原始 URL 记录（不含缓存参数）
    /// - `ctx`: 日志上下文
    ///
    /// # 返回
    /// 访问结果；导航两次失败、超时或 panic 都记为 `NetworkError`
    pub async fn visit<S: BrowserSession>(
        &self,
        session: &S,
        record: &UrlRecord,
        ctx: &VisitCtx,
    ) -> Outcome {
        let outcome = self.visit_once(session, record, ctx).await;
        self.throttle().await;
        outcome
    }

    async fn visit_once<S: BrowserSession>(
        &self,
        session: &S,
        record: &UrlRecord,
        ctx: &VisitCtx,
    ) -> Outcome {
        let original_url = record.url.as_str();
        let warm_url = match add_cache_params(original_url, &self.query_params) {
            Ok(url) => url,
            Err(e) => {
                error!("{} 无法构造预热 URL: {} - {}", ctx, original_url, e);
                return Outcome::network_error(original_url);
            }
        };

        let page = match session.new_page().await {
            Ok(page) => page,
            Err(e) => {
                error!("{} 错误: {} - {}", ctx, original_url, e);
                return Outcome::network_error(original_url);
            }
        };

        let outcome = AssertUnwindSafe(self.drive(&page, &warm_url, original_url, ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                error!("{} 处理过程中发生 panic: {}", ctx, original_url);
                Outcome::network_error(original_url)
            });

        // 所有路径都关闭页面
        if let Err(e) = page.close().await {
            warn!("{} 关闭页面失败: {}", ctx, e);
        }

        outcome
    }

    async fn drive<P: PageHandle>(
        &self,
        page: &P,
        warm_url: &str,
        original_url: &str,
        ctx: &VisitCtx,
    ) -> Outcome {
        if let Err(e) = self.configure(page, warm_url).await {
            error!("{} 错误: {} - {}", ctx, original_url, e);
            return Outcome::network_error(original_url);
        }

        let status = match self.navigate_with_retry(page, warm_url, ctx).await {
            Ok(status) => status,
            Err(e) => {
                error!("{} 错误: {} - {}", ctx, original_url, e);
                return Outcome::network_error(original_url);
            }
        };

        if !(200..400).contains(&status) {
            let outcome = Outcome::http_error(original_url, status);
            error!("{} {}: {}", ctx, outcome.status, original_url);
            return outcome;
        }

        let cache_generated = match page.evaluate_probe(&self.success_probe).await {
            Ok(flag) => flag,
            Err(e) => {
                debug!("{} 探针执行失败，按未生成处理: {}", ctx, e);
                false
            }
        };

        let outcome = Outcome::success(original_url, cache_generated);
        info!("{} ✓ {}: {}", ctx, outcome.status, original_url);
        outcome
    }

    /// 设置 UA、Cookie（作用域为目标主机）和请求拦截
    async fn configure<P: PageHandle>(&self, page: &P, warm_url: &str) -> Result<(), SessionError> {
        page.set_user_agent(&self.user_agent).await?;

        let host = Url::parse(warm_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .ok_or_else(|| SessionError::Configure(format!("URL 没有主机名: {}", warm_url)))?;
        page.set_cookies(&self.cookies, &host).await?;

        page.enable_interception(&self.policy).await
    }

    /// 导航，失败时原样重试一次
    async fn navigate_with_retry<P: PageHandle>(
        &self,
        page: &P,
        url: &str,
        ctx: &VisitCtx,
    ) -> Result<u16, SessionError> {
        match self.navigate_once(page, url).await {
            Ok(status) => Ok(status),
            Err(e) => {
                info!("{} 重试: {} ({})", ctx, url, e);
                self.navigate_once(page, url).await
            }
        }
    }

    async fn navigate_once<P: PageHandle>(&self, page: &P, url: &str) -> Result<u16, SessionError> {
        match timeout(self.page_timeout, page.navigate(url)).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::NavigationTimeout {
                url: url.to_string(),
                timeout_ms: self.page_timeout.as_millis() as u64,
            }),
        }
    }

    async fn throttle(&self) {
        let ms = random_delay_ms(self.delay);
        if ms > 0 {
            sleep(Duration::from_millis(ms)).await;
        }
    }
}

/// 在 [min, max] 中均匀取一个毫秒数
fn random_delay_ms(delay: DelayRange) -> u64 {
    let (low, high) = if delay.min_ms <= delay.max_ms {
        (delay.min_ms, delay.max_ms)
    } else {
        (delay.max_ms, delay.min_ms)
    };
    if low == high {
        return low;
    }
    rand::thread_rng().gen_range(low..=high)
}
