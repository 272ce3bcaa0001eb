//! 基于 chromiumoxide 的浏览器实现

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, ErrorReason, EventResponseReceived, LoaderId, ResourceType,
    SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::{EventDomContentEventFired, NavigateParams};
use chromiumoxide::Browser;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{connect_to_browser, launch_headless_browser};
use super::{BrowserLauncher, BrowserSession, PageHandle, RequestPolicy, ResourceKind};
use crate::config::{BrowserOptions, Config, CookieSpec};
use crate::error::SessionError;
use crate::infrastructure::JsExecutor;

/// 每批启动一个无头 Chromium，或连接到已运行的浏览器
pub struct ChromiumLauncher {
    options: BrowserOptions,
    /// CDP 命令超时，`Page.navigate` 也受它约束，应与页面超时一致
    command_timeout: Duration,
}

impl ChromiumLauncher {
    pub fn new(options: BrowserOptions, command_timeout: Duration) -> Self {
        Self {
            options,
            command_timeout,
        }
    }

    /// 命令超时取页面超时，`request_timeout_ms` 只用于 sitemap 下载
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.browser.clone(), config.page_timeout())
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    type Session = ChromiumSession;

    async fn launch(&self) -> Result<ChromiumSession, SessionError> {
        match self.options.debug_port {
            Some(port) => {
                let (browser, handler) = connect_to_browser(port).await?;
                Ok(ChromiumSession {
                    browser,
                    handler,
                    attached: true,
                })
            }
            None => {
                let (browser, handler) =
                    launch_headless_browser(&self.options, self.command_timeout).await?;
                Ok(ChromiumSession {
                    browser,
                    handler,
                    attached: false,
                })
            }
        }
    }
}

/// 一个批次使用的浏览器
pub struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
    /// 连接模式：浏览器不归本进程所有，不关闭
    attached: bool,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    type Page = ChromiumPage;

    async fn new_page(&self) -> Result<ChromiumPage, SessionError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| SessionError::PageCreation(e.to_string()))?;
        Ok(ChromiumPage::new(JsExecutor::new(page)))
    }

    async fn close(mut self) -> Result<(), SessionError> {
        if self.attached {
            self.handler.abort();
            return Ok(());
        }

        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            warn!("等待浏览器进程退出失败: {}", e);
        }
        self.handler.abort();
        closed
            .map(|_| ())
            .map_err(|e| SessionError::Close(e.to_string()))
    }
}

/// 单个 Chromium 页面
pub struct ChromiumPage {
    executor: JsExecutor,
    interceptor: Mutex<Option<JoinHandle<()>>>,
}

impl ChromiumPage {
    fn new(executor: JsExecutor) -> Self {
        Self {
            executor,
            interceptor: Mutex::new(None),
        }
    }
}

#[async_trait]
impl PageHandle for ChromiumPage {
    async fn set_user_agent(&self, user_agent: &str) -> Result<(), SessionError> {
        self.executor
            .page()
            .execute(SetUserAgentOverrideParams::new(user_agent))
            .await?;
        Ok(())
    }

    async fn set_cookies(&self, cookies: &[CookieSpec], domain: &str) -> Result<(), SessionError> {
        let params = cookies
            .iter()
            .map(|c| {
                CookieParam::builder()
                    .name(c.name.as_str())
                    .value(c.value.as_str())
                    .domain(domain)
                    .path("/")
                    .build()
                    .map_err(SessionError::Configure)
            })
            .collect::<Result<Vec<_>, _>>()?;
        if params.is_empty() {
            return Ok(());
        }
        self.executor.page().set_cookies(params).await?;
        Ok(())
    }

    async fn enable_interception(&self, policy: &RequestPolicy) -> Result<(), SessionError> {
        let page = self.executor.page().clone();
        let mut paused = page.event_listener::<EventRequestPaused>().await?;
        page.execute(
            EnableParams::builder()
                .pattern(RequestPattern::builder().url_pattern("*").build())
                .build(),
        )
        .await?;

        let policy = policy.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let kind = resource_kind(&event.resource_type);
                let result = if policy.should_abort(kind, &event.request.url) {
                    page.execute(FailRequestParams::new(
                        event.request_id.clone(),
                        ErrorReason::BlockedByClient,
                    ))
                    .await
                    .map(|_| ())
                } else {
                    page.execute(ContinueRequestParams::new(event.request_id.clone()))
                        .await
                        .map(|_| ())
                };
                if let Err(e) = result {
                    debug!("处理被拦截的请求失败 {}: {}", event.request.url, e);
                }
            }
        });

        if let Some(previous) = self.interceptor.lock().await.replace(task) {
            previous.abort();
        }
        Ok(())
    }

    /// 发出 `Page.navigate`，等到主文档响应和 DOMContentLoaded 后返回状态码
    ///
    /// 不等待 `load`；超时由调用方控制
    async fn navigate(&self, url: &str) -> Result<u16, SessionError> {
        let page = self.executor.page();
        // 先订阅再导航，事件不会丢失
        let mut responses = page.event_listener::<EventResponseReceived>().await?;
        let mut dom_ready = page.event_listener::<EventDomContentEventFired>().await?;

        let navigated = page
            .execute(NavigateParams::new(url))
            .await
            .map_err(|e| SessionError::navigation(url, e))?;
        if let Some(error_text) = &navigated.result.error_text {
            return Err(SessionError::navigation(url, error_text));
        }
        let loader_id = navigated.result.loader_id.clone();

        let mut status = None;
        while let Some(event) = responses.next().await {
            if is_main_document(&event, loader_id.as_ref()) {
                status = u16::try_from(event.response.status).ok();
                break;
            }
        }
        let status = status.ok_or_else(|| SessionError::MissingResponse {
            url: url.to_string(),
        })?;

        if dom_ready.next().await.is_none() {
            return Err(SessionError::navigation(url, "DOMContentLoaded 之前页面已关闭"));
        }
        Ok(status)
    }

    async fn evaluate_probe(&self, expression: &str) -> Result<bool, SessionError> {
        self.executor.probe(expression).await
    }

    async fn close(self) -> Result<(), SessionError> {
        if let Some(task) = self.interceptor.into_inner() {
            task.abort();
        }
        self.executor
            .into_page()
            .close()
            .await
            .map_err(|e| SessionError::Close(e.to_string()))
    }
}

/// 本次导航的主文档响应；导航没有返回 loader id 时取第一个文档响应
fn is_main_document(event: &EventResponseReceived, loader_id: Option<&LoaderId>) -> bool {
    event.r#type == ResourceType::Document && loader_id.map_or(true, |id| *id == event.loader_id)
}

fn resource_kind(resource_type: &ResourceType) -> ResourceKind {
    match resource_type {
        ResourceType::Document => ResourceKind::Document,
        ResourceType::Stylesheet => ResourceKind::Stylesheet,
        ResourceType::Script => ResourceKind::Script,
        ResourceType::Image => ResourceKind::Image,
        ResourceType::Media => ResourceKind::Media,
        ResourceType::Font => ResourceKind::Font,
        ResourceType::Xhr => ResourceKind::Xhr,
        ResourceType::Fetch => ResourceKind::Fetch,
        _ => ResourceKind::Other,
    }
}
