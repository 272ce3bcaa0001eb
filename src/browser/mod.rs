//! 浏览器能力边界
//!
//! 编排层只依赖这里的 trait：
//! - `BrowserLauncher` 每批启动（或连接）一个浏览器
//! - `BrowserSession` 在一个浏览器里打开页面，批次结束时关闭
//! - `PageHandle` 单个页面：UA / Cookie / 请求拦截 / 导航 / 探针
//!
//! `chromium` 子模块是基于 chromiumoxide 的实现

pub mod chromium;
pub mod connection;
pub mod headless;
pub mod policy;

pub use chromium::{ChromiumLauncher, ChromiumPage, ChromiumSession};
pub use connection::connect_to_browser;
pub use headless::launch_headless_browser;
pub use policy::{RequestPolicy, ResourceKind};

use async_trait::async_trait;

use crate::config::CookieSpec;
use crate::error::SessionError;

/// 浏览器启动器，每个批次调用一次 `launch`
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    type Session: BrowserSession;

    async fn launch(&self) -> Result<Self::Session, SessionError>;
}

/// 一个浏览器进程（或连接）的生命周期
#[async_trait]
pub trait BrowserSession: Send + Sync {
    type Page: PageHandle;

    /// 打开一个空白页面
    async fn new_page(&self) -> Result<Self::Page, SessionError>;

    /// 关闭浏览器，释放本批次积累的资源
    async fn close(self) -> Result<(), SessionError>;
}

/// 单个页面
#[async_trait]
pub trait PageHandle: Send + Sync {
    async fn set_user_agent(&self, user_agent: &str) -> Result<(), SessionError>;

    /// 设置 Cookie，作用域为 `domain`，路径为 `/`
    async fn set_cookies(&self, cookies: &[CookieSpec], domain: &str) -> Result<(), SessionError>;

    /// 开启请求拦截，之后每个请求按 `policy` 决定放行或中止
    async fn enable_interception(&self, policy: &RequestPolicy) -> Result<(), SessionError>;

    /// 导航到 `url`，返回主文档的 HTTP 状态码
    async fn navigate(&self, url: &str) -> Result<u16, SessionError>;

    /// 在页面上下文中执行布尔表达式
    async fn evaluate_probe(&self, expression: &str) -> Result<bool, SessionError>;

    async fn close(self) -> Result<(), SessionError>;
}
