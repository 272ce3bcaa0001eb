//! 测试用的浏览器与 sitemap 替身

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use cache_warmer::browser::{BrowserLauncher, BrowserSession, PageHandle, RequestPolicy};
use cache_warmer::config::{Config, CookieSpec, DelayRange};
use cache_warmer::error::{SessionError, SitemapError};
use cache_warmer::infrastructure::SitemapFetcher;

/// 探针的返回方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeBehavior {
    True,
    False,
    Error,
}

/// 所有替身共享的计数器和脚本
#[derive(Debug)]
pub struct FakeState {
    pub launches: AtomicUsize,
    pub sessions_closed: AtomicUsize,
    pub pages_opened: AtomicUsize,
    pub pages_closed: AtomicUsize,
    pub navigations: AtomicUsize,
    pub probes: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    /// 允许成功启动的浏览器数量，之后的启动全部失败
    launch_budget: AtomicUsize,
    /// 为 true 时导航直接 panic
    pub panic_on_navigate: AtomicBool,
    /// URL 片段 → 剩余的失败次数
    failures: Mutex<HashMap<String, usize>>,
    /// URL 片段 → 状态码，未命中时为 200
    statuses: Mutex<HashMap<String, u16>>,
    probe: Mutex<ProbeBehavior>,
    visited: Mutex<Vec<String>>,
    nav_delay: Duration,
}

impl FakeState {
    pub fn new() -> Arc<Self> {
        Self::with_nav_delay(Duration::ZERO)
    }

    pub fn with_nav_delay(nav_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            launches: AtomicUsize::new(0),
            sessions_closed: AtomicUsize::new(0),
            pages_opened: AtomicUsize::new(0),
            pages_closed: AtomicUsize::new(0),
            navigations: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            launch_budget: AtomicUsize::new(usize::MAX),
            panic_on_navigate: AtomicBool::new(false),
            failures: Mutex::new(HashMap::new()),
            statuses: Mutex::new(HashMap::new()),
            probe: Mutex::new(ProbeBehavior::True),
            visited: Mutex::new(Vec::new()),
            nav_delay,
        })
    }

    pub fn limit_launches(&self, budget: usize) {
        self.launch_budget.store(budget, Ordering::SeqCst);
    }

    pub fn fail_navigation(&self, fragment: &str, times: usize) {
        self.failures.lock().unwrap().insert(fragment.to_string(), times);
    }

    pub fn set_status(&self, fragment: &str, status: u16) {
        self.statuses.lock().unwrap().insert(fragment.to_string(), status);
    }

    pub fn set_probe(&self, behavior: ProbeBehavior) {
        *self.probe.lock().unwrap() = behavior;
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn take_failure(&self, url: &str) -> bool {
        let mut failures = self.failures.lock().unwrap();
        for (fragment, remaining) in failures.iter_mut() {
            if url.contains(fragment.as_str()) && *remaining > 0 {
                *remaining -= 1;
                return true;
            }
        }
        false
    }

    fn status_for(&self, url: &str) -> u16 {
        self.statuses
            .lock()
            .unwrap()
            .iter()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, status)| *status)
            .unwrap_or(200)
    }
}

pub struct FakeLauncher {
    pub state: Arc<FakeState>,
}

impl FakeLauncher {
    pub fn new(state: Arc<FakeState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    type Session = FakeSession;

    async fn launch(&self) -> Result<FakeSession, SessionError> {
        let budget = self.state.launch_budget.load(Ordering::SeqCst);
        if self.state.launches.load(Ordering::SeqCst) >= budget {
            return Err(SessionError::Launch("no browser".to_string()));
        }
        self.state.launches.fetch_add(1, Ordering::SeqCst);
        Ok(FakeSession {
            state: self.state.clone(),
        })
    }
}

pub struct FakeSession {
    state: Arc<FakeState>,
}

impl FakeSession {
    pub fn new(state: Arc<FakeState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    type Page = FakePage;

    async fn new_page(&self) -> Result<FakePage, SessionError> {
        self.state.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(FakePage {
            state: self.state.clone(),
        })
    }

    async fn close(self) -> Result<(), SessionError> {
        self.state.sessions_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakePage {
    state: Arc<FakeState>,
}

#[async_trait]
impl PageHandle for FakePage {
    async fn set_user_agent(&self, _user_agent: &str) -> Result<(), SessionError> {
        Ok(())
    }

    async fn set_cookies(&self, _cookies: &[CookieSpec], _domain: &str) -> Result<(), SessionError> {
        Ok(())
    }

    async fn enable_interception(&self, _policy: &RequestPolicy) -> Result<(), SessionError> {
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<u16, SessionError> {
        let state = &self.state;
        state.navigations.fetch_add(1, Ordering::SeqCst);
        if state.panic_on_navigate.load(Ordering::SeqCst) {
            panic!("renderer crashed");
        }
        state.visited.lock().unwrap().push(url.to_string());

        let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        state.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !state.nav_delay.is_zero() {
            tokio::time::sleep(state.nav_delay).await;
        }
        state.in_flight.fetch_sub(1, Ordering::SeqCst);

        if state.take_failure(url) {
            return Err(SessionError::navigation(url, "net::ERR_CONNECTION_RESET"));
        }
        Ok(state.status_for(url))
    }

    async fn evaluate_probe(&self, _expression: &str) -> Result<bool, SessionError> {
        self.state.probes.fetch_add(1, Ordering::SeqCst);
        match *self.state.probe.lock().unwrap() {
            ProbeBehavior::True => Ok(true),
            ProbeBehavior::False => Ok(false),
            ProbeBehavior::Error => Err(SessionError::Probe("BX is not defined".to_string())),
        }
    }

    async fn close(self) -> Result<(), SessionError> {
        self.state.pages_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// URL → 响应体的 sitemap 替身，未登记的 URL 返回 404
#[derive(Default)]
pub struct FakeFetcher {
    bodies: HashMap<String, String>,
    pub fetches: Arc<AtomicUsize>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: impl Into<String>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }
}

#[async_trait]
impl SitemapFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, SitemapError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.bodies
            .get(url)
            .map(|body| body.as_bytes().to_vec())
            .ok_or_else(|| SitemapError::HttpStatus {
                url: url.to_string(),
                status: 404,
            })
    }
}

/// `<urlset>` 文档
pub fn urlset(locs: &[&str]) -> String {
    let entries: String = locs
        .iter()
        .map(|loc| format!("<url><loc>{}</loc></url>", loc))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
        entries
    )
}

/// `<sitemapindex>` 文档
pub fn sitemap_index(locs: &[&str]) -> String {
    let entries: String = locs
        .iter()
        .map(|loc| format!("<sitemap><loc>{}</loc></sitemap>", loc))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</sitemapindex>"#,
        entries
    )
}

/// 无延迟、lock 文件位于 `dir` 的测试配置
pub fn test_config(dir: &Path) -> Config {
    Config {
        sites: vec!["https://shop.test".to_string()],
        delay: DelayRange { min_ms: 0, max_ms: 0 },
        page_timeout_ms: 2_000,
        lock_file: dir.join("warmer.lock"),
        log_dir: dir.join("logs"),
        ..Config::default()
    }
}
