//! # Cache Warmer
//!
//! 通过无头浏览器访问站点 sitemap 中的页面，预先生成服务端组合缓存
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page、HTTP 客户端、lock 文件），只暴露能力
//! - `JsExecutor` - page owner，提供 eval() / probe() 能力
//! - `ReqwestFetcher` - 下载 sitemap
//! - `RunLock` - 防止多个实例同时运行
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `SitemapResolver` - 展开 sitemap / sitemapindex
//! - `UrlPrioritizer` - 按模式和 priority 排序并截断
//! - `add_cache_params` - 构造预热 URL
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个 URL"的完整处理流程
//! - `VisitCtx` - 上下文封装（批次 + 序号）
//! - `SessionRunner` - 配置页面 → 导航（重试一次）→ 探针 → 关闭
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/run_coordinator` - lock、站点遍历、汇总统计
//! - `orchestrator/batch_scheduler` - 分批，每批一个浏览器
//!
//! `browser/` 定义浏览器 trait 及其 chromiumoxide 实现，`utils/logging` 负责日志输出

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::{BrowserLauncher, BrowserSession, ChromiumLauncher, PageHandle};
pub use config::{Config, ExecutionMode};
pub use error::{AppError, AppResult};
pub use infrastructure::{ReqwestFetcher, RunLock, SitemapFetcher};
pub use models::{Outcome, RunReport, Statistics, UrlRecord, VisitStatus};
pub use orchestrator::{BatchScheduler, RunCoordinator};
pub use workflow::{SessionRunner, VisitCtx};
