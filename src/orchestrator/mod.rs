//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责整次运行的调度和统计，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `run_coordinator` - 运行协调器
//! - 获取 / 释放 lock 文件
//! - 遍历站点：sitemap 解析 → 排序截断 → 批次调度
//! - 汇总统计，输出 `STATS:` 行
//!
//! ### `batch_scheduler` - 批次调度器
//! - 按 `batch_size` 分批，每批一个浏览器
//! - 顺序执行或 worker 池执行
//! - 计入每个 URL 的结果
//!
//! ## 层次关系
//!
//! ```text
//! run_coordinator (处理 Vec<站点>)
//!     ↓
//! batch_scheduler (处理 Vec<UrlRecord>)
//!     ↓
//! workflow::SessionRunner (处理单个 URL)
//!     ↓
//! services / browser / infrastructure
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：run_coordinator 管站点和 lock，batch_scheduler 管浏览器生命周期
//! 2. **资源隔离**：只有编排层启动和关闭浏览器
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure

pub mod batch_scheduler;
pub mod run_coordinator;

// 重新导出主要类型
pub use batch_scheduler::BatchScheduler;
pub use run_coordinator::{sitemap_url_for, RunCoordinator};
