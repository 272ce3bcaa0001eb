/// 日志工具模块
///
/// 日志同时写到标准输出和按天划分的日志文件，每行格式为 `[时间] 内容`，
/// 错误行带 `ERROR: ` 前缀，运行结束时输出一行 `STATS: {json}`
use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::SecondsFormat;
use tracing::{info, Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{SiteSummary, Statistics};

const DEFAULT_FILTER: &str = "cache_warmer=info,warn";

/// 行格式：`[2024-05-01T10:00:00.000Z] ERROR: 内容`
pub struct WarmerFormat;

impl<S, N> FormatEvent<S, N> for WarmerFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(writer, "[{}] ", timestamp())?;
        if *event.metadata().level() == Level::ERROR {
            write!(writer, "ERROR: ")?;
        }
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 当天的日志文件路径
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!(
        "cache_warming_{}.log",
        chrono::Utc::now().format("%Y-%m-%d")
    ))
}

/// 初始化日志
///
/// # 参数
/// - `log_dir`: 日志目录，不存在时创建
///
/// # 返回
/// 返回当天日志文件的路径；目录或文件无法创建时返回启动错误
pub fn init(log_dir: &Path) -> Result<PathBuf, AppError> {
    fs::create_dir_all(log_dir).map_err(|e| {
        AppError::startup(format!("无法创建日志目录 {}: {}", log_dir.display(), e))
    })?;

    let path = log_file_path(log_dir);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| AppError::startup(format!("无法打开日志文件 {}: {}", path.display(), e)))?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(WarmerFormat)
                .with_writer(std::io::stdout),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(WarmerFormat)
                .with_ansi(false)
                .with_writer(Arc::new(file)),
        )
        .try_init()
        .map_err(|e| AppError::startup(format!("无法初始化日志: {}", e)))?;

    Ok(path)
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 缓存预热启动 - 模式: {:?}", config.execution_mode);
    info!("🌐 站点数量: {}", config.sites.len());
    info!(
        "📦 每批 {} 个 URL, 最大并发 {}",
        config.batch_size, config.max_concurrency
    );
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
pub fn log_batch_start(batch_num: usize, total_batches: usize, start: usize, end: usize, total: usize) {
    info!("{}", "=".repeat(60));
    info!("📦 处理批次 {}/{} ({} 个 URL)", batch_num, total_batches, end + 1 - start);
    info!("📄 本批 URL: {}-{} / 共 {} 个", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: usize, success: usize, total: usize) {
    info!("{}", "─".repeat(60));
    info!("✓ 批次 {} 完成: 成功 {}/{}", batch_num, success, total);
    info!("{}", "─".repeat(60));
}

/// 记录单个站点的摘要
pub fn log_site_summary(summary: &SiteSummary) {
    match &summary.statistics {
        Some(stats) => info!(
            "🌐 {}: 发现 {}, 预热 {}, 成功 {}, 缓存生成 {}, 失败 {}",
            summary.site,
            summary.discovered,
            summary.selected,
            stats.success,
            stats.cache_generated,
            stats.failed
        ),
        None => info!("🌐 {}: 发现 {}, 未预热", summary.site, summary.discovered),
    }
}

/// 输出 `STATS:` 行
pub fn log_stats(stats: &Statistics) {
    match serde_json::to_string(stats) {
        Ok(json) => info!("STATS: {}", json),
        Err(e) => info!("STATS: {:?} ({})", stats, e),
    }
}
