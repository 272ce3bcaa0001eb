use anyhow::Result;
use tracing::{error, info};

use cache_warmer::utils::logging;
use cache_warmer::{AppError, ChromiumLauncher, Config, ReqwestFetcher, RunCoordinator, RunReport};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    let log_file = logging::init(&config.log_dir)?;
    logging::log_startup(&config);
    info!("日志文件: {}", log_file.display());

    let fetcher = ReqwestFetcher::new(&config.user_agent, config.request_timeout())
        .map_err(|e| AppError::startup(format!("无法创建 HTTP 客户端: {}", e)))?;
    let launcher = ChromiumLauncher::from_config(&config);

    match RunCoordinator::new(&config, fetcher, launcher).run().await {
        Ok(RunReport::Skipped { lock_age_hours }) => {
            info!(
                "另一个实例正在运行（lock 已存在 {:.2} 小时），退出",
                lock_age_hours
            );
            Ok(())
        }
        Ok(RunReport::Completed { statistics, .. }) => {
            info!(
                "✓ 全部完成: 成功 {}/{}, 缓存生成 {}, 失败 {}",
                statistics.success, statistics.total, statistics.cache_generated, statistics.failed
            );
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            Err(e.into())
        }
    }
}
