use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig, Handler};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::BrowserOptions;
use crate::error::SessionError;

/// 启动无头浏览器
///
/// # 参数
/// - `options`: 可执行文件和启动参数
/// - `command_timeout`: 单个 CDP 命令的超时
///
/// # 返回
/// 返回浏览器和后台事件处理任务，任务在浏览器关闭后自然结束
pub async fn launch_headless_browser(
    options: &BrowserOptions,
    command_timeout: Duration,
) -> Result<(Browser, JoinHandle<()>), SessionError> {
    debug!("🚀 启动无头浏览器...");

    let mut builder = BrowserConfig::builder()
        .new_headless_mode()
        .request_timeout(command_timeout)
        .args(options.extra_args.iter().map(String::as_str));

    if let Some(executable) = &options.chrome_executable {
        builder = builder.chrome_executable(executable);
    }

    let config = builder.build().map_err(|e| {
        error!("配置无头浏览器失败: {}", e);
        SessionError::Launch(format!("配置无头浏览器失败: {}", e))
    })?;

    let (browser, handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动无头浏览器失败: {}", e);
        SessionError::Launch(e.to_string())
    })?;

    let handler_task = spawn_handler(handler);
    info!("Chromium 已启动");

    Ok((browser, handler_task))
}

/// 在后台处理浏览器事件
pub(crate) fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                debug!("浏览器事件处理出错: {}", e);
            }
        }
    })
}
