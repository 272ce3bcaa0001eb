use chromiumoxide::Browser;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

use super::headless::spawn_handler;
use crate::error::SessionError;

/// 连接到调试端口上已运行的浏览器
///
/// 连接模式下浏览器不归本进程所有，批次结束时只关闭页面
pub async fn connect_to_browser(port: u16) -> Result<(Browser, JoinHandle<()>), SessionError> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        SessionError::Launch(format!("无法连接到浏览器 (端口: {}): {}", port, e))
    })?;
    debug!("浏览器连接成功");

    let handler_task = spawn_handler(handler);

    // 等待浏览器状态同步
    sleep(Duration::from_millis(300)).await;

    Ok((browser, handler_task))
}
