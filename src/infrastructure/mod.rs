//! 基础设施层：持有稀缺资源（page、HTTP 客户端、lock 文件），只暴露能力

pub mod http_fetcher;
pub mod js_executor;
pub mod run_lock;

pub use http_fetcher::{ReqwestFetcher, SitemapFetcher};
pub use js_executor::JsExecutor;
pub use run_lock::{LockStatus, RunLock, RunLockGuard};
