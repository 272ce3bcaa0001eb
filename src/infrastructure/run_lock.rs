//! 进程级单实例 lock
//!
//! lock 文件内容为创建时的毫秒时间戳，只通过 `create_new` 创建，同一时刻最多一个实例持有。
//! 文件存在且未过期时本次运行直接放弃；过期（或时间戳无法解析）时由拿到
//! `<lock>.takeover` 标记的实例删除后重新创建，其他实例按已被占用处理。
//! 获取成功后返回 `RunLockGuard`，guard 被 drop 时删除文件，保证所有退出路径都会释放。

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::LockError;

/// 获取 lock 的结果
#[derive(Debug)]
pub enum LockStatus {
    Acquired(RunLockGuard),
    /// 已有未过期的 lock（或另一个实例正在接管），未做任何修改
    AlreadyHeld { age: Duration },
}

/// 已存在的 lock 文件状态
enum Existing {
    Missing,
    Fresh(Duration),
    Stale,
}

/// lock 文件
#[derive(Debug, Clone)]
pub struct RunLock {
    path: PathBuf,
    stale_after: Duration,
}

impl RunLock {
    pub fn new(path: impl Into<PathBuf>, stale_after: Duration) -> Self {
        Self {
            path: path.into(),
            stale_after,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 尝试获取 lock
    ///
    /// # 返回
    /// - `Acquired`: 本实例持有 lock，guard 释放时删除文件
    /// - `AlreadyHeld`: 其他实例持有未过期的 lock
    ///
    /// 只有文件系统错误（无权限等）返回 `Err`
    pub fn acquire(&self) -> Result<LockStatus, LockError> {
        self.acquire_at(now_millis())
    }

    fn acquire_at(&self, now_ms: i64) -> Result<LockStatus, LockError> {
        if let Some(guard) = self.try_create(now_ms)? {
            return Ok(LockStatus::Acquired(guard));
        }

        match self.inspect(now_ms)? {
            Existing::Fresh(age) => {
                info!("Lock 文件存在 ({:.2} 小时)，中止运行", hours(age));
                Ok(LockStatus::AlreadyHeld { age })
            }
            Existing::Missing | Existing::Stale => self.take_over(now_ms),
        }
    }

    /// 在 takeover 标记的保护下重新检查、删除过期文件并创建新的 lock
    fn take_over(&self, now_ms: i64) -> Result<LockStatus, LockError> {
        let Some(_marker) = TakeoverMarker::create(takeover_path(&self.path), self.stale_after)? else {
            info!("另一个实例正在接管 lock 文件，中止运行");
            return Ok(LockStatus::AlreadyHeld { age: Duration::ZERO });
        };

        match self.inspect(now_ms)? {
            Existing::Fresh(age) => {
                info!("Lock 文件存在 ({:.2} 小时)，中止运行", hours(age));
                return Ok(LockStatus::AlreadyHeld { age });
            }
            Existing::Stale => {
                info!("删除过期的 lock 文件");
                remove_if_exists(&self.path)?;
            }
            Existing::Missing => {}
        }

        match self.try_create(now_ms)? {
            Some(guard) => Ok(LockStatus::Acquired(guard)),
            None => Ok(LockStatus::AlreadyHeld {
                age: Duration::ZERO,
            }),
        }
    }

    /// 原子地创建 lock 文件；文件已存在时返回 `None`
    fn try_create(&self, now_ms: i64) -> Result<Option<RunLockGuard>, LockError> {
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(None),
            Err(source) => return Err(self.write_error(source)),
        };

        // 先建 guard，写入失败时空文件也会被删除
        let guard = RunLockGuard {
            path: self.path.clone(),
            released: false,
        };
        file.write_all(now_ms.to_string().as_bytes())
            .map_err(|source| self.write_error(source))?;
        info!("已创建 lock 文件: {}", self.path.display());

        Ok(Some(guard))
    }

    fn inspect(&self, now_ms: i64) -> Result<Existing, LockError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Existing::Missing),
            Err(source) => {
                return Err(LockError::Read {
                    path: self.path.display().to_string(),
                    source,
                })
            }
        };

        // 空文件：另一个实例刚创建，时间戳尚未写入
        if content.trim().is_empty() {
            return Ok(Existing::Fresh(Duration::ZERO));
        }

        match lock_age(&content, now_ms) {
            Some(age) if age < self.stale_after => Ok(Existing::Fresh(age)),
            Some(age) => {
                info!("lock 文件已过期 ({:.2} 小时)", hours(age));
                Ok(Existing::Stale)
            }
            None => {
                warn!("lock 文件内容无法解析，按过期处理: {:?}", content.trim());
                Ok(Existing::Stale)
            }
        }
    }

    fn write_error(&self, source: std::io::Error) -> LockError {
        LockError::Write {
            path: self.path.display().to_string(),
            source,
        }
    }
}

fn takeover_path(lock_path: &Path) -> PathBuf {
    let mut name = lock_path.as_os_str().to_os_string();
    name.push(".takeover");
    PathBuf::from(name)
}

/// 接管过期 lock 期间持有的标记文件，drop 时删除
struct TakeoverMarker {
    path: PathBuf,
}

impl TakeoverMarker {
    /// 标记已存在时返回 `None`；超过 `stale_after` 的遗留标记先删除再重试一次
    fn create(path: PathBuf, stale_after: Duration) -> Result<Option<Self>, LockError> {
        for attempt in 0..2 {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Some(Self { path })),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if attempt > 0 || !is_older_than(&path, stale_after) {
                        return Ok(None);
                    }
                    warn!("删除遗留的 takeover 标记: {}", path.display());
                    remove_if_exists(&path)?;
                }
                Err(source) => {
                    return Err(LockError::Write {
                        path: path.display().to_string(),
                        source,
                    })
                }
            }
        }
        Ok(None)
    }
}

impl Drop for TakeoverMarker {
    fn drop(&mut self) {
        if let Err(e) = remove_if_exists(&self.path) {
            debug!("删除 takeover 标记失败: {}", e);
        }
    }
}

fn is_older_than(path: &Path, limit: Duration) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .is_some_and(|elapsed| elapsed > limit)
}

fn remove_if_exists(path: &Path) -> Result<(), LockError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LockError::Remove {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// 持有中的 lock，释放一次且只释放一次
#[derive(Debug)]
pub struct RunLockGuard {
    path: PathBuf,
    released: bool,
}

impl RunLockGuard {
    /// 显式释放
    pub fn release(mut self) -> Result<(), LockError> {
        self.released = true;
        remove_lock_file(&self.path)
    }
}

impl Drop for RunLockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = remove_lock_file(&self.path) {
            warn!("释放 lock 文件失败: {}", e);
        }
    }
}

fn remove_lock_file(path: &Path) -> Result<(), LockError> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!("已删除 lock 文件");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LockError::Remove {
            path: path.display().to_string(),
            source,
        }),
    }
}

fn lock_age(content: &str, now_ms: i64) -> Option<Duration> {
    let created: i64 = content.trim().parse().ok()?;
    // 时间戳在未来时按刚创建处理
    let age_ms = now_ms.saturating_sub(created).max(0);
    Some(Duration::from_millis(age_ms as u64))
}

fn hours(age: Duration) -> f64 {
    age.as_secs_f64() / 3600.0
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
