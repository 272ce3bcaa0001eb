//! URL 访问上下文
//!
//! 封装"我正在处理第几批的第几个 URL"这一信息，仅用于日志

use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitCtx {
    /// 批次编号（从 1 开始）
    pub batch_index: usize,
    /// URL 在本站点中的序号（从 1 开始）
    pub position: usize,
    /// 本站点 URL 总数
    pub total: usize,
}

impl VisitCtx {
    pub fn new(batch_index: usize, position: usize, total: usize) -> Self {
        Self {
            batch_index,
            position,
            total,
        }
    }
}

impl Display for VisitCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[批次 {} | URL {}/{}]", self.batch_index, self.position, self.total)
    }
}
