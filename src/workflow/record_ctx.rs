//! 记录处理上下文
//!
//! 封装"我正在处理第几张卡片"这一信息

use std::fmt::Display;

/// 记录处理上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordCtx {
    /// 记录在加载序列中的位置（从 0 开始）
    pub index: usize,
    /// 加载的记录总数
    pub total: usize,
}

impl RecordCtx {
    pub fn new(index: usize, total: usize) -> Self {
        Self { index, total }
    }
}

impl Display for RecordCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[卡片 {}/{}]", self.index + 1, self.total)
    }
}
