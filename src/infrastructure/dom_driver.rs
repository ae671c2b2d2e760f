//! DOM 驱动抽象 - 基础设施层
//!
//! 定位层和会话控制器只通过这个 trait 接触页面，测试里可以换成假的 DOM。

use crate::error::SessionResult;
use crate::locator::Query;
use std::fmt::Debug;

/// 一次查找的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence<H> {
    /// 没有匹配的元素
    Missing,
    /// 元素在 DOM 中但不可见
    Attached(H),
    /// 元素可见
    Visible(H),
}

impl<H> Presence<H> {
    pub fn is_visible(&self) -> bool {
        matches!(self, Presence::Visible(_))
    }
}

/// 页面驱动
///
/// 所有方法都只做一次尝试，等待和超时由定位层负责。
#[allow(async_fn_in_trait)]
pub trait DomDriver {
    /// 元素引用
    type Handle: Clone + Debug;

    /// 导航到指定地址
    async fn goto(&self, url: &str) -> SessionResult<()>;

    /// `document.readyState`
    async fn ready_state(&self) -> SessionResult<String>;

    /// 查找查询对应的元素
    async fn lookup(&self, query: &Query) -> SessionResult<Presence<Self::Handle>>;

    /// 匹配查询的元素个数（忽略 pick）
    async fn count(&self, query: &Query) -> SessionResult<usize>;

    /// 点击元素；`force` 时跳过可见性检查直接派发点击
    async fn click(&self, handle: &Self::Handle, force: bool) -> SessionResult<()>;

    /// 用文本替换输入框内容
    async fn fill(&self, handle: &Self::Handle, text: &str) -> SessionResult<()>;

    /// 在元素上按键
    async fn press_key(&self, handle: &Self::Handle, key: &str) -> SessionResult<()>;

    /// 元素的可见文本，元素已不存在时返回空串
    async fn inner_text(&self, handle: &Self::Handle) -> SessionResult<String>;

    /// 关闭页面并断开连接
    async fn close(self) -> SessionResult<()>
    where
        Self: Sized;
}
