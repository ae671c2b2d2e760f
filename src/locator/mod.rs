//! 定位层
//!
//! 把抽象的 UI 角色解析成页面中的元素引用，并提供有界的出现/消失等待。
//! 本层不重试，超时直接以 `LocatorTimeout` 返回给调用方。

pub mod query;
pub mod wait;

pub use query::{normalize, Pick, Query, TextMatch};
pub use wait::{Locator, WaitState};
