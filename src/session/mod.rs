//! 会话层
//!
//! - `ui` - 界面角色到查询的映射
//! - `poller` - 流式回答的稳定性判断
//! - `controller` - 会话状态机与高层操作
//! - `chat` - 编排层使用的会话 / 工厂 trait

pub mod chat;
pub mod controller;
pub mod poller;
pub mod ui;

pub use chat::{ChatSession, ChromiumSessionFactory, ConnectionTarget, SessionFactory};
pub use controller::{SessionController, SessionState, SessionTimeouts};
pub use poller::{SnapshotSource, StabilityPoller};
pub use ui::{GeminiUi, Submit, UiMap};
