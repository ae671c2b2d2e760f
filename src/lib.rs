//! # Flashcard Optimiser
//!
//! 通过浏览器里已登录的对话服务，把导出的闪卡逐张改写成新卡片
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `browser/` - 连接已运行的浏览器（调试端口）
//! - `infrastructure/` - `DomDriver` 能力接口及其 Chromium 实现
//! - `locator/` - 类型化的元素查询和带超时的等待
//!
//! ### ② 会话层（Session）
//! - `SessionController` - 会话状态机：打开、选角色、选模型、提问、删对话
//! - `StabilityPoller` - 判断流式回答何时写完
//! - `UiMap` - 界面角色到查询的映射
//!
//! ### ③ 业务能力层（Services）
//! - `response_parser` - 回答 → 问答对
//! - `package_writer` - 生成的卡片 → 输出包
//!
//! ### ④ 流程层（Workflow）
//! - `RecordFlow` - "一张卡片"的完整处理流程
//!
//! ### ⑤ 编排层（Orchestration）
//! - `BatchOrchestrator` - 批量处理、检查点、崩溃恢复
//!
//! ## 模块结构

pub mod app;
pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod locator;
pub mod logger;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod session;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use browser::connect_to_browser;
pub use config::Config;
pub use error::{AppError, AppResult, SessionError};
pub use infrastructure::{ChromiumDriver, DomDriver};
pub use locator::{Locator, Query};
pub use models::{InputRecord, OutputRecord};
pub use orchestrator::{BatchOrchestrator, BatchReport, RetryPolicy};
pub use session::{ChatSession, SessionController, SessionFactory};
pub use workflow::{RecordCtx, RecordFlow};
