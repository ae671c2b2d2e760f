//! 编排层看到的会话能力
//!
//! 编排层只依赖这两个 trait：能打开会话的工厂，以及会话本身。
//! 生产环境用 Chromium，测试里用脚本化的假会话。

use tracing::{info_span, warn, Span};

use crate::browser::connect_to_browser;
use crate::config::Config;
use crate::error::SessionResult;
use crate::infrastructure::{ChromiumDriver, DomDriver};
use crate::session::controller::{SessionController, SessionTimeouts};
use crate::session::ui::GeminiUi;

/// 一个可对话的会话
#[allow(async_fn_in_trait)]
pub trait ChatSession {
    async fn select_persona(&mut self, name: &str) -> SessionResult<()>;
    async fn select_model(&mut self, name: &str) -> SessionResult<()>;
    async fn ask(&mut self, prompt: &str) -> SessionResult<String>;
    async fn delete_recent_conversation(&mut self, index: usize) -> SessionResult<()>;
    /// 释放会话占用的页面和连接
    async fn close(self) -> SessionResult<()>
    where
        Self: Sized;
}

/// 会话工厂
#[allow(async_fn_in_trait)]
pub trait SessionFactory {
    type Session: ChatSession;

    /// 建立一个处于 Ready 状态的新会话
    async fn open(&self) -> SessionResult<Self::Session>;
}

impl<D: DomDriver> ChatSession for SessionController<D> {
    async fn select_persona(&mut self, name: &str) -> SessionResult<()> {
        SessionController::select_persona(self, name).await
    }

    async fn select_model(&mut self, name: &str) -> SessionResult<()> {
        SessionController::select_model(self, name).await
    }

    async fn ask(&mut self, prompt: &str) -> SessionResult<String> {
        SessionController::ask(self, prompt).await
    }

    async fn delete_recent_conversation(&mut self, index: usize) -> SessionResult<()> {
        SessionController::delete_recent_conversation(self, index).await
    }

    async fn close(self) -> SessionResult<()> {
        SessionController::close(self).await
    }
}

/// 连接目标：本地调试端口 + 服务地址
#[derive(Debug, Clone)]
pub struct ConnectionTarget {
    pub port: u16,
    pub url: String,
}

impl ConnectionTarget {
    pub fn from_config(config: &Config) -> Self {
        Self {
            port: config.browser_debug_port,
            url: config.target_url.clone(),
        }
    }
}

/// 连接已运行的 Chromium 并打开 Gemini 页面
pub struct ChromiumSessionFactory {
    target: ConnectionTarget,
    timeouts: SessionTimeouts,
    span: Span,
}

impl ChromiumSessionFactory {
    pub fn new(config: &Config) -> Self {
        Self {
            target: ConnectionTarget::from_config(config),
            timeouts: SessionTimeouts::from_config(config),
            span: info_span!("session", port = config.browser_debug_port),
        }
    }

    /// 替换日志上下文
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

impl SessionFactory for ChromiumSessionFactory {
    type Session = SessionController<ChromiumDriver>;

    async fn open(&self) -> SessionResult<Self::Session> {
        let connection = connect_to_browser(self.target.port).await?;
        let driver = ChromiumDriver::open(connection).await?;
        let mut controller =
            SessionController::new(driver, Box::new(GeminiUi), self.timeouts, self.span.clone());

        if let Err(e) = controller.open(&self.target.url).await {
            if let Err(close_err) = controller.close().await {
                warn!("关闭失败的会话时出错: {}", close_err);
            }
            return Err(e);
        }
        Ok(controller)
    }
}
