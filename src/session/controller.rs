//! 会话控制器
//!
//! 持有一个自动化会话（一个页面），把导航、选角色、选模型、提问、删对话
//! 拼成高层操作。所有等待都交给定位层，超时以类型化错误返回。

use std::fmt;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, instrument, Span};

use crate::config::Config;
use crate::error::{SessionError, SessionResult};
use crate::infrastructure::{DomDriver, Presence};
use crate::locator::{Locator, Query, WaitState};
use crate::session::poller::{SnapshotSource, StabilityPoller};
use crate::session::ui::{Submit, UiMap};

/// 会话状态
///
/// 控制器只能由一个已连接的驱动构造，因此没有"未初始化"的实例。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 已连接，尚未导航
    Connected,
    /// 可以接受操作
    Ready,
    /// 已提交问题，等待回答
    Busy,
    /// 已关闭
    Closed,
}

impl SessionState {
    pub fn name(self) -> &'static str {
        match self {
            SessionState::Connected => "Connected",
            SessionState::Ready => "Ready",
            SessionState::Busy => "Busy",
            SessionState::Closed => "Closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 会话超时设置
#[derive(Debug, Clone, Copy)]
pub struct SessionTimeouts {
    /// 普通元素等待
    pub element: Duration,
    /// 回答生成
    pub writing: Duration,
    /// 回答轮询间隔
    pub poll_interval: Duration,
    /// 元素探测间隔
    pub locator_poll: Duration,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SessionTimeouts {
    pub fn from_config(config: &Config) -> Self {
        Self {
            element: config.element_timeout(),
            writing: config.writing_timeout(),
            poll_interval: config.poll_interval(),
            locator_poll: config.locator_poll(),
        }
    }
}

/// 会话控制器
pub struct SessionController<D: DomDriver> {
    locator: Locator<D>,
    ui: Box<dyn UiMap>,
    poller: StabilityPoller,
    state: SessionState,
    last_observed_response_text: String,
    span: Span,
}

impl<D: DomDriver> SessionController<D> {
    /// 用已连接的驱动创建控制器
    pub fn new(driver: D, ui: Box<dyn UiMap>, timeouts: SessionTimeouts, span: Span) -> Self {
        Self {
            locator: Locator::new(driver, timeouts.element, timeouts.locator_poll),
            ui,
            poller: StabilityPoller::new(timeouts.poll_interval, timeouts.writing),
            state: SessionState::Connected,
            last_observed_response_text: String::new(),
            span,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// 稳定性轮询最后一次读到的回答文本
    pub fn last_observed_response_text(&self) -> &str {
        &self.last_observed_response_text
    }

    pub fn driver(&self) -> &D {
        self.locator.driver()
    }

    /// 导航到服务地址并等待文档加载
    #[instrument(name = "open", parent = &self.span, skip_all, fields(url = %url))]
    pub async fn open(&mut self, url: &str) -> SessionResult<()> {
        self.expect_state(SessionState::Connected)?;
        let limit = self.locator.default_timeout();

        timeout(limit, self.locator.driver().goto(url))
            .await
            .map_err(|_| SessionError::connection(url, format!("导航超时 ({:?})", limit)))?
            .map_err(|e| SessionError::connection(url, e))?;

        self.locator
            .wait_for_document(limit)
            .await
            .map_err(|e| SessionError::connection(url, e))?;

        self.state = SessionState::Ready;
        info!("✓ 页面已就绪: {}", url);
        Ok(())
    }

    /// 选择角色（Gem）
    ///
    /// 界面不提供"已选中"的判断，所以每次都完整点击并等待。
    #[instrument(name = "select_persona", parent = &self.span, skip_all, fields(persona = %name))]
    pub async fn select_persona(&mut self, name: &str) -> SessionResult<()> {
        self.expect_state(SessionState::Ready)?;

        let entry = self
            .locator
            .wait_for(&self.ui.persona_entry(name), WaitState::Visible)
            .await?;
        self.locator.driver().click(&entry, false).await?;

        self.locator
            .wait_for(&self.ui.persona_active(name), WaitState::Visible)
            .await?;
        self.settle().await?;

        debug!("已选择角色: {}", name);
        Ok(())
    }

    /// 选择模型
    #[instrument(name = "select_model", parent = &self.span, skip_all, fields(model = %name))]
    pub async fn select_model(&mut self, name: &str) -> SessionResult<()> {
        self.expect_state(SessionState::Ready)?;

        let menu = self
            .locator
            .wait_for(&self.ui.model_menu(), WaitState::Visible)
            .await?;
        self.locator.driver().click(&menu, false).await?;

        let option_query = self.ui.model_option(name);
        let option = self
            .locator
            .wait_for(&option_query, WaitState::Visible)
            .await?;
        self.locator.driver().click(&option, false).await?;

        // 菜单关闭即表示选择已生效
        self.locator
            .wait_until_hidden(&option_query, self.locator.default_timeout())
            .await?;
        self.settle().await?;

        debug!("已选择模型: {}", name);
        Ok(())
    }

    /// 提问并等待完整回答
    ///
    /// 一旦提交就会等完整个稳定性协议，不会中途放弃。
    #[instrument(name = "ask", parent = &self.span, skip_all, fields(prompt_len = prompt.len()))]
    pub async fn ask(&mut self, prompt: &str) -> SessionResult<String> {
        self.expect_state(SessionState::Ready)?;

        let input = self
            .locator
            .wait_for(&self.ui.input_box(), WaitState::Visible)
            .await?;
        let driver = self.locator.driver();
        driver.click(&input, false).await?;
        driver.fill(&input, prompt).await?;

        let responses = self.ui.responses();
        let seen_before = driver.count(&responses).await?;

        match self.ui.submit() {
            Submit::Key(key) => driver.press_key(&input, &key).await?,
            Submit::Click(send) => {
                let button = self.locator.wait_for(&send, WaitState::Visible).await?;
                self.locator.driver().click(&button, false).await?;
            }
        }
        self.state = SessionState::Busy;
        // 上一轮的回答不能作为这一轮的基线
        self.last_observed_response_text.clear();

        self.settle().await?;

        let mut reader = ResponseReader {
            locator: &self.locator,
            query: responses,
            seen_before,
        };
        let text = self
            .poller
            .await_stable(&mut reader, &mut self.last_observed_response_text)
            .await?;

        self.state = SessionState::Ready;
        debug!("收到回答 ({} 字符)", text.len());
        Ok(text)
    }

    /// 删除最近对话列表中第 `index` 个对话
    #[instrument(name = "delete_recent_conversation", parent = &self.span, skip_all, fields(index = index))]
    pub async fn delete_recent_conversation(&mut self, index: usize) -> SessionResult<()> {
        self.expect_state(SessionState::Ready)?;
        let limit = self.locator.default_timeout();
        let driver = self.locator.driver();

        // 菜单按钮只在悬停时显示，存在即可，强制点击
        let menu = self
            .locator
            .wait_for(&self.ui.conversation_menu(index), WaitState::Attached)
            .await?;
        driver.click(&menu, true).await?;

        let delete = self
            .locator
            .wait_for(&self.ui.delete_action(), WaitState::Visible)
            .await?;
        driver.click(&delete, false).await?;

        let dialog = self.ui.confirm_dialog();
        self.locator.wait_for(&dialog, WaitState::Visible).await?;
        let confirm = self
            .locator
            .wait_for(&self.ui.confirm_button(), WaitState::Visible)
            .await?;
        driver.click(&confirm, false).await?;

        self.locator.wait_until_hidden(&dialog, limit).await?;
        info!("✓ 已删除最近对话 #{}", index);
        Ok(())
    }

    /// 关闭页面并断开连接
    pub async fn close(mut self) -> SessionResult<()> {
        self.state = SessionState::Closed;
        debug!(parent: &self.span, "关闭会话");
        self.locator.into_driver().close().await
    }

    async fn settle(&self) -> SessionResult<()> {
        self.locator
            .wait_for_document(self.locator.default_timeout())
            .await
    }

    fn expect_state(&self, expected: SessionState) -> SessionResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                expected: expected.name(),
                actual: self.state.name(),
            })
        }
    }
}

/// 读取最新回答的文本
struct ResponseReader<'a, D: DomDriver> {
    locator: &'a Locator<D>,
    query: Query,
    seen_before: usize,
}

impl<D: DomDriver> SnapshotSource for ResponseReader<'_, D> {
    async fn locate(&mut self, limit: Duration) -> SessionResult<()> {
        // 等到出现一个提交之后才有的新回答
        self.locator
            .wait_for_count_above(&self.query, self.seen_before, limit)
            .await?;
        Ok(())
    }

    async fn snapshot(&mut self) -> SessionResult<String> {
        let driver = self.locator.driver();
        match driver.lookup(&self.query).await? {
            Presence::Missing => Ok(String::new()),
            Presence::Attached(handle) | Presence::Visible(handle) => driver.inner_text(&handle).await,
        }
    }
}
