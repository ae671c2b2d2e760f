use std::time::Duration;

use tokio::time::{sleep, timeout, Instant};
use tracing::debug;

use crate::error::{SessionError, SessionResult};
use crate::infrastructure::{DomDriver, Presence};
use crate::locator::Query;

/// 等待的目标状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    /// 元素存在且可见
    Visible,
    /// 元素存在即可（可能被隐藏，例如悬停才显示的菜单按钮）
    Attached,
}

/// 带超时的元素定位器
///
/// 持有唯一的驱动，按固定间隔探测，直到条件满足或超时。
pub struct Locator<D> {
    driver: D,
    default_timeout: Duration,
    poll_interval: Duration,
}

impl<D: DomDriver> Locator<D> {
    pub fn new(driver: D, default_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            driver,
            default_timeout,
            poll_interval,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// 使用默认超时等待元素
    pub async fn wait_for(&self, query: &Query, state: WaitState) -> SessionResult<D::Handle> {
        self.wait_for_within(query, state, self.default_timeout).await
    }

    /// 等待元素达到指定状态
    pub async fn wait_for_within(
        &self,
        query: &Query,
        state: WaitState,
        limit: Duration,
    ) -> SessionResult<D::Handle> {
        let deadline = Instant::now() + limit;
        loop {
            let lookup = self.lookup_before(query, deadline, limit).await?;
            match (state, lookup) {
                (_, Presence::Visible(handle)) => return Ok(handle),
                (WaitState::Attached, Presence::Attached(handle)) => return Ok(handle),
                _ => {}
            }
            self.pause_until_next_poll(query, deadline, limit).await?;
        }
    }

    /// 等待元素消失（不存在或不可见）
    pub async fn wait_until_hidden(&self, query: &Query, limit: Duration) -> SessionResult<()> {
        let deadline = Instant::now() + limit;
        loop {
            if !self.lookup_before(query, deadline, limit).await?.is_visible() {
                return Ok(());
            }
            self.pause_until_next_poll(query, deadline, limit).await?;
        }
    }

    /// 等待匹配元素的数量超过 `baseline`
    pub async fn wait_for_count_above(
        &self,
        query: &Query,
        baseline: usize,
        limit: Duration,
    ) -> SessionResult<usize> {
        let deadline = Instant::now() + limit;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let count = timeout(remaining, self.driver.count(query))
                .await
                .map_err(|_| SessionError::locator_timeout(format!("{} (count > {})", query, baseline), limit))??;
            if count > baseline {
                return Ok(count);
            }
            self.pause_until_next_poll(query, deadline, limit).await?;
        }
    }

    /// 等待文档至少完成 DOMContentLoaded
    pub async fn wait_for_document(&self, limit: Duration) -> SessionResult<()> {
        let deadline = Instant::now() + limit;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let state = timeout(remaining, self.driver.ready_state())
                .await
                .map_err(|_| SessionError::locator_timeout("document (domcontentloaded)", limit))??;
            if state == "interactive" || state == "complete" {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(SessionError::locator_timeout("document (domcontentloaded)", limit));
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn lookup_before(
        &self,
        query: &Query,
        deadline: Instant,
        limit: Duration,
    ) -> SessionResult<Presence<D::Handle>> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        timeout(remaining, self.driver.lookup(query))
            .await
            .map_err(|_| SessionError::locator_timeout(query, limit))?
    }

    async fn pause_until_next_poll(
        &self,
        query: &Query,
        deadline: Instant,
        limit: Duration,
    ) -> SessionResult<()> {
        let now = Instant::now();
        if now >= deadline {
            debug!("等待元素超时: {}", query);
            return Err(SessionError::locator_timeout(query, limit));
        }
        sleep(self.poll_interval.min(deadline - now)).await;
        Ok(())
    }
}
