//! 回答稳定性轮询
//!
//! 页面没有"生成完毕"的信号，只能每隔一段时间读一次回答文本：
//! 连续两次读到相同且非空的文本即认为回答已完成。

use std::time::Duration;

use tokio::time::{sleep, timeout, Instant};
use tracing::debug;

use crate::error::{SessionError, SessionResult};

/// 回答文本来源
#[allow(async_fn_in_trait)]
pub trait SnapshotSource {
    /// 定位最新的回答元素，最多等待 `limit`
    async fn locate(&mut self, limit: Duration) -> SessionResult<()>;
    /// 读取当前文本
    async fn snapshot(&mut self) -> SessionResult<String>;
}

/// 稳定性轮询器
#[derive(Debug, Clone, Copy)]
pub struct StabilityPoller {
    interval: Duration,
    writing_timeout: Duration,
}

impl StabilityPoller {
    pub fn new(interval: Duration, writing_timeout: Duration) -> Self {
        Self {
            interval,
            writing_timeout,
        }
    }

    /// 等待回答稳定并返回去掉首尾空白的文本
    ///
    /// `last_observed` 是上一次读到的文本，每次读取后都会更新。
    pub async fn await_stable<S: SnapshotSource>(
        &self,
        source: &mut S,
        last_observed: &mut String,
    ) -> SessionResult<String> {
        source.locate(self.writing_timeout).await?;

        let started = Instant::now();
        loop {
            let elapsed = started.elapsed();
            if elapsed > self.writing_timeout {
                return Err(SessionError::ResponseTimeout {
                    timeout: self.writing_timeout,
                });
            }

            let remaining = self.writing_timeout - elapsed;
            let current = timeout(remaining, source.snapshot())
                .await
                .map_err(|_| SessionError::ResponseTimeout {
                    timeout: self.writing_timeout,
                })??;

            if !current.trim().is_empty() && current == *last_observed {
                debug!("回答已稳定 ({} 字符, 用时 {:?})", current.len(), started.elapsed());
                return Ok(current.trim().to_string());
            }

            *last_observed = current;
            sleep(self.interval).await;
        }
    }
}
