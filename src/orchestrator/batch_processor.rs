//! 批量记录处理器 - 编排层
//!
//! ## 职责
//!
//! 把所有输入记录推进到完成，同时容忍会话级崩溃。
//!
//! ## 核心流程
//!
//! 1. **建立会话**：通过工厂打开新会话，选择角色和模型
//! 2. **逐条处理**：按加载顺序处理剩余记录，委托 `RecordFlow`
//! 3. **检查点**：每生成固定数量的新卡片写一个中间包
//! 4. **崩溃恢复**：会话错误时转储已生成内容，按重试策略重建会话
//! 5. **收尾**：写最终包并汇总统计
//!
//! ## 设计特点
//!
//! - **状态独占**：`BatchState` 只在本模块内修改
//! - **不致命**：默认无限重试，只有重试策略耗尽才会留下未完成记录
//! - **向下委托**：单条记录的细节交给流程层

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{error, info, instrument, warn, Span};

use crate::config::Config;
use crate::error::{PersistenceError, SessionResult};
use crate::models::{InputRecord, OutputRecord};
use crate::services::{PackageName, PackageSink};
use crate::session::{ChatSession, SessionFactory};
use crate::workflow::{RecordCtx, RecordFlow, RecordOutcome};

/// 批处理设置
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub persona: String,
    pub model: String,
    pub group_prefix: String,
    /// 每生成多少条写一次中间包，0 表示不写
    pub checkpoint_every: usize,
}

impl BatchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            persona: config.persona_name.clone(),
            model: config.model_name.clone(),
            group_prefix: config.group_prefix.clone(),
            checkpoint_every: config.checkpoint_every,
        }
    }
}

/// 会话重建策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最多建立多少次会话，`None` 表示不限
    pub max_attempts: Option<usize>,
    /// 两次会话之间的等待
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn unbounded(backoff: Duration) -> Self {
        Self {
            max_attempts: None,
            backoff,
        }
    }

    pub fn limited(max_attempts: usize, backoff: Duration) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            backoff,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.max_session_attempts,
            backoff: config.retry_backoff(),
        }
    }

    /// 已经尝试 `attempts` 次后是否还能再试
    pub fn allows(&self, attempts: usize) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }
}

/// 运行统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// 加载的记录数
    pub total_loaded: usize,
    /// 已从剩余列表移除的记录数
    pub processed: usize,
    /// 回答无法解析而跳过的记录数
    pub skipped: usize,
    /// 重试策略耗尽时仍未处理的记录数
    pub unfinished: usize,
    /// 生成的新卡片数
    pub derived: usize,
    /// 成功写入的中间包数
    pub checkpoints: usize,
    /// 成功写入的转储包数
    pub crash_dumps: usize,
    /// 建立会话的次数
    pub session_attempts: usize,
}

/// 一次运行的结果
#[derive(Debug)]
pub struct BatchOutcome {
    pub report: BatchReport,
    pub generated: Vec<OutputRecord>,
    /// 最终包的位置或写入失败的原因
    pub final_package: Result<PathBuf, PersistenceError>,
}

/// 批处理状态
///
/// 记录以它在加载序列中的下标表示。
#[derive(Debug, Default)]
struct BatchState {
    remaining: Vec<usize>,
    skipped: BTreeSet<usize>,
    generated: Vec<OutputRecord>,
    checkpoint_count: usize,
    crash_dump_count: usize,
    session_attempts: usize,
}

impl BatchState {
    fn new(total: usize) -> Self {
        Self {
            remaining: (0..total).collect(),
            ..Default::default()
        }
    }

    /// 还需要尝试的记录（跳过的记录留在剩余列表里，但不再尝试）
    fn pending(&self) -> Vec<usize> {
        self.remaining
            .iter()
            .copied()
            .filter(|i| !self.skipped.contains(i))
            .collect()
    }

    fn has_pending(&self) -> bool {
        self.remaining.iter().any(|i| !self.skipped.contains(i))
    }

    fn complete(&mut self, index: usize) {
        self.remaining.retain(|&i| i != index);
    }
}

/// 批量处理器
pub struct BatchOrchestrator<F, P> {
    factory: F,
    sink: P,
    settings: BatchSettings,
    retry: RetryPolicy,
    span: Span,
}

impl<F: SessionFactory, P: PackageSink> BatchOrchestrator<F, P> {
    pub fn new(factory: F, sink: P, settings: BatchSettings, retry: RetryPolicy, span: Span) -> Self {
        Self {
            factory,
            sink,
            settings,
            retry,
            span,
        }
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    /// 处理所有记录
    #[instrument(name = "batch", parent = &self.span, skip_all, fields(total = records.len()))]
    pub async fn run(&self, records: &[InputRecord]) -> BatchOutcome {
        let mut state = BatchState::new(records.len());

        while state.has_pending() {
            if !self.retry.allows(state.session_attempts) {
                error!(
                    "❌ 已建立 {} 次会话，达到重试上限，停止处理",
                    state.session_attempts
                );
                break;
            }
            if state.session_attempts > 0 && !self.retry.backoff.is_zero() {
                tokio::time::sleep(self.retry.backoff).await;
            }
            state.session_attempts += 1;

            info!(
                "尝试处理批次，剩余 {} 张卡片 (第 {} 次会话)",
                state.pending().len(),
                state.session_attempts
            );

            if let Err(e) = self.run_session(records, &mut state).await {
                error!("❌ 会话意外中断: {}，转储进度后重试...", e);
                self.write_crash_dump(&mut state);
            }
        }

        self.finish(records.len(), state)
    }

    /// 一次会话：打开、处理、关闭
    async fn run_session(&self, records: &[InputRecord], state: &mut BatchState) -> SessionResult<()> {
        let mut session = self.factory.open().await?;
        let result = self.drive_session(&mut session, records, state).await;
        if let Err(e) = session.close().await {
            warn!("关闭会话失败: {}", e);
        }
        result
    }

    async fn drive_session<S: ChatSession>(
        &self,
        session: &mut S,
        records: &[InputRecord],
        state: &mut BatchState,
    ) -> SessionResult<()> {
        session.select_persona(&self.settings.persona).await?;
        session.select_model(&self.settings.model).await?;

        let flow = RecordFlow::new(&self.settings.persona, &self.settings.group_prefix);
        let total = records.len();

        // 遍历快照，处理过程中会修改剩余列表
        for index in state.pending() {
            let ctx = RecordCtx::new(index, total);
            match flow.run(session, &records[index], ctx).await? {
                RecordOutcome::Derived(derived) => {
                    let count = derived.len();
                    for record in derived {
                        state.generated.push(record);
                        if self.checkpoint_due(state.generated.len()) {
                            info!("已生成 {} 张新卡片...", state.generated.len());
                            self.write_checkpoint(state);
                        }
                    }
                    state.complete(index);
                    info!("{} ✓ 生成 {} 张新卡片", ctx, count);
                }
                RecordOutcome::Skipped(_) => {
                    state.skipped.insert(index);
                }
            }
        }
        Ok(())
    }

    fn checkpoint_due(&self, generated: usize) -> bool {
        let every = self.settings.checkpoint_every;
        every > 0 && generated > 0 && generated % every == 0
    }

    fn write_checkpoint(&self, state: &mut BatchState) {
        let name = PackageName::Intermediary(state.checkpoint_count + 1);
        match self.sink.write_package(name, &state.generated) {
            Ok(path) => {
                state.checkpoint_count += 1;
                info!("✓ 中间包 {} 已写入: {}", state.checkpoint_count, path.display());
            }
            Err(e) => error!("❌ 写入中间包失败: {}", e),
        }
    }

    fn write_crash_dump(&self, state: &mut BatchState) {
        // 没有卡片时也写一个空转储，转储编号与崩溃次数一一对应
        let name = PackageName::Dump(state.crash_dump_count + 1);
        match self.sink.write_package(name, &state.generated) {
            Ok(path) => {
                state.crash_dump_count += 1;
                info!("✓ 转储包 {} 已写入: {}", state.crash_dump_count, path.display());
            }
            Err(e) => error!("❌ 写入转储包失败: {}", e),
        }
    }

    fn finish(&self, total: usize, state: BatchState) -> BatchOutcome {
        let unfinished = state.remaining.len() - state.skipped.len();
        let report = BatchReport {
            total_loaded: total,
            processed: total - state.remaining.len(),
            skipped: state.skipped.len(),
            unfinished,
            derived: state.generated.len(),
            checkpoints: state.checkpoint_count,
            crash_dumps: state.crash_dump_count,
            session_attempts: state.session_attempts,
        };

        if unfinished > 0 {
            warn!("⚠️ {} 张卡片未能处理", unfinished);
        }

        let final_package = self.sink.write_package(PackageName::Final, &state.generated);
        match &final_package {
            Ok(path) => info!("✓ 最终包已写入: {}", path.display()),
            Err(e) => error!("❌ 写入最终包失败: {}", e),
        }

        BatchOutcome {
            report,
            generated: state.generated,
            final_package,
        }
    }
}
