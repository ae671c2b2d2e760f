//! 记录处理流程 - 流程层
//!
//! 核心职责：定义"一张卡片"的完整处理流程
//!
//! 流程顺序：
//! 1. 重新选择角色
//! 2. 发送问答 JSON，等待回答
//! 3. 解析回答 → 生成新卡片，或记为跳过

use tracing::{debug, info, warn};

use crate::error::{SessionResult, TransformError};
use crate::models::{InputRecord, OutputRecord};
use crate::services::parse_qa_pairs;
use crate::session::ChatSession;
use crate::utils::logging::{indent_raw, truncate_text};
use crate::workflow::record_ctx::RecordCtx;

/// 单条记录的处理结果
#[derive(Debug)]
pub enum RecordOutcome {
    /// 解析成功（可能一条都没有）
    Derived(Vec<OutputRecord>),
    /// 回答无法解析，记录被跳过
    Skipped(TransformError),
}

/// 记录处理流程
///
/// - 不持有会话，由调用方借给它
/// - 会话错误原样返回，由编排层决定是否重建会话
/// - 解析错误只影响当前记录
pub struct RecordFlow {
    persona: String,
    group_prefix: String,
}

impl RecordFlow {
    pub fn new(persona: impl Into<String>, group_prefix: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            group_prefix: group_prefix.into(),
        }
    }

    pub async fn run<S: ChatSession>(
        &self,
        session: &mut S,
        record: &InputRecord,
        ctx: RecordCtx,
    ) -> SessionResult<RecordOutcome> {
        info!("--- 处理卡片 {} / {} ---", ctx.index + 1, ctx.total);
        debug!("{} 问题: {}", ctx, truncate_text(&record.question, 80));

        // 界面在两轮之间可能重置上下文，每条都重新选一次
        session.select_persona(&self.persona).await?;

        let raw = session.ask(&record.to_prompt()).await?;

        match parse_qa_pairs(&raw) {
            Ok(pairs) => {
                let derived: Vec<OutputRecord> = pairs
                    .into_iter()
                    .map(|pair| OutputRecord::derive(pair, record, &self.group_prefix))
                    .collect();
                Ok(RecordOutcome::Derived(derived))
            }
            Err(e) => {
                warn!("{} ⚠️ 跳过: 回答不是合法的问答 JSON", ctx);
                warn!("原始回答:\n{}", indent_raw(e.raw()));
                Ok(RecordOutcome::Skipped(e))
            }
        }
    }
}
