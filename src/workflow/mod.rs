//! 流程层
//!
//! - `record_ctx` - 当前处理的是哪张卡片
//! - `record_flow` - 一张卡片的完整处理流程

pub mod record_ctx;
pub mod record_flow;

pub use record_ctx::RecordCtx;
pub use record_flow::{RecordFlow, RecordOutcome};
