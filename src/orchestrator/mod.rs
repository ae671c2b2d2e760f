//! 编排层
//!
//! - `batch_processor` - 批量处理记录，管理会话生命周期和崩溃恢复

pub mod batch_processor;

pub use batch_processor::{
    BatchOrchestrator, BatchOutcome, BatchReport, BatchSettings, RetryPolicy,
};
