//! 批量删除最近的对话
//!
//! 连接同一个浏览器，从最近对话列表的 `CLEANUP_INDEX` 位置开始，
//! 连续删除 `CLEANUP_COUNT` 个对话。

use anyhow::Result;
use tracing::{error, info};

use flashcard_optimiser::error::AppResult;
use flashcard_optimiser::session::{ChromiumSessionFactory, SessionFactory};
use flashcard_optimiser::{logger, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    logger::init(&config.output_log_file, config.verbose_logging)?;

    info!(
        "🧹 删除 {} 个对话 (从第 {} 个开始)",
        config.cleanup_count, config.cleanup_index
    );

    let deleted = delete_conversations(&config).await?;
    info!("✓ 已删除 {}/{} 个对话", deleted, config.cleanup_count);
    Ok(())
}

/// 返回实际删除的个数
async fn delete_conversations(config: &Config) -> AppResult<usize> {
    let factory = ChromiumSessionFactory::new(config);
    let mut session = factory.open().await?;

    let mut deleted = 0;
    for _ in 0..config.cleanup_count {
        // 删除后后面的对话会前移，位置不变
        if let Err(e) = session.delete_recent_conversation(config.cleanup_index).await {
            error!("❌ 删除失败: {}", e);
            break;
        }
        deleted += 1;
    }

    session.close().await?;
    Ok(deleted)
}
