//! 日志工具模块
//!
//! 提供日志格式化和输出的辅助函数

use tracing::{info, warn};

use crate::config::Config;
use crate::orchestrator::BatchReport;

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 闪卡优化");
    info!("📄 输入文件: {}", config.input_file);
    info!("🤖 角色: {} | 模型: {}", config.persona_name, config.model_name);
    info!("{}", "=".repeat(60));
}

/// 记录卡片加载信息
pub fn log_records_loaded(total: usize, checkpoint_every: usize) {
    info!("✓ 找到 {} 张待处理的卡片", total);
    if checkpoint_every > 0 {
        info!("💾 每生成 {} 张新卡片写一个中间包\n", checkpoint_every);
    }
}

/// 打印最终统计信息
pub fn print_final_stats(report: &BatchReport, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📥 加载卡片: {}", report.total_loaded);
    info!("✅ 处理成功: {}", report.processed);
    warn!("⏭️ 跳过: {}", report.skipped);
    if report.unfinished > 0 {
        warn!("❌ 未完成: {}", report.unfinished);
    }
    info!("✨ 生成新卡片: {}", report.derived);
    info!(
        "💾 中间包: {} | 转储包: {} | 会话次数: {}",
        report.checkpoints, report.crash_dumps, report.session_attempts
    );
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

/// 多行原文缩进一级，方便在日志里辨认
pub fn indent_raw(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push('\t');
        out.push_str(line);
    }
    out
}
