//! 日志初始化
//!
//! 控制台和日志文件各一个输出层，级别由 `RUST_LOG` 控制，
//! 未设置时为 `info`（详细模式下为 `debug`）。

use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 初始化全局日志，日志文件以追加方式打开
pub fn init(log_file_path: &str, verbose: bool) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .with_context(|| format!("无法打开日志文件: {}", log_file_path))?;

    let log_header = format!(
        "{}\n闪卡优化日志 - {}\n{}\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    file.write_all(log_header.as_bytes())
        .with_context(|| format!("写入日志文件失败: {}", log_file_path))?;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let console_layer = fmt::layer().with_target(false);
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(Arc::new(file));

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("日志系统已初始化")?;

    Ok(())
}
