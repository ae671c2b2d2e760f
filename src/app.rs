use std::path::Path;

use tracing::{info_span, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::load_input_records;
use crate::orchestrator::{BatchOrchestrator, BatchOutcome, BatchSettings, RetryPolicy};
use crate::services::JsonPackageWriter;
use crate::session::ChromiumSessionFactory;
use crate::utils::logging::{log_records_loaded, log_startup, print_final_stats};

/// 应用主结构
pub struct App {
    config: Config,
    orchestrator: BatchOrchestrator<ChromiumSessionFactory, JsonPackageWriter>,
}

impl App {
    /// 组装应用，浏览器在批处理开始时才连接
    pub fn new(config: Config) -> Self {
        log_startup(&config);

        let span = info_span!("flashcard_optimiser");
        let factory = ChromiumSessionFactory::new(&config).with_span(span.clone());
        let writer = JsonPackageWriter::new(&config.output_dir);
        let orchestrator = BatchOrchestrator::new(
            factory,
            writer,
            BatchSettings::from_config(&config),
            RetryPolicy::from_config(&config),
            span,
        );

        Self {
            config,
            orchestrator,
        }
    }

    /// 运行应用主逻辑
    ///
    /// 输入为空时返回 `None`；最终包写入失败时返回错误。
    pub async fn run(&self) -> AppResult<Option<BatchOutcome>> {
        let records =
            load_input_records(Path::new(&self.config.input_file), self.config.header_lines)
                .await
                .map_err(|e| AppError::Input(format!("{:#}", e)))?;

        if records.is_empty() {
            warn!("⚠️ 输入文件中没有卡片，程序结束");
            return Ok(None);
        }
        log_records_loaded(records.len(), self.config.checkpoint_every);

        let outcome = self.orchestrator.run(&records).await;

        print_final_stats(&outcome.report, &self.config.output_log_file);
        match outcome.final_package {
            Ok(_) => Ok(Some(outcome)),
            Err(e) => Err(e.into()),
        }
    }
}
