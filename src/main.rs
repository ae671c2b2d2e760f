use anyhow::Result;
use flashcard_optimiser::{logger, App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logger::init(&config.output_log_file, config.verbose_logging)?;

    // 初始化并运行应用
    let _outcome = App::new(config).run().await?;

    Ok(())
}
