use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_FILE: &str = "flashcard_optimiser.toml";

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 对话服务地址
    pub target_url: String,
    /// 导出的卡片文件（TSV）
    pub input_file: String,
    /// 输入文件开头需要跳过的行数
    pub header_lines: usize,
    /// 输出包目录
    pub output_dir: String,
    /// 输出日志文件
    pub output_log_file: String,
    /// 对话角色（Gem）名称
    pub persona_name: String,
    /// 模型名称
    pub model_name: String,
    /// 生成记录的分组前缀
    pub group_prefix: String,
    /// 每生成多少条记录写一次中间包
    pub checkpoint_every: usize,
    /// 元素等待超时（毫秒）
    pub element_timeout_ms: u64,
    /// 回答写作超时（毫秒）
    pub writing_timeout_ms: u64,
    /// 回答轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 元素探测间隔（毫秒）
    pub locator_poll_ms: u64,
    /// 会话崩溃后重试前的等待（毫秒）
    pub retry_backoff_ms: u64,
    /// 最多尝试建立多少次会话，不设置则无限重试
    pub max_session_attempts: Option<usize>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- 清理对话 ---
    pub cleanup_count: usize,
    pub cleanup_index: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: 9222,
            target_url: "https://gemini.google.com/app".to_string(),
            input_file: "./exported.txt".to_string(),
            header_lines: 3,
            output_dir: "./flashcards_out".to_string(),
            output_log_file: "./flashcard_optimiser.log".to_string(),
            persona_name: "Flashcard Optimiser".to_string(),
            model_name: "Thinking".to_string(),
            group_prefix: "Gemini".to_string(),
            checkpoint_every: 30,
            element_timeout_ms: 40_000,
            writing_timeout_ms: 180_000,
            poll_interval_ms: 1_000,
            locator_poll_ms: 100,
            retry_backoff_ms: 3_000,
            max_session_attempts: None,
            verbose_logging: false,
            cleanup_count: 0,
            cleanup_index: 0,
        }
    }
}

impl Config {
    /// 读取配置文件（若存在），再用环境变量覆盖
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("FLASHCARD_OPTIMISER_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let base = if Path::new(&path).exists() {
            Self::from_toml_file(&path)?
        } else {
            Self::default()
        };

        base.with_env_overrides()
    }

    /// 只使用默认值和环境变量
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载，缺失的字段使用默认值
    pub fn from_toml_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        override_parsed("BROWSER_DEBUG_PORT", &mut self.browser_debug_port, "u16")?;
        override_string("TARGET_URL", &mut self.target_url);
        override_string("INPUT_FILE", &mut self.input_file);
        override_parsed("HEADER_LINES", &mut self.header_lines, "usize")?;
        override_string("OUTPUT_DIR", &mut self.output_dir);
        override_string("OUTPUT_LOG_FILE", &mut self.output_log_file);
        override_string("PERSONA_NAME", &mut self.persona_name);
        override_string("MODEL_NAME", &mut self.model_name);
        override_string("GROUP_PREFIX", &mut self.group_prefix);
        override_parsed("CHECKPOINT_EVERY", &mut self.checkpoint_every, "usize")?;
        override_parsed("ELEMENT_TIMEOUT_MS", &mut self.element_timeout_ms, "u64")?;
        override_parsed("WRITING_TIMEOUT_MS", &mut self.writing_timeout_ms, "u64")?;
        override_parsed("POLL_INTERVAL_MS", &mut self.poll_interval_ms, "u64")?;
        override_parsed("LOCATOR_POLL_MS", &mut self.locator_poll_ms, "u64")?;
        override_parsed("RETRY_BACKOFF_MS", &mut self.retry_backoff_ms, "u64")?;
        if let Some(value) = read_var("MAX_SESSION_ATTEMPTS") {
            self.max_session_attempts = Some(parse_var("MAX_SESSION_ATTEMPTS", &value, "usize")?);
        }
        override_parsed("VERBOSE_LOGGING", &mut self.verbose_logging, "bool")?;
        override_parsed("CLEANUP_COUNT", &mut self.cleanup_count, "usize")?;
        override_parsed("CLEANUP_INDEX", &mut self.cleanup_index, "usize")?;
        Ok(self)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn writing_timeout(&self) -> Duration {
        Duration::from_millis(self.writing_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn locator_poll(&self) -> Duration {
        Duration::from_millis(self.locator_poll_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

fn read_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn override_string(name: &str, slot: &mut String) {
    if let Some(value) = read_var(name) {
        *slot = value;
    }
}

fn override_parsed<T: FromStr>(
    name: &str,
    slot: &mut T,
    expected_type: &'static str,
) -> Result<(), ConfigError> {
    if let Some(value) = read_var(name) {
        *slot = parse_var(name, &value, expected_type)?;
    }
    Ok(())
}

fn parse_var<T: FromStr>(name: &str, value: &str, expected_type: &'static str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::EnvVarParseFailed {
            var_name: name.to_string(),
            value: value.to_string(),
            expected_type,
        })
}
