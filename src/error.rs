use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 会话相关错误
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
    /// 写包失败
    #[error("持久化错误: {0}")]
    Persistence(#[from] PersistenceError),
    /// 输入文件无法加载
    #[error("输入错误: {0}")]
    Input(String),
}

/// 会话错误
///
/// 任何一种都意味着当前自动化会话已不可信，编排层会丢弃会话并重建。
#[derive(Debug, Error)]
pub enum SessionError {
    /// 元素在超时时间内没有出现（或没有消失）
    #[error("等待元素超时 ({timeout:?}): {role}")]
    LocatorTimeout { role: String, timeout: Duration },

    /// 回答在写作超时时间内没有稳定
    #[error("等待回答稳定超时 ({timeout:?})")]
    ResponseTimeout { timeout: Duration },

    /// 无法连接控制端口或导航失败
    #[error("无法连接到 {target}: {reason}")]
    Connection { target: String, reason: String },

    /// CDP 命令失败
    #[error("CDP 错误: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    /// 页面脚本返回了无法识别的结果
    #[error("执行脚本失败: {0}")]
    Script(String),

    /// 会话不在允许该操作的状态
    #[error("会话状态错误: 需要 {expected}, 当前 {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Script(err.to_string())
    }
}

/// 回答无法解析为问答对
#[derive(Debug, Error)]
pub enum TransformError {
    /// 不是合法 JSON，或结构不符
    #[error("回答不是合法的问答 JSON: {source}")]
    InvalidJson {
        raw: String,
        #[source]
        source: serde_json::Error,
    },
}

impl TransformError {
    /// 原始回答（已去掉代码块标记）
    pub fn raw(&self) -> &str {
        match self {
            TransformError::InvalidJson { raw, .. } => raw,
        }
    }
}

/// 写包失败
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// 创建输出目录失败
    #[error("无法创建输出目录 {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 序列化失败
    #[error("序列化包 {name} 失败: {source}")]
    Serialize {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败
    #[error("读取配置文件 {path} 失败: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件解析失败
    #[error("解析配置文件 {path} 失败: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: &'static str,
    },
}

// ========== 便捷构造函数 ==========

impl SessionError {
    /// 创建连接错误
    pub fn connection(target: impl Into<String>, reason: impl ToString) -> Self {
        SessionError::Connection {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    /// 创建元素等待超时错误
    pub fn locator_timeout(role: impl ToString, timeout: Duration) -> Self {
        SessionError::LocatorTimeout {
            role: role.to_string(),
            timeout,
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 会话操作结果类型
pub type SessionResult<T> = Result<T, SessionError>;
