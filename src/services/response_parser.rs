//! 回答解析服务 - 业务能力层
//!
//! 只负责把一段回答文本变成问答对，不关心回答从哪里来。

use serde::Deserialize;

use crate::error::TransformError;
use crate::models::QaPair;

/// 回答的两种可接受形状
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QaPayload {
    List(Vec<QaPair>),
    Wrapped { qas: Vec<QaPair> },
}

/// 去掉代码块标记和语言标签
///
/// 依次去掉两端的反引号、开头的 `json` / `JSON`、两端空白。
pub fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim().trim_matches('`');
    let text = text
        .strip_prefix("json")
        .or_else(|| text.strip_prefix("JSON"))
        .unwrap_or(text);
    text.trim()
}

/// 解析回答为问答对
///
/// 解析是全有或全无的：只要有一处不符合结构，整条回答都算失败。
pub fn parse_qa_pairs(raw: &str) -> Result<Vec<QaPair>, TransformError> {
    let text = strip_code_fence(raw);
    match serde_json::from_str::<QaPayload>(text) {
        Ok(QaPayload::List(pairs)) | Ok(QaPayload::Wrapped { qas: pairs }) => Ok(pairs),
        Err(source) => Err(TransformError::InvalidJson {
            raw: text.to_string(),
            source,
        }),
    }
}
