use serde::{Deserialize, Serialize};

/// 导出文件中的一张卡片
///
/// 身份由它在加载序列中的位置决定，内容可能重复。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRecord {
    pub group: String,
    pub question: String,
    pub answer: String,
}

impl InputRecord {
    pub fn new(
        group: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// 发送给对话服务的内容：`{"q": ..., "a": ...}`
    pub fn to_prompt(&self) -> String {
        // 两个字段都是字符串，序列化不会失败
        serde_json::to_string(&QaPair {
            q: self.question.clone(),
            a: self.answer.clone(),
        })
        .unwrap_or_default()
    }
}

/// 生成的卡片
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub group: String,
    pub question: String,
    pub answer: String,
}

impl OutputRecord {
    /// 由问答对构造，分组挂在生成标记下：`{prefix}::{group}`
    pub fn derive(pair: QaPair, source: &InputRecord, group_prefix: &str) -> Self {
        Self {
            group: derived_group(group_prefix, &source.group),
            question: pair.q,
            answer: pair.a,
        }
    }
}

pub fn derived_group(prefix: &str, group: &str) -> String {
    format!("{}::{}", prefix, group)
}

/// 对话服务返回的单个问答对
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub q: String,
    pub a: String,
}
