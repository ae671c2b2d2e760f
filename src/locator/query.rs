//! 元素查询描述
//!
//! 三种基本查询方式（CSS + 文本过滤、test-id、角色 + 名称），
//! 再加上从匹配列表中取第几个。`Within` 把一个查询限定在另一个查询
//! 选中元素的父容器里。驱动层负责把它们翻译成实际的 DOM 查找。

use serde::Serialize;
use std::fmt;

/// 文本匹配方式
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum TextMatch {
    /// 压缩空白后完全相等
    Exact(String),
    /// 忽略大小写的子串匹配
    Contains(String),
}

impl TextMatch {
    pub fn exact(text: impl Into<String>) -> Self {
        TextMatch::Exact(text.into())
    }

    pub fn contains(text: impl Into<String>) -> Self {
        TextMatch::Contains(text.into())
    }

    /// 判断候选文本是否匹配
    pub fn matches(&self, candidate: &str) -> bool {
        let candidate = normalize(candidate);
        match self {
            TextMatch::Exact(wanted) => candidate == normalize(wanted),
            TextMatch::Contains(wanted) => candidate
                .to_lowercase()
                .contains(&normalize(wanted).to_lowercase()),
        }
    }
}

impl fmt::Display for TextMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextMatch::Exact(text) => write!(f, "={:?}", text),
            TextMatch::Contains(text) => write!(f, "~{:?}", text),
        }
    }
}

/// 压缩连续空白并去掉首尾空白
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 从匹配列表中取哪一个
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "at", content = "index", rename_all = "snake_case")]
pub enum Pick {
    #[default]
    First,
    Last,
    Nth(usize),
}

impl Pick {
    /// 在长度为 `len` 的列表中选出下标
    pub fn index_in(self, len: usize) -> Option<usize> {
        match self {
            Pick::First if len > 0 => Some(0),
            Pick::Last if len > 0 => Some(len - 1),
            Pick::Nth(i) if i < len => Some(i),
            _ => None,
        }
    }
}

/// 元素查询
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Query {
    /// CSS 选择器，可按可见文本过滤
    Css {
        selector: String,
        text: Option<TextMatch>,
        pick: Pick,
    },
    /// `data-test-id` 属性
    TestId { id: String, pick: Pick },
    /// ARIA 角色，可按可访问名称过滤
    Role {
        role: String,
        name: Option<TextMatch>,
        pick: Pick,
    },
    /// 先用 `scope` 选出一个元素，再在它的父容器里查找 `inner`
    Within { scope: Box<Query>, inner: Box<Query> },
}

impl Query {
    pub fn css(selector: impl Into<String>) -> Self {
        Query::Css {
            selector: selector.into(),
            text: None,
            pick: Pick::First,
        }
    }

    pub fn test_id(id: impl Into<String>) -> Self {
        Query::TestId {
            id: id.into(),
            pick: Pick::First,
        }
    }

    pub fn role(role: impl Into<String>) -> Self {
        Query::Role {
            role: role.into(),
            name: None,
            pick: Pick::First,
        }
    }

    /// 在 `scope` 选中元素的父容器里查找 `inner`；取第几个由 `inner` 决定
    pub fn within(scope: Query, inner: Query) -> Self {
        Query::Within {
            scope: Box::new(scope),
            inner: Box::new(inner),
        }
    }

    /// 按可见文本过滤（仅 CSS 查询）
    pub fn with_text(mut self, matcher: TextMatch) -> Self {
        if let Query::Css { text, .. } = &mut self {
            *text = Some(matcher);
        }
        self
    }

    /// 按可访问名称过滤（仅角色查询）
    pub fn named(mut self, matcher: TextMatch) -> Self {
        if let Query::Role { name, .. } = &mut self {
            *name = Some(matcher);
        }
        self
    }

    pub fn nth(self, index: usize) -> Self {
        self.pick(Pick::Nth(index))
    }

    pub fn last(self) -> Self {
        self.pick(Pick::Last)
    }

    pub fn pick(mut self, at: Pick) -> Self {
        self.set_pick(at);
        self
    }

    fn set_pick(&mut self, at: Pick) {
        match self {
            Query::Css { pick, .. } | Query::TestId { pick, .. } | Query::Role { pick, .. } => {
                *pick = at
            }
            Query::Within { inner, .. } => inner.set_pick(at),
        }
    }

    pub fn picked(&self) -> Pick {
        match self {
            Query::Css { pick, .. } | Query::TestId { pick, .. } | Query::Role { pick, .. } => *pick,
            Query::Within { inner, .. } => inner.picked(),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Css { selector, text, .. } => {
                write!(f, "css:{}", selector)?;
                if let Some(text) = text {
                    write!(f, "[text{}]", text)?;
                }
            }
            Query::TestId { id, .. } => write!(f, "test-id:{}", id)?,
            Query::Role { role, name, .. } => {
                write!(f, "role:{}", role)?;
                if let Some(name) = name {
                    write!(f, "[name{}]", name)?;
                }
            }
            Query::Within { scope, inner } => return write!(f, "{} in {}", inner, scope),
        }
        match self.picked() {
            Pick::First => Ok(()),
            Pick::Last => write!(f, " (last)"),
            Pick::Nth(i) => write!(f, " (nth {})", i),
        }
    }
}
