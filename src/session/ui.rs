//! 对话界面的元素映射
//!
//! 会话控制器只认识抽象角色（输入框、最新回答、角色选择……），
//! 具体用什么查询找到它们由 `UiMap` 决定，换一个界面只需换一个实现。

use crate::locator::{Query, TextMatch};

/// 提交问题的方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submit {
    /// 在输入框上按键
    Key(String),
    /// 点击发送按钮
    Click(Query),
}

/// 界面角色到查询的映射
pub trait UiMap: Send + Sync {
    /// 输入框
    fn input_box(&self) -> Query;
    /// 提交方式
    fn submit(&self) -> Submit;
    /// 回答区域（所有回答，取最后一个）
    fn responses(&self) -> Query;
    /// 侧栏里的角色入口
    fn persona_entry(&self, name: &str) -> Query;
    /// 角色生效后界面上出现的标志
    fn persona_active(&self, name: &str) -> Query;
    /// 模型下拉按钮
    fn model_menu(&self) -> Query;
    /// 下拉中的模型选项
    fn model_option(&self, name: &str) -> Query;
    /// 第 `index` 个最近对话的操作菜单按钮
    fn conversation_menu(&self, index: usize) -> Query;
    /// 操作菜单中的删除按钮
    fn delete_action(&self) -> Query;
    /// 确认对话框
    fn confirm_dialog(&self) -> Query;
    /// 确认对话框里的确认按钮
    fn confirm_button(&self) -> Query;
    /// 标签匹配规则，默认忽略大小写的子串匹配
    fn label(&self, name: &str) -> TextMatch {
        TextMatch::contains(name)
    }
}

/// Gemini 网页版
#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiUi;

impl UiMap for GeminiUi {
    fn input_box(&self) -> Query {
        Query::role("textbox")
    }

    fn submit(&self) -> Submit {
        Submit::Key("Enter".to_string())
    }

    fn responses(&self) -> Query {
        Query::css("message-content").last()
    }

    fn persona_entry(&self, name: &str) -> Query {
        Query::role("button").named(self.label(name))
    }

    fn persona_active(&self, name: &str) -> Query {
        Query::css("#chat-history").with_text(self.label(name))
    }

    fn model_menu(&self) -> Query {
        Query::css("[data-test-id='bard-mode-menu-button'] button")
    }

    fn model_option(&self, name: &str) -> Query {
        Query::role("menuitemradio").named(self.label(name))
    }

    fn conversation_menu(&self, index: usize) -> Query {
        Query::within(
            Query::test_id("conversation").nth(index),
            Query::test_id("actions-menu-button"),
        )
    }

    fn delete_action(&self) -> Query {
        Query::css("button[data-test-id='delete-button']")
    }

    fn confirm_dialog(&self) -> Query {
        Query::css("mat-dialog-container")
    }

    fn confirm_button(&self) -> Query {
        Query::css("mat-dialog-container button[data-test-id='confirm-button']")
    }
}
