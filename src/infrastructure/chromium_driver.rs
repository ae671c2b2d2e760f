//! 基于 chromiumoxide 的 DOM 驱动
//!
//! 查询在页面里用一段脚本完成：找到的元素会被打上 `data-fo-handle` 属性，
//! 之后的点击、按键、读文本都通过这个属性重新找到同一个元素。

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::browser::BrowserConnection;
use crate::error::{SessionError, SessionResult};
use crate::infrastructure::{DomDriver, JsExecutor, Presence};
use crate::locator::Query;

const HANDLE_ATTR: &str = "data-fo-handle";

/// 页面内查询脚本，`__QUERY__` 替换为序列化后的查询，`__COUNT_ONLY__` 为布尔值
const LOOKUP_SCRIPT: &str = r#"
(() => {
    const q = __QUERY__;
    const countOnly = __COUNT_ONLY__;
    const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
    const matches = (m, value) => {
        if (!m) return true;
        const v = norm(value);
        if (m.mode === 'exact') return v === norm(m.value);
        return v.toLowerCase().includes(norm(m.value).toLowerCase());
    };
    const roleSelectors = {
        button: 'button, [role="button"], input[type="button"], input[type="submit"]',
        textbox: 'textarea, input:not([type]), input[type="text"], [contenteditable="true"], [role="textbox"]',
    };
    const accessibleName = (el) => el.getAttribute('aria-label') || el.innerText || el.textContent || '';

    const pickOf = (q) => (q.kind === 'within' ? pickOf(q.inner) : q.pick);
    const pickFrom = (pick, nodes) => {
        if (pick.at === 'first') return nodes[0];
        if (pick.at === 'last') return nodes[nodes.length - 1];
        return nodes[pick.index];
    };
    const resolve = (q, root) => {
        if (q.kind === 'css') {
            return Array.from(root.querySelectorAll(q.selector))
                .filter((el) => matches(q.text, el.innerText || el.textContent));
        }
        if (q.kind === 'test_id') {
            return Array.from(root.querySelectorAll('[data-test-id]'))
                .filter((el) => el.getAttribute('data-test-id') === q.id);
        }
        if (q.kind === 'within') {
            const anchor = pickFrom(pickOf(q.scope), resolve(q.scope, root));
            if (!anchor) return [];
            return resolve(q.inner, anchor.parentElement || anchor);
        }
        const selector = roleSelectors[q.role] || `[role="${q.role}"]`;
        return Array.from(root.querySelectorAll(selector))
            .filter((el) => matches(q.name, accessibleName(el)));
    };

    const nodes = resolve(q, document);
    if (countOnly) return { count: nodes.length, handle: '', visible: false };

    const el = pickFrom(pickOf(q), nodes);
    if (!el) return { count: nodes.length, handle: '', visible: false };

    if (!el.hasAttribute('__ATTR__')) {
        window.__foHandleSeq = (window.__foHandleSeq || 0) + 1;
        el.setAttribute('__ATTR__', String(window.__foHandleSeq));
    }
    const style = window.getComputedStyle(el);
    const visible = style.visibility !== 'hidden'
        && style.display !== 'none'
        && el.getClientRects().length > 0;
    return { count: nodes.length, handle: el.getAttribute('__ATTR__'), visible };
})()
"#;

const FILL_SCRIPT: &str = r#"
((selector, text) => {
    const el = document.querySelector(selector);
    if (!el) return { ok: false };
    el.focus();
    if (el instanceof HTMLInputElement || el instanceof HTMLTextAreaElement) {
        const setter = Object.getOwnPropertyDescriptor(Object.getPrototypeOf(el), 'value').set;
        setter.call(el, text);
        el.dispatchEvent(new Event('input', { bubbles: true }));
        el.dispatchEvent(new Event('change', { bubbles: true }));
    } else {
        const range = document.createRange();
        range.selectNodeContents(el);
        const selection = window.getSelection();
        selection.removeAllRanges();
        selection.addRange(range);
        document.execCommand('insertText', false, text);
        el.dispatchEvent(new Event('input', { bubbles: true }));
    }
    return { ok: true };
})(__SELECTOR__, __TEXT__)
"#;

#[derive(Debug, Deserialize)]
struct LookupReply {
    count: usize,
    handle: String,
    visible: bool,
}

#[derive(Debug, Deserialize)]
struct ActionReply {
    ok: bool,
    #[serde(default)]
    text: String,
}

/// Chromium 页面驱动
pub struct ChromiumDriver {
    executor: JsExecutor,
    connection: BrowserConnection,
}

impl ChromiumDriver {
    /// 在连接上打开新页面
    pub async fn open(connection: BrowserConnection) -> SessionResult<Self> {
        let page = connection.new_page().await?;
        Ok(Self {
            executor: JsExecutor::new(page),
            connection,
        })
    }

    fn selector_for(handle: &str) -> String {
        format!("[{}=\"{}\"]", HANDLE_ATTR, handle)
    }

    async fn run_lookup(&self, query: &Query, count_only: bool) -> SessionResult<LookupReply> {
        let js_code = LOOKUP_SCRIPT
            .replace("__COUNT_ONLY__", if count_only { "true" } else { "false" })
            .replace("__ATTR__", HANDLE_ATTR)
            .replace("__QUERY__", &serde_json::to_string(query)?);
        self.executor.eval_as(js_code).await
    }

    async fn run_on_handle(&self, handle: &str, body: &str) -> SessionResult<ActionReply> {
        let js_code = format!(
            r#"
            ((selector) => {{
                const el = document.querySelector(selector);
                if (!el) return {{ ok: false }};
                {}
            }})({})
            "#,
            body,
            serde_json::to_string(&Self::selector_for(handle))?
        );
        self.executor.eval_as(js_code).await
    }

    fn stale(handle: &str) -> SessionError {
        SessionError::Script(format!("元素引用已失效: {}", handle))
    }
}

impl DomDriver for ChromiumDriver {
    type Handle = String;

    async fn goto(&self, url: &str) -> SessionResult<()> {
        debug!("导航到: {}", url);
        self.executor.page().goto(url).await?;
        Ok(())
    }

    async fn ready_state(&self) -> SessionResult<String> {
        let reply: serde_json::Value = self
            .executor
            .eval("(() => ({ state: document.readyState }))()")
            .await?;
        Ok(reply
            .get("state")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string())
    }

    async fn lookup(&self, query: &Query) -> SessionResult<Presence<String>> {
        let reply = self.run_lookup(query, false).await?;
        Ok(match (reply.handle.is_empty(), reply.visible) {
            (true, _) => Presence::Missing,
            (false, true) => Presence::Visible(reply.handle),
            (false, false) => Presence::Attached(reply.handle),
        })
    }

    async fn count(&self, query: &Query) -> SessionResult<usize> {
        Ok(self.run_lookup(query, true).await?.count)
    }

    async fn click(&self, handle: &String, force: bool) -> SessionResult<()> {
        if force {
            let reply = self.run_on_handle(handle, "el.click(); return { ok: true };").await?;
            if !reply.ok {
                return Err(Self::stale(handle));
            }
            return Ok(());
        }
        let element = self
            .executor
            .page()
            .find_element(Self::selector_for(handle))
            .await?;
        element.click().await?;
        Ok(())
    }

    async fn fill(&self, handle: &String, text: &str) -> SessionResult<()> {
        let js_code = FILL_SCRIPT
            .replace("__SELECTOR__", &serde_json::to_string(&Self::selector_for(handle))?)
            .replace("__TEXT__", &json!(text).to_string());
        let reply: ActionReply = self.executor.eval_as(js_code).await?;
        if !reply.ok {
            return Err(Self::stale(handle));
        }
        Ok(())
    }

    async fn press_key(&self, handle: &String, key: &str) -> SessionResult<()> {
        let element = self
            .executor
            .page()
            .find_element(Self::selector_for(handle))
            .await?;
        element.press_key(key).await?;
        Ok(())
    }

    async fn inner_text(&self, handle: &String) -> SessionResult<String> {
        let reply = self
            .run_on_handle(handle, "return { ok: true, text: el.innerText || '' };")
            .await?;
        Ok(reply.text)
    }

    async fn close(self) -> SessionResult<()> {
        let ChromiumDriver {
            executor,
            connection,
        } = self;
        executor.into_page().close().await?;
        debug!("页面已关闭: {}", connection.endpoint());
        Ok(())
    }
}
