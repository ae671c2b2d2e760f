#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use flashcard_optimiser::error::{PersistenceError, SessionError, SessionResult};
use flashcard_optimiser::infrastructure::{DomDriver, Presence};
use flashcard_optimiser::locator::{Query, TextMatch};
use flashcard_optimiser::models::{InputRecord, OutputRecord, QaPair};
use flashcard_optimiser::orchestrator::BatchSettings;
use flashcard_optimiser::services::{PackageName, PackageSink};
use flashcard_optimiser::session::{
    ChatSession, GeminiUi, SessionFactory, SessionTimeouts, Submit, UiMap,
};

// ========== 假 DOM ==========

/// 用发送按钮提交的 Gemini 界面
#[derive(Debug, Clone, Copy, Default)]
pub struct SendButtonUi;

impl UiMap for SendButtonUi {
    fn input_box(&self) -> Query {
        GeminiUi.input_box()
    }

    fn submit(&self) -> Submit {
        Submit::Click(Query::css("button.send-button"))
    }

    fn responses(&self) -> Query {
        GeminiUi.responses()
    }

    fn persona_entry(&self, name: &str) -> Query {
        GeminiUi.persona_entry(name)
    }

    fn persona_active(&self, name: &str) -> Query {
        GeminiUi.persona_active(name)
    }

    fn model_menu(&self) -> Query {
        GeminiUi.model_menu()
    }

    fn model_option(&self, name: &str) -> Query {
        GeminiUi.model_option(name)
    }

    fn conversation_menu(&self, index: usize) -> Query {
        GeminiUi.conversation_menu(index)
    }

    fn delete_action(&self) -> Query {
        GeminiUi.delete_action()
    }

    fn confirm_dialog(&self) -> Query {
        GeminiUi.confirm_dialog()
    }

    fn confirm_button(&self) -> Query {
        GeminiUi.confirm_button()
    }
}

/// 假页面上的一个元素
#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    /// 句柄，也是动作日志里的名字
    pub key: String,
    pub selector: Option<String>,
    pub test_id: Option<String>,
    pub role: Option<String>,
    /// 可见文本，同时当作可访问名称
    pub label: String,
    /// 父容器
    pub parent: Option<String>,
    pub visible: bool,
}

impl FakeElement {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            visible: true,
            ..Default::default()
        }
    }

    pub fn css(mut self, selector: &str) -> Self {
        self.selector = Some(selector.to_string());
        self
    }

    pub fn test_id(mut self, id: &str) -> Self {
        self.test_id = Some(id.to_string());
        self
    }

    pub fn role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn inside(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// 不含范围限定的单个查询是否选中本元素，文本比较用库里的 `TextMatch`
    fn matches(&self, query: &Query) -> bool {
        let label_ok = |m: &Option<TextMatch>| m.as_ref().map_or(true, |m| m.matches(&self.label));
        match query {
            Query::Css { selector, text, .. } => {
                self.selector.as_deref() == Some(selector.as_str()) && label_ok(text)
            }
            Query::TestId { id, .. } => self.test_id.as_deref() == Some(id.as_str()),
            Query::Role { role, name, .. } => {
                self.role.as_deref() == Some(role.as_str()) && label_ok(name)
            }
            Query::Within { .. } => false,
        }
    }
}

#[derive(Debug, Default)]
pub struct DomState {
    /// 按文档顺序排列
    elements: Vec<FakeElement>,
    /// 每次提交后回答依次显示的文本
    answers: VecDeque<Vec<String>>,
    stream: VecDeque<String>,
    responses: usize,
    input: String,
    /// 打开了操作菜单、等待确认删除的对话行
    pending_delete: Option<String>,
    pub actions: Vec<String>,
}

impl DomState {
    fn resolve<'a>(&'a self, query: &Query, parent: Option<&str>) -> Vec<&'a FakeElement> {
        match query {
            Query::Within { scope, inner } => {
                let anchors = self.resolve(scope, parent);
                match scope.picked().index_in(anchors.len()) {
                    Some(i) => self.resolve(inner, anchors[i].parent.as_deref()),
                    None => Vec::new(),
                }
            }
            _ => self
                .elements
                .iter()
                .filter(|el| parent.map_or(true, |p| el.parent.as_deref() == Some(p)))
                .filter(|el| el.matches(query))
                .collect(),
        }
    }

    fn pick(&self, query: &Query) -> Option<&FakeElement> {
        let found = self.resolve(query, None);
        query.picked().index_in(found.len()).map(|i| found[i])
    }

    fn element(&self, key: &str) -> Option<&FakeElement> {
        self.elements.iter().find(|el| el.key == key)
    }

    fn set_visible(&mut self, key: &str, visible: bool) {
        for el in self.elements.iter_mut().filter(|el| el.key == key) {
            el.visible = visible;
        }
    }

    fn latest_response(&self) -> String {
        format!("response-{}", self.responses)
    }

    fn submit(&mut self) {
        let prompt = std::mem::take(&mut self.input);
        self.actions.push(format!("submit:{prompt}"));
        self.stream = self.answers.pop_front().unwrap_or_default().into();
        self.responses += 1;
        let key = self.latest_response();
        self.elements
            .push(FakeElement::new(&key).css("message-content"));
    }
}

/// 内存中的 Gemini 页面，点击会按固定规则改变元素
#[derive(Debug, Clone, Default)]
pub struct FakeDom {
    state: Arc<Mutex<DomState>>,
}

impl FakeDom {
    /// Gemini 首页：两个 Gem 入口、模型菜单、页头的操作菜单和三条最近对话
    pub fn home_page() -> Self {
        let mut elements = vec![
            FakeElement::new("header-menu")
                .test_id("actions-menu-button")
                .inside("header"),
            FakeElement::new("gem:Coding Partner")
                .role("button")
                .label("Coding Partner"),
            FakeElement::new("gem:My Flashcard Optimiser")
                .role("button")
                .label("My  Flashcard\n Optimiser"),
            FakeElement::new("chat-history").css("#chat-history"),
            FakeElement::new("model-menu").css("[data-test-id='bard-mode-menu-button'] button"),
            FakeElement::new("model:Fast")
                .role("menuitemradio")
                .label("Fast")
                .hidden(),
            FakeElement::new("model:Thinking")
                .role("menuitemradio")
                .label("Thinking")
                .hidden(),
        ];
        for i in 0..3 {
            let row = format!("row-{i}");
            elements.push(
                FakeElement::new(&format!("conversation-{i}"))
                    .test_id("conversation")
                    .label(&format!("Chat {i}"))
                    .inside(&row),
            );
            elements.push(
                FakeElement::new(&format!("conversation-menu-{i}"))
                    .test_id("actions-menu-button")
                    .inside(&row)
                    .hidden(),
            );
        }
        elements.extend([
            FakeElement::new("input").role("textbox"),
            FakeElement::new("send").css("button.send-button"),
            FakeElement::new("delete")
                .css("button[data-test-id='delete-button']")
                .hidden(),
            FakeElement::new("dialog").css("mat-dialog-container").hidden(),
            FakeElement::new("confirm")
                .css("mat-dialog-container button[data-test-id='confirm-button']")
                .hidden(),
        ]);

        let dom = FakeDom::default();
        dom.state.lock().unwrap().elements = elements;
        dom
    }

    pub fn without(self, key: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .elements
            .retain(|el| el.key != key);
        self
    }

    /// 下一次提交后回答依次显示的文本
    pub fn answer_with(self, snapshots: &[&str]) -> Self {
        self.state
            .lock()
            .unwrap()
            .answers
            .push_back(snapshots.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn actions(&self) -> Vec<String> {
        self.state.lock().unwrap().actions.clone()
    }

    pub fn is_visible(&self, key: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .element(key)
            .map_or(false, |el| el.visible)
    }

    pub fn has(&self, key: &str) -> bool {
        self.state.lock().unwrap().element(key).is_some()
    }
}

impl DomDriver for FakeDom {
    type Handle = String;

    async fn goto(&self, url: &str) -> SessionResult<()> {
        self.state.lock().unwrap().actions.push(format!("goto:{url}"));
        Ok(())
    }

    async fn ready_state(&self) -> SessionResult<String> {
        Ok("complete".to_string())
    }

    async fn lookup(&self, query: &Query) -> SessionResult<Presence<String>> {
        let state = self.state.lock().unwrap();
        Ok(match state.pick(query) {
            Some(el) if el.visible => Presence::Visible(el.key.clone()),
            Some(el) => Presence::Attached(el.key.clone()),
            None => Presence::Missing,
        })
    }

    async fn count(&self, query: &Query) -> SessionResult<usize> {
        Ok(self.state.lock().unwrap().resolve(query, None).len())
    }

    async fn click(&self, handle: &String, force: bool) -> SessionResult<()> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        let (visible, label, parent) = match state.element(handle) {
            Some(el) => (el.visible, el.label.clone(), el.parent.clone()),
            None => return Err(SessionError::Script(format!("{handle} is detached"))),
        };
        if !force && !visible {
            return Err(SessionError::Script(format!("{handle} is not interactable")));
        }
        state.actions.push(if force {
            format!("click:{handle}:force")
        } else {
            format!("click:{handle}")
        });

        match handle.as_str() {
            h if h.starts_with("gem:") => {
                if let Some(history) = state.elements.iter_mut().find(|el| el.key == "chat-history") {
                    history.label = label;
                }
            }
            "model-menu" | "model:Fast" | "model:Thinking" => {
                let open = handle.as_str() == "model-menu";
                for option in state
                    .elements
                    .iter_mut()
                    .filter(|el| el.role.as_deref() == Some("menuitemradio"))
                {
                    option.visible = open;
                }
            }
            h if h.starts_with("conversation-menu-") => {
                state.pending_delete = parent;
                state.set_visible("delete", true);
            }
            "delete" => {
                state.set_visible("delete", false);
                state.set_visible("dialog", true);
                state.set_visible("confirm", true);
            }
            "confirm" => {
                state.set_visible("dialog", false);
                state.set_visible("confirm", false);
                if let Some(row) = state.pending_delete.take() {
                    state
                        .elements
                        .retain(|el| el.parent.as_deref() != Some(row.as_str()));
                }
            }
            "send" => state.submit(),
            _ => {}
        }
        Ok(())
    }

    async fn fill(&self, handle: &String, text: &str) -> SessionResult<()> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(format!("fill:{handle}"));
        state.input = text.to_string();
        Ok(())
    }

    async fn press_key(&self, handle: &String, key: &str) -> SessionResult<()> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(format!("press:{handle}:{key}"));
        if key == "Enter" {
            state.submit();
        }
        Ok(())
    }

    async fn inner_text(&self, handle: &String) -> SessionResult<String> {
        let mut state = self.state.lock().unwrap();
        if *handle != state.latest_response() {
            return Ok(state
                .element(handle)
                .map(|el| el.label.clone())
                .unwrap_or_default());
        }
        let text = if state.stream.len() > 1 {
            state.stream.pop_front()
        } else {
            state.stream.front().cloned()
        };
        Ok(text.unwrap_or_default())
    }

    async fn close(self) -> SessionResult<()> {
        self.state.lock().unwrap().actions.push("close".to_string());
        Ok(())
    }
}

pub fn fast_timeouts() -> SessionTimeouts {
    SessionTimeouts {
        element: Duration::from_secs(2),
        writing: Duration::from_secs(30),
        poll_interval: Duration::from_secs(1),
        locator_poll: Duration::from_millis(100),
    }
}

// ========== 脚本化会话 ==========

pub type Responder = Box<dyn FnMut(&QaPair) -> SessionResult<String> + Send>;

pub struct Script {
    pub log: Vec<String>,
    pub opens: usize,
    pub closes: usize,
    pub failing_opens: usize,
    responder: Responder,
}

/// 按回调回答问题的会话工厂
#[derive(Clone)]
pub struct ScriptedFactory {
    script: Arc<Mutex<Script>>,
}

impl ScriptedFactory {
    pub fn new(responder: impl FnMut(&QaPair) -> SessionResult<String> + Send + 'static) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                log: Vec::new(),
                opens: 0,
                closes: 0,
                failing_opens: 0,
                responder: Box::new(responder),
            })),
        }
    }

    /// 前 `n` 次打开会话都失败
    pub fn failing_first_opens(self, n: usize) -> Self {
        self.script.lock().unwrap().failing_opens = n;
        self
    }

    pub fn log(&self) -> Vec<String> {
        self.script.lock().unwrap().log.clone()
    }

    /// 按顺序被问到的问题
    pub fn asked(&self) -> Vec<String> {
        self.log()
            .into_iter()
            .filter_map(|line| line.strip_prefix("ask:").map(str::to_string))
            .collect()
    }

    pub fn opens(&self) -> usize {
        self.script.lock().unwrap().opens
    }

    pub fn closes(&self) -> usize {
        self.script.lock().unwrap().closes
    }
}

pub struct ScriptedSession {
    script: Arc<Mutex<Script>>,
}

impl SessionFactory for ScriptedFactory {
    type Session = ScriptedSession;

    async fn open(&self) -> SessionResult<ScriptedSession> {
        let mut script = self.script.lock().unwrap();
        script.opens += 1;
        if script.failing_opens > 0 {
            script.failing_opens -= 1;
            return Err(SessionError::connection("127.0.0.1:9222", "connection refused"));
        }
        Ok(ScriptedSession {
            script: self.script.clone(),
        })
    }
}

impl ChatSession for ScriptedSession {
    async fn select_persona(&mut self, name: &str) -> SessionResult<()> {
        self.script.lock().unwrap().log.push(format!("persona:{name}"));
        Ok(())
    }

    async fn select_model(&mut self, name: &str) -> SessionResult<()> {
        self.script.lock().unwrap().log.push(format!("model:{name}"));
        Ok(())
    }

    async fn ask(&mut self, prompt: &str) -> SessionResult<String> {
        let pair: QaPair = serde_json::from_str(prompt)?;
        let mut script = self.script.lock().unwrap();
        script.log.push(format!("ask:{}", pair.q));
        (script.responder)(&pair)
    }

    async fn delete_recent_conversation(&mut self, index: usize) -> SessionResult<()> {
        self.script.lock().unwrap().log.push(format!("delete:{index}"));
        Ok(())
    }

    async fn close(self) -> SessionResult<()> {
        self.script.lock().unwrap().closes += 1;
        Ok(())
    }
}

/// `count` 个问答对组成的回答
pub fn qa_answer(q: &str, count: usize) -> String {
    let pairs: Vec<QaPair> = (0..count)
        .map(|i| QaPair {
            q: format!("{q}.{i}"),
            a: format!("answer {i}"),
        })
        .collect();
    format!("```json\n{}\n```", serde_json::to_string(&pairs).unwrap())
}

// ========== 记录写入的包 ==========

#[derive(Default)]
pub struct RecordingSink {
    /// 所有写入尝试的包名
    pub attempts: Mutex<Vec<String>>,
    /// 成功写入的包名和记录
    pub written: Mutex<Vec<(String, Vec<OutputRecord>)>>,
    fail_once: Mutex<HashSet<String>>,
}

impl RecordingSink {
    /// 指定包名的第一次写入失败
    pub fn failing_once(names: &[&str]) -> Self {
        Self {
            fail_once: Mutex::new(names.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        }
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn written_names(&self) -> Vec<String> {
        self.written
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn package(&self, name: &str) -> Option<Vec<OutputRecord>> {
        self.written
            .lock()
            .unwrap()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, records)| records.clone())
    }
}

impl PackageSink for RecordingSink {
    fn write_package(
        &self,
        name: PackageName,
        records: &[OutputRecord],
    ) -> Result<PathBuf, PersistenceError> {
        let name = name.to_string();
        self.attempts.lock().unwrap().push(name.clone());
        if self.fail_once.lock().unwrap().remove(&name) {
            return Err(PersistenceError::Write {
                path: PathBuf::from(format!("{name}.json")),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            });
        }
        self.written
            .lock()
            .unwrap()
            .push((name.clone(), records.to_vec()));
        Ok(PathBuf::from(format!("{name}.json")))
    }
}

impl PackageSink for &RecordingSink {
    fn write_package(
        &self,
        name: PackageName,
        records: &[OutputRecord],
    ) -> Result<PathBuf, PersistenceError> {
        (**self).write_package(name, records)
    }
}

// ========== 输入数据 ==========

pub fn records(count: usize) -> Vec<InputRecord> {
    (1..=count)
        .map(|i| InputRecord::new(format!("Deck{}", i % 2), format!("Q{i}"), format!("A{i}")))
        .collect()
}

pub fn settings() -> BatchSettings {
    BatchSettings {
        persona: "Flashcard Optimiser".to_string(),
        model: "Thinking".to_string(),
        group_prefix: "Gemini".to_string(),
        checkpoint_every: 30,
    }
}
