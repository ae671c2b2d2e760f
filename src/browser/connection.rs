use crate::error::{SessionError, SessionResult};
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

/// 与远程浏览器的 CDP 连接
///
/// 浏览器进程不归我们管：这里只断开连接，不关闭浏览器。
/// 被丢弃时停止后台事件循环，连接随之释放。
pub struct BrowserConnection {
    browser: Browser,
    handler_task: JoinHandle<()>,
    endpoint: String,
}

impl BrowserConnection {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 打开一个空白页面
    pub async fn new_page(&self) -> SessionResult<Page> {
        self.browser.new_page("about:blank").await.map_err(|e| {
            error!("创建新页面失败: {}", e);
            SessionError::connection(&self.endpoint, format!("创建页面失败: {}", e))
        })
    }
}

impl Drop for BrowserConnection {
    fn drop(&mut self) {
        debug!("断开浏览器连接: {}", self.endpoint);
        self.handler_task.abort();
    }
}

/// 连接到已经在运行的浏览器（远程调试端口）
pub async fn connect_to_browser(port: u16) -> SessionResult<BrowserConnection> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        SessionError::connection(&browser_url, e)
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(Duration::from_millis(300)).await;

    Ok(BrowserConnection {
        browser,
        handler_task,
        endpoint: browser_url,
    })
}
