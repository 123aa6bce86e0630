//! chromiumoxide-backed implementation of [`BrowserEngine`].
//!
//! Owns the browser process, its CDP handler task, and the handle tables
//! mapping opaque [`ContextId`]/[`PageId`] values to chromiumoxide pages.
//! Contexts are logical groupings used for response interception; pages in a
//! context share the browser profile.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::network::EventResponseReceived;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::cdp::js_protocol::runtime::{ConsoleApiCalledType, EventConsoleApiCalled};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use log::{debug, warn};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use super::launch::launch_chromium;
use super::{
    BrowserEngine, BrowserError, BrowserResult, BrowserType, ConsoleHandler, ContextId,
    LaunchOptions, NavigateOptions, NetworkResponse, PageId, ResponseHandler,
};

const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

struct Session {
    browser: Browser,
    handler_task: JoinHandle<()>,
    user_data_dir: PathBuf,
}

struct ContextState {
    pages: Vec<PageId>,
    /// Handlers registered through `on_response`; cleared by
    /// `remove_interceptors` while the per-page recorder tasks keep running.
    handlers: Arc<RwLock<Vec<ResponseHandler>>>,
    responses: Arc<StdMutex<Vec<NetworkResponse>>>,
}

struct PageState {
    page: Page,
    ctx: ContextId,
    tasks: Vec<JoinHandle<()>>,
}

#[derive(Default)]
struct Inner {
    session: Option<Session>,
    next_handle: u64,
    contexts: HashMap<ContextId, ContextState>,
    pages: HashMap<PageId, PageState>,
}

/// Chromium driver. One instance owns at most one browser process.
#[derive(Default)]
pub struct ChromiumEngine {
    inner: tokio::sync::Mutex<Inner>,
}

impl ChromiumEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn page(&self, page: PageId) -> BrowserResult<Page> {
        let inner = self.inner.lock().await;
        inner
            .pages
            .get(&page)
            .map(|st| st.page.clone())
            .ok_or(BrowserError::UnknownPage(page))
    }
}

#[async_trait]
impl BrowserEngine for ChromiumEngine {
    async fn launch(&self, opts: &LaunchOptions) -> BrowserResult<()> {
        if opts.browser != BrowserType::Chromium {
            return Err(BrowserError::Launch(format!(
                "unsupported browser type {:?}, this engine drives chromium",
                opts.browser
            )));
        }

        let mut inner = self.inner.lock().await;
        if inner.session.is_some() {
            return Err(BrowserError::Launch("browser already running".into()));
        }

        let (browser, handler_task, user_data_dir) = launch_chromium(opts.headless)
            .await
            .map_err(|e| BrowserError::Launch(format!("{e:#}")))?;

        inner.session = Some(Session {
            browser,
            handler_task,
            user_data_dir,
        });
        Ok(())
    }

    async fn close(&self) -> BrowserResult<()> {
        let mut inner = self.inner.lock().await;
        for (_, st) in inner.pages.drain() {
            for task in st.tasks {
                task.abort();
            }
        }
        inner.contexts.clear();

        let Some(mut session) = inner.session.take() else {
            return Ok(());
        };
        drop(inner);

        session.handler_task.abort();
        if let Err(e) = session.browser.close().await {
            warn!("Browser close failed: {e}");
        }
        if let Err(e) = session.browser.wait().await {
            warn!("Browser wait failed: {e}");
        }
        if let Err(e) = std::fs::remove_dir_all(&session.user_data_dir) {
            warn!(
                "Failed to remove profile directory {}: {e}",
                session.user_data_dir.display()
            );
        }
        Ok(())
    }

    async fn create_context(&self) -> BrowserResult<ContextId> {
        let mut inner = self.inner.lock().await;
        if inner.session.is_none() {
            return Err(BrowserError::NotLaunched);
        }
        inner.next_handle += 1;
        let ctx = ContextId(inner.next_handle);
        inner.contexts.insert(
            ctx,
            ContextState {
                pages: Vec::new(),
                handlers: Arc::new(RwLock::new(Vec::new())),
                responses: Arc::new(StdMutex::new(Vec::new())),
            },
        );
        Ok(ctx)
    }

    async fn close_context(&self, ctx: ContextId) -> BrowserResult<()> {
        let pages = {
            let mut inner = self.inner.lock().await;
            let state = inner
                .contexts
                .remove(&ctx)
                .ok_or(BrowserError::UnknownContext(ctx))?;
            state.pages
        };
        for page in pages {
            if let Err(e) = self.close_page(page).await {
                debug!("Page {page:?} already gone during context close: {e}");
            }
        }
        Ok(())
    }

    async fn create_page(&self, ctx: ContextId) -> BrowserResult<PageId> {
        let mut inner = self.inner.lock().await;
        let session = inner.session.as_ref().ok_or(BrowserError::NotLaunched)?;

        let page = session
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Protocol(e.to_string()))?;

        inner.next_handle += 1;
        let id = PageId(inner.next_handle);

        let context = inner
            .contexts
            .get_mut(&ctx)
            .ok_or(BrowserError::UnknownContext(ctx))?;
        context.pages.push(id);

        // Always-on recorder: feeds both export_har and registered handlers.
        let handlers = Arc::clone(&context.handlers);
        let responses = Arc::clone(&context.responses);
        let mut tasks = Vec::new();
        match page.event_listener::<EventResponseReceived>().await {
            Ok(mut events) => {
                tasks.push(tokio::spawn(async move {
                    while let Some(event) = events.next().await {
                        let response = NetworkResponse {
                            url: event.response.url.clone(),
                            status: u16::try_from(event.response.status).unwrap_or(0),
                            status_text: event.response.status_text.clone(),
                        };
                        if let Ok(mut log) = responses.lock() {
                            log.push(response.clone());
                        }
                        if let Ok(registered) = handlers.read() {
                            for handler in registered.iter() {
                                handler(response.clone());
                            }
                        }
                    }
                }));
            }
            Err(e) => warn!("Failed to attach response listener: {e}"),
        }

        inner.pages.insert(
            id,
            PageState {
                page,
                ctx,
                tasks,
            },
        );
        Ok(id)
    }

    async fn close_page(&self, page: PageId) -> BrowserResult<()> {
        let state = {
            let mut inner = self.inner.lock().await;
            let state = inner
                .pages
                .remove(&page)
                .ok_or(BrowserError::UnknownPage(page))?;
            if let Some(ctx) = inner.contexts.get_mut(&state.ctx) {
                ctx.pages.retain(|p| *p != page);
            }
            state
        };
        for task in state.tasks {
            task.abort();
        }
        state
            .page
            .close()
            .await
            .map_err(|e| BrowserError::Protocol(e.to_string()))?;
        Ok(())
    }

    async fn navigate(
        &self,
        page: PageId,
        url: &str,
        opts: NavigateOptions,
    ) -> BrowserResult<Option<u16>> {
        let handle = self.page(page).await?;
        let timeout = opts.timeout.unwrap_or(DEFAULT_NAVIGATION_TIMEOUT);

        let goto = async {
            handle
                .goto(url)
                .await
                .map_err(|e| BrowserError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            handle
                .wait_for_navigation()
                .await
                .map_err(|e| BrowserError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok::<(), BrowserError>(())
        };
        match tokio::time::timeout(timeout, goto).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(BrowserError::Navigation {
                    url: url.to_string(),
                    message: format!("timeout after {}ms", timeout.as_millis()),
                });
            }
        }

        // Best effort: the recorder may have seen the main document response.
        let final_url = self.current_url(page).await.unwrap_or_default();
        let inner = self.inner.lock().await;
        let status = inner
            .pages
            .get(&page)
            .and_then(|st| inner.contexts.get(&st.ctx))
            .and_then(|ctx| {
                ctx.responses
                    .lock()
                    .ok()
                    .and_then(|log| {
                        log.iter()
                            .rev()
                            .find(|r| r.url == final_url || r.url == url)
                            .map(|r| r.status)
                    })
            });
        Ok(status)
    }

    async fn current_url(&self, page: PageId) -> BrowserResult<String> {
        let handle = self.page(page).await?;
        let url = handle
            .url()
            .await
            .map_err(|e| BrowserError::Protocol(e.to_string()))?;
        url.ok_or_else(|| BrowserError::Protocol("page has no URL".into()))
    }

    async fn click(&self, page: PageId, selector: &str) -> BrowserResult<()> {
        let handle = self.page(page).await?;
        let element = handle
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;
        element
            .click()
            .await
            .map_err(|e| BrowserError::Protocol(e.to_string()))?;
        Ok(())
    }

    async fn type_text(&self, page: PageId, selector: &str, text: &str) -> BrowserResult<()> {
        let handle = self.page(page).await?;
        let element = handle
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;
        element
            .click()
            .await
            .map_err(|e| BrowserError::Protocol(e.to_string()))?;
        element
            .type_str(text)
            .await
            .map_err(|e| BrowserError::Protocol(e.to_string()))?;
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        page: PageId,
        selector: &str,
        timeout: Duration,
    ) -> BrowserResult<bool> {
        let handle = self.page(page).await?;
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if handle.find_element(selector).await.is_ok() {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn evaluate(&self, page: PageId, script: &str) -> BrowserResult<Value> {
        let handle = self.page(page).await?;
        let result = handle
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Evaluation(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn screenshot(&self, page: PageId) -> BrowserResult<Vec<u8>> {
        let handle = self.page(page).await?;
        handle
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
            )
            .await
            .map_err(|e| BrowserError::Screenshot(e.to_string()))
    }

    async fn on_response(&self, ctx: ContextId, handler: ResponseHandler) -> BrowserResult<()> {
        let inner = self.inner.lock().await;
        let context = inner
            .contexts
            .get(&ctx)
            .ok_or(BrowserError::UnknownContext(ctx))?;
        context
            .handlers
            .write()
            .map_err(|_| BrowserError::Protocol("interceptor registry poisoned".into()))?
            .push(handler);
        Ok(())
    }

    async fn remove_interceptors(&self, ctx: ContextId) -> BrowserResult<()> {
        let inner = self.inner.lock().await;
        let context = inner
            .contexts
            .get(&ctx)
            .ok_or(BrowserError::UnknownContext(ctx))?;
        context
            .handlers
            .write()
            .map_err(|_| BrowserError::Protocol("interceptor registry poisoned".into()))?
            .clear();
        Ok(())
    }

    async fn on_console_error(&self, page: PageId, handler: ConsoleHandler) -> BrowserResult<()> {
        let handle = self.page(page).await?;
        let mut events = handle
            .event_listener::<EventConsoleApiCalled>()
            .await
            .map_err(|e| BrowserError::Protocol(e.to_string()))?;

        let task = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if event.r#type != ConsoleApiCalledType::Error {
                    continue;
                }
                let message = event
                    .args
                    .iter()
                    .filter_map(|arg| {
                        arg.value
                            .as_ref()
                            .map(ToString::to_string)
                            .or_else(|| arg.description.clone())
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                handler(message);
            }
        });

        let mut inner = self.inner.lock().await;
        if let Some(state) = inner.pages.get_mut(&page) {
            state.tasks.push(task);
        } else {
            task.abort();
            return Err(BrowserError::UnknownPage(page));
        }
        Ok(())
    }

    async fn export_har(&self, ctx: ContextId) -> BrowserResult<Value> {
        let inner = self.inner.lock().await;
        let context = inner
            .contexts
            .get(&ctx)
            .ok_or(BrowserError::UnknownContext(ctx))?;
        let entries: Vec<Value> = context
            .responses
            .lock()
            .map_err(|_| BrowserError::Protocol("response log poisoned".into()))?
            .iter()
            .map(|r| {
                json!({
                    "request": { "url": r.url },
                    "response": { "status": r.status, "statusText": r.status_text },
                })
            })
            .collect();
        Ok(json!({
            "log": {
                "version": "1.2",
                "creator": { "name": "sentinel", "version": env!("CARGO_PKG_VERSION") },
                "entries": entries,
            }
        }))
    }
}
