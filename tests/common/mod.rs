//! Scripted in-process browser engine for engine-level tests.
//!
//! Serves a fixed site map for exploration tests and selector-keyed
//! responses for executor tests, with no real browser involved.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use sentinel::browser::{
    BrowserEngine, BrowserError, BrowserResult, ConsoleHandler, ContextId, LaunchOptions,
    NavigateOptions, PageId, ResponseHandler,
};
use sentinel::dom::RawDomData;
use sentinel::dom::scripts::{BODY_LENGTH_SCRIPT, DOM_EXTRACTION_SCRIPT, TITLE_SCRIPT};
use sentinel::explore::ReadinessConfig;

/// Readiness tuned so polling settles in a few milliseconds.
pub fn fast_readiness() -> ReadinessConfig {
    ReadinessConfig {
        stability_timeout_ms: 100,
        network_idle_timeout_ms: 10,
        poll_interval_ms: 2,
    }
}

/// Build a leaf element.
pub fn element(tag: &str, attrs: &[(&str, &str)], text: &str) -> RawDomData {
    RawDomData {
        tag: tag.to_string(),
        id: None,
        classes: Vec::new(),
        attributes: attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
        text_content: text.to_string(),
        children: Vec::new(),
        bounding_box: None,
        is_visible: true,
    }
}

/// Build a page body whose links point at `hrefs`.
pub fn page_with_links(hrefs: &[&str]) -> RawDomData {
    let mut body = element("body", &[], "");
    for href in hrefs {
        body.children
            .push(element("a", &[("href", href)], &format!("link to {href}")));
    }
    let mut html = element("html", &[], "");
    html.children.push(body);
    html
}

#[derive(Clone)]
pub struct MockPage {
    pub title: String,
    pub dom: RawDomData,
}

/// Scripted engine: a site map plus selector-keyed assertion answers.
#[derive(Default)]
pub struct MockEngine {
    pub site: HashMap<String, MockPage>,
    pub redirects: HashMap<String, String>,
    pub fail_navigation: HashSet<String>,
    pub visible_selectors: HashSet<String>,
    pub text_by_selector: HashMap<String, String>,
    pub count_by_selector: HashMap<String, u64>,
    pub attr_by_selector: HashMap<String, String>,
    pub click_errors: HashSet<String>,
    pub clicks: Mutex<Vec<String>>,
    current_url: Mutex<HashMap<u64, String>>,
    next_handle: AtomicU64,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, title: &str, dom: RawDomData) -> Self {
        self.site.insert(
            url.to_string(),
            MockPage {
                title: title.to_string(),
                dom,
            },
        );
        self
    }

    fn page_at(&self, page: PageId) -> Option<MockPage> {
        let current = self.current_url.lock().ok()?;
        let url = current.get(&page.0)?;
        self.site.get(url).cloned()
    }

    fn selector_answer<'m, T: Clone>(
        script: &str,
        answers: &'m HashMap<String, T>,
    ) -> Option<T> {
        answers.iter().find_map(|(selector, answer)| {
            let embedded = serde_json::to_string(selector).ok()?;
            script.contains(&embedded).then(|| answer.clone())
        })
    }
}

#[async_trait]
impl BrowserEngine for MockEngine {
    async fn launch(&self, _opts: &LaunchOptions) -> BrowserResult<()> {
        Ok(())
    }

    async fn close(&self) -> BrowserResult<()> {
        Ok(())
    }

    async fn create_context(&self) -> BrowserResult<ContextId> {
        Ok(ContextId(self.next_handle.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn close_context(&self, _ctx: ContextId) -> BrowserResult<()> {
        Ok(())
    }

    async fn create_page(&self, _ctx: ContextId) -> BrowserResult<PageId> {
        let id = self.next_handle.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut current) = self.current_url.lock() {
            current.insert(id, "about:blank".to_string());
        }
        Ok(PageId(id))
    }

    async fn close_page(&self, _page: PageId) -> BrowserResult<()> {
        Ok(())
    }

    async fn navigate(
        &self,
        page: PageId,
        url: &str,
        _opts: NavigateOptions,
    ) -> BrowserResult<Option<u16>> {
        if self.fail_navigation.contains(url) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                message: "connection refused".to_string(),
            });
        }
        let landed = self
            .redirects
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string());
        self.current_url
            .lock()
            .map_err(|_| BrowserError::Protocol("url table poisoned".to_string()))?
            .insert(page.0, landed);
        Ok(Some(200))
    }

    async fn current_url(&self, page: PageId) -> BrowserResult<String> {
        self.current_url
            .lock()
            .map_err(|_| BrowserError::Protocol("url table poisoned".to_string()))?
            .get(&page.0)
            .cloned()
            .ok_or(BrowserError::UnknownPage(page))
    }

    async fn click(&self, _page: PageId, selector: &str) -> BrowserResult<()> {
        if self.click_errors.contains(selector) {
            return Err(BrowserError::ElementNotFound(selector.to_string()));
        }
        if let Ok(mut clicks) = self.clicks.lock() {
            clicks.push(selector.to_string());
        }
        Ok(())
    }

    async fn type_text(&self, _page: PageId, _selector: &str, _text: &str) -> BrowserResult<()> {
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        _page: PageId,
        selector: &str,
        _timeout: Duration,
    ) -> BrowserResult<bool> {
        Ok(self.visible_selectors.contains(selector))
    }

    async fn evaluate(&self, page: PageId, script: &str) -> BrowserResult<Value> {
        if script == DOM_EXTRACTION_SCRIPT {
            let mock = self
                .page_at(page)
                .ok_or_else(|| BrowserError::Evaluation("no page content".to_string()))?;
            return serde_json::to_value(&mock.dom)
                .map_err(|e| BrowserError::Evaluation(e.to_string()));
        }
        if script == TITLE_SCRIPT {
            let title = self.page_at(page).map(|p| p.title).unwrap_or_default();
            return Ok(Value::String(title));
        }
        if script == BODY_LENGTH_SCRIPT {
            let length = self
                .page_at(page)
                .map(|p| p.title.len() as u64 + 100)
                .unwrap_or(0);
            return Ok(json!(length));
        }
        if script.contains("textContent") {
            return Ok(Value::String(
                Self::selector_answer(script, &self.text_by_selector).unwrap_or_default(),
            ));
        }
        if script.contains("querySelectorAll") {
            return Ok(json!(
                Self::selector_answer(script, &self.count_by_selector).unwrap_or(0)
            ));
        }
        if script.contains("getAttribute") {
            return Ok(Value::String(
                Self::selector_answer(script, &self.attr_by_selector).unwrap_or_default(),
            ));
        }
        Ok(Value::Null)
    }

    async fn screenshot(&self, _page: PageId) -> BrowserResult<Vec<u8>> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn on_response(&self, _ctx: ContextId, _handler: ResponseHandler) -> BrowserResult<()> {
        Ok(())
    }

    async fn remove_interceptors(&self, _ctx: ContextId) -> BrowserResult<()> {
        Ok(())
    }

    async fn on_console_error(
        &self,
        _page: PageId,
        _handler: ConsoleHandler,
    ) -> BrowserResult<()> {
        Ok(())
    }

    async fn export_har(&self, _ctx: ContextId) -> BrowserResult<Value> {
        Ok(json!({"log": {"entries": []}}))
    }
}
