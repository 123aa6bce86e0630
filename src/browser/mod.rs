//! Browser driver abstraction.
//!
//! Both engines drive the browser exclusively through the [`BrowserEngine`]
//! trait so that exploration and execution logic stay independent of the
//! concrete automation backend. The shipped backend is chromiumoxide
//! ([`ChromiumEngine`]); tests substitute scripted implementations.

pub mod chromium;
pub mod launch;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use chromium::ChromiumEngine;
pub use launch::{find_browser_executable, launch_chromium};

/// Opaque handle to a browser context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(pub u64);

/// Opaque handle to a page within a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(pub u64);

/// Browser family to launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BrowserType {
    Chromium,
    Firefox,
    Webkit,
}

impl Default for BrowserType {
    fn default() -> Self {
        Self::Chromium
    }
}

/// Options for [`BrowserEngine::launch`].
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub browser: BrowserType,
    pub headless: bool,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            browser: BrowserType::Chromium,
            headless: true,
        }
    }
}

/// Options for [`BrowserEngine::navigate`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NavigateOptions {
    /// Overall navigation deadline. `None` uses the backend default.
    pub timeout: Option<Duration>,
}

/// A network response observed by a context interceptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkResponse {
    pub url: String,
    pub status: u16,
    #[serde(default)]
    pub status_text: String,
}

/// Callback invoked for every observed [`NetworkResponse`].
pub type ResponseHandler = Arc<dyn Fn(NetworkResponse) + Send + Sync>;

/// Callback invoked for every console error line emitted by a page.
pub type ConsoleHandler = Arc<dyn Fn(String) + Send + Sync>;

/// Driver-level failures.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Browser is not running")]
    NotLaunched,

    #[error("Unknown context {0:?}")]
    UnknownContext(ContextId),

    #[error("Unknown page {0:?}")]
    UnknownPage(PageId),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Script evaluation failed: {0}")]
    Evaluation(String),

    #[error("Element not found for selector {0:?}")]
    ElementNotFound(String),

    #[error("Screenshot failed: {0}")]
    Screenshot(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

pub type BrowserResult<T> = Result<T, BrowserError>;

/// Minimal driver contract consumed by the discovery and execution engines.
///
/// Page and context handles are opaque; callers never touch backend types.
/// All methods take `&self` so an engine can be shared behind a reference
/// across the single-owner call sites of each engine.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Launch the underlying browser process.
    async fn launch(&self, opts: &LaunchOptions) -> BrowserResult<()>;

    /// Shut the browser down, releasing every context and page.
    async fn close(&self) -> BrowserResult<()>;

    async fn create_context(&self) -> BrowserResult<ContextId>;

    async fn close_context(&self, ctx: ContextId) -> BrowserResult<()>;

    async fn create_page(&self, ctx: ContextId) -> BrowserResult<PageId>;

    async fn close_page(&self, page: PageId) -> BrowserResult<()>;

    /// Navigate and return the main-document HTTP status when the backend
    /// exposes one.
    async fn navigate(
        &self,
        page: PageId,
        url: &str,
        opts: NavigateOptions,
    ) -> BrowserResult<Option<u16>>;

    /// Current URL of the page, after any redirects or SPA routing.
    async fn current_url(&self, page: PageId) -> BrowserResult<String>;

    async fn click(&self, page: PageId, selector: &str) -> BrowserResult<()>;

    async fn type_text(&self, page: PageId, selector: &str, text: &str) -> BrowserResult<()>;

    /// Wait until `selector` matches an element. Returns `true` when the
    /// element appeared within `timeout`, `false` when it did not.
    async fn wait_for_selector(
        &self,
        page: PageId,
        selector: &str,
        timeout: Duration,
    ) -> BrowserResult<bool>;

    /// Evaluate a script in the page and return its JSON result.
    async fn evaluate(&self, page: PageId, script: &str) -> BrowserResult<serde_json::Value>;

    /// Capture a PNG screenshot of the page.
    async fn screenshot(&self, page: PageId) -> BrowserResult<Vec<u8>>;

    /// Observe every network response produced by pages of `ctx`.
    async fn on_response(&self, ctx: ContextId, handler: ResponseHandler) -> BrowserResult<()>;

    /// Drop all response interceptors registered on `ctx`.
    async fn remove_interceptors(&self, ctx: ContextId) -> BrowserResult<()>;

    /// Observe console errors emitted by `page`. Backends without console
    /// event support may accept the handler and never invoke it.
    async fn on_console_error(&self, page: PageId, handler: ConsoleHandler) -> BrowserResult<()>;

    /// Export the network activity of `ctx` as a HAR-shaped JSON document.
    async fn export_har(&self, ctx: ContextId) -> BrowserResult<serde_json::Value>;
}
