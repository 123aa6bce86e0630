//! Chromium process discovery and launch.
//!
//! Locates a system Chrome/Chromium executable, builds a hardened launch
//! configuration with a per-instance profile directory, and spawns the CDP
//! event handler task that drives the connection.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use futures::StreamExt;
use tokio::task::{self, JoinHandle};
use tracing::{error, info, warn};

/// Find a Chrome/Chromium executable on the system.
///
/// `CHROMIUM_PATH` overrides every other method; after that, well-known
/// installation paths are probed, and finally `which` on Unix systems.
pub fn find_browser_executable() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            info!("Using browser from CHROMIUM_PATH: {}", path.display());
            return Ok(path);
        }
        warn!(
            "CHROMIUM_PATH points to non-existent file: {}",
            path.display()
        );
    }

    let candidates: Vec<PathBuf> = if cfg!(target_os = "macos") {
        vec![
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome".into(),
            "/Applications/Chromium.app/Contents/MacOS/Chromium".into(),
            "~/Applications/Google Chrome.app/Contents/MacOS/Google Chrome".into(),
            "/opt/homebrew/bin/chromium".into(),
        ]
    } else if cfg!(target_os = "windows") {
        vec![
            r"C:\Program Files\Google\Chrome\Application\chrome.exe".into(),
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe".into(),
            r"C:\Program Files\Chromium\Application\chrome.exe".into(),
        ]
    } else {
        vec![
            "/usr/bin/google-chrome".into(),
            "/usr/bin/google-chrome-stable".into(),
            "/usr/bin/chromium".into(),
            "/usr/bin/chromium-browser".into(),
            "/snap/bin/chromium".into(),
            "/opt/google/chrome/chrome".into(),
        ]
    };

    for path in candidates {
        let expanded = if let Ok(stripped) = path.strip_prefix("~") {
            match dirs::home_dir() {
                Some(home) => home.join(stripped),
                None => continue,
            }
        } else {
            path
        };
        if expanded.exists() {
            info!("Found browser at: {}", expanded.display());
            return Ok(expanded);
        }
    }

    if !cfg!(target_os = "windows") {
        for cmd in &["chromium", "chromium-browser", "google-chrome", "chrome"] {
            if let Ok(output) = Command::new("which").arg(cmd).output()
                && output.status.success()
            {
                let path_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path_str.is_empty() {
                    let path = PathBuf::from(path_str);
                    info!("Found browser via 'which': {}", path.display());
                    return Ok(path);
                }
            }
        }
    }

    Err(anyhow::anyhow!("Chrome/Chromium executable not found"))
}

/// Launch a Chromium instance with a fresh profile directory.
///
/// Returns the browser, the handler task driving the CDP connection, and the
/// profile directory that must be removed once the browser has shut down.
/// The handler task MUST be aborted when the browser is closed; leaving it
/// running keeps the event stream (and the process) alive.
pub async fn launch_chromium(headless: bool) -> Result<(Browser, JoinHandle<()>, PathBuf)> {
    let chrome_path = find_browser_executable()?;

    let user_data_dir = std::env::temp_dir().join(format!(
        "sentinel_chrome_{}_{}",
        std::process::id(),
        uuid::Uuid::new_v4().simple()
    ));
    std::fs::create_dir_all(&user_data_dir).context("Failed to create profile directory")?;

    let headless_mode = if headless {
        HeadlessMode::New
    } else {
        HeadlessMode::False
    };

    let browser_config = BrowserConfigBuilder::default()
        .request_timeout(Duration::from_secs(30))
        .window_size(1440, 900)
        .user_data_dir(user_data_dir.clone())
        .chrome_executable(chrome_path)
        .headless_mode(headless_mode)
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-infobars")
        .arg("--disable-notifications")
        .arg("--disable-extensions")
        .arg("--disable-popup-blocking")
        .arg("--disable-background-networking")
        .arg("--disable-background-timer-throttling")
        .arg("--disable-breakpad")
        .arg("--disable-hang-monitor")
        .arg("--disable-prompt-on-repost")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--no-sandbox")
        .arg("--mute-audio")
        .arg("--hide-scrollbars")
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build browser config: {e}"))?;

    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .context("Failed to launch browser")?;

    let handler_task = task::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                error!("Browser handler error: {e:?}");
            }
        }
        info!("Browser event handler task completed");
    });

    Ok((browser, handler_task, user_data_dir))
}
