use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use scout_core::driver::{DriverCandidate, DriverTimeouts, EngineKind};
use scout_core::error::AppError;
use scout_core::traits::{Driver, EngineLauncher};
use tokio::task::JoinHandle;

/// Launches Chrome or Chromium over the Chrome DevTools Protocol.
///
/// Each candidate gets its own browser process; the acquisition chain
/// decides which one to keep.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromiumLauncher;

impl ChromiumLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl EngineLauncher for ChromiumLauncher {
    type Driver = ChromiumDriver;

    async fn launch(&self, candidate: &DriverCandidate) -> Result<ChromiumDriver, AppError> {
        let binary = resolve_binary(candidate)?;
        match &binary {
            Some(bin) => tracing::info!(engine = %candidate.engine, binary = %bin.display(), "Launching browser"),
            None => tracing::info!(engine = %candidate.engine, "Launching browser from default location"),
        }

        let config = build_config(candidate, binary.as_deref())?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            AppError::BrowserError(format!("Failed to launch {}: {e}", candidate.engine))
        })?;

        // The CDP handler must be polled continuously for the connection to work.
        let engine = candidate.engine;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::warn!(%engine, error = %e, "Browser CDP handler error");
                    break;
                }
            }
        });

        Ok(ChromiumDriver {
            engine: candidate.engine,
            browser,
            handler_task,
            timeouts: candidate.timeouts,
        })
    }
}

/// Explicit override first, then the engine's well-known install paths.
///
/// Chromium falls back to `chromiumoxide`'s own lookup when nothing is
/// found; Chrome does not, so a missing Chrome moves the chain on.
fn resolve_binary(candidate: &DriverCandidate) -> Result<Option<PathBuf>, AppError> {
    if let Some(path) = &candidate.binary_path {
        if !path.exists() {
            return Err(AppError::BrowserError(format!(
                "{} binary override {} does not exist",
                candidate.engine,
                path.display()
            )));
        }
        return Ok(Some(path.clone()));
    }

    match find_binary(candidate.engine) {
        Some(path) => Ok(Some(path)),
        None if candidate.engine == EngineKind::Chromium => Ok(None),
        None => Err(AppError::BrowserError(format!(
            "{} binary not found",
            candidate.engine
        ))),
    }
}

fn known_paths(engine: EngineKind) -> &'static [&'static str] {
    match engine {
        EngineKind::Chrome => &[
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/opt/google/chrome/chrome",
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        ],
        EngineKind::Chromium => &[
            // Snap wrappers reject standard CLI flags; use the real binary.
            "/snap/chromium/current/usr/lib/chromium-browser/chrome",
            "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ],
    }
}

fn find_binary(engine: EngineKind) -> Option<PathBuf> {
    known_paths(engine)
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

fn build_config(
    candidate: &DriverCandidate,
    binary: Option<&Path>,
) -> Result<BrowserConfig, AppError> {
    let mut builder = BrowserConfig::builder()
        .no_sandbox()
        .disable_default_args()
        .request_timeout(candidate.timeouts.page_load);

    if let Some(bin) = binary {
        builder = builder.chrome_executable(bin);
    }

    match candidate.headless_arg() {
        Some(flag) => builder = builder.arg(flag),
        None => builder = builder.with_head(),
    }

    for arg in &candidate.args {
        builder = builder.arg(arg.as_str());
    }

    builder
        .arg(format!("--user-agent={}", candidate.user_agent))
        .build()
        .map_err(|e| AppError::BrowserError(format!("Browser config error: {e}")))
}

/// A live CDP session. Every [`Driver::load`] opens a tab, reads the
/// rendered DOM and closes the tab again.
pub struct ChromiumDriver {
    engine: EngineKind,
    browser: Browser,
    handler_task: JoinHandle<()>,
    timeouts: DriverTimeouts,
}

impl ChromiumDriver {
    pub fn engine(&self) -> EngineKind {
        self.engine
    }
}

async fn within<T>(
    limit: Duration,
    future: impl Future<Output = Result<T, AppError>>,
) -> Result<T, AppError> {
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| AppError::Timeout(limit.as_secs()))?
}

impl Driver for ChromiumDriver {
    fn apply_timeouts(&mut self, timeouts: &DriverTimeouts) -> Result<(), AppError> {
        if timeouts.page_load.is_zero() {
            return Err(AppError::BrowserError("page load timeout must be positive".into()));
        }
        self.timeouts = *timeouts;
        Ok(())
    }

    async fn load(&mut self, url: &str) -> Result<String, AppError> {
        let page = within(self.timeouts.page_load, async {
            self.browser
                .new_page(url)
                .await
                .map_err(|e| AppError::BrowserError(format!("Failed to navigate to {url}: {e}")))
        })
        .await?;

        let rendered = async {
            // <body> is the minimal signal that the page has rendered.
            within(self.timeouts.implicit_wait, async {
                page.find_element("body")
                    .await
                    .map_err(|e| AppError::BrowserError(format!("Page did not render body: {e}")))
            })
            .await?;

            within(self.timeouts.script, async {
                page.content().await.map_err(|e| {
                    AppError::BrowserError(format!("Failed to read page content: {e}"))
                })
            })
            .await
        }
        .await;

        if let Err(e) = page.close().await {
            tracing::debug!(engine = %self.engine, error = %e, "Failed to close tab");
        }

        rendered
    }

    async fn close(&mut self) -> Result<(), AppError> {
        let closed = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| AppError::BrowserError(format!("Failed to close {}: {e}", self.engine)));
        if let Err(e) = self.browser.wait().await {
            tracing::debug!(engine = %self.engine, error = %e, "Browser process did not exit cleanly");
        }
        self.handler_task.abort();
        closed
    }
}
