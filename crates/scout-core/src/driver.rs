//! Browser driver acquisition with ordered engine fallback.
//!
//! Candidates are plain configuration values tried strictly in order. A
//! candidate is accepted only after its constructed driver passes a smoke
//! test; if none does, crawling is simply unavailable for this process.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, OnceCell};

use crate::error::AppError;
use crate::traits::{Driver, EngineLauncher};

/// Minimal inline document loaded by the smoke test.
pub const SMOKE_TEST_URL: &str =
    "data:text/html,<html><body><h1>Driver%20Smoke%20Test</h1></body></html>";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Browser engine a candidate launches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// Google Chrome, new headless mode.
    Chrome,
    /// Chromium, legacy headless mode.
    Chromium,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Chrome => "chrome",
            EngineKind::Chromium => "chromium",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timeouts applied uniformly to every accepted driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverTimeouts {
    pub page_load: Duration,
    /// How long to wait for an element to appear.
    pub implicit_wait: Duration,
    pub script: Duration,
}

impl DriverTimeouts {
    pub fn with_page_load(page_load: Duration) -> Self {
        Self {
            page_load,
            ..Default::default()
        }
    }
}

impl Default for DriverTimeouts {
    fn default() -> Self {
        Self {
            page_load: Duration::from_secs(30),
            implicit_wait: Duration::from_secs(10),
            script: Duration::from_secs(30),
        }
    }
}

/// Operational configuration for driver acquisition.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Master switch. When off, no engine is ever launched.
    pub enabled: bool,
    pub headless: bool,
    pub timeouts: DriverTimeouts,
    pub user_agent: String,
    pub chrome_path: Option<PathBuf>,
    pub chromium_path: Option<PathBuf>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            headless: true,
            timeouts: DriverTimeouts::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            chrome_path: None,
            chromium_path: None,
        }
    }
}

impl DriverConfig {
    pub fn path_override(&self, engine: EngineKind) -> Option<&PathBuf> {
        match engine {
            EngineKind::Chrome => self.chrome_path.as_ref(),
            EngineKind::Chromium => self.chromium_path.as_ref(),
        }
    }
}

/// One entry in the ordered acquisition list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverCandidate {
    pub engine: EngineKind,
    pub headless: bool,
    /// Explicit browser binary; `None` lets the launcher search for one.
    pub binary_path: Option<PathBuf>,
    pub user_agent: String,
    /// Engine command-line flags, excluding headless mode and user agent.
    pub args: Vec<String>,
    pub timeouts: DriverTimeouts,
}

impl DriverCandidate {
    pub fn for_engine(engine: EngineKind, config: &DriverConfig) -> Self {
        let mut args: Vec<String> = [
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--disable-gpu",
            "--window-size=1920,1080",
            "--no-first-run",
            // Skip heavy resources
            "--blink-settings=imagesEnabled=false",
            "--disable-extensions",
            "--disable-plugins",
            // Stability
            "--disable-background-timer-throttling",
            "--disable-backgrounding-occluded-windows",
            "--disable-renderer-backgrounding",
            "--disable-ipc-flooding-protection",
            "--disable-features=TranslateUI,VizDisplayCompositor",
            "--memory-pressure-off",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        if engine == EngineKind::Chromium {
            args.push("--disable-popup-blocking".to_string());
            args.push("--disable-translate".to_string());
        }

        Self {
            engine,
            headless: config.headless,
            binary_path: config.path_override(engine).cloned(),
            user_agent: config.user_agent.clone(),
            args,
            timeouts: config.timeouts,
        }
    }

    /// The headless flag understood by this engine, if headless.
    pub fn headless_arg(&self) -> Option<&'static str> {
        if !self.headless {
            return None;
        }
        Some(match self.engine {
            EngineKind::Chrome => "--headless=new",
            EngineKind::Chromium => "--headless",
        })
    }
}

/// Tries engine candidates in priority order until one passes its smoke test.
pub struct DriverChain<L: EngineLauncher> {
    launcher: L,
    config: DriverConfig,
}

impl<L: EngineLauncher> DriverChain<L> {
    pub fn new(launcher: L, config: DriverConfig) -> Self {
        Self { launcher, config }
    }

    /// Candidates in priority order: Chrome first, Chromium as fallback.
    pub fn candidates(&self) -> Vec<DriverCandidate> {
        [EngineKind::Chrome, EngineKind::Chromium]
            .into_iter()
            .map(|engine| DriverCandidate::for_engine(engine, &self.config))
            .collect()
    }

    /// Returns the first driver that constructs and passes its smoke test.
    ///
    /// `None` when acquisition is disabled or every candidate failed; the
    /// rest of the pipeline keeps running without crawling.
    pub async fn acquire(&self) -> Option<L::Driver> {
        if !self.config.enabled {
            tracing::warn!("Browser driver disabled via configuration; crawling will be skipped");
            return None;
        }

        tracing::info!("Acquiring browser driver");
        for candidate in self.candidates() {
            match self.attempt(&candidate).await {
                Ok(driver) => {
                    tracing::info!(engine = %candidate.engine, "Browser driver ready");
                    return Some(driver);
                }
                Err(e) => {
                    tracing::warn!(
                        engine = %candidate.engine,
                        error = %e,
                        "Browser driver candidate rejected"
                    );
                }
            }
        }

        tracing::warn!(
            "All browser driver candidates failed; crawling disabled, continuing in AI-only mode"
        );
        None
    }

    /// Construct, configure and smoke-test a single candidate.
    pub async fn attempt(&self, candidate: &DriverCandidate) -> Result<L::Driver, AppError> {
        tracing::info!(engine = %candidate.engine, "Launching browser driver candidate");
        if let Some(path) = &candidate.binary_path {
            tracing::info!(engine = %candidate.engine, path = %path.display(), "Using binary override");
        }

        let mut driver = self.launcher.launch(candidate).await?;

        let checked = match driver.apply_timeouts(&candidate.timeouts) {
            Ok(()) => smoke_test(&mut driver, candidate.engine).await,
            Err(e) => Err(e),
        };

        match checked {
            Ok(()) => Ok(driver),
            Err(e) => {
                if let Err(close_err) = driver.close().await {
                    tracing::debug!(
                        engine = %candidate.engine,
                        error = %close_err,
                        "Failed to close rejected driver"
                    );
                }
                Err(e)
            }
        }
    }
}

/// Loads [`SMOKE_TEST_URL`] and checks the driver returns a non-empty page.
pub async fn smoke_test<D: Driver>(driver: &mut D, engine: EngineKind) -> Result<(), AppError> {
    tracing::debug!(%engine, "Running driver smoke test");

    let source = driver
        .load(SMOKE_TEST_URL)
        .await
        .map_err(|e| AppError::SmokeTestFailed {
            engine: engine.to_string(),
            reason: e.to_string(),
        })?;

    if source.trim().is_empty() {
        return Err(AppError::SmokeTestFailed {
            engine: engine.to_string(),
            reason: "empty page source".into(),
        });
    }

    tracing::debug!(%engine, bytes = source.len(), "Driver smoke test passed");
    Ok(())
}

/// Acquisition status of a [`DriverSlot`].
pub enum DriverState<D> {
    /// Acquisition has not finished yet.
    Pending,
    /// Acquisition found no working engine, or the driver was released.
    Unavailable,
    Ready(Arc<Mutex<D>>),
}

/// Process-wide home of the accepted driver.
///
/// Acquisition runs at most once, however many tasks race to initialize
/// the slot. The driver sits behind an async mutex because navigation on
/// one browser session cannot run in parallel.
pub struct DriverSlot<D: Driver> {
    cell: OnceCell<Option<Arc<Mutex<D>>>>,
    released: AtomicBool,
}

impl<D: Driver> Default for DriverSlot<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Driver> DriverSlot<D> {
    /// An uninitialized slot.
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
            released: AtomicBool::new(false),
        }
    }

    /// A slot holding the result of an acquisition already performed.
    pub fn with_driver(driver: Option<D>) -> Self {
        Self {
            cell: OnceCell::new_with(Some(driver.map(|d| Arc::new(Mutex::new(d))))),
            released: AtomicBool::new(false),
        }
    }

    /// Runs the chain once; concurrent and later callers share its result.
    pub async fn initialize<L>(&self, chain: &DriverChain<L>) -> bool
    where
        L: EngineLauncher<Driver = D>,
    {
        self.cell
            .get_or_init(|| async { chain.acquire().await.map(|d| Arc::new(Mutex::new(d))) })
            .await
            .is_some()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    /// Where acquisition stands. A released driver is `Unavailable`.
    pub fn state(&self) -> DriverState<D> {
        if self.released.load(Ordering::Acquire) {
            return DriverState::Unavailable;
        }
        match self.cell.get() {
            None => DriverState::Pending,
            Some(None) => DriverState::Unavailable,
            Some(Some(driver)) => DriverState::Ready(driver.clone()),
        }
    }

    /// The shared driver, if one was acquired and not yet released.
    pub fn get(&self) -> Option<Arc<Mutex<D>>> {
        match self.state() {
            DriverState::Ready(driver) => Some(driver),
            DriverState::Pending | DriverState::Unavailable => None,
        }
    }

    /// Closes the driver. Later calls to [`get`](Self::get) return `None`.
    pub async fn shutdown(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(Some(driver)) = self.cell.get() {
            let mut driver = driver.lock().await;
            match driver.close().await {
                Ok(()) => tracing::info!("Browser driver released"),
                Err(e) => tracing::warn!(error = %e, "Error releasing browser driver"),
            }
        }
    }
}
