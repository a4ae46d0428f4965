//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::sync::{Arc, Mutex};

use crate::driver::{DriverCandidate, DriverTimeouts, EngineKind};
use crate::error::AppError;
use crate::models::CompanyInfo;
use crate::traits::{AiSource, CompanyCrawler, Driver, EngineLauncher};

/// Recorded source call: (company_name, linkedin_url).
pub type SourceCall = (String, String);

/// Build a complete profile for assertions.
///
/// The timestamp is fixed so that two profiles for the same name compare equal.
pub fn make_company(name: &str) -> CompanyInfo {
    CompanyInfo {
        name: name.to_string(),
        description: format!("{name} makes things"),
        website: format!("https://{}.example.com", name.to_lowercase()),
        industry: "Manufacturing".to_string(),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// MockAiSource
// ---------------------------------------------------------------------------

/// Mock AI source that returns queued responses and records every call.
#[derive(Clone, Default)]
pub struct MockAiSource {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns a profile named after the requested company.
    responses: Arc<Mutex<Vec<Result<CompanyInfo, AppError>>>>,
    pub calls: Arc<Mutex<Vec<SourceCall>>>,
}

impl MockAiSource {
    pub fn new(info: CompanyInfo) -> Self {
        Self::with_responses(vec![Ok(info)])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<CompanyInfo, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl AiSource for MockAiSource {
    async fn generate(
        &self,
        company_name: &str,
        linkedin_url: &str,
    ) -> Result<CompanyInfo, AppError> {
        self.calls
            .lock()
            .unwrap()
            .push((company_name.to_string(), linkedin_url.to_string()));

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(make_company(company_name))
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockDriver
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MockDriverState {
    page_source: String,
    fail_load: bool,
    fail_timeouts: bool,
    loads: Vec<String>,
    timeouts: Option<DriverTimeouts>,
    close_count: u32,
}

/// Mock browser session. Clones share state, so a test can keep a handle
/// on a driver that was moved into the code under test.
#[derive(Debug, Clone)]
pub struct MockDriver {
    pub engine: EngineKind,
    state: Arc<Mutex<MockDriverState>>,
}

impl MockDriver {
    /// Driver whose every page load returns `page_source`.
    pub fn new(engine: EngineKind, page_source: &str) -> Self {
        Self {
            engine,
            state: Arc::new(Mutex::new(MockDriverState {
                page_source: page_source.to_string(),
                ..Default::default()
            })),
        }
    }

    /// Driver whose page loads fail.
    pub fn failing_load(engine: EngineKind) -> Self {
        let driver = Self::new(engine, "");
        driver.state.lock().unwrap().fail_load = true;
        driver
    }

    /// Driver that refuses timeout configuration.
    pub fn failing_timeouts(engine: EngineKind) -> Self {
        let driver = Self::new(engine, "<html></html>");
        driver.state.lock().unwrap().fail_timeouts = true;
        driver
    }

    /// URLs loaded so far, in order.
    pub fn loads(&self) -> Vec<String> {
        self.state.lock().unwrap().loads.clone()
    }

    pub fn timeouts(&self) -> Option<DriverTimeouts> {
        self.state.lock().unwrap().timeouts
    }

    pub fn is_closed(&self) -> bool {
        self.close_count() > 0
    }

    pub fn close_count(&self) -> u32 {
        self.state.lock().unwrap().close_count
    }
}

impl Driver for MockDriver {
    fn apply_timeouts(&mut self, timeouts: &DriverTimeouts) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_timeouts {
            return Err(AppError::BrowserError("cannot set timeouts".into()));
        }
        state.timeouts = Some(*timeouts);
        Ok(())
    }

    async fn load(&mut self, url: &str) -> Result<String, AppError> {
        let mut state = self.state.lock().unwrap();
        state.loads.push(url.to_string());
        if state.fail_load {
            return Err(AppError::BrowserError(format!("navigation to {url} failed")));
        }
        Ok(state.page_source.clone())
    }

    async fn close(&mut self) -> Result<(), AppError> {
        self.state.lock().unwrap().close_count += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockLauncher
// ---------------------------------------------------------------------------

/// What the next launched candidate does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// Construction fails.
    LaunchError,
    /// Constructs and passes the smoke test.
    Ready,
    /// Constructs, but the smoke-test page comes back empty.
    EmptyPage,
    /// Constructs, but navigation fails.
    LoadError,
    /// Constructs, but rejects timeout configuration.
    TimeoutError,
}

/// Mock engine launcher driven by a queue of outcomes, one per launch.
#[derive(Clone, Default)]
pub struct MockLauncher {
    outcomes: Arc<Mutex<Vec<LaunchOutcome>>>,
    attempted: Arc<Mutex<Vec<EngineKind>>>,
    launched: Arc<Mutex<Vec<MockDriver>>>,
}

impl MockLauncher {
    /// Once the queue is exhausted every launch fails.
    pub fn new(outcomes: Vec<LaunchOutcome>) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(outcomes)),
            ..Default::default()
        }
    }

    /// Engines whose construction was attempted, in order.
    pub fn attempted(&self) -> Vec<EngineKind> {
        self.attempted.lock().unwrap().clone()
    }

    /// Handles on every driver that was constructed.
    pub fn launched(&self) -> Vec<MockDriver> {
        self.launched.lock().unwrap().clone()
    }
}

impl EngineLauncher for MockLauncher {
    type Driver = MockDriver;

    async fn launch(&self, candidate: &DriverCandidate) -> Result<MockDriver, AppError> {
        self.attempted.lock().unwrap().push(candidate.engine);

        let outcome = {
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.is_empty() {
                LaunchOutcome::LaunchError
            } else {
                outcomes.remove(0)
            }
        };

        let driver = match outcome {
            LaunchOutcome::LaunchError => {
                return Err(AppError::BrowserError(format!(
                    "{} binary not found",
                    candidate.engine
                )));
            }
            LaunchOutcome::Ready => {
                MockDriver::new(candidate.engine, "<html><body>ok</body></html>")
            }
            LaunchOutcome::EmptyPage => MockDriver::new(candidate.engine, "   "),
            LaunchOutcome::LoadError => MockDriver::failing_load(candidate.engine),
            LaunchOutcome::TimeoutError => MockDriver::failing_timeouts(candidate.engine),
        };

        self.launched.lock().unwrap().push(driver.clone());
        Ok(driver)
    }
}

// ---------------------------------------------------------------------------
// MockCrawler
// ---------------------------------------------------------------------------

/// Mock crawler that loads the target through the driver, then returns
/// queued responses.
#[derive(Clone, Default)]
pub struct MockCrawler {
    responses: Arc<Mutex<Vec<Result<CompanyInfo, AppError>>>>,
    pub calls: Arc<Mutex<Vec<SourceCall>>>,
}

impl MockCrawler {
    pub fn new(info: CompanyInfo) -> Self {
        Self::with_responses(vec![Ok(info)])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<CompanyInfo, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl CompanyCrawler for MockCrawler {
    async fn crawl<D: Driver>(
        &self,
        driver: &mut D,
        company_name: &str,
        linkedin_url: &str,
    ) -> Result<CompanyInfo, AppError> {
        self.calls
            .lock()
            .unwrap()
            .push((company_name.to_string(), linkedin_url.to_string()));

        driver.load(linkedin_url).await?;

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(make_company(company_name))
        } else {
            responses.remove(0)
        }
    }
}
