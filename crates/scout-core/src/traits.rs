use std::future::Future;

use crate::driver::{DriverCandidate, DriverTimeouts};
use crate::error::AppError;
use crate::models::CompanyInfo;

/// Generates company information with an AI service.
///
/// Any error (timeout, rate limit, malformed reply) counts as a source
/// failure; callers do not inspect the variant to decide what to do.
pub trait AiSource: Send + Sync {
    fn generate(
        &self,
        company_name: &str,
        linkedin_url: &str,
    ) -> impl Future<Output = Result<CompanyInfo, AppError>> + Send;
}

/// A source that was never configured. Every call fails, which the
/// orchestrator counts like any other AI failure.
impl<A: AiSource> AiSource for Option<A> {
    async fn generate(
        &self,
        company_name: &str,
        linkedin_url: &str,
    ) -> Result<CompanyInfo, AppError> {
        match self {
            Some(source) => source.generate(company_name, linkedin_url).await,
            None => Err(AppError::ConfigError("AI source not configured".into())),
        }
    }
}

/// A live browser automation session.
pub trait Driver: Send + Sync + 'static {
    /// Apply page-load, implicit-wait and script timeouts to the session.
    fn apply_timeouts(&mut self, timeouts: &DriverTimeouts) -> Result<(), AppError>;

    /// Navigate to `url` and return the rendered page source.
    fn load(&mut self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;

    /// Release the underlying browser resources.
    fn close(&mut self) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Constructs a [`Driver`] for one acquisition candidate.
pub trait EngineLauncher: Send + Sync {
    type Driver: Driver;

    fn launch(
        &self,
        candidate: &DriverCandidate,
    ) -> impl Future<Output = Result<Self::Driver, AppError>> + Send;
}

/// Produces company information by driving a browser session.
pub trait CompanyCrawler: Send + Sync {
    fn crawl<D: Driver>(
        &self,
        driver: &mut D,
        company_name: &str,
        linkedin_url: &str,
    ) -> impl Future<Output = Result<CompanyInfo, AppError>> + Send;
}

/// Converts raw HTML into clean Markdown text.
pub trait Cleaner: Send + Sync + Clone {
    fn clean(&self, html: &str) -> Result<String, AppError>;
}
