use std::sync::Arc;

use crate::circuit_breaker::BreakerStore;
use crate::driver::{DriverSlot, DriverState};
use crate::error::AppError;
use crate::models::{CompanyInfo, DataSource, EnrichmentOutcome};
use crate::status::StatusReporter;
use crate::traits::{AiSource, CompanyCrawler, Driver};

/// Orchestrates company enrichment: AI generation first, browser crawling
/// as fallback, both gated by circuit breakers.
///
/// Generic over all external dependencies via traits, enabling dependency
/// injection and testability without real HTTP or browser sessions.
pub struct EnrichmentService<A, C, D>
where
    A: AiSource,
    C: CompanyCrawler,
    D: Driver,
{
    ai: A,
    crawler: C,
    breakers: BreakerStore,
    driver: Arc<DriverSlot<D>>,
    status: StatusReporter,
}

impl<A, C, D> EnrichmentService<A, C, D>
where
    A: AiSource,
    C: CompanyCrawler,
    D: Driver,
{
    /// While the driver slot is still pending, crawls are skipped without
    /// touching the breakers; once acquisition has failed, the first crawl
    /// attempt trips `CRAWLING`.
    pub fn new(ai: A, crawler: C, breakers: BreakerStore, driver: Arc<DriverSlot<D>>) -> Self {
        let status = StatusReporter::new(breakers.clone());
        Self {
            ai,
            crawler,
            breakers,
            driver,
            status,
        }
    }

    pub fn breakers(&self) -> &BreakerStore {
        &self.breakers
    }

    pub fn driver_slot(&self) -> &Arc<DriverSlot<D>> {
        &self.driver
    }

    pub fn status_reporter(&self) -> &StatusReporter {
        &self.status
    }

    /// Produce company information for `company_name`.
    ///
    /// 1. Ask the AI source, unless its breaker is open
    /// 2. On AI failure, record it; at the threshold trip both AI and crawling
    /// 3. Crawl through the shared driver, unless crawling is disabled
    ///
    /// Never fails: every source error ends as [`EnrichmentOutcome::Empty`].
    pub async fn generate_company_info(
        &self,
        company_name: &str,
        linkedin_url: &str,
    ) -> EnrichmentOutcome {
        let company_name = company_name.trim();
        if company_name.is_empty() {
            tracing::warn!("Company name is empty; nothing to enrich");
            return EnrichmentOutcome::Empty;
        }

        tracing::info!(company = %company_name, "Starting company enrichment");

        if self.breakers.is_enabled(DataSource::AiGeneration) {
            let result = self
                .ai
                .generate(company_name, linkedin_url)
                .await
                .and_then(require_complete);

            match result {
                Ok(info) => {
                    self.breakers.record_ai_success();
                    tracing::info!(company = %company_name, "Company info generated by AI");
                    return EnrichmentOutcome::Success(info);
                }
                Err(e) => self.on_ai_failure(company_name, &e),
            }
        } else {
            tracing::debug!(company = %company_name, "AI generation disabled, skipping");
        }

        self.crawl(company_name, linkedin_url).await
    }

    fn on_ai_failure(&self, company_name: &str, error: &AppError) {
        tracing::error!(
            company = %company_name,
            kind = error.kind(),
            error = %error,
            "AI generation failed"
        );

        if self.breakers.record_ai_failure(error) {
            tracing::error!("Disabling AI generation and crawling after AI failure");
            self.breakers.trip(DataSource::AiGeneration);
            self.breakers.trip(DataSource::Crawling);
        }
    }

    async fn crawl(&self, company_name: &str, linkedin_url: &str) -> EnrichmentOutcome {
        if !self.breakers.is_enabled(DataSource::Crawling) {
            tracing::info!(company = %company_name, "Crawling disabled, no information available");
            return EnrichmentOutcome::Empty;
        }

        let driver = match self.driver.state() {
            DriverState::Ready(driver) => driver,
            DriverState::Pending => {
                tracing::info!(company = %company_name, "Browser driver still initializing, skipping crawl");
                return EnrichmentOutcome::Empty;
            }
            DriverState::Unavailable => {
                tracing::warn!("No browser driver available, disabling crawling");
                self.breakers.trip(DataSource::Crawling);
                return EnrichmentOutcome::Empty;
            }
        };

        tracing::info!(company = %company_name, url = %linkedin_url, "Crawling for company info");
        let mut driver = driver.lock().await;
        let result = self
            .crawler
            .crawl(&mut *driver, company_name, linkedin_url)
            .await
            .and_then(require_complete);

        match result {
            Ok(info) => {
                tracing::info!(company = %company_name, "Company info crawled");
                EnrichmentOutcome::Success(info)
            }
            Err(e) => {
                // Crawl failures never feed back into the AI breaker.
                tracing::warn!(
                    company = %company_name,
                    kind = e.kind(),
                    error = %e,
                    "Crawling failed"
                );
                EnrichmentOutcome::Empty
            }
        }
    }

    /// `"AI_GENERATION: ENABLED|DISABLED, CRAWLING: ENABLED|DISABLED"`
    pub fn ai_service_status(&self) -> String {
        self.status.status()
    }

    pub fn reset_circuit_breakers(&self) {
        self.status.reset();
    }
}

fn require_complete(info: CompanyInfo) -> Result<CompanyInfo, AppError> {
    if info.is_complete() {
        Ok(info)
    } else {
        Err(AppError::ParseError("company info has no name".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::BreakerConfig;
    use crate::driver::{DriverChain, DriverConfig, EngineKind};
    use crate::testutil::*;

    const LINKEDIN: &str = "https://www.linkedin.com/company/acme";

    type TestService = EnrichmentService<MockAiSource, MockCrawler, MockDriver>;

    fn service(ai: MockAiSource, crawler: MockCrawler) -> (TestService, MockDriver) {
        service_with(ai, crawler, BreakerStore::default())
    }

    fn service_with(
        ai: MockAiSource,
        crawler: MockCrawler,
        breakers: BreakerStore,
    ) -> (TestService, MockDriver) {
        let driver = MockDriver::new(EngineKind::Chrome, "<html><body>acme</body></html>");
        let slot = Arc::new(DriverSlot::with_driver(Some(driver.clone())));
        (EnrichmentService::new(ai, crawler, breakers, slot), driver)
    }

    #[tokio::test]
    async fn ai_success_returns_info_without_touching_breakers() {
        let ai = MockAiSource::new(make_company("Acme"));
        let crawler = MockCrawler::default();
        let (svc, _) = service(ai.clone(), crawler.clone());

        let outcome = svc.generate_company_info("Acme", LINKEDIN).await;

        assert_eq!(outcome, EnrichmentOutcome::Success(make_company("Acme")));
        assert_eq!(
            *ai.calls.lock().unwrap(),
            vec![("Acme".to_string(), LINKEDIN.to_string())]
        );
        assert_eq!(crawler.call_count(), 0);
        assert_eq!(
            svc.ai_service_status(),
            "AI_GENERATION: ENABLED, CRAWLING: ENABLED"
        );
    }

    #[tokio::test]
    async fn ai_failure_trips_both_sources() {
        let ai = MockAiSource::with_error(AppError::Generic("Gemini API error".into()));
        let crawler = MockCrawler::default();
        let (svc, _) = service(ai, crawler.clone());

        let outcome = svc.generate_company_info("Acme", LINKEDIN).await;

        assert_eq!(outcome, EnrichmentOutcome::Empty);
        assert!(!svc.breakers().is_enabled(DataSource::AiGeneration));
        assert!(!svc.breakers().is_enabled(DataSource::Crawling));
        assert_eq!(
            svc.ai_service_status(),
            "AI_GENERATION: DISABLED, CRAWLING: DISABLED"
        );
        assert_eq!(crawler.call_count(), 0);
    }

    #[tokio::test]
    async fn rate_limit_and_timeout_trip_identically() {
        for error in [
            AppError::RateLimitExceeded,
            AppError::Timeout(90),
            AppError::ParseError("not json".into()),
        ] {
            let (svc, _) = service(MockAiSource::with_error(error), MockCrawler::default());

            assert_eq!(
                svc.generate_company_info("Acme", LINKEDIN).await,
                EnrichmentOutcome::Empty
            );
            assert_eq!(
                svc.ai_service_status(),
                "AI_GENERATION: DISABLED, CRAWLING: DISABLED"
            );
        }
    }

    #[tokio::test]
    async fn disabled_ai_is_never_called() {
        let ai = MockAiSource::new(make_company("Acme"));
        let crawler = MockCrawler::new(make_company("Acme Crawled"));
        let (svc, driver) = service(ai.clone(), crawler.clone());
        svc.breakers().trip(DataSource::AiGeneration);

        let outcome = svc.generate_company_info("Acme", LINKEDIN).await;

        assert_eq!(ai.call_count(), 0);
        assert_eq!(
            outcome,
            EnrichmentOutcome::Success(make_company("Acme Crawled"))
        );
        assert_eq!(crawler.call_count(), 1);
        assert_eq!(driver.loads(), vec![LINKEDIN.to_string()]);
    }

    #[tokio::test]
    async fn both_disabled_returns_empty_without_calls() {
        let ai = MockAiSource::new(make_company("Acme"));
        let crawler = MockCrawler::new(make_company("Acme"));
        let (svc, driver) = service(ai.clone(), crawler.clone());
        svc.breakers().trip(DataSource::AiGeneration);
        svc.breakers().trip(DataSource::Crawling);

        for _ in 0..3 {
            assert_eq!(
                svc.generate_company_info("Acme", LINKEDIN).await,
                EnrichmentOutcome::Empty
            );
        }

        assert_eq!(ai.call_count(), 0);
        assert_eq!(crawler.call_count(), 0);
        assert!(driver.loads().is_empty());
    }

    #[tokio::test]
    async fn timeout_scenario_stays_empty_while_crawling_disabled() {
        let ai = MockAiSource::with_responses(vec![
            Err(AppError::Generic("Request timeout for Gemini API".into())),
            Err(AppError::Generic("Request timeout for Gemini API".into())),
        ]);
        let crawler = MockCrawler::new(make_company("Acme"));
        let (svc, _) = service(ai.clone(), crawler.clone());

        assert_eq!(
            svc.generate_company_info("Acme", LINKEDIN).await,
            EnrichmentOutcome::Empty
        );

        svc.breakers().restore(DataSource::AiGeneration);
        assert!(!svc.breakers().is_enabled(DataSource::Crawling));

        assert_eq!(
            svc.generate_company_info("Acme", LINKEDIN).await,
            EnrichmentOutcome::Empty
        );
        assert_eq!(ai.call_count(), 2);
        assert_eq!(crawler.call_count(), 0);
    }

    #[tokio::test]
    async fn ai_failure_below_threshold_falls_back_to_crawling() {
        let ai = MockAiSource::with_error(AppError::Timeout(90));
        let crawler = MockCrawler::new(make_company("Acme"));
        let breakers = BreakerStore::new(BreakerConfig {
            ai_failure_threshold: 2,
        });
        let (svc, driver) = service_with(ai, crawler.clone(), breakers);

        let outcome = svc.generate_company_info("Acme", LINKEDIN).await;

        assert_eq!(outcome, EnrichmentOutcome::Success(make_company("Acme")));
        assert_eq!(crawler.call_count(), 1);
        assert_eq!(driver.loads(), vec![LINKEDIN.to_string()]);
        assert_eq!(
            svc.ai_service_status(),
            "AI_GENERATION: ENABLED, CRAWLING: ENABLED"
        );
    }

    #[tokio::test]
    async fn threshold_trips_after_consecutive_failures() {
        let ai = MockAiSource::with_responses(vec![
            Err(AppError::RateLimitExceeded),
            Err(AppError::RateLimitExceeded),
        ]);
        let breakers = BreakerStore::new(BreakerConfig {
            ai_failure_threshold: 2,
        });
        let (svc, _) = service_with(ai, MockCrawler::default(), breakers);

        svc.generate_company_info("Acme", LINKEDIN).await;
        assert!(svc.breakers().is_enabled(DataSource::AiGeneration));

        svc.generate_company_info("Acme", LINKEDIN).await;
        assert_eq!(
            svc.ai_service_status(),
            "AI_GENERATION: DISABLED, CRAWLING: DISABLED"
        );
    }

    #[tokio::test]
    async fn crawl_failure_is_empty_and_never_trips_ai() {
        let ai = MockAiSource::with_error(AppError::Timeout(90));
        let crawler = MockCrawler::with_error(AppError::BrowserError("tab crashed".into()));
        let breakers = BreakerStore::new(BreakerConfig {
            ai_failure_threshold: 2,
        });
        let (svc, _) = service_with(ai, crawler.clone(), breakers);

        let outcome = svc.generate_company_info("Acme", LINKEDIN).await;

        assert_eq!(outcome, EnrichmentOutcome::Empty);
        assert_eq!(crawler.call_count(), 1);
        assert!(svc.breakers().is_enabled(DataSource::AiGeneration));
        assert!(svc.breakers().is_enabled(DataSource::Crawling));
    }

    #[tokio::test]
    async fn missing_driver_disables_crawling() {
        let ai = MockAiSource::new(make_company("Acme"));
        let crawler = MockCrawler::new(make_company("Acme"));
        let slot: Arc<DriverSlot<MockDriver>> = Arc::new(DriverSlot::with_driver(None));
        let svc = EnrichmentService::new(ai.clone(), crawler.clone(), BreakerStore::default(), slot);
        svc.breakers().trip(DataSource::AiGeneration);

        let outcome = svc.generate_company_info("Acme", LINKEDIN).await;

        assert_eq!(outcome, EnrichmentOutcome::Empty);
        assert_eq!(crawler.call_count(), 0);
        assert_eq!(
            svc.ai_service_status(),
            "AI_GENERATION: DISABLED, CRAWLING: DISABLED"
        );
    }

    #[tokio::test]
    async fn pending_driver_skips_crawl_without_tripping() {
        let crawler = MockCrawler::new(make_company("Acme"));
        let slot: Arc<DriverSlot<MockDriver>> = Arc::new(DriverSlot::new());
        let svc = EnrichmentService::new(
            MockAiSource::default(),
            crawler.clone(),
            BreakerStore::default(),
            slot.clone(),
        );
        svc.breakers().trip(DataSource::AiGeneration);

        assert_eq!(
            svc.generate_company_info("Acme", LINKEDIN).await,
            EnrichmentOutcome::Empty
        );
        assert!(svc.breakers().is_enabled(DataSource::Crawling));

        let chain = DriverChain::new(
            MockLauncher::new(vec![LaunchOutcome::Ready]),
            DriverConfig::default(),
        );
        assert!(slot.initialize(&chain).await);

        let outcome = svc.generate_company_info("Acme", LINKEDIN).await;
        assert_eq!(outcome, EnrichmentOutcome::Success(make_company("Acme")));
        assert_eq!(crawler.call_count(), 1);
        assert_eq!(
            svc.ai_service_status(),
            "AI_GENERATION: DISABLED, CRAWLING: ENABLED"
        );
    }

    #[tokio::test]
    async fn unconfigured_ai_source_with_zero_threshold_crawls() {
        let crawler = MockCrawler::new(make_company("Acme"));
        let breakers = BreakerStore::new(BreakerConfig {
            ai_failure_threshold: 0,
        });
        let driver = MockDriver::new(EngineKind::Chrome, "<html><body>acme</body></html>");
        let slot = Arc::new(DriverSlot::with_driver(Some(driver)));
        let svc = EnrichmentService::new(None::<MockAiSource>, crawler.clone(), breakers, slot);

        assert!(svc.generate_company_info("Acme", LINKEDIN).await.is_success());
        assert_eq!(crawler.call_count(), 1);
    }

    #[tokio::test]
    async fn unconfigured_ai_source_counts_as_failure() {
        let breakers = BreakerStore::new(BreakerConfig {
            ai_failure_threshold: 2,
        });
        let driver = MockDriver::new(EngineKind::Chrome, "<html></html>");
        let slot = Arc::new(DriverSlot::with_driver(Some(driver)));
        let svc = EnrichmentService::new(None::<MockAiSource>, MockCrawler::default(), breakers, slot);

        assert!(svc.generate_company_info("Acme", LINKEDIN).await.is_success());
        let snapshot = svc.status_reporter().snapshot();
        assert_eq!(snapshot.ai_failure_count, 1);
        assert!(snapshot.last_ai_error.unwrap().contains("not configured"));
    }

    #[tokio::test]
    async fn released_driver_is_unavailable() {
        let crawler = MockCrawler::new(make_company("Acme"));
        let (svc, driver) = service(MockAiSource::default(), crawler.clone());
        svc.breakers().trip(DataSource::AiGeneration);
        svc.driver_slot().shutdown().await;

        assert_eq!(
            svc.generate_company_info("Acme", LINKEDIN).await,
            EnrichmentOutcome::Empty
        );
        assert!(driver.is_closed());
        assert_eq!(crawler.call_count(), 0);
    }

    #[tokio::test]
    async fn incomplete_ai_result_counts_as_failure() {
        let ai = MockAiSource::new(CompanyInfo::default());
        let (svc, _) = service(ai, MockCrawler::default());

        let outcome = svc.generate_company_info("Acme", LINKEDIN).await;

        assert_eq!(outcome, EnrichmentOutcome::Empty);
        assert!(!svc.breakers().is_enabled(DataSource::AiGeneration));
    }

    #[tokio::test]
    async fn incomplete_crawl_result_is_empty() {
        let crawler = MockCrawler::new(CompanyInfo::default());
        let (svc, _) = service(MockAiSource::default(), crawler);
        svc.breakers().trip(DataSource::AiGeneration);

        assert_eq!(
            svc.generate_company_info("Acme", LINKEDIN).await,
            EnrichmentOutcome::Empty
        );
        assert!(svc.breakers().is_enabled(DataSource::Crawling));
    }

    #[tokio::test]
    async fn blank_company_name_makes_no_calls() {
        let ai = MockAiSource::default();
        let crawler = MockCrawler::default();
        let (svc, _) = service(ai.clone(), crawler.clone());

        assert_eq!(
            svc.generate_company_info("   ", LINKEDIN).await,
            EnrichmentOutcome::Empty
        );
        assert_eq!(ai.call_count(), 0);
        assert_eq!(crawler.call_count(), 0);
        assert_eq!(
            svc.ai_service_status(),
            "AI_GENERATION: ENABLED, CRAWLING: ENABLED"
        );
    }

    #[tokio::test]
    async fn reset_re_enables_ai_calls() {
        let ai = MockAiSource::with_responses(vec![
            Err(AppError::NetworkError("connection refused".into())),
            Ok(make_company("Acme")),
        ]);
        let (svc, _) = service(ai.clone(), MockCrawler::default());

        svc.generate_company_info("Acme", LINKEDIN).await;
        svc.generate_company_info("Acme", LINKEDIN).await;
        assert_eq!(ai.call_count(), 1);

        svc.reset_circuit_breakers();
        assert_eq!(
            svc.ai_service_status(),
            "AI_GENERATION: ENABLED, CRAWLING: ENABLED"
        );

        let outcome = svc.generate_company_info("Acme", LINKEDIN).await;
        assert!(outcome.is_success());
        assert_eq!(ai.call_count(), 2);
    }

    #[tokio::test]
    async fn zero_threshold_goes_straight_to_crawling() {
        let ai = MockAiSource::new(make_company("Acme"));
        let crawler = MockCrawler::new(make_company("Acme"));
        let breakers = BreakerStore::new(BreakerConfig {
            ai_failure_threshold: 0,
        });
        let (svc, _) = service_with(ai.clone(), crawler.clone(), breakers);

        assert!(svc.generate_company_info("Acme", LINKEDIN).await.is_success());
        assert_eq!(ai.call_count(), 0);
        assert_eq!(crawler.call_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_failures_leave_both_disabled() {
        let ai = MockAiSource::with_responses(
            (0..16)
                .map(|_| Err(AppError::Generic("Gemini API error".into())))
                .collect(),
        );
        let (svc, _) = service(ai, MockCrawler::default());
        let svc = Arc::new(svc);

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let svc = svc.clone();
                tokio::spawn(async move {
                    svc.generate_company_info(&format!("Company {i}"), LINKEDIN)
                        .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(
            svc.ai_service_status(),
            "AI_GENERATION: DISABLED, CRAWLING: DISABLED"
        );
    }
}
