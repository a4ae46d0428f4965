//! Per-source circuit breakers for the enrichment pipeline.
//!
//! Each [`DataSource`] has a single `enabled` flag. A tripped source stays
//! disabled until [`BreakerStore::reset_all`] is called; there is no timed
//! recovery.
//!
//! ```text
//! ENABLED --[trip]--> DISABLED --[reset_all]--> ENABLED
//! ```

use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::error::AppError;
use crate::models::DataSource;

/// Configuration for breaker behavior.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive AI failures before the AI breaker trips.
    ///
    /// `0` disables the AI source entirely.
    pub ai_failure_threshold: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            ai_failure_threshold: 1,
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    ai_enabled: bool,
    crawling_enabled: bool,
    ai_failure_count: u32,
    last_ai_error: Option<String>,
}

impl BreakerInner {
    fn new(config: &BreakerConfig) -> Self {
        Self {
            ai_enabled: config.ai_failure_threshold > 0,
            crawling_enabled: true,
            ai_failure_count: 0,
            last_ai_error: None,
        }
    }

    fn flag(&self, source: DataSource) -> bool {
        match source {
            DataSource::AiGeneration => self.ai_enabled,
            DataSource::Crawling => self.crawling_enabled,
        }
    }

    fn flag_mut(&mut self, source: DataSource) -> &mut bool {
        match source {
            DataSource::AiGeneration => &mut self.ai_enabled,
            DataSource::Crawling => &mut self.crawling_enabled,
        }
    }
}

/// Point-in-time copy of the breaker state, for monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub ai_generation_enabled: bool,
    pub crawling_enabled: bool,
    pub ai_failure_count: u32,
    pub ai_failure_threshold: u32,
    pub last_ai_error: Option<String>,
}

impl BreakerSnapshot {
    pub fn is_enabled(&self, source: DataSource) -> bool {
        match source {
            DataSource::AiGeneration => self.ai_generation_enabled,
            DataSource::Crawling => self.crawling_enabled,
        }
    }
}

/// Thread-safe health flags for every [`DataSource`].
///
/// Clones share the same state. Each write is independent: tripping two
/// sources is two separate updates, observable in between.
#[derive(Debug, Clone)]
pub struct BreakerStore {
    config: BreakerConfig,
    inner: Arc<Mutex<BreakerInner>>,
}

impl Default for BreakerStore {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}

impl BreakerStore {
    pub fn new(config: BreakerConfig) -> Self {
        let inner = BreakerInner::new(&config);
        if config.ai_failure_threshold == 0 {
            tracing::warn!("AI generation disabled via configuration (failure threshold = 0)");
        }
        Self {
            config,
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Acquires the inner mutex lock, recovering from poison if necessary.
    fn lock_inner(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered from poisoned breaker mutex");
            poisoned.into_inner()
        })
    }

    pub fn is_enabled(&self, source: DataSource) -> bool {
        self.lock_inner().flag(source)
    }

    /// Disables `source`. Returns `false` if it was already disabled.
    pub fn trip(&self, source: DataSource) -> bool {
        let mut inner = self.lock_inner();
        let flag = inner.flag_mut(source);
        if !*flag {
            return false;
        }
        *flag = false;
        tracing::warn!(%source, "Circuit breaker tripped");
        true
    }

    /// Re-enables a single source. Returns `false` if it was already enabled
    /// or is disabled by configuration.
    pub fn restore(&self, source: DataSource) -> bool {
        if source == DataSource::AiGeneration && self.config.ai_failure_threshold == 0 {
            return false;
        }
        let mut inner = self.lock_inner();
        let flag = inner.flag_mut(source);
        if *flag {
            return false;
        }
        *flag = true;
        if source == DataSource::AiGeneration {
            inner.ai_failure_count = 0;
        }
        tracing::info!(%source, "Circuit breaker restored");
        true
    }

    /// Re-enables every source and clears the failure history.
    ///
    /// A source disabled by configuration stays disabled.
    pub fn reset_all(&self) {
        let mut inner = self.lock_inner();
        *inner = BreakerInner::new(&self.config);
        tracing::info!("Circuit breakers reset");
    }

    /// Records a failed AI call. Returns `true` once the failure threshold
    /// has been reached and the caller should trip the breakers.
    pub fn record_ai_failure(&self, error: &AppError) -> bool {
        let mut inner = self.lock_inner();
        inner.ai_failure_count = inner.ai_failure_count.saturating_add(1);
        inner.last_ai_error = Some(error.to_string());

        tracing::warn!(
            failures = inner.ai_failure_count,
            threshold = self.config.ai_failure_threshold,
            kind = error.kind(),
            "AI generation failure recorded"
        );

        self.config.ai_failure_threshold > 0
            && inner.ai_failure_count >= self.config.ai_failure_threshold
    }

    pub fn record_ai_success(&self) {
        let mut inner = self.lock_inner();
        inner.ai_failure_count = 0;
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock_inner();
        BreakerSnapshot {
            ai_generation_enabled: inner.ai_enabled,
            crawling_enabled: inner.crawling_enabled,
            ai_failure_count: inner.ai_failure_count,
            ai_failure_threshold: self.config.ai_failure_threshold,
            last_ai_error: inner.last_ai_error.clone(),
        }
    }
}
