use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An external source of company information guarded by its own breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataSource {
    /// The AI generation service.
    AiGeneration,
    /// Browser-driven web crawling.
    Crawling,
}

impl DataSource {
    /// Every source, in status-report order.
    pub const ALL: [DataSource; 2] = [DataSource::AiGeneration, DataSource::Crawling];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::AiGeneration => "AI_GENERATION",
            DataSource::Crawling => "CRAWLING",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured company profile produced by either source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyInfo {
    pub name: String,
    /// Concise summary or tagline.
    pub description: String,
    pub logo_url: String,
    pub website: String,
    pub career_page_url: String,
    /// Long-form company history and business description.
    pub about_us: String,
    pub culture: String,
    pub mission: String,
    pub vision: String,
    pub company_size: String,
    pub headquarters: String,
    pub industry: String,
    pub linkedin_url: String,
    pub specialties: String,
    pub last_crawled_at: DateTime<Utc>,
}

impl CompanyInfo {
    /// An otherwise empty profile stamped with the current time.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            last_crawled_at: Utc::now(),
            ..Default::default()
        }
    }

    /// Whether this profile is usable as an enrichment result.
    ///
    /// A profile without a name is treated as a failed attempt, never
    /// returned to callers.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// Result of one enrichment attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentOutcome {
    Success(CompanyInfo),
    /// No information obtainable. A normal business outcome, not an error.
    Empty,
}

impl EnrichmentOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, EnrichmentOutcome::Success(_))
    }

    pub fn into_option(self) -> Option<CompanyInfo> {
        match self {
            EnrichmentOutcome::Success(info) => Some(info),
            EnrichmentOutcome::Empty => None,
        }
    }
}
