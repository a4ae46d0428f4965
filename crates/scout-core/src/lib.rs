pub mod circuit_breaker;
pub mod config;
pub mod driver;
pub mod enrichment;
pub mod error;
pub mod models;
pub mod status;
pub mod traits;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use circuit_breaker::{BreakerConfig, BreakerSnapshot, BreakerStore};
pub use config::{AiConfig, EnrichmentConfig};
pub use driver::{
    DriverCandidate, DriverChain, DriverConfig, DriverSlot, DriverTimeouts, EngineKind,
};
pub use enrichment::EnrichmentService;
pub use error::AppError;
pub use models::{CompanyInfo, DataSource, EnrichmentOutcome};
pub use status::StatusReporter;
pub use traits::{AiSource, Cleaner, CompanyCrawler, Driver, EngineLauncher};
