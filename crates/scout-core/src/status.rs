use crate::circuit_breaker::{BreakerSnapshot, BreakerStore};
use crate::models::DataSource;

/// Operational view of the breaker state, plus manual recovery.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    breakers: BreakerStore,
}

impl StatusReporter {
    pub fn new(breakers: BreakerStore) -> Self {
        Self { breakers }
    }

    /// Renders `"AI_GENERATION: ENABLED|DISABLED, CRAWLING: ENABLED|DISABLED"`.
    pub fn status(&self) -> String {
        render_status(&self.breakers.snapshot())
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        self.breakers.snapshot()
    }

    pub fn reset(&self) {
        self.breakers.reset_all();
    }
}

/// Fixed two-field summary of a snapshot.
pub fn render_status(snapshot: &BreakerSnapshot) -> String {
    DataSource::ALL
        .iter()
        .map(|source| {
            let state = if snapshot.is_enabled(*source) {
                "ENABLED"
            } else {
                "DISABLED"
            };
            format!("{source}: {state}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}
