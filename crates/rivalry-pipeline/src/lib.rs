pub mod analyze;
pub mod collect;
pub mod config;
pub mod dates;
pub mod filing;
pub mod http;
pub mod mentions;
pub mod returns;
pub mod stats;
pub mod store;

use tracing::info;

/// Per-stage item accounting, reported at the end of every stage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StageSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl StageSummary {
    pub fn report(&self, stage: &str) {
        info!(
            "{stage} complete: {} processed, {} skipped, {} failed",
            self.processed, self.skipped, self.failed
        );
    }
}
