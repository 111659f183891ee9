pub mod edgar;
pub mod yahoo;

use crate::config::Config;
use crate::store::ArtifactStore;
use crate::StageSummary;

/// Fetch filings and price series for the configured roster; both halves
/// are idempotent per item, so a partial run picks up where it stopped.
///
/// `company`/`year` narrow the run to one ticker or one filing year,
/// mirroring the single-item download the operator sometimes wants.
/// `force` refetches items already on disk.
pub async fn run(
    cfg: &Config,
    store: &ArtifactStore,
    company: Option<&str>,
    year: Option<i32>,
    force: bool,
) -> anyhow::Result<StageSummary> {
    let filings = edgar::run(cfg, store, company, year, force).await?;
    filings.report("filing download");

    let prices = yahoo::run(cfg, store, company, force).await?;
    prices.report("price download");

    Ok(StageSummary {
        processed: filings.processed + prices.processed,
        skipped: filings.skipped + prices.skipped,
        failed: filings.failed + prices.failed,
    })
}
