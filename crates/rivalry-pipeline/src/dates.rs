use crate::config::Config;
use crate::filing;
use crate::store::ArtifactStore;
use crate::StageSummary;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Metadata for one downloaded filing, keyed by (ticker, year) in the
/// artifact. `resolved == false` marks filings whose header could not be
/// read; later joins exclude them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingRecord {
    pub ticker: String,
    pub year: i32,
    pub accession: Option<String>,
    pub form_type: Option<String>,
    pub filed_date: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub company_name: Option<String>,
    pub cik: Option<String>,
    pub resolved: bool,
}

/// ticker -> filing year -> record. BTreeMaps keep the artifact bytes
/// stable across re-runs.
pub type FilingDates = BTreeMap<String, BTreeMap<i32, FilingRecord>>;

/// Parse the header of every downloaded filing into `filing_dates.json`.
pub async fn run(cfg: &Config, store: &ArtifactStore) -> anyhow::Result<StageSummary> {
    let mut records: FilingDates = BTreeMap::new();
    let mut summary = StageSummary::default();

    info!("extracting filing dates ...");
    for company in &cfg.companies {
        for year in cfg.years() {
            let path = store.filing_path(&company.ticker, year);
            if !store.exists(&path) {
                debug!("[{}] no {year} filing on disk", company.ticker);
                summary.skipped += 1;
                continue;
            }

            let raw = store.read_text(&path).await?;
            let header = filing::parse_header(&raw);
            let resolved = header.filed_date.is_some() && header.form_type.is_some();
            if !resolved {
                warn!(
                    "[{}] {year} filing header unresolved; excluding from joins",
                    company.ticker
                );
                summary.failed += 1;
            } else {
                debug!(
                    "[{}] {year} filed {:?}, period end {:?}",
                    company.ticker, header.filed_date, header.period_end
                );
                summary.processed += 1;
            }

            records.entry(company.ticker.clone()).or_default().insert(
                year,
                FilingRecord {
                    ticker: company.ticker.clone(),
                    year,
                    accession: header.accession,
                    form_type: header.form_type,
                    filed_date: header.filed_date,
                    period_end: header.period_end,
                    company_name: header.company_name,
                    cik: header.cik,
                    resolved,
                },
            );
        }
    }

    store.write_json(&store.filing_dates_path(), &records).await?;
    info!(
        "filing dates written to {}",
        store.filing_dates_path().display()
    );

    Ok(summary)
}
