use crate::config::Config;
use crate::dates::FilingDates;
use crate::mentions::Mentions;
use crate::returns;
use crate::stats::{self, Ols};
use crate::store::ArtifactStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{info, warn};

/// Output of the regression stage: the fit (if one could be computed) and
/// the join accounting behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    /// Rows in the regression sample.
    pub n: usize,
    /// (ticker, year) keys seen in some artifact but missing another.
    pub excluded_rows: usize,
    pub fit: Option<Ols>,
}

/// One regression-sample row, persisted for audit alongside the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    pub ticker: String,
    pub year: i32,
    /// Peer filings mentioning this company that year.
    pub num_mention: u32,
    /// Annual return, demeaned within its year.
    pub res_return: f64,
    pub predicted: Option<f64>,
    pub residual: Option<f64>,
}

/// Join filing dates, mentions, and returns; regress demeaned annual
/// return on mentions received from peers.
pub async fn run(cfg: &Config, store: &ArtifactStore) -> anyhow::Result<RegressionResult> {
    let dates: FilingDates = store
        .read_json_if_present(&store.filing_dates_path())
        .await?
        .ok_or_else(|| {
            anyhow::anyhow!(
                "filing dates artifact not found at {}; run `rivalry extract-dates` first",
                store.filing_dates_path().display()
            )
        })?;
    let mentions: Mentions = store
        .read_json_if_present(&store.mentions_path())
        .await?
        .ok_or_else(|| {
            anyhow::anyhow!(
                "mentions artifact not found at {}; run `rivalry extract-mentions` first",
                store.mentions_path().display()
            )
        })?;

    let annual = returns::load_all(cfg, store).await?;
    store
        .write_csv(&store.annual_returns_path(), &annual)
        .await?;

    // join components, keyed (ticker, year)
    let mut resolved_filings = BTreeSet::new();
    for records in dates.values() {
        for record in records.values() {
            if record.resolved {
                resolved_filings.insert((record.ticker.clone(), record.year));
            }
        }
    }

    let mut own_records = BTreeSet::new();
    let mut received: HashMap<(String, i32), u32> = HashMap::new();
    for records in mentions.values() {
        for record in records.values() {
            own_records.insert((record.ticker.clone(), record.year));
            for peer in &record.mentioned {
                *received.entry((peer.clone(), record.year)).or_default() += 1;
            }
        }
    }

    let returns_map: HashMap<(String, i32), f64> = annual
        .iter()
        .map(|r| ((r.ticker.clone(), r.year), r.annual_return_pct))
        .collect();

    // a row needs all three; anything else is counted out
    let mut universe: BTreeSet<(String, i32)> = BTreeSet::new();
    universe.extend(resolved_filings.iter().cloned());
    universe.extend(own_records.iter().cloned());
    universe.extend(returns_map.keys().cloned());

    let mut sample: Vec<(String, i32, u32, f64)> = Vec::new();
    for key in &universe {
        if !resolved_filings.contains(key) || !own_records.contains(key) {
            continue;
        }
        let Some(annual_return) = returns_map.get(key) else {
            continue;
        };
        let count = received.get(key).copied().unwrap_or(0);
        sample.push((key.0.clone(), key.1, count, *annual_return));
    }
    let excluded_rows = universe.len() - sample.len();
    if excluded_rows > 0 {
        warn!("{excluded_rows} rows excluded from the regression sample (missing join component)");
    }

    // year fixed effect via demeaning within the sample
    let mut year_sums: HashMap<i32, (f64, usize)> = HashMap::new();
    for (_, year, _, ret) in &sample {
        let entry = year_sums.entry(*year).or_default();
        entry.0 += ret;
        entry.1 += 1;
    }

    let x: Vec<f64> = sample.iter().map(|(_, _, count, _)| *count as f64).collect();
    let y: Vec<f64> = sample
        .iter()
        .map(|(_, year, _, ret)| {
            let (sum, count) = year_sums[year];
            ret - sum / count as f64
        })
        .collect();

    let fit = stats::ols(&x, &y);
    match &fit {
        Some(fit) => info!(
            "regression over {} rows: slope {:.6}, p {:?}, r² {:?}",
            fit.n, fit.slope, fit.p_slope, fit.r_squared
        ),
        None => warn!(
            "regression not computable over {} rows (no predictor variance)",
            sample.len()
        ),
    }

    let rows: Vec<SampleRow> = sample
        .iter()
        .zip(y.iter())
        .map(|((ticker, year, count, _), res_return)| {
            let predicted = fit
                .as_ref()
                .map(|f| f.intercept + f.slope * *count as f64);
            SampleRow {
                ticker: ticker.clone(),
                year: *year,
                num_mention: *count,
                res_return: *res_return,
                predicted,
                residual: predicted.map(|p| res_return - p),
            }
        })
        .collect();

    let result = RegressionResult {
        n: sample.len(),
        excluded_rows,
        fit,
    };

    store
        .write_json(&store.regression_json_path(), &result)
        .await?;
    store.write_csv(&store.regression_csv_path(), &rows).await?;
    info!(
        "regression results written to {}",
        store.regression_json_path().display()
    );

    Ok(result)
}
