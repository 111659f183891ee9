use crate::collect::yahoo::PriceRow;
use crate::config::Config;
use crate::store::ArtifactStore;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Percentage return for one company over one year: first trading day of
/// the year to the first trading day of the following year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualReturn {
    pub ticker: String,
    pub year: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_price: f64,
    pub end_price: f64,
    pub annual_return_pct: f64,
}

/// Derive annual returns from one company's daily closes. Pure; the input
/// need not be sorted.
pub fn annual_returns(ticker: &str, rows: &[PriceRow]) -> Vec<AnnualReturn> {
    let mut sorted: Vec<&PriceRow> = rows.iter().collect();
    sorted.sort_by_key(|row| row.date);

    // first trading day per year
    let mut anchors: Vec<&PriceRow> = Vec::new();
    for row in sorted {
        if anchors.last().map_or(true, |a| a.date.year() < row.date.year()) {
            anchors.push(row);
        }
    }

    anchors
        .windows(2)
        .filter_map(|pair| {
            let (start, end) = (pair[0], pair[1]);
            if start.close == 0.0 {
                return None;
            }
            Some(AnnualReturn {
                ticker: ticker.to_string(),
                year: start.date.year(),
                start_date: start.date,
                end_date: end.date,
                start_price: start.close,
                end_price: end.close,
                annual_return_pct: (end.close - start.close) / start.close * 100.0,
            })
        })
        .collect()
}

/// Load every company's price artifact and compute the full return panel.
/// Companies without a price file are skipped with a warning.
pub async fn load_all(cfg: &Config, store: &ArtifactStore) -> anyhow::Result<Vec<AnnualReturn>> {
    let mut all = Vec::new();
    for company in &cfg.companies {
        let path = store.price_path(&company.ticker);
        let Some(rows) = store.read_csv_if_present::<PriceRow>(&path).await? else {
            warn!(
                "[{}] no price series at {}; returns unavailable",
                company.ticker,
                path.display()
            );
            continue;
        };
        let returns = annual_returns(&company.ticker, &rows);
        debug!("[{}] {} annual returns computed", company.ticker, returns.len());
        all.extend(returns);
    }
    all.sort_by(|a, b| (&a.ticker, a.year).cmp(&(&b.ticker, b.year)));
    Ok(all)
}
