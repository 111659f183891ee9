use crate::config::{Company, Config};
use crate::http::{self, fetch_text};
use crate::store::ArtifactStore;
use crate::StageSummary;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace};

/// One row of a normalized price-series artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub date: NaiveDate,
    pub close: f64,
    pub adj_close: f64,
}

// scrape
// ----------------------------------------------------------------------------

/// Fetch the daily price series covering the study window for each company
/// whose price artifact is not already on disk; `force` refetches all.
pub async fn run(
    cfg: &Config,
    store: &ArtifactStore,
    only_company: Option<&str>,
    force: bool,
) -> anyhow::Result<StageSummary> {
    let client = http::std_client_build("rivalry-pipeline");
    let mut summary = StageSummary::default();

    info!("fetching Yahoo Finance prices ...");
    for company in cfg
        .companies
        .iter()
        .filter(|c| only_company.map_or(true, |t| t == c.ticker))
    {
        let path = store.price_path(&company.ticker);
        if !force && store.exists(&path) {
            debug!("[{}] price series already present", company.ticker);
            summary.skipped += 1;
            continue;
        }

        match fetch_series(&client, cfg, company).await {
            Ok(rows) if rows.is_empty() => {
                error!(
                    "no price data returned for [{}] {}",
                    company.ticker, company.name
                );
                summary.failed += 1;
            }
            Ok(rows) => {
                store.write_csv(&path, &rows).await?;
                debug!(
                    "[{}] wrote {} price rows to {}",
                    company.ticker,
                    rows.len(),
                    path.display()
                );
                summary.processed += 1;
            }
            Err(err) => {
                error!(
                    "failed to fetch Yahoo Finance prices for [{}] {}, error({err})",
                    company.ticker, company.name
                );
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

async fn fetch_series(
    client: &http::HttpClient,
    cfg: &Config,
    company: &Company,
) -> anyhow::Result<Vec<PriceRow>> {
    // the window runs one month into the year after the study so the first
    // trading day of the final year's successor is available for returns
    let period1 = NaiveDate::from_ymd_opt(cfg.start_year, 1, 1)
        .expect("valid start-of-window date")
        .and_hms_opt(0, 0, 0)
        .expect("valid midnight")
        .and_utc()
        .timestamp();
    let period2 = NaiveDate::from_ymd_opt(cfg.end_year + 1, 2, 1)
        .expect("valid end-of-window date")
        .and_hms_opt(0, 0, 0)
        .expect("valid midnight")
        .and_utc()
        .timestamp();

    let url = format!(
        "https://query1.finance.yahoo.com/v8/finance/chart/{ticker}?period1={period1}&period2={period2}&interval=1d",
        ticker = company.ticker,
    );

    let body = fetch_text(client, &url).await?;
    let response: PriceResponse = serde_json::from_str(&body)?;
    trace!(
        "price response received; transforming price data for [{}] {}",
        company.ticker,
        company.name
    );

    series_rows(response)
}

/// Flatten a chart response into price rows. Yahoo returns structurally
/// valid but empty `result`/`quote`/`adjclose` arrays for unknown or
/// delisted symbols; those are per-item errors, not panics.
fn series_rows(response: PriceResponse) -> anyhow::Result<Vec<PriceRow>> {
    let Some(data) = response.chart.result else {
        anyhow::bail!("no results found within http response");
    };
    let Some(base) = data.first() else {
        anyhow::bail!("empty result set within http response");
    };
    let Some(quote) = base.indicators.quote.first() else {
        anyhow::bail!("no quote block within http response");
    };
    let Some(adjclose) = base.indicators.adjclose.first() else {
        anyhow::bail!("no adjclose block within http response");
    };

    let rows = base
        .timestamp
        .iter()
        .zip(quote.close.iter())
        .zip(adjclose.adjclose.iter())
        .filter_map(|((timestamp, close), adj_close)| {
            let date = chrono::DateTime::from_timestamp(*timestamp, 0)?.date_naive();
            Some(PriceRow {
                date,
                close: (*close)?,
                adj_close: (*adj_close)?,
            })
        })
        .collect();

    Ok(rows)
}

// de
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PriceResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
    adjclose: Vec<AdjClose>,
}

// half-holidays come back as nulls; those rows are dropped
#[derive(Debug, Deserialize)]
struct Quote {
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    adjclose: Vec<Option<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_chart_response() {
        let json = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1577977200, 1578063600],
                    "indicators": {
                        "quote": [{"close": [2050.5, null]}],
                        "adjclose": [{"adjclose": [2050.5, 2071.0]}]
                    }
                }]
            }
        }"#;
        let response: PriceResponse = serde_json::from_str(json).unwrap();
        let rows = series_rows(response).unwrap();
        // the null close drops its row
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].close, 2050.5);
    }

    #[test]
    fn empty_result_set_is_an_error_not_a_panic() {
        let json = r#"{"chart": {"result": []}}"#;
        let response: PriceResponse = serde_json::from_str(json).unwrap();
        let err = series_rows(response).unwrap_err();
        assert!(err.to_string().contains("empty result set"));
    }

    #[test]
    fn empty_indicator_blocks_are_errors() {
        let json = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1577977200],
                    "indicators": {"quote": [], "adjclose": []}
                }]
            }
        }"#;
        let response: PriceResponse = serde_json::from_str(json).unwrap();
        assert!(series_rows(response).is_err());
    }

    #[test]
    fn missing_result_is_an_error() {
        let json = r#"{"chart": {"result": null}}"#;
        let response: PriceResponse = serde_json::from_str(json).unwrap();
        let err = series_rows(response).unwrap_err();
        assert!(err.to_string().contains("no results found"));
    }
}
