use crate::config::{Company, Config};
use crate::http::{self, fetch_text};
use crate::store::ArtifactStore;
use crate::StageSummary;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// SEC asks for at most 10 requests per second; stay well under it.
const REQUEST_DELAY: Duration = Duration::from_millis(150);

/// Annual-report variants we accept.
const ANNUAL_FORMS: &[&str] = &["10-K", "20-F"];

// scrape
// ----------------------------------------------------------------------------

/// Download the annual filing for each (company, year) not already on
/// disk; `force` refetches filings that are.
pub async fn run(
    cfg: &Config,
    store: &ArtifactStore,
    only_company: Option<&str>,
    only_year: Option<i32>,
    force: bool,
) -> anyhow::Result<StageSummary> {
    let user_agent = cfg
        .edgar_user_agent
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("EDGAR_USER_AGENT is not set; the SEC requires an identity string"))?;
    let client = http::std_client_build(user_agent);

    let companies: Vec<&Company> = cfg
        .companies
        .iter()
        .filter(|c| only_company.map_or(true, |t| t == c.ticker))
        .collect();
    let years: Vec<i32> = cfg
        .years()
        .filter(|y| only_year.map_or(true, |f| f == *y))
        .collect();

    let mut summary = StageSummary::default();
    let pb = ProgressBar::new((companies.len() * years.len()) as u64).with_style(
        ProgressStyle::default_bar()
            .template("{msg} |{bar:40.cyan/blue}| {pos}/{len}")
            .expect("valid progress template")
            .progress_chars("##-"),
    );

    info!("fetching EDGAR annual filings ...");
    for company in companies.iter().copied() {
        pb.set_message(company.ticker.clone());

        // years already on disk need no index lookup
        let missing = years_to_fetch(store, &company.ticker, &years, force);
        let already_present = years.len() - missing.len();
        if already_present > 0 {
            debug!(
                "[{}] {already_present} filings already present",
                company.ticker
            );
            summary.skipped += already_present;
            pb.inc(already_present as u64);
        }
        if missing.is_empty() {
            continue;
        }

        let index = match fetch_submissions(&client, company).await {
            Ok(index) => index,
            Err(err) => {
                error!(
                    "failed to fetch submissions index for [{}] {}, error({err})",
                    company.ticker, company.name
                );
                summary.failed += missing.len();
                pb.inc(missing.len() as u64);
                continue;
            }
        };

        for year in missing {
            match download_filing(&client, store, company, year, &index).await {
                Ok(true) => summary.processed += 1,
                Ok(false) => {
                    warn!(
                        "no annual filing found for [{}] {} in {year}",
                        company.ticker, company.name
                    );
                    summary.failed += 1;
                }
                Err(err) => {
                    error!(
                        "failed to download [{}] {year} filing, error({err})",
                        company.ticker
                    );
                    summary.failed += 1;
                }
            }
            pb.inc(1);
        }
    }
    pb.finish_and_clear();

    Ok(summary)
}

/// Years still needing a download; with `force`, all of them.
fn years_to_fetch(store: &ArtifactStore, ticker: &str, years: &[i32], force: bool) -> Vec<i32> {
    years
        .iter()
        .copied()
        .filter(|year| force || !store.exists(&store.filing_path(ticker, *year)))
        .collect()
}

async fn fetch_submissions(
    client: &http::HttpClient,
    company: &Company,
) -> anyhow::Result<RecentFilings> {
    let url = format!(
        "https://data.sec.gov/submissions/CIK{cik:010}.json",
        cik = company.cik
    );
    tokio::time::sleep(REQUEST_DELAY).await;
    let body = fetch_text(client, &url).await?;
    let submissions: Submissions = serde_json::from_str(&body)?;
    Ok(submissions.filings.recent)
}

/// Fetch the full submission text for `year`, if the index lists one.
/// Ok(false) means the index had no matching annual form for that year.
async fn download_filing(
    client: &http::HttpClient,
    store: &ArtifactStore,
    company: &Company,
    year: i32,
    index: &RecentFilings,
) -> anyhow::Result<bool> {
    let Some(accession) = index.annual_accession_for(year) else {
        return Ok(false);
    };

    let url = format!(
        "https://www.sec.gov/Archives/edgar/data/{cik}/{folder}/{accession}.txt",
        cik = company.cik,
        folder = accession.replace('-', ""),
    );

    debug!("[{}] {year} downloading {url}", company.ticker);
    tokio::time::sleep(REQUEST_DELAY).await;
    let text = fetch_text(client, &url).await?;
    store
        .write_text(&store.filing_path(&company.ticker, year), &text)
        .await?;
    Ok(true)
}

// de
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Submissions {
    filings: Filings,
}

#[derive(Debug, Deserialize)]
struct Filings {
    recent: RecentFilings,
}

/// Column-oriented, as EDGAR serves it: index i across the vectors
/// describes one filing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecentFilings {
    accession_number: Vec<String>,
    filing_date: Vec<String>,
    form: Vec<String>,
}

impl RecentFilings {
    /// Accession number of the annual report filed in calendar `year`.
    fn annual_accession_for(&self, year: i32) -> Option<&str> {
        let prefix = format!("{year}-");
        self.form
            .iter()
            .zip(&self.filing_date)
            .zip(&self.accession_number)
            .find(|((form, date), _)| {
                ANNUAL_FORMS.contains(&form.as_str()) && date.starts_with(&prefix)
            })
            .map(|(_, accession)| accession.as_str())
    }
}
