pub mod excerpt;
pub mod openai;

use crate::config::{Company, Config};
use crate::filing;
use crate::store::ArtifactStore;
use crate::StageSummary;
use excerpt::ExcerptStrategy;
use openai::{CompletionClient, CompletionError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Attempts per filing against the completion endpoint.
const MAX_ATTEMPTS: usize = 3;
const BASE_DELAY: Duration = Duration::from_millis(750);

/// Sentinel the prompt asks for when no competitor is mentioned.
const NONE_SENTINEL: &str = "NONE";

/// Which competitors one filing mentions. The raw model response is kept
/// for auditing; `discarded` counts response tokens that matched no
/// roster alias (models invent names).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentionRecord {
    pub ticker: String,
    pub year: i32,
    pub mentioned: Vec<String>,
    pub matched_names: Vec<String>,
    pub raw_response: String,
    pub discarded: u32,
}

/// ticker -> filing year -> record; BTreeMaps for stable artifact bytes.
pub type Mentions = BTreeMap<String, BTreeMap<i32, MentionRecord>>;

/// Extract competitor mentions for every downloaded filing that does not
/// already have a record in `company_mentions.json`.
///
/// The artifact is rewritten after every filing, so an interrupted run
/// resumes without re-spending API budget on finished filings.
pub async fn run(
    cfg: &Config,
    store: &ArtifactStore,
    client: &dyn CompletionClient,
    strategy: &dyn ExcerptStrategy,
) -> anyhow::Result<StageSummary> {
    let path = store.mentions_path();
    let mut mentions: Mentions = store.read_json_if_present(&path).await?.unwrap_or_default();
    let alias_table = cfg.alias_table();
    let mut summary = StageSummary::default();

    info!("extracting competitor mentions ...");
    for company in &cfg.companies {
        for year in cfg.years() {
            let filing_path = store.filing_path(&company.ticker, year);
            if !store.exists(&filing_path) {
                debug!("[{}] no {year} filing on disk", company.ticker);
                summary.skipped += 1;
                continue;
            }

            if mentions
                .get(&company.ticker)
                .is_some_and(|years| years.contains_key(&year))
            {
                debug!(
                    "[{}] {year} mention record already present",
                    company.ticker
                );
                summary.skipped += 1;
                continue;
            }

            let raw = store.read_text(&filing_path).await?;
            let body = filing::clean_body(&raw);
            let prompt = build_prompt(company, &cfg.companies, strategy.select(&body));

            let record = match complete_with_retry(client, &prompt).await {
                Ok(response) => {
                    if response.trim().is_empty() {
                        warn!(
                            "[{}] {year} empty completion response; treating as zero mentions",
                            company.ticker
                        );
                    }
                    let parsed = parse_response(&response, &company.ticker, &alias_table);
                    if parsed.discarded > 0 {
                        warn!(
                            "[{}] {year} response contained {} unknown names; discarded",
                            company.ticker, parsed.discarded
                        );
                    }
                    debug!(
                        "[{}] {year} mentions: {:?}",
                        company.ticker, parsed.mentioned
                    );
                    summary.processed += 1;
                    MentionRecord {
                        ticker: company.ticker.clone(),
                        year,
                        mentioned: parsed.mentioned,
                        matched_names: parsed.matched_names,
                        raw_response: response,
                        discarded: parsed.discarded,
                    }
                }
                // a bad key fails every filing identically; abort before
                // a poisoned artifact locks in zero-mention records
                Err(err) if err.is_auth() => {
                    anyhow::bail!(
                        "completion credential rejected, error({err}); \
                         check OPENAI_API_KEY and rerun"
                    );
                }
                Err(err) => {
                    warn!(
                        "[{}] {year} completion failed, error({err}); recording zero mentions",
                        company.ticker
                    );
                    summary.failed += 1;
                    MentionRecord {
                        ticker: company.ticker.clone(),
                        year,
                        mentioned: Vec::new(),
                        matched_names: Vec::new(),
                        raw_response: String::new(),
                        discarded: 0,
                    }
                }
            };

            mentions
                .entry(company.ticker.clone())
                .or_default()
                .insert(year, record);
            // persist partial progress after every filing
            store.write_json(&path, &mentions).await?;
        }
    }

    info!("competitor mentions written to {}", path.display());
    Ok(summary)
}

/// Call the completion endpoint, retrying transient failures with
/// exponential backoff. Non-transient failures return immediately.
async fn complete_with_retry(
    client: &dyn CompletionClient,
    prompt: &str,
) -> Result<String, CompletionError> {
    let mut delay = BASE_DELAY;
    let mut attempt = 0;

    loop {
        attempt += 1;
        let err = match client.complete(prompt).await {
            Ok(response) => return Ok(response),
            Err(err) => err,
        };

        if attempt >= MAX_ATTEMPTS || !err.is_transient() {
            return Err(err);
        }

        warn!("completion attempt {attempt} failed, error({err}); retrying in {delay:?}");
        tokio::time::sleep(delay).await;
        delay *= 2;
    }
}

/// Deterministic prompt: candidate roster in fixed order, fixed
/// instructions, one canonical name per line expected back.
fn build_prompt(filer: &Company, roster: &[Company], excerpt: &str) -> String {
    let mut candidates = String::new();
    for company in roster.iter().filter(|c| c.ticker != filer.ticker) {
        candidates.push_str(&format!(
            "{}: {}\n",
            company.ticker,
            company.aliases.join(", ")
        ));
    }

    format!(
        "The text below is from the annual SEC filing of {name} ({ticker}).\n\
         Candidate competitors and their brand names:\n\n\
         {candidates}\n\
         List the candidate companies this filing explicitly mentions as \
         competitors or comparators. Answer with one brand name per line, \
         exactly as written above. If none are mentioned, answer {NONE_SENTINEL}.\n\n\
         Filing text:\n{excerpt}",
        name = filer.name,
        ticker = filer.ticker,
    )
}

struct ParsedResponse {
    mentioned: Vec<String>,
    matched_names: Vec<String>,
    discarded: u32,
}

/// Split a model response into name tokens and resolve each against the
/// alias table. Unknown tokens are dropped and counted; an empty or
/// malformed response simply yields zero mentions.
fn parse_response(
    raw: &str,
    own_ticker: &str,
    alias_table: &HashMap<String, String>,
) -> ParsedResponse {
    let mut mentioned = BTreeSet::new();
    let mut matched_names = Vec::new();
    let mut discarded = 0;

    for token in raw.lines().flat_map(|line| line.split(',')) {
        let normalized = normalize_token(token);
        if normalized.is_empty() || normalized.eq_ignore_ascii_case(NONE_SENTINEL) {
            continue;
        }

        match alias_table.get(&normalized) {
            Some(ticker) if ticker != own_ticker => {
                if mentioned.insert(ticker.clone()) {
                    matched_names.push(normalized);
                }
            }
            Some(_) => {} // the model echoed the filer itself
            None => discarded += 1,
        }
    }

    ParsedResponse {
        mentioned: mentioned.into_iter().collect(),
        matched_names,
        discarded,
    }
}

/// Lowercase, strip bullets/quotes/trailing punctuation, collapse inner
/// whitespace.
fn normalize_token(token: &str) -> String {
    let trimmed = token
        .trim_matches(|c: char| {
            c.is_whitespace() || matches!(c, '-' | '*' | '•' | '"' | '\'' | '`')
        })
        .trim_end_matches(['.', ',', ';', ':'])
        .trim();
    trimmed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
