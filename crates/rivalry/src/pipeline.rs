use anyhow::bail;
use rivalry_pipeline::config::Config;
use rivalry_pipeline::mentions::excerpt::BusinessSection;
use rivalry_pipeline::mentions::openai::OpenAiClient;
use rivalry_pipeline::store::ArtifactStore;
use rivalry_pipeline::{analyze as analyze_stage, collect, dates, mentions};
use tracing::info;

/// Fetch filings and price series. Idempotent per item; `--force`
/// refetches items already on disk.
pub(crate) async fn download(
    cfg: &Config,
    store: &ArtifactStore,
    company: Option<&str>,
    year: Option<i32>,
    force: bool,
) -> anyhow::Result<()> {
    if cfg.companies.is_empty() {
        bail!("company roster is empty");
    }
    if let Some(ticker) = company {
        if cfg.company(ticker).is_none() {
            bail!("unknown ticker {ticker}; not in the study roster");
        }
    }

    let summary = collect::run(cfg, store, company, year, force).await?;
    summary.report("download");
    Ok(())
}

pub(crate) async fn extract_dates(
    cfg: &Config,
    store: &ArtifactStore,
    force: bool,
) -> anyhow::Result<()> {
    let path = store.filing_dates_path();
    if !force && store.exists(&path) {
        info!(
            "filing dates artifact already exists at {}; skipping (--force to recompute)",
            path.display()
        );
        return Ok(());
    }
    ensure_filings_present(store)?;

    let summary = dates::run(cfg, store).await?;
    summary.report("extract-dates");
    Ok(())
}

pub(crate) async fn extract_mentions(
    cfg: &Config,
    store: &ArtifactStore,
    force: bool,
) -> anyhow::Result<()> {
    ensure_filings_present(store)?;
    let Some(api_key) = cfg.openai_api_key.as_deref() else {
        bail!("OPENAI_API_KEY is not set; the mention extractor needs a completion credential");
    };

    // the stage skips per record; force means starting from nothing
    if force && store.exists(&store.mentions_path()) {
        tokio::fs::remove_file(store.mentions_path()).await?;
        info!("existing mentions artifact removed (--force)");
    }

    let client = OpenAiClient::new(api_key);
    let summary = mentions::run(cfg, store, &client, &BusinessSection::default()).await?;
    summary.report("extract-mentions");
    Ok(())
}

pub(crate) async fn analyze(
    cfg: &Config,
    store: &ArtifactStore,
    force: bool,
) -> anyhow::Result<()> {
    let path = store.regression_json_path();
    if !force && store.exists(&path) {
        info!(
            "regression results already exist at {}; skipping (--force to recompute)",
            path.display()
        );
        return Ok(());
    }

    let result = analyze_stage::run(cfg, store).await?;
    info!(
        "analysis finished: {} rows in sample, {} excluded",
        result.n, result.excluded_rows
    );
    Ok(())
}

/// Every stage in dependency order.
pub(crate) async fn run_all(
    cfg: &Config,
    store: &ArtifactStore,
    force: bool,
) -> anyhow::Result<()> {
    let time = std::time::Instant::now();

    download(cfg, store, None, None, force).await?;
    extract_dates(cfg, store, force).await?;
    extract_mentions(cfg, store, force).await?;
    analyze(cfg, store, force).await?;

    info!(
        "pipeline finished, time elapsed: {:?}",
        time.elapsed()
    );
    Ok(())
}

fn ensure_filings_present(store: &ArtifactStore) -> anyhow::Result<()> {
    let filings_dir = store.root().join("filings");
    if !filings_dir.is_dir() {
        bail!(
            "no filings found under {}; run `rivalry download` first",
            filings_dir.display()
        );
    }
    Ok(())
}
