use std::path::{Path, PathBuf};
use tracing::trace;

/// All stage artifacts live under one data directory, behind this value.
///
/// The read-if-present / write pair is the resumability contract: a stage
/// (or the orchestrator) asks whether its output is already there instead
/// of scattering ad-hoc existence checks through stage logic.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Raw filing text downloaded from EDGAR.
    pub fn filing_path(&self, ticker: &str, year: i32) -> PathBuf {
        self.root.join("filings").join(ticker).join(format!("{year}.txt"))
    }

    /// Normalized daily price series for one company.
    pub fn price_path(&self, ticker: &str) -> PathBuf {
        self.root.join("price").join(format!("{ticker}.csv"))
    }

    pub fn filing_dates_path(&self) -> PathBuf {
        self.root.join("filing_dates.json")
    }

    pub fn mentions_path(&self) -> PathBuf {
        self.root.join("company_mentions.json")
    }

    pub fn annual_returns_path(&self) -> PathBuf {
        self.root.join("annual_stock_return.csv")
    }

    pub fn regression_json_path(&self) -> PathBuf {
        self.root.join("regression_results.json")
    }

    pub fn regression_csv_path(&self) -> PathBuf {
        self.root.join("regression_results.csv")
    }

    pub fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    pub async fn read_text(&self, path: &Path) -> anyhow::Result<String> {
        trace!("reading file path: {}", path.display());
        Ok(tokio::fs::read_to_string(path).await?)
    }

    pub async fn write_text(&self, path: &Path, text: &str) -> anyhow::Result<()> {
        self.ensure_parent(path).await?;
        tokio::fs::write(path, text).await?;
        Ok(())
    }

    /// Deserialize a JSON artifact, or `None` if it has not been written yet.
    pub async fn read_json_if_present<T>(&self, path: &Path) -> anyhow::Result<Option<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        if !path.exists() {
            return Ok(None);
        }
        trace!("reading file path: {}", path.display());
        let bytes = tokio::fs::read(path).await?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    pub async fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> anyhow::Result<()> {
        self.ensure_parent(path).await?;
        let json = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub async fn read_csv_if_present<T>(&self, path: &Path) -> anyhow::Result<Option<Vec<T>>>
    where
        T: serde::de::DeserializeOwned,
    {
        if !path.exists() {
            return Ok(None);
        }
        trace!("reading file path: {}", path.display());
        let bytes = tokio::fs::read(path).await?;
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let rows = reader.deserialize().collect::<Result<Vec<T>, _>>()?;
        Ok(Some(rows))
    }

    pub async fn write_csv<T: serde::Serialize>(&self, path: &Path, rows: &[T]) -> anyhow::Result<()> {
        self.ensure_parent(path).await?;
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in rows {
            writer.serialize(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| anyhow::anyhow!("failed to flush csv buffer, error({err})"))?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn ensure_parent(&self, path: &Path) -> anyhow::Result<()> {
        let dir = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("no parent directory for {}", path.display()))?;
        tokio::fs::create_dir_all(dir).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        ticker: String,
        year: i32,
    }

    #[tokio::test]
    async fn json_round_trip_and_absence() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let path = store.filing_dates_path();

        let missing: Option<Vec<Row>> = store.read_json_if_present(&path).await.unwrap();
        assert!(missing.is_none());

        let rows = vec![Row { ticker: "BKNG".into(), year: 2020 }];
        store.write_json(&path, &rows).await.unwrap();
        let read: Option<Vec<Row>> = store.read_json_if_present(&path).await.unwrap();
        assert_eq!(read, Some(rows));
    }

    #[tokio::test]
    async fn csv_round_trip_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let path = store.price_path("EXPE");

        let rows = vec![Row { ticker: "EXPE".into(), year: 2019 }];
        store.write_csv(&path, &rows).await.unwrap();
        let read: Option<Vec<Row>> = store.read_csv_if_present(&path).await.unwrap();
        assert_eq!(read, Some(rows));
    }
}
