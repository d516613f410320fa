//! Downloading yearly comex files, with a local Parquet cache.

use crate::comex::catalog::{parse_year, TradeFlow};
use crate::comex::dataset::ComexDataset;
use crate::error::{CrewLabError, Result};
use futures::future::join_all;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use zip::ZipArchive;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Level of detail of the yearly files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    /// `{base}/mun/{FLOW}_{YEAR}_MUN.csv`
    #[default]
    Municipality,
    /// `{base}/ncm/{FLOW}_{YEAR}.csv`
    Ncm,
}

/// Where yearly comex files are published.
#[derive(Debug, Clone)]
pub struct ComexSource {
    base_url: String,
    granularity: Granularity,
    zipped: bool,
}

impl ComexSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            granularity: Granularity::default(),
            zipped: false,
        }
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// Request `.zip` archives instead of plain `.csv` files.
    pub fn zipped(mut self, zipped: bool) -> Self {
        self.zipped = zipped;
        self
    }

    pub fn url(&self, flow: TradeFlow, year: &str) -> String {
        let extension = if self.zipped { "zip" } else { "csv" };
        match self.granularity {
            Granularity::Municipality => {
                format!("{}/mun/{}_{}_MUN.{}", self.base_url, flow, year, extension)
            }
            Granularity::Ncm => format!("{}/ncm/{}_{}.{}", self.base_url, flow, year, extension),
        }
    }
}

/// Result of warming the cache for one (year, flow) pair.
#[derive(Debug)]
pub struct PrecacheOutcome {
    pub flow: TradeFlow,
    pub year: String,
    /// Row count on success
    pub rows: Result<usize>,
}

pub struct ComexLoader {
    client: reqwest::Client,
    source: ComexSource,
    cache_dir: PathBuf,
}

impl ComexLoader {
    pub fn new(source: ComexSource, cache_dir: impl Into<PathBuf>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .unwrap_or_default();

        Self {
            client,
            source,
            cache_dir: cache_dir.into(),
        }
    }

    pub fn source(&self) -> &ComexSource {
        &self.source
    }

    pub fn cache_path(&self, flow: TradeFlow, year: &str) -> PathBuf {
        self.cache_dir.join(format!("{}_{}.parquet", flow, year))
    }

    /// The full year of `flow`, from the cache when allowed and present.
    pub async fn fetch_year(&self, flow: TradeFlow, year: &str, use_cache: bool) -> Result<ComexDataset> {
        let year = parse_year(year)?;
        let cache_path = self.cache_path(flow, year);

        if use_cache && cache_path.is_file() {
            info!(path = %cache_path.display(), "Reading comex data from cache");
            let path = cache_path.clone();
            match tokio::task::spawn_blocking(move || ComexDataset::read_parquet(path)).await? {
                Ok(dataset) => return Ok(dataset),
                Err(e) => warn!(path = %cache_path.display(), error = %e, "Unreadable cache, downloading again"),
            }
        }

        let url = self.source.url(flow, year);
        info!(url = %url, "Downloading comex data");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CrewLabError::DataError(format!(
                "Download of {} failed with status {}",
                url, status
            )));
        }
        let bytes = response.bytes().await?;
        debug!(bytes = bytes.len(), "Download complete");

        let dataset = tokio::task::spawn_blocking(move || {
            let csv = extract_csv(&bytes)?;
            ComexDataset::from_csv_bytes(&csv)
        })
        .await??;

        if use_cache {
            let cached = dataset.clone();
            let path = cache_path.clone();
            tokio::task::spawn_blocking(move || write_cache(&cached, &path)).await??;
            info!(path = %cache_path.display(), rows = dataset.num_rows(), "Cached comex data");
        }

        Ok(dataset)
    }

    pub async fn fetch_month(
        &self,
        flow: TradeFlow,
        year: &str,
        month: u32,
        use_cache: bool,
    ) -> Result<ComexDataset> {
        self.fetch_year(flow, year, use_cache).await?.filter_month(month)
    }

    /// Download every (year, flow) pair concurrently into the cache.
    ///
    /// Failures are reported per pair; one failure does not stop the others.
    pub async fn precache(&self, years: &[&str], flows: &[TradeFlow]) -> Vec<PrecacheOutcome> {
        let pairs: Vec<(&str, TradeFlow)> = years
            .iter()
            .flat_map(|year| flows.iter().map(move |flow| (*year, *flow)))
            .collect();

        let jobs = pairs.into_iter().map(|(year, flow)| async move {
            let rows = self.fetch_year(flow, year, true).await.map(|d| d.num_rows());
            match &rows {
                Ok(rows) => info!(flow = %flow, year, rows, "Cached"),
                Err(e) => warn!(flow = %flow, year, error = %e, "Caching failed"),
            }
            PrecacheOutcome {
                flow,
                year: year.to_string(),
                rows,
            }
        });

        join_all(jobs).await
    }
}

/// The CSV payload of a download, unpacking the first `.csv` entry of a ZIP archive.
fn extract_csv(bytes: &[u8]) -> Result<Vec<u8>> {
    if !bytes.starts_with(ZIP_MAGIC) {
        return Ok(bytes.to_vec());
    }

    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if !entry.name().to_lowercase().ends_with(".csv") {
            continue;
        }

        debug!(entry = entry.name(), "Extracting CSV from archive");
        let mut csv = Vec::new();
        entry.read_to_end(&mut csv)?;
        return Ok(csv);
    }

    Err(CrewLabError::DataError("ZIP archive contains no .csv file".to_string()))
}

fn write_cache(dataset: &ComexDataset, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    dataset.write_parquet(path)
}
