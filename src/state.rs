use crate::types::{
    DigestReport, EnrichmentOutcome, ProcessedMarker, Result, ResultSet, ScoutError, StoragePaths,
    StoreStatus,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

/// File-backed state shared between runs: the raw feed, the result set,
/// the processed marker and the last digest.
///
/// One pipeline per data directory. Nothing here guards against two
/// processes writing the same files.
pub struct ResultStore {
    paths: StoragePaths,
}

impl ResultStore {
    pub fn new(paths: StoragePaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    /// Outcomes from earlier runs. A missing file is an empty set; an unreadable
    /// one is logged and also treated as empty.
    pub async fn load(&self) -> ResultSet {
        match read_json::<ResultSet>(&self.paths.results).await {
            Ok(Some(results)) => {
                info!("Loaded {} existing outcomes from {}", results.len(), self.paths.results.display());
                results
            }
            Ok(None) => ResultSet::new(),
            Err(e) => {
                warn!("Could not load existing outcomes, starting empty: {}", e);
                ResultSet::new()
            }
        }
    }

    /// Append `new_outcomes` and overwrite the stored set with the result.
    pub async fn append_and_persist(
        &self,
        mut results: ResultSet,
        new_outcomes: Vec<EnrichmentOutcome>,
    ) -> Result<ResultSet> {
        results.extend(new_outcomes);
        self.persist(&results).await?;
        Ok(results)
    }

    pub async fn persist(&self, results: &ResultSet) -> Result<()> {
        write_json(&self.paths.results, results).await?;
        info!("Saved {} outcomes to {}", results.len(), self.paths.results.display());
        Ok(())
    }

    pub async fn is_processed(&self) -> bool {
        match self.marker().await {
            Ok(marker) => marker.map(|m| m.processed).unwrap_or(false),
            Err(e) => {
                warn!("Unreadable processed marker, treating as unprocessed: {}", e);
                false
            }
        }
    }

    pub async fn marker(&self) -> Result<Option<ProcessedMarker>> {
        read_json(&self.paths.marker).await
    }

    pub async fn mark_processed(&self) -> Result<()> {
        self.write_marker(true).await
    }

    pub async fn clear_processed(&self) -> Result<()> {
        self.write_marker(false).await
    }

    async fn write_marker(&self, processed: bool) -> Result<()> {
        let marker = ProcessedMarker {
            processed,
            timestamp: Utc::now(),
        };
        write_json(&self.paths.marker, &marker).await?;
        debug!("Processed marker set to {}", processed);
        Ok(())
    }

    /// Raw feed text saved by an earlier run, if any.
    pub async fn load_feed(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.paths.feed).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ScoutError::storage(&self.paths.feed, e)),
        }
    }

    /// Store the feed exactly as fetched.
    pub async fn save_feed(&self, raw: &str) -> Result<()> {
        write_atomic(&self.paths.feed, raw.as_bytes()).await?;
        info!("Wrote feed data to {}", self.paths.feed.display());
        Ok(())
    }

    pub async fn save_digest(&self, report: &DigestReport) -> Result<()> {
        write_json(&self.paths.digest, report).await
    }

    pub async fn load_digest(&self) -> Result<Option<DigestReport>> {
        read_json(&self.paths.digest).await
    }

    pub async fn status(&self) -> StoreStatus {
        let marker = self.marker().await.ok().flatten();
        let results_exist = fs::try_exists(&self.paths.results).await.unwrap_or(false);
        let outcome_count = if results_exist { self.load().await.len() } else { 0 };

        StoreStatus {
            processed: marker.as_ref().map(|m| m.processed).unwrap_or(false),
            processed_timestamp: marker.filter(|m| m.processed).map(|m| m.timestamp),
            feed_exists: fs::try_exists(&self.paths.feed).await.unwrap_or(false),
            results_exist,
            outcome_count,
        }
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ScoutError::storage(path, e)),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &json).await
}

/// Write to a sibling temp file, then rename over the target.
async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| ScoutError::storage(parent, e))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    fs::write(&tmp, contents)
        .await
        .map_err(|e| ScoutError::storage(&tmp, e))?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| ScoutError::storage(path, e))?;
    Ok(())
}
