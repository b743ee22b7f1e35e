//! Dataset acquisition
//!
//! Downloads the housing archive once and unpacks it next to itself. Both
//! steps are skipped when their output already exists, so repeated training
//! runs never touch the network. Both outputs are staged under a temporary
//! name and renamed into place only when complete.

use crate::config::AppConfig;
use crate::error::{HousingError, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Upper bound for a single backoff sleep
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Fetches and extracts the housing dataset
#[derive(Debug, Clone)]
pub struct DatasetFetcher {
    url: String,
    data_dir: PathBuf,
    max_attempts: u32,
    timeout: Duration,
    initial_backoff: Duration,
}

impl DatasetFetcher {
    /// Create a fetcher for `url` caching into `data_dir`
    pub fn new(url: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            data_dir: data_dir.into(),
            max_attempts: 3,
            timeout: Duration::from_secs(120),
            initial_backoff: Duration::from_secs(1),
        }
    }

    /// Build a fetcher from the application configuration
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.dataset_url.clone(), config.data_dir.clone())
            .with_max_attempts(config.download_retries)
            .with_timeout(Duration::from_secs(config.download_timeout_secs))
    }

    /// Set the number of download attempts
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the per-attempt timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the first backoff delay; later delays double
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn archive_path(&self) -> PathBuf {
        self.data_dir.join("housing.tgz")
    }

    pub fn csv_path(&self) -> PathBuf {
        self.data_dir.join("housing.csv")
    }

    /// Make sure `housing.csv` exists locally and return its path
    pub async fn fetch(&self) -> Result<PathBuf> {
        let csv_path = self.csv_path();
        if csv_path.exists() {
            info!(path = %csv_path.display(), "Data already exists");
            return Ok(csv_path);
        }

        fs::create_dir_all(&self.data_dir)?;

        let archive_path = self.archive_path();
        if archive_path.exists() {
            info!(path = %archive_path.display(), "Archive cached, skipping download");
        } else {
            self.download_with_retry(&archive_path).await?;
        }

        if let Err(e) = extract_archive(&archive_path, &self.data_dir) {
            warn!(path = %archive_path.display(), error = %e, "Discarding unusable archive");
            let _ = fs::remove_file(&archive_path);
            return Err(e);
        }
        Ok(csv_path)
    }

    async fn download_with_retry(&self, dest: &Path) -> Result<()> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("calhousing/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HousingError::DownloadError {
                attempts: 0,
                reason: format!("failed to create HTTP client: {}", e),
            })?;

        let mut backoff = self.initial_backoff;
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            info!(url = %self.url, attempt, max_attempts = self.max_attempts, "Downloading housing data");

            match self.download_once(&client, dest).await {
                Ok(bytes) => {
                    info!(size_bytes = bytes, path = %dest.display(), "Dataset downloaded");
                    return Ok(());
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Download attempt failed");
                    last_error = e;
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }

        Err(HousingError::DownloadError {
            attempts: self.max_attempts,
            reason: last_error,
        })
    }

    /// One attempt; writes to a sibling temp file and renames on success
    async fn download_once(
        &self,
        client: &reqwest::Client,
        dest: &Path,
    ) -> std::result::Result<usize, String> {
        let response = client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!(
                "HTTP error {}: {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown")
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| format!("failed to read response body: {}", e))?;

        if bytes.is_empty() {
            return Err("empty response body".to_string());
        }

        persist_archive(&bytes, dest)?;
        Ok(bytes.len())
    }
}

/// Write `bytes` to `dest` through `<dest>.part`, leaving nothing behind on failure
fn persist_archive(bytes: &[u8], dest: &Path) -> std::result::Result<(), String> {
    let partial = dest.with_extension("tgz.part");
    if let Err(e) = fs::write(&partial, bytes) {
        let _ = fs::remove_file(&partial);
        return Err(format!("failed to write archive: {}", e));
    }
    if let Err(e) = fs::rename(&partial, dest) {
        let _ = fs::remove_file(&partial);
        return Err(format!("failed to move archive: {}", e));
    }
    Ok(())
}

/// Unpack `housing.csv` from a gzip-compressed tarball into `data_dir`
///
/// The entry is copied to `housing.csv.part` and renamed once its full size
/// has been read, so a truncated or corrupt archive never leaves a CSV
/// behind. An archive without `housing.csv` is a malformed download.
pub fn extract_archive(archive_path: &Path, data_dir: &Path) -> Result<()> {
    info!(archive = %archive_path.display(), "Extracting housing data");

    let csv_path = data_dir.join("housing.csv");
    let partial = data_dir.join("housing.csv.part");

    let file = File::open(archive_path)?;
    let found = match unpack_csv(file, &partial) {
        Ok(found) => found,
        Err(e) => {
            let _ = fs::remove_file(&partial);
            return Err(HousingError::MalformedDataset(format!(
                "failed to extract {}: {}",
                archive_path.display(),
                e
            )));
        }
    };

    if !found {
        return Err(HousingError::MalformedDataset(format!(
            "{} did not contain housing.csv",
            archive_path.display()
        )));
    }

    if let Err(e) = fs::rename(&partial, &csv_path) {
        let _ = fs::remove_file(&partial);
        return Err(e.into());
    }

    info!(path = %csv_path.display(), "Data extracted");
    Ok(())
}

/// Copy the `housing.csv` entry to `dest`; `false` when the archive has none
fn unpack_csv(file: File, dest: &Path) -> io::Result<bool> {
    let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
    for entry in archive.entries()? {
        let mut entry = entry?;
        let is_csv = entry.path()?.file_name().and_then(|n| n.to_str()) == Some("housing.csv");
        if !is_csv {
            continue;
        }

        let expected = entry.header().size()?;
        let mut writer = BufWriter::new(File::create(dest)?);
        let copied = io::copy(&mut entry, &mut writer)?;
        writer.flush()?;
        if copied != expected {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("housing.csv truncated: {} of {} bytes", copied, expected),
            ));
        }
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn write_archive(path: &Path, name: &str, contents: &[u8]) {
        let file = File::create(path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);

        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, contents).unwrap();
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_extract_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("housing.tgz");
        write_archive(&archive, "housing.csv", b"longitude\n-122.0\n");

        extract_archive(&archive, dir.path()).unwrap();
        let csv = fs::read_to_string(dir.path().join("housing.csv")).unwrap();
        assert!(csv.starts_with("longitude"));
    }

    #[test]
    fn test_extract_archive_without_csv() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("housing.tgz");
        write_archive(&archive, "other.txt", b"nothing here");

        let err = extract_archive(&archive, dir.path()).unwrap_err();
        assert!(matches!(err, HousingError::MalformedDataset(_)));
    }

    #[test]
    fn test_extract_corrupt_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("housing.tgz");
        fs::write(&archive, b"definitely not gzip").unwrap();

        let err = extract_archive(&archive, dir.path()).unwrap_err();
        assert!(matches!(err, HousingError::MalformedDataset(_)));
    }

    fn large_csv() -> Vec<u8> {
        let mut csv = String::from("longitude,latitude,median_income\n");
        for i in 0..20_000u64 {
            let v = i.wrapping_mul(2_654_435_761) % 1_000_003;
            csv.push_str(&format!("-{}.{},{}.{},{}\n", 114 + v % 10, v, 32 + i % 10, v % 977, v % 150_001));
        }
        csv.into_bytes()
    }

    fn write_truncated_archive(path: &Path) {
        write_archive(path, "housing.csv", &large_csv());
        let bytes = fs::read(path).unwrap();
        fs::write(path, &bytes[..bytes.len() / 2]).unwrap();
    }

    #[test]
    fn test_extract_truncated_archive_leaves_no_csv() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("housing.tgz");
        write_truncated_archive(&archive);

        let err = extract_archive(&archive, dir.path()).unwrap_err();
        assert!(matches!(err, HousingError::MalformedDataset(_)));
        assert!(!dir.path().join("housing.csv").exists());
        assert!(!dir.path().join("housing.csv.part").exists());
    }

    #[tokio::test]
    async fn test_fetch_discards_truncated_archive() {
        let dir = tempfile::tempdir().unwrap();
        write_truncated_archive(&dir.path().join("housing.tgz"));

        let fetcher = DatasetFetcher::new("http://127.0.0.1:9/housing.tgz", dir.path());
        assert!(fetcher.fetch().await.is_err());
        assert!(!dir.path().join("housing.csv").exists());
        // The next fetch downloads again instead of reusing the bad archive
        assert!(!dir.path().join("housing.tgz").exists());
    }

    #[test]
    fn test_persist_archive_cleans_up_on_failed_rename() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory where the archive should go makes the rename fail
        let dest = dir.path().join("housing.tgz");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("keep"), b"x").unwrap();

        assert!(persist_archive(b"archive bytes", &dest).is_err());
        assert!(!dir.path().join("housing.tgz.part").exists());
    }

    #[test]
    fn test_persist_archive() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("housing.tgz");
        persist_archive(b"archive bytes", &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"archive bytes");
        assert!(!dir.path().join("housing.tgz.part").exists());
    }

    #[tokio::test]
    async fn test_fetch_uses_cached_csv() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("housing.csv"), b"longitude\n").unwrap();

        // Unroutable URL: any network access would fail the test
        let fetcher = DatasetFetcher::new("http://127.0.0.1:9/housing.tgz", dir.path());
        let path = fetcher.fetch().await.unwrap();
        assert_eq!(path, dir.path().join("housing.csv"));
    }

    #[tokio::test]
    async fn test_fetch_extracts_cached_archive() {
        let dir = tempfile::tempdir().unwrap();
        write_archive(&dir.path().join("housing.tgz"), "housing.csv", b"longitude\n");

        let fetcher = DatasetFetcher::new("http://127.0.0.1:9/housing.tgz", dir.path());
        let path = fetcher.fetch().await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_download_failure_reports_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = DatasetFetcher::new("http://127.0.0.1:9/housing.tgz", dir.path())
            .with_max_attempts(2)
            .with_timeout(Duration::from_secs(2))
            .with_initial_backoff(Duration::from_millis(10));

        let err = fetcher.fetch().await.unwrap_err();
        assert!(matches!(err, HousingError::DownloadError { attempts: 2, .. }));
    }
}
