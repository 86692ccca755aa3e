//! Local speech model assets: download, integrity checks, and locking.
//!
//! The two files are fetched once into the asset directory. Within a process
//! a `OnceCell` makes initialization happen once; across processes an
//! exclusive lock file next to the assets serializes downloads.
//!
//! Every asset is checked with BLAKE3 before use. With no configured digest,
//! the digest seen on first use is pinned in a `<name>.blake3` sidecar and
//! later runs verify against it.

use crate::config::LocalSpeechConfig;
use crate::error::StoryError;
use blake3::Hasher as Blake3Hasher;
use futures_util::StreamExt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;

/// ONNX weights file name.
pub const WEIGHTS_FILE: &str = "kokoro-v1.0.onnx";
/// Voice table file name.
pub const VOICES_FILE: &str = "voices-v1.0.bin";

const LOCK_FILE: &str = ".assets.lock";
const LOCK_POLL: Duration = Duration::from_millis(250);
const LOCK_WAIT: Duration = Duration::from_secs(15 * 60);
/// A lock older than this is assumed to belong to a crashed process.
const LOCK_STALE_AFTER: Duration = Duration::from_secs(60 * 60);

/// One downloadable asset.
#[derive(Debug, Clone)]
pub struct AssetSpec {
    pub file_name: &'static str,
    pub url: String,
    /// Configured digest; takes precedence over a pinned sidecar
    pub expected_blake3: Option<String>,
}

/// Paths of the verified asset pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    pub weights: PathBuf,
    pub voices: PathBuf,
}

/// On-disk state of one asset, for listing.
#[derive(Debug, Clone)]
pub struct AssetStatus {
    pub file_name: &'static str,
    pub path: PathBuf,
    pub size_bytes: Option<u64>,
    /// Digest from config or sidecar, if any
    pub pinned_blake3: Option<String>,
}

impl AssetStatus {
    pub fn is_present(&self) -> bool {
        self.size_bytes.is_some()
    }
}

/// The local speech asset pair and its one-time initialization.
pub struct LocalAssets {
    dir: PathBuf,
    weights: AssetSpec,
    voices: AssetSpec,
    client: reqwest::Client,
    ready: OnceCell<AssetPaths>,
}

impl LocalAssets {
    pub fn new(dir: PathBuf, weights: AssetSpec, voices: AssetSpec) -> Self {
        Self {
            dir,
            weights,
            voices,
            client: reqwest::Client::new(),
            ready: OnceCell::new(),
        }
    }

    pub fn from_config(dir: PathBuf, config: &LocalSpeechConfig) -> Self {
        Self::new(
            dir,
            AssetSpec {
                file_name: WEIGHTS_FILE,
                url: config.weights_url.clone(),
                expected_blake3: config.weights_blake3.clone(),
            },
            AssetSpec {
                file_name: VOICES_FILE,
                url: config.voices_url.clone(),
                expected_blake3: config.voices_blake3.clone(),
            },
        )
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Download (if needed) and verify both assets, once per process.
    pub async fn ensure(&self) -> Result<&AssetPaths, StoryError> {
        self.ready.get_or_try_init(|| self.acquire()).await
    }

    async fn acquire(&self) -> Result<AssetPaths, StoryError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            StoryError::Asset(format!("Cannot create {}: {e}", self.dir.display()))
        })?;

        let _lock = DirLock::acquire(&self.dir, LOCK_WAIT).await?;
        let weights = self.ensure_one(&self.weights).await?;
        let voices = self.ensure_one(&self.voices).await?;

        tracing::info!("Local speech assets ready in {}", self.dir.display());
        Ok(AssetPaths { weights, voices })
    }

    async fn ensure_one(&self, spec: &AssetSpec) -> Result<PathBuf, StoryError> {
        let path = self.dir.join(spec.file_name);
        if !path.exists() {
            tracing::info!("Downloading {}...", spec.file_name);
            download_file(&self.client, &spec.url, &path).await?;
        }
        verify_or_pin(&path, spec.expected_blake3.as_deref()).await?;
        Ok(path)
    }

    /// Current on-disk state of both assets.
    pub fn status(&self) -> Vec<AssetStatus> {
        [&self.weights, &self.voices]
            .into_iter()
            .map(|spec| {
                let path = self.dir.join(spec.file_name);
                let size_bytes = std::fs::metadata(&path).ok().map(|m| m.len());
                let pinned_blake3 = spec
                    .expected_blake3
                    .clone()
                    .or_else(|| std::fs::read_to_string(sidecar_path(&path)).ok())
                    .map(|s| s.trim().to_string());
                AssetStatus {
                    file_name: spec.file_name,
                    path,
                    size_bytes,
                    pinned_blake3,
                }
            })
            .collect()
    }
}

/// Exclusive lock file held for the duration of asset acquisition.
struct DirLock {
    path: PathBuf,
}

impl DirLock {
    fn try_acquire(dir: &Path) -> std::io::Result<Option<Self>> {
        let path = dir.join(LOCK_FILE);
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(mut file) => {
                use std::io::Write;
                let _ = writeln!(file, "{}", std::process::id());
                Ok(Some(Self { path }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                if is_stale(&path) {
                    tracing::warn!("Removing stale lock {}", path.display());
                    let _ = std::fs::remove_file(&path);
                }
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn acquire(dir: &Path, wait: Duration) -> Result<Self, StoryError> {
        let started = std::time::Instant::now();
        let mut logged = false;
        loop {
            match Self::try_acquire(dir) {
                Ok(Some(lock)) => return Ok(lock),
                Ok(None) => {}
                Err(e) => {
                    return Err(StoryError::Asset(format!(
                        "Cannot create lock in {}: {e}",
                        dir.display()
                    )))
                }
            }
            if started.elapsed() >= wait {
                return Err(StoryError::Asset(format!(
                    "Timed out waiting for another process to finish downloading into {}",
                    dir.display()
                )));
            }
            if !logged {
                tracing::info!("Waiting for another process to finish downloading assets...");
                logged = true;
            }
            tokio::time::sleep(LOCK_POLL).await;
        }
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn is_stale(path: &Path) -> bool {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > LOCK_STALE_AFTER)
}

fn sidecar_path(asset: &Path) -> PathBuf {
    let mut name = asset.file_name().unwrap_or_default().to_os_string();
    name.push(".blake3");
    asset.with_file_name(name)
}

fn part_path(asset: &Path) -> PathBuf {
    let mut name = asset.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    asset.with_file_name(name)
}

/// BLAKE3 of a file's contents, streamed in 64KB blocks.
pub fn content_hash(path: &Path) -> std::io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Blake3Hasher::new();

    let mut buffer = [0u8; 65536];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}

/// Stream `url` into `dest` through a `.part` file renamed on completion.
async fn download_file(client: &reqwest::Client, url: &str, dest: &Path) -> Result<(), StoryError> {
    let name = dest.display();
    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| StoryError::Asset(format!("Download of {name} failed: {e}")))?;

    let total_size = response.content_length();
    if let Some(size) = total_size {
        tracing::info!("  Size: {:.1} MB", size as f64 / (1024.0 * 1024.0));
    }

    let part = part_path(dest);
    let io_err = |e: std::io::Error| StoryError::Asset(format!("Writing {name} failed: {e}"));
    let mut file = tokio::fs::File::create(&part).await.map_err(io_err)?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&part).await;
                return Err(StoryError::Asset(format!(
                    "Download of {name} interrupted: {e}"
                )));
            }
        };
        file.write_all(&chunk).await.map_err(io_err)?;
        downloaded += chunk.len() as u64;

        if let Some(total) = total_size {
            if downloaded % (50 * 1024 * 1024) < chunk.len() as u64 {
                tracing::info!(
                    "  Progress: {:.0}%",
                    downloaded as f64 / total as f64 * 100.0
                );
            }
        }
    }

    file.flush().await.map_err(io_err)?;
    drop(file);
    tokio::fs::rename(&part, dest).await.map_err(io_err)?;
    Ok(())
}

/// Verify `path` against `expected`, or against its pinned sidecar, pinning
/// the current digest when neither exists.
///
/// On mismatch the corrupt file is removed so the next run re-downloads.
async fn verify_or_pin(path: &Path, expected: Option<&str>) -> Result<(), StoryError> {
    let owned = path.to_path_buf();
    let actual = tokio::task::spawn_blocking(move || content_hash(&owned))
        .await
        .map_err(|e| StoryError::Asset(format!("Checksum task failed: {e}")))?
        .map_err(|e| {
            StoryError::Asset(format!(
                "Checksum computation failed for {}: {e}",
                path.display()
            ))
        })?;

    let sidecar = sidecar_path(path);
    let pinned = match expected {
        Some(digest) => Some(digest.trim().to_lowercase()),
        None => tokio::fs::read_to_string(&sidecar)
            .await
            .ok()
            .map(|s| s.trim().to_lowercase()),
    };

    match pinned {
        Some(expected) if expected != actual => {
            let _ = tokio::fs::remove_file(path).await;
            Err(StoryError::Asset(format!(
                "Checksum mismatch for {}:\n  expected: {}\n  actual:   {}\n\
                 Corrupt file removed, run `storyloom assets download` again.",
                path.display(),
                expected,
                actual
            )))
        }
        Some(_) => {
            tracing::debug!("  Checksum verified: {}…", &actual[..16]);
            Ok(())
        }
        None => {
            tokio::fs::write(&sidecar, format!("{actual}\n"))
                .await
                .map_err(|e| {
                    StoryError::Asset(format!("Cannot pin {}: {e}", sidecar.display()))
                })?;
            tracing::info!("  Pinned checksum for {}: {}…", path.display(), &actual[..16]);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(file_name: &'static str, expected: Option<&str>) -> AssetSpec {
        AssetSpec {
            file_name,
            // Unroutable: tests never reach the network
            url: "http://127.0.0.1:9/missing".into(),
            expected_blake3: expected.map(String::from),
        }
    }

    #[test]
    fn test_content_hash_matches_in_memory_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, b"kokoro").unwrap();
        assert_eq!(
            content_hash(&path).unwrap(),
            blake3::hash(b"kokoro").to_hex().to_string()
        );
    }

    #[tokio::test]
    async fn test_first_use_pins_then_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voices.bin");
        std::fs::write(&path, b"voice table").unwrap();

        verify_or_pin(&path, None).await.unwrap();
        let pinned = std::fs::read_to_string(sidecar_path(&path)).unwrap();
        assert_eq!(pinned.trim(), blake3::hash(b"voice table").to_hex().as_str());

        // Same content verifies against the pin
        verify_or_pin(&path, None).await.unwrap();

        // Tampered content is rejected and removed
        std::fs::write(&path, b"tampered").unwrap();
        let err = verify_or_pin(&path, None).await.unwrap_err();
        assert!(err.to_string().contains("Checksum mismatch"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_configured_digest_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.onnx");
        std::fs::write(&path, b"weights").unwrap();
        let good = blake3::hash(b"weights").to_hex().to_string();

        verify_or_pin(&path, Some(&good.to_uppercase())).await.unwrap();
        assert!(!sidecar_path(&path).exists());

        let bad = blake3::hash(b"other").to_hex().to_string();
        assert!(verify_or_pin(&path, Some(&bad)).await.is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_ensure_uses_present_files_without_network() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(WEIGHTS_FILE), b"w").unwrap();
        std::fs::write(dir.path().join(VOICES_FILE), b"v").unwrap();

        let assets = LocalAssets::new(
            dir.path().to_path_buf(),
            spec(WEIGHTS_FILE, None),
            spec(VOICES_FILE, None),
        );
        let paths = assets.ensure().await.unwrap().clone();
        assert_eq!(paths.weights, dir.path().join(WEIGHTS_FILE));
        assert_eq!(paths.voices, dir.path().join(VOICES_FILE));

        // Lock is released after acquisition
        assert!(!dir.path().join(LOCK_FILE).exists());

        // Second call is served from the cell
        assert_eq!(assets.ensure().await.unwrap(), &paths);

        let status = assets.status();
        assert!(status.iter().all(|s| s.is_present() && s.pinned_blake3.is_some()));
    }

    #[tokio::test]
    async fn test_missing_asset_download_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let assets = LocalAssets::new(
            dir.path().to_path_buf(),
            spec(WEIGHTS_FILE, None),
            spec(VOICES_FILE, None),
        );
        let err = assets.ensure().await.unwrap_err();
        assert!(matches!(err, StoryError::Asset(_)));
        assert!(!dir.path().join(format!("{WEIGHTS_FILE}.part")).exists());
        assert!(!dir.path().join(LOCK_FILE).exists());
    }

    #[test]
    fn test_lock_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let first = DirLock::try_acquire(dir.path()).unwrap();
        assert!(first.is_some());
        assert!(DirLock::try_acquire(dir.path()).unwrap().is_none());
        drop(first);
        assert!(DirLock::try_acquire(dir.path()).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_lock_wait_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let _held = DirLock::try_acquire(dir.path()).unwrap().unwrap();
        let result = DirLock::acquire(dir.path(), Duration::from_millis(10)).await;
        assert!(matches!(result, Err(StoryError::Asset(ref m)) if m.contains("Timed out")));
    }

    #[test]
    fn test_status_reports_absent_files() {
        let dir = tempfile::tempdir().unwrap();
        let assets =
            LocalAssets::from_config(dir.path().to_path_buf(), &LocalSpeechConfig::default());
        let status = assets.status();
        assert_eq!(status.len(), 2);
        assert!(status.iter().all(|s| !s.is_present()));
        assert_eq!(status[0].file_name, WEIGHTS_FILE);
    }
}
