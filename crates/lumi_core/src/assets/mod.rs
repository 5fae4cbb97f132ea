//! On-device model bundle management.
//!
//! # Responsibility
//! - Resolve bundle file paths under one model directory.
//! - Report whether the GGUF weights are present.
//! - Download bundle files through a `Downloader`.
//!
//! # Invariants
//! - Downloads land in `{dest}.download` and are renamed into place only
//!   after a 2xx response body is fully written.
//! - A failed download leaves no temp file behind.
//! - Progress is reported only when the content length is known.

mod http;

pub use http::HttpDownloader;

use crate::config::ModelConfig;
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

pub const MODEL_DIR_NAME: &str = "lumi-model";
pub const GGUF_FILE: &str = "lumi_finetuned.gguf";
pub const METADATA_FILE: &str = "gguf_metadata.json";
pub const VOCAB_FILE: &str = "vocab.json";

const TEMP_SUFFIX: &str = ".download";
const COPY_BUFFER_BYTES: usize = 64 * 1024;

#[derive(Debug)]
pub enum AssetError {
    Io { path: PathBuf, source: io::Error },
    /// Server answered outside 2xx.
    HttpStatus { url: String, status: u16 },
    /// Connection, DNS or TLS failure.
    Transport { url: String, message: String },
}

impl Display for AssetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "io error at {}: {source}", path.display()),
            Self::HttpStatus { url, status } => {
                write!(f, "download failed with status {status}: {url}")
            }
            Self::Transport { url, message } => write!(f, "download failed for {url}: {message}"),
        }
    }
}

impl Error for AssetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type AssetResult<T> = Result<T, AssetError>;

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> AssetError + '_ {
    move |source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Open HTTP response body.
pub struct DownloadResponse {
    pub status: u16,
    pub content_length: Option<u64>,
    pub body: Box<dyn Read + Send>,
}

/// Fetches remote bundle files.
pub trait Downloader {
    /// Starts a GET. Non-2xx statuses are returned, not raised.
    fn get(&self, url: &str) -> AssetResult<DownloadResponse>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DownloadProgress {
    pub bytes_written: u64,
    pub content_length: u64,
    /// Whole percent, clamped to `0..=100`.
    pub pct: u8,
}

impl DownloadProgress {
    fn new(bytes_written: u64, content_length: u64) -> Self {
        let pct = (u128::from(bytes_written) * 100 / u128::from(content_length.max(1))).min(100);
        Self {
            bytes_written,
            content_length,
            pct: u8::try_from(pct).unwrap_or(100),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelStatus {
    pub has_model: bool,
    pub model_path: Option<PathBuf>,
}

/// Model bundle rooted at one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAssets {
    model_dir: PathBuf,
}

impl ModelAssets {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
        }
    }

    /// Uses `model.model_dir` when set, else `{documents_dir}/lumi-model`.
    pub fn from_config(config: &ModelConfig, documents_dir: &Path) -> Self {
        match &config.model_dir {
            Some(dir) => Self::new(dir.clone()),
            None => Self::new(documents_dir.join(MODEL_DIR_NAME)),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn gguf_path(&self) -> PathBuf {
        self.model_dir.join(GGUF_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.model_dir.join(METADATA_FILE)
    }

    pub fn vocab_path(&self) -> PathBuf {
        self.model_dir.join(VOCAB_FILE)
    }

    pub fn status(&self) -> ModelStatus {
        let gguf = self.gguf_path();
        let has_model = gguf.is_file();
        ModelStatus {
            has_model,
            model_path: has_model.then_some(gguf),
        }
    }

    pub fn ensure_dir(&self) -> AssetResult<&Path> {
        fs::create_dir_all(&self.model_dir).map_err(io_error(&self.model_dir))?;
        Ok(&self.model_dir)
    }

    /// Removes the whole model directory. Missing directory is not an error.
    pub fn delete_local_model(&self) -> AssetResult<()> {
        match fs::remove_dir_all(&self.model_dir) {
            Ok(()) => {
                info!("event=model_delete module=assets status=ok");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(&self.model_dir)(err)),
        }
    }

    /// Downloads the GGUF weights, then the optional metadata and vocab.
    ///
    /// Only a GGUF failure is returned; helper file failures are logged.
    pub fn download_model_bundle(
        &self,
        downloader: &dyn Downloader,
        urls: &ModelConfig,
        on_progress: &mut dyn FnMut(DownloadProgress),
    ) -> AssetResult<ModelStatus> {
        self.ensure_dir()?;
        download_file(downloader, &urls.gguf_url, &self.gguf_path(), Some(on_progress))?;

        for (url, dest) in [
            (&urls.metadata_url, self.metadata_path()),
            (&urls.vocab_url, self.vocab_path()),
        ] {
            if let Err(err) = download_file(downloader, url, &dest, None) {
                warn!(
                    "event=model_download module=assets status=skip file={} error={}",
                    dest.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
                    err
                );
            }
        }
        Ok(self.status())
    }
}

/// `{dest}.download`.
pub fn temp_path(dest: &Path) -> PathBuf {
    let mut name = OsString::from(dest.as_os_str());
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

/// Downloads `url` to `dest` through a temp file.
pub fn download_file(
    downloader: &dyn Downloader,
    url: &str,
    dest: &Path,
    on_progress: Option<&mut dyn FnMut(DownloadProgress)>,
) -> AssetResult<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let tmp = temp_path(dest);
    match write_download(downloader, url, dest, &tmp, on_progress) {
        Ok(bytes) => {
            info!("event=model_download module=assets status=ok bytes={}", bytes);
            Ok(())
        }
        Err(err) => {
            let _ = fs::remove_file(&tmp);
            warn!("event=model_download module=assets status=error error={}", err);
            Err(err)
        }
    }
}

fn write_download(
    downloader: &dyn Downloader,
    url: &str,
    dest: &Path,
    tmp: &Path,
    mut on_progress: Option<&mut dyn FnMut(DownloadProgress)>,
) -> AssetResult<u64> {
    let response = downloader.get(url)?;
    if !(200..300).contains(&response.status) {
        return Err(AssetError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    let mut file = File::create(tmp).map_err(io_error(tmp))?;
    let mut reader = response.body;
    let content_length = response.content_length.filter(|len| *len > 0);
    let mut buf = vec![0u8; COPY_BUFFER_BYTES];
    let mut written: u64 = 0;
    loop {
        let n = reader.read(&mut buf).map_err(|err| AssetError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        })?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(io_error(tmp))?;
        written += n as u64;
        if let (Some(callback), Some(total)) = (on_progress.as_deref_mut(), content_length) {
            callback(DownloadProgress::new(written, total));
        }
    }
    file.sync_all().map_err(io_error(tmp))?;
    drop(file);

    if dest.exists() {
        fs::remove_file(dest).map_err(io_error(dest))?;
    }
    fs::rename(tmp, dest).map_err(io_error(dest))?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_pct_is_clamped() {
        assert_eq!(DownloadProgress::new(50, 200).pct, 25);
        assert_eq!(DownloadProgress::new(300, 200).pct, 100);
        assert_eq!(DownloadProgress::new(0, 200).pct, 0);
    }

    #[test]
    fn temp_path_appends_suffix() {
        let tmp = temp_path(Path::new("/data/lumi-model/lumi_finetuned.gguf"));
        assert_eq!(tmp, PathBuf::from("/data/lumi-model/lumi_finetuned.gguf.download"));
    }

    #[test]
    fn from_config_prefers_explicit_dir() {
        let mut config = ModelConfig::default();
        let assets = ModelAssets::from_config(&config, Path::new("/docs"));
        assert_eq!(assets.model_dir(), Path::new("/docs/lumi-model"));

        config.model_dir = Some(PathBuf::from("/models"));
        let assets = ModelAssets::from_config(&config, Path::new("/docs"));
        assert_eq!(assets.gguf_path(), PathBuf::from("/models/lumi_finetuned.gguf"));
    }
}
