use lumi_core::assets::{
    download_file, temp_path, AssetError, AssetResult, DownloadProgress, DownloadResponse,
    Downloader, ModelAssets,
};
use lumi_core::ModelConfig;
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;

/// Serves canned bodies per URL; unknown URLs answer 404.
struct FakeDownloader {
    bodies: HashMap<String, Vec<u8>>,
    report_length: bool,
}

impl FakeDownloader {
    fn new(entries: &[(&str, &[u8])]) -> Self {
        Self {
            bodies: entries
                .iter()
                .map(|(url, body)| (url.to_string(), body.to_vec()))
                .collect(),
            report_length: true,
        }
    }
}

impl Downloader for FakeDownloader {
    fn get(&self, url: &str) -> AssetResult<DownloadResponse> {
        match self.bodies.get(url) {
            Some(body) => Ok(DownloadResponse {
                status: 200,
                content_length: self.report_length.then_some(body.len() as u64),
                body: Box::new(Cursor::new(body.clone())),
            }),
            None => Ok(DownloadResponse {
                status: 404,
                content_length: None,
                body: Box::new(std::io::empty()),
            }),
        }
    }
}

fn urls() -> ModelConfig {
    ModelConfig {
        gguf_url: "https://models.test/lumi.gguf".to_string(),
        metadata_url: "https://models.test/meta.json".to_string(),
        vocab_url: "https://models.test/vocab.json".to_string(),
        ..ModelConfig::default()
    }
}

#[test]
fn bundle_download_writes_all_files_and_reports_progress() {
    let dir = tempfile::tempdir().unwrap();
    let assets = ModelAssets::new(dir.path().join("lumi-model"));
    let weights = vec![7u8; 200_000];
    let downloader = FakeDownloader::new(&[
        ("https://models.test/lumi.gguf", &weights),
        ("https://models.test/meta.json", b"{}"),
        ("https://models.test/vocab.json", b"[]"),
    ]);
    let mut progress: Vec<DownloadProgress> = Vec::new();

    let status = assets
        .download_model_bundle(&downloader, &urls(), &mut |p| progress.push(p))
        .unwrap();

    assert!(status.has_model);
    assert_eq!(status.model_path, Some(assets.gguf_path()));
    assert_eq!(fs::read(assets.gguf_path()).unwrap().len(), weights.len());
    assert_eq!(fs::read(assets.metadata_path()).unwrap(), b"{}");
    assert_eq!(fs::read(assets.vocab_path()).unwrap(), b"[]");
    assert!(!temp_path(&assets.gguf_path()).exists());

    let last = progress.last().unwrap();
    assert_eq!(last.pct, 100);
    assert_eq!(last.bytes_written, weights.len() as u64);
    assert!(progress.windows(2).all(|w| w[0].bytes_written < w[1].bytes_written));
}

#[test]
fn missing_helper_files_do_not_fail_the_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let assets = ModelAssets::new(dir.path().join("lumi-model"));
    let downloader = FakeDownloader::new(&[("https://models.test/lumi.gguf", b"weights")]);

    let status = assets
        .download_model_bundle(&downloader, &urls(), &mut |_| {})
        .unwrap();

    assert!(status.has_model);
    assert!(!assets.metadata_path().exists());
    assert!(!assets.vocab_path().exists());
    assert!(!temp_path(&assets.vocab_path()).exists());
}

#[test]
fn non_success_status_leaves_no_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    let assets = ModelAssets::new(dir.path().join("lumi-model"));
    let downloader = FakeDownloader::new(&[]);

    let err = assets
        .download_model_bundle(&downloader, &urls(), &mut |_| {})
        .unwrap_err();

    assert!(matches!(err, AssetError::HttpStatus { status: 404, .. }));
    assert!(!assets.gguf_path().exists());
    assert!(!temp_path(&assets.gguf_path()).exists());
    assert!(!assets.status().has_model);
}

#[test]
fn unknown_length_downloads_without_progress() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("nested").join("file.bin");
    let mut downloader = FakeDownloader::new(&[("https://models.test/file", b"abc")]);
    downloader.report_length = false;
    let mut calls = 0;

    download_file(
        &downloader,
        "https://models.test/file",
        &dest,
        Some(&mut |_| calls += 1),
    )
    .unwrap();

    assert_eq!(fs::read(&dest).unwrap(), b"abc");
    assert_eq!(calls, 0);
}

#[test]
fn redownload_replaces_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("file.bin");
    fs::write(&dest, b"stale").unwrap();
    let downloader = FakeDownloader::new(&[("https://models.test/file", b"fresh")]);

    download_file(&downloader, "https://models.test/file", &dest, None).unwrap();

    assert_eq!(fs::read(&dest).unwrap(), b"fresh");
}

#[test]
fn delete_local_model_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let assets = ModelAssets::new(dir.path().join("lumi-model"));
    assets.ensure_dir().unwrap();
    fs::write(assets.gguf_path(), b"weights").unwrap();
    assert!(assets.status().has_model);

    assets.delete_local_model().unwrap();
    assert!(!assets.model_dir().exists());
    assert_eq!(assets.status().model_path, None);
    assets.delete_local_model().unwrap();
}
