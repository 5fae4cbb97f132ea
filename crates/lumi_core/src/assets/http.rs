//! `ureq`-backed downloader.

use super::{AssetError, AssetResult, DownloadResponse, Downloader};
use std::time::Duration;

pub struct HttpDownloader {
    agent: ureq::Agent,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self::with_agent(
            ureq::AgentBuilder::new()
                .timeout_connect(Duration::from_secs(10))
                .timeout_read(Duration::from_secs(60))
                .build(),
        )
    }

    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl Downloader for HttpDownloader {
    fn get(&self, url: &str) -> AssetResult<DownloadResponse> {
        let response = match self.agent.get(url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Ok(DownloadResponse {
                    status,
                    content_length: None,
                    body: Box::new(std::io::empty()),
                });
            }
            Err(err) => {
                return Err(AssetError::Transport {
                    url: url.to_string(),
                    message: err.to_string(),
                });
            }
        };

        let content_length = response
            .header("content-length")
            .and_then(|value| value.parse::<u64>().ok());
        Ok(DownloadResponse {
            status: response.status(),
            content_length,
            body: Box::new(response.into_reader()),
        })
    }
}
