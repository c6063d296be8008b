use anyhow::{anyhow, Result};
use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::{path::Path, time::Duration};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, warn};

use crate::{env, events::{Events, LaunchEvent}, Error};

/// Extra attempts made after a failed download when retry is requested
pub const MAX_RETRIES: usize = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded,
    NotFound,
    Failed
}

enum Attempt {
    Done,
    NotFound
}

#[derive(Clone)]
pub struct Downloader {
    client: Client,
    events: Events
}

impl Downloader {
    pub fn new(timeout: Duration, events: Events) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("{}/{}", env::get_package_name(), env::get_package_version()))
            .build()?;

        Ok(Downloader { client, events })
    }

    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url)
            .send().await
            .and_then(|r| r.error_for_status())
            .map_err(|e| network_error(url, e))?;

        Ok(response.text().await.map_err(|e| network_error(url, e))?)
    }

    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let text = self.fetch_text(url).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Stream `url` into `dest_dir/name`.
    ///
    /// Never fails, callers inspect the outcome or the destination file. A
    /// failed attempt removes the partial file and, when `retry` is set, is
    /// repeated once. A 404 is final.
    pub async fn fetch(&self, url: &str, dest_dir: &Path, name: &str, retry: bool) -> FetchOutcome {
        let attempts = if retry { 1 + MAX_RETRIES } else { 1 };
        let dest = dest_dir.join(name);

        for attempt in 1..=attempts {
            match self.try_fetch(url, dest_dir, &dest, name).await {
                Ok(Attempt::Done) => {
                    debug!("Downloaded {url} to {}", dest.display());
                    return FetchOutcome::Downloaded;
                }
                Ok(Attempt::NotFound) => {
                    warn!("Download {url} returned 404");
                    return FetchOutcome::NotFound;
                }
                Err(e) => {
                    warn!("Download {url} failed (attempt {attempt}/{attempts}): {e}");

                    if dest.exists() {
                        let _ = fs::remove_file(&dest).await;
                    }
                }
            }
        }

        FetchOutcome::Failed
    }

    /// Same as [`Downloader::fetch`] with the destination given as a file path
    pub async fn fetch_file(&self, url: &str, dest: &Path, retry: bool) -> FetchOutcome {
        let (Some(dir), Some(name)) = (dest.parent(), dest.file_name().and_then(|n| n.to_str())) else {
            warn!("Invalid download destination {}", dest.display());
            return FetchOutcome::Failed;
        };

        self.fetch(url, dir, name, retry).await
    }

    async fn try_fetch(&self, url: &str, dest_dir: &Path, dest: &Path, name: &str) -> Result<Attempt> {
        fs::create_dir_all(dest_dir).await?;

        let response = self.client.get(url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Attempt::NotFound);
        }

        if !response.status().is_success() {
            return Err(anyhow!("unexpected status {}", response.status()));
        }

        let total = response.content_length();
        let mut received: u64 = 0;
        let mut stream = response.bytes_stream();
        let mut file = fs::File::create(dest).await?;

        while let Some(item) = stream.next().await {
            let chunk = item?;
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;

            self.events.emit(LaunchEvent::Download {
                name: name.to_string(),
                received,
                total
            });
        }

        file.flush().await?;

        Ok(Attempt::Done)
    }
}

fn network_error(url: &str, e: reqwest::Error) -> Error {
    Error::Network { url: url.to_string(), reason: e.to_string() }
}
