/*
 * Blocklaunch - A Minecraft Launcher
 * Copyright (C) 2025 Josh Kropf <josh@slashdev.ca>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use anyhow::{bail, Result};
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::{
    downloader::Downloader,
    json::{GameManifest, LaunchProfile, VersionManifest},
    Error
};

/// Finds version descriptors, on disk first and then through the manifest
pub struct VersionResolver {
    root: PathBuf,
    directory: Option<PathBuf>,
    meta_url: String,
    downloader: Downloader
}

impl VersionResolver {
    pub fn new(profile: &LaunchProfile, downloader: Downloader) -> Self {
        VersionResolver {
            root: profile.root.clone(),
            directory: profile.overrides.directory.clone(),
            meta_url: profile.overrides.url.meta.trim_end_matches('/').to_string(),
            downloader
        }
    }

    pub fn descriptor_path(&self, number: &str) -> PathBuf {
        self.directory.clone()
            .unwrap_or_else(|| self.root.join("versions").join(number))
            .join(format!("{number}.json"))
    }

    fn manifest_cache_path(&self) -> PathBuf {
        self.root.join("cache").join("json").join("version_manifest.json")
    }

    pub async fn resolve(&self, number: &str) -> Result<GameManifest> {
        let descriptor_path = self.descriptor_path(number);

        if descriptor_path.exists() {
            let json = fs::read_to_string(&descriptor_path).await?;

            match serde_json::from_str::<GameManifest>(&json) {
                Ok(manifest) => {
                    debug!("Using local descriptor {}", descriptor_path.display());
                    return Ok(manifest);
                }
                Err(e) => warn!("Ignoring unreadable descriptor {}: {e}", descriptor_path.display())
            }
        }

        let manifest = self.version_manifest().await?;

        let Some(entry) = manifest.find(number) else {
            bail!(Error::VersionNotFound(number.to_string()));
        };

        info!("Fetching version descriptor {number}");
        let json = self.downloader.fetch_text(&entry.url).await?;
        let game_manifest: GameManifest = serde_json::from_str(&json)?;

        if let Some(parent) = descriptor_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&descriptor_path, &json).await?;

        Ok(game_manifest)
    }

    /// Remote version manifest, falling back to the last cached copy
    pub async fn version_manifest(&self) -> Result<VersionManifest> {
        let url = format!("{}/mc/game/version_manifest.json", self.meta_url);
        let cache_path = self.manifest_cache_path();

        match self.downloader.fetch_text(&url).await {
            Ok(json) => {
                let manifest = serde_json::from_str(&json)?;

                if let Some(parent) = cache_path.parent() {
                    fs::create_dir_all(parent).await?;
                }
                fs::write(&cache_path, &json).await?;

                Ok(manifest)
            }

            Err(e) => {
                let cached = fs::read_to_string(&cache_path).await.ok()
                    .and_then(|json| serde_json::from_str(&json).ok());

                match cached {
                    Some(manifest) => {
                        warn!("Version manifest unavailable, using cached copy: {e}");
                        Ok(manifest)
                    }
                    None => Err(e)
                }
            }
        }
    }
}
