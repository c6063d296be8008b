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

use anyhow::Result;
use futures_util::future::join_all;
use std::path::{Path, PathBuf};
use tokio::{fs, task};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    archive, checksum,
    downloader::Downloader,
    env::{self, Os},
    events::{Events, Phase, PhaseProgress},
    json::{GameManifest, LaunchProfile, Library, LibraryArtifact},
    rules::{library_applies, RulesContext}
};

/// Downloads and unpacks the platform native libraries of a version
pub struct NativesExtractor {
    natives_dir: PathBuf,
    cwd: PathBuf,
    rules_ctx: RulesContext,
    downloader: Downloader,
    events: Events
}

impl NativesExtractor {
    pub fn new(profile: &LaunchProfile, downloader: Downloader, events: Events) -> Self {
        NativesExtractor {
            natives_dir: profile.natives_dir(),
            cwd: profile.cwd(),
            rules_ctx: RulesContext::new(profile.os(), profile.features()),
            downloader,
            events
        }
    }

    /// Returns the directory to pass as `java.library.path`
    pub async fn materialize(&self, game_manifest: &GameManifest) -> Result<PathBuf> {
        // 1.19+ loads natives straight out of the library jars
        if game_manifest.minor_version().map_or(false, |minor| minor >= 19) {
            return Ok(self.cwd.clone());
        }

        if is_populated(&self.natives_dir).await {
            debug!("Natives already present in {}", self.natives_dir.display());
            return Ok(self.natives_dir.clone());
        }

        fs::create_dir_all(&self.natives_dir).await?;

        let natives: Vec<(&Library, &LibraryArtifact)> = game_manifest.libraries.iter()
            .filter(|lib| library_applies(lib.rules.as_deref().unwrap_or_default(), &self.rules_ctx))
            .filter_map(|lib| native_artifact(lib, self.rules_ctx.os).map(|a| (lib, a)))
            .collect();

        info!("Extracting {} native libraries", natives.len());

        let progress = PhaseProgress::begin(&self.events, Phase::Natives, natives.len());
        let progress = &progress;

        join_all(natives.into_iter().map(|(lib, artifact)| async move {
            self.extract_native(lib, artifact).await;
            progress.advance();
        })).await;

        Ok(self.natives_dir.clone())
    }

    async fn extract_native(&self, lib: &Library, artifact: &LibraryArtifact) {
        let Some(name) = archive_name(artifact) else {
            warn!("Native {} has no usable file name", lib.name);
            return;
        };
        let name = name.as_str();

        let archive_path = self.natives_dir.join(name);

        if !archive_path.exists() {
            self.downloader.fetch(&artifact.url, &self.natives_dir, name, true).await;
        }

        if let Some(sha1) = &artifact.sha1 {
            if !checksum::verify(sha1, &archive_path).await {
                warn!("Native {name} failed checksum, downloading again");
                self.downloader.fetch(&artifact.url, &self.natives_dir, name, false).await;
            }
        }

        let exclude = lib.extract.as_ref()
            .map(|e| e.exclude.clone())
            .unwrap_or_default();
        let natives_dir = self.natives_dir.clone();
        let zip_path = archive_path.clone();

        let result = task::spawn_blocking(move || {
            let zip_file = std::fs::File::open(&zip_path)?;
            archive::extract_zip(zip_file, &natives_dir, &exclude)
        }).await;

        match result {
            Ok(Ok(())) => debug!("Extracted {name}"),
            Ok(Err(e)) => warn!("Unable to extract native {name}: {e}"),
            Err(e) => warn!("Native extraction task for {name} failed: {e}")
        }

        let _ = fs::remove_file(&archive_path).await;
    }
}

/// Classifier artifact holding the natives of `lib` for `os`
pub fn native_artifact(lib: &Library, os: Os) -> Option<&LibraryArtifact> {
    let classifiers = lib.classifiers()?;

    if let Some(key) = lib.natives.as_ref().and_then(|n| n.get(os.name())) {
        let key = key.replace("${arch}", env::get_host_bitness());

        if let Some(artifact) = classifiers.get(&key) {
            return Some(artifact);
        }
    }

    match os {
        Os::Osx => classifiers.get("natives-osx")
            .or_else(|| classifiers.get("natives-macos")),
        _ => classifiers.get(&format!("natives-{}", os.name()))
    }
}

/// File name of the native jar, from its library path or else its url
fn archive_name(artifact: &LibraryArtifact) -> Option<String> {
    let name = match &artifact.path {
        Some(path) => path.rsplit('/').next().map(str::to_string),
        None => Url::parse(&artifact.url).ok()
            .and_then(|url| url.path_segments()?.last().map(str::to_string))
    };

    name.filter(|n| !n.is_empty())
}

async fn is_populated(dir: &Path) -> bool {
    match fs::read_dir(dir).await {
        Ok(mut entries) => matches!(entries.next_entry().await, Ok(Some(_))),
        Err(_) => false
    }
}
