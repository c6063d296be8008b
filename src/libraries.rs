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
use futures_util::future::join_all;
use std::{collections::HashSet, fmt, path::PathBuf};
use tracing::{debug, warn};

use crate::{
    checksum,
    downloader::{Downloader, FetchOutcome},
    events::{Events, Phase, PhaseProgress},
    json::{GameManifest, LaunchProfile, Library, LoaderManifest},
    rules::{library_applies, RulesContext},
    Error
};

/// Ordered jar paths and the separator used to join them
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classpath {
    pub entries: Vec<PathBuf>,
    pub separator: &'static str
}

impl Classpath {
    /// Drops repeated entries, the first occurrence keeps its position
    pub fn new(entries: Vec<PathBuf>, separator: &'static str) -> Self {
        let mut seen = HashSet::new();
        let entries = entries.into_iter()
            .filter(|e| seen.insert(e.clone()))
            .collect();

        Classpath { entries, separator }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Classpath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let joined = self.entries.iter()
            .map(|e| e.to_string_lossy())
            .collect::<Vec<_>>()
            .join(self.separator);

        write!(f, "{joined}")
    }
}

/// Downloads libraries and assembles the classpath from them
pub struct ClasspathBuilder {
    library_root: PathBuf,
    fallback_maven: String,
    rules_ctx: RulesContext,
    downloader: Downloader,
    events: Events
}

impl ClasspathBuilder {
    pub fn new(profile: &LaunchProfile, downloader: Downloader, events: Events) -> Self {
        ClasspathBuilder {
            library_root: profile.library_root(),
            fallback_maven: profile.overrides.url.fallback_maven.clone(),
            rules_ctx: RulesContext::new(profile.os(), profile.features()),
            downloader,
            events
        }
    }

    pub async fn build(&self, vanilla: &GameManifest, custom: Option<&LoaderManifest>) -> Result<Classpath> {
        let mut custom_entries = Vec::new();
        let mut overridden = HashSet::new();

        if let Some(custom) = custom {
            // maven files are required by the loader but never on the classpath
            self.resolve_all(&custom.maven_files, Phase::Forge).await?;

            let libs: Vec<&Library> = custom.libraries.iter()
                .filter(|lib| self.applies(lib))
                .collect();

            overridden.extend(libs.iter().filter_map(|lib| override_key(&lib.name)));
            custom_entries = self.resolve_all(libs, Phase::Classes).await?;
        }

        let vanilla_libs: Vec<&Library> = vanilla.libraries.iter()
            .filter(|lib| lib.artifact().is_some())
            .filter(|lib| self.applies(lib))
            .filter(|lib| {
                let replaced = override_key(&lib.name).map_or(false, |k| overridden.contains(&k));
                if replaced {
                    debug!("Library {} replaced by loader", lib.name);
                }
                !replaced
            })
            .collect();

        let vanilla_entries = self.resolve_all(vanilla_libs, Phase::Classes).await?;

        let mut entries = custom_entries;
        entries.extend(vanilla_entries);

        let mut classpath = Classpath::new(entries, self.rules_ctx.os.classpath_separator());

        if custom.is_some() {
            classpath.entries.sort();
        }

        Ok(classpath)
    }

    fn applies(&self, lib: &Library) -> bool {
        library_applies(lib.rules.as_deref().unwrap_or_default(), &self.rules_ctx)
    }

    async fn resolve_all<'a, I>(&self, libs: I, phase: Phase) -> Result<Vec<PathBuf>>
        where I: IntoIterator<Item = &'a Library>
    {
        let libs: Vec<&Library> = libs.into_iter().collect();
        let progress = PhaseProgress::begin(&self.events, phase, libs.len());
        let progress = &progress;

        let results = join_all(libs.into_iter().map(|lib| async move {
            let result = self.resolve(lib).await;
            progress.advance();
            result
        })).await;

        let mut entries = Vec::new();
        for result in results {
            if let Some(path) = result? {
                entries.push(path);
            }
        }

        Ok(entries)
    }

    /// Local jar of `lib`, downloading or repairing it as needed.
    ///
    /// `None` when the library can't be downloaded and isn't on disk.
    pub async fn resolve(&self, lib: &Library) -> Result<Option<PathBuf>> {
        let artifact = lib.artifact();

        let path = match artifact.and_then(|a| a.path.clone()) {
            Some(path) => path,
            None => match name_to_path(&lib.name) {
                Ok(path) => path,
                Err(e) => {
                    warn!("Skipping library: {e}");
                    return Ok(None);
                }
            }
        };

        let jar = self.library_root.join(&path);

        let url = match (artifact.map(|a| a.url.as_str()).filter(|u| !u.is_empty()), &lib.url) {
            (Some(url), _) => Some(url.to_string()),
            (None, Some(base)) => Some(format!("{}/{path}", base.trim_end_matches('/'))),
            (None, None) => None
        };

        let Some(url) = url else {
            if jar.exists() {
                return Ok(Some(jar));
            }

            debug!("Library {} has no download source, skipping", lib.name);
            return Ok(None);
        };

        if !jar.exists() {
            let outcome = self.downloader.fetch_file(&url, &jar, true).await;

            // maven hosted entries get a second chance from the fallback repository
            if outcome != FetchOutcome::Downloaded && artifact.is_none() {
                let fallback = format!("{}{path}", self.fallback_maven);
                warn!("Library {} unavailable at {url}, trying {fallback}", lib.name);
                self.downloader.fetch_file(&fallback, &jar, true).await;
            }
        } else if let Some(sha1) = artifact.and_then(|a| a.sha1.as_ref()) {
            if !checksum::verify(sha1, &jar).await {
                warn!("Library {} failed checksum, downloading again", lib.name);
                self.downloader.fetch_file(&url, &jar, false).await;
            }
        }

        Ok(Some(jar))
    }
}

/// `group:artifact[:classifier]`, the identity a loader library replaces
fn override_key(name: &str) -> Option<String> {
    let parts: Vec<&str> = name.split(':').collect();

    match parts.as_slice() {
        [group, artifact, _version] => Some(format!("{group}:{artifact}")),
        [group, artifact, _version, classifier, ..] => Some(format!("{group}:{artifact}:{classifier}")),
        _ => None
    }
}

/// Turns maven style name into library path
pub fn name_to_path(name: &str) -> Result<String> {
    // an "@ext" suffix replaces the default jar extension
    let (name, ext) = match name.split_once('@') {
        Some((name, ext)) => (name, ext),
        None => (name, "jar")
    };

    let mut parts = name.split(':');

    let (Some(group_id), Some(artifact_id), Some(version)) = (parts.next(), parts.next(), parts.next()) else {
        bail!(Error::InvalidLibraryName(name.to_string()));
    };

    let classifier = parts.next().map_or("".to_string(), |c| format!("-{c}"));
    let file_name = format!("{artifact_id}-{version}{classifier}.{ext}");

    let mut path: Vec<_> = group_id.split('.').collect();
    path.extend([artifact_id, version, file_name.as_str()]);

    Ok(path.join("/"))
}
