use anyhow::{bail, Result};
use futures_util::future::join_all;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::{
    checksum,
    downloader::Downloader,
    events::{Events, Phase, PhaseProgress},
    json::{AssetManifest, AssetObject, GameManifest, LaunchProfile},
    Error
};

/// Brings the asset objects of a version in line with its asset index
pub struct AssetSync {
    assets_dir: PathBuf,
    resources_dir: PathBuf,
    resource_url: String,
    index_override: Option<String>,
    downloader: Downloader,
    events: Events
}

impl AssetSync {
    pub fn new(profile: &LaunchProfile, downloader: Downloader, events: Events) -> Self {
        AssetSync {
            assets_dir: profile.asset_root(),
            resources_dir: profile.resources_dir(),
            resource_url: profile.overrides.url.resource.trim_end_matches('/').to_string(),
            index_override: profile.overrides.asset_index.clone(),
            downloader,
            events
        }
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.assets_dir.join("objects")
    }

    pub fn indexes_dir(&self) -> PathBuf {
        self.assets_dir.join("indexes")
    }

    fn object_path(&self, obj: &AssetObject) -> PathBuf {
        self.objects_dir().join(obj.object_dir()).join(&obj.hash)
    }

    pub async fn sync(&self, game_manifest: &GameManifest) -> Result<()> {
        let asset_manifest = self.asset_manifest(game_manifest).await?;

        self.download_objects(&asset_manifest).await;

        if game_manifest.is_legacy_assets() || asset_manifest.map_to_resources == Some(true) {
            self.copy_resources(&asset_manifest, &self.resources_dir).await?;
        }

        Ok(())
    }

    /// Asset index for the version, downloaded once and then read from disk
    pub async fn asset_manifest(&self, game_manifest: &GameManifest) -> Result<AssetManifest> {
        let index_id = self.index_override.as_deref()
            .unwrap_or(&game_manifest.asset_index.id);
        let index_name = format!("{index_id}.json");
        let index_file_path = self.indexes_dir().join(&index_name);

        if !index_file_path.exists() {
            info!("Fetching asset index {index_id}");

            self.downloader.fetch(
                &game_manifest.asset_index.url,
                &self.indexes_dir(),
                &index_name,
                true
            ).await;
        }

        let json = match fs::read_to_string(&index_file_path).await {
            Ok(json) => json,
            Err(_) => bail!(Error::AssetIndexMissing(index_id.to_string()))
        };

        Ok(serde_json::from_str(&json)?)
    }

    pub async fn download_objects(&self, asset_manifest: &AssetManifest) {
        let progress = PhaseProgress::begin(&self.events, Phase::Assets, asset_manifest.objects.len());

        let progress = &progress;

        join_all(asset_manifest.objects.values().map(|obj| async move {
            self.download_object(obj).await;
            progress.advance();
        })).await;
    }

    async fn download_object(&self, obj: &AssetObject) {
        let object_path = self.object_path(obj);

        // skip download if object exists with the expected hash
        if object_path.exists() && checksum::verify(&obj.hash, &object_path).await {
            return;
        }

        let url = format!("{}/{}/{}", self.resource_url, obj.object_dir(), obj.hash);
        let object_dir = self.objects_dir().join(obj.object_dir());

        debug!("Fetching asset object {}", obj.hash);
        self.downloader.fetch(&url, &object_dir, &obj.hash, true).await;
    }

    /// Copy every object to its logical path under `target_dir`, existing
    /// files are left alone
    pub async fn copy_resources(&self, asset_manifest: &AssetManifest, target_dir: &Path) -> Result<()> {
        let progress = PhaseProgress::begin(&self.events, Phase::AssetsCopy, asset_manifest.objects.len());

        let results = join_all(asset_manifest.objects.iter().map(|(path, obj)| {
            let progress = &progress;

            async move {
                let object_path = self.object_path(obj);

                let Some(resource_path) = resource_path(target_dir, path) else {
                    warn!("Skipping asset with unsafe path {path}");
                    progress.advance();
                    return Ok(());
                };

                if !resource_path.exists() {
                    if let Some(parent) = resource_path.parent() {
                        fs::create_dir_all(parent).await?;
                    }

                    if let Err(e) = fs::copy(&object_path, &resource_path).await {
                        warn!("Unable to copy asset {path}: {e}");
                    }
                }

                progress.advance();
                Ok::<(), std::io::Error>(())
            }
        })).await;

        for result in results {
            result?;
        }

        Ok(())
    }
}

/// `logical` under `target_dir`, `None` when it would escape the directory
fn resource_path(target_dir: &Path, logical: &str) -> Option<PathBuf> {
    let logical = Path::new(logical);

    if logical.as_os_str().is_empty() || !logical.components().all(|c| matches!(c, Component::Normal(_))) {
        return None;
    }

    Some(target_dir.join(logical))
}
