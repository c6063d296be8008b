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

use anyhow::{Context, Result};
use std::{path::{Path, PathBuf}, time::Duration};
use tokio::{fs, task};
use tracing::{debug, info, warn};

use crate::{
    archive,
    arguments::{ArgumentEngine, LaunchPaths},
    assets::AssetSync,
    downloader::{Downloader, FetchOutcome},
    env::Os,
    events::{Events, LaunchState},
    installer::{ForgeWrapperInstaller, InstallRequest, LoaderInstaller},
    java::probe_java,
    json::{GameManifest, LaunchDescriptor, LaunchProfile, LoaderManifest},
    launch_cmd::{GameProcess, LaunchCommand},
    libraries::ClasspathBuilder,
    natives::NativesExtractor,
    versions::VersionResolver
};

const LOG4J_CONFIG_1_12: (&str, &str) = (
    "https://launcher.mojang.com/v1/objects/02937d122c86ce73319ef9975b58896fc1b491d1/log4j2_112-116.xml",
    "log4j2_112-116.xml"
);

const LOG4J_CONFIG_1_7: (&str, &str) = (
    "https://launcher.mojang.com/v1/objects/dd2b723346a8dcd48e7f4d245f6bf09e98db9696/log4j2_17-111.xml",
    "log4j2_17-111.xml"
);

const PACKAGE_FILE: &str = "clientPackage.zip";

/// Runs a launch end to end, from version resolution to the spawned game
pub struct Launcher {
    events: Events,
    installer: Box<dyn LoaderInstaller>
}

impl Launcher {
    pub fn new(events: Events) -> Self {
        Launcher {
            events,
            installer: Box::new(ForgeWrapperInstaller::default())
        }
    }

    pub fn with_installer(mut self, installer: Box<dyn LoaderInstaller>) -> Self {
        self.installer = installer;
        self
    }

    pub async fn launch(&self, profile: &LaunchProfile) -> Result<GameProcess> {
        let cmd = self.prepare(profile).await?;

        let process = cmd.spawn(self.events.clone()).map_err(|e| {
            self.events.state(LaunchState::Aborted);
            anyhow::Error::from(e).context("Failed to start game process")
        })?;

        self.events.state(LaunchState::Spawned);

        Ok(process)
    }

    /// Everything up to spawning, the returned command is ready to run
    pub async fn prepare(&self, profile: &LaunchProfile) -> Result<LaunchCommand> {
        self.events.state(LaunchState::Idle);

        let result = self.build_command(profile).await;

        if let Err(e) = &result {
            warn!("Launch aborted: {e:#}");
            self.events.state(LaunchState::Aborted);
        }

        result
    }

    async fn build_command(&self, profile: &LaunchProfile) -> Result<LaunchCommand> {
        let mut profile = profile.clone();
        profile.normalize();

        probe_java(&profile.java_path()).await?;

        fs::create_dir_all(&profile.root).await?;
        fs::create_dir_all(profile.game_directory()).await?;

        let downloader = Downloader::new(
            Duration::from_millis(profile.overrides.timeout),
            self.events.clone()
        )?;

        self.install_client_package(&profile, &downloader).await?;

        self.events.state(LaunchState::ResolvingVersion);

        let vanilla = VersionResolver::new(&profile, downloader.clone())
            .resolve(&profile.version.number).await?;

        self.download_client_jar(&profile, &vanilla, &downloader).await;

        let (custom, classpath_prefix) = self.load_custom(&profile, &vanilla).await?;
        let descriptor = LaunchDescriptor::new(&vanilla, custom.as_ref());

        self.events.state(LaunchState::AcquiringAssets);

        let natives = NativesExtractor::new(&profile, downloader.clone(), self.events.clone());
        let libraries = ClasspathBuilder::new(&profile, downloader.clone(), self.events.clone());
        let assets = AssetSync::new(&profile, downloader.clone(), self.events.clone());

        let (natives_dir, classpath, assets_result) = tokio::join!(
            natives.materialize(&vanilla),
            libraries.build(&vanilla, custom.as_ref()),
            assets.sync(&vanilla)
        );

        let natives_dir = natives_dir?;
        let classpath = classpath?;
        assets_result?;

        self.events.state(LaunchState::BuildingArguments);

        let mut entries = Vec::new();
        entries.extend(classpath_prefix);
        entries.extend(classpath.entries);
        entries.push(profile.client_jar());

        let classpath_string = entries.iter()
            .map(|p| p.to_string_lossy())
            .collect::<Vec<_>>()
            .join(classpath.separator);

        let paths = LaunchPaths {
            natives_directory: natives_dir,
            classpath: classpath_string.clone()
        };

        let engine = ArgumentEngine::new(&profile);

        let mut jvm_args = base_jvm_args(&profile, &vanilla, &paths.natives_directory);
        jvm_args.extend(self.log4j_args(&profile, &vanilla, &downloader).await);

        for arg in engine.jvm_arguments(&descriptor, &paths) {
            if !jvm_args.contains(&arg) {
                jvm_args.push(arg);
            }
        }

        let game_args = engine.expand(&descriptor, &paths);

        self.events.debug(format!(
            "Launching {} ({:?}) with main class {}",
            vanilla.id, descriptor.schema(), descriptor.main_class()
        ));

        let mut cmd = LaunchCommand::new(&profile.java_path(), &profile.cwd(), profile.overrides.detached);
        cmd.args(jvm_args);
        cmd.arg("-cp").arg(classpath_string);
        cmd.arg(descriptor.main_class());
        cmd.args(game_args);

        Ok(cmd)
    }

    async fn download_client_jar(&self, profile: &LaunchProfile, vanilla: &GameManifest, downloader: &Downloader) {
        let client_jar = profile.client_jar();

        if client_jar.exists() {
            return;
        }

        match vanilla.client_download() {
            Some(client) => {
                info!("Downloading client jar {}", vanilla.id);
                downloader.fetch_file(&client.url, &client_jar, true).await;
            }
            None => warn!("Version {} has no client download", vanilla.id)
        }
    }

    /// Override descriptor from the configured loader installer or custom version
    async fn load_custom(&self, profile: &LaunchProfile, vanilla: &GameManifest) -> Result<(Option<LoaderManifest>, Option<PathBuf>)> {
        if let Some(installer) = &profile.forge {
            let request = InstallRequest {
                installer,
                vanilla,
                profile
            };

            let manifest = self.installer.install(&request).await?;
            let prefix = self.installer.classpath_prefix(&request, &manifest);

            return Ok((Some(manifest), prefix));
        }

        if let Some(custom) = &profile.version.custom {
            let path = profile.root.join("versions").join(custom).join(format!("{custom}.json"));

            let json = fs::read_to_string(&path).await
                .with_context(|| format!("Failed to read custom version {}", path.display()))?;
            let manifest = serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse custom version {}", path.display()))?;

            return Ok((Some(manifest), None));
        }

        Ok((None, None))
    }

    async fn log4j_args(&self, profile: &LaunchProfile, vanilla: &GameManifest, downloader: &Downloader) -> Vec<String> {
        let mut args = Vec::new();
        let minor = vanilla.minor_version();

        if let Some(config) = &profile.overrides.log4j_configuration_file {
            args.push(format!("-Dlog4j.configurationFile={}", absolute(config).display()));
        }

        if minor == Some(17) || (minor == Some(18) && vanilla.patch_version().unwrap_or(0) == 0) {
            args.push("-Dlog4j2.formatMsgNoLookups=true".to_string());
        }

        if profile.overrides.log4j_configuration_file.is_some() {
            return args;
        }

        let (url, name) = match minor {
            Some(minor) if (12..17).contains(&minor) => LOG4J_CONFIG_1_12,
            Some(minor) if (7..12).contains(&minor) => LOG4J_CONFIG_1_7,
            _ => return args
        };

        let dir = profile.cwd();

        if !dir.join(name).exists() {
            debug!("Fetching log4j configuration {name}");
            downloader.fetch(url, &dir, name, true).await;
        }

        if dir.join(name).exists() {
            args.push(format!("-Dlog4j.configurationFile={name}"));
        }

        args
    }

    async fn install_client_package(&self, profile: &LaunchProfile, downloader: &Downloader) -> Result<()> {
        let Some(package) = &profile.client_package else {
            return Ok(());
        };

        let package_path = if package.starts_with("http://") || package.starts_with("https://") {
            info!("Downloading client package {package}");

            if downloader.fetch(package, &profile.root, PACKAGE_FILE, true).await != FetchOutcome::Downloaded {
                warn!("Client package {package} could not be downloaded");
                return Ok(());
            }

            profile.root.join(PACKAGE_FILE)
        } else {
            PathBuf::from(package)
        };

        let root = profile.root.clone();
        let zip_path = package_path.clone();

        let result = task::spawn_blocking(move || {
            archive::extract_zip(std::fs::File::open(&zip_path)?, &root, &[])
        }).await?;

        if let Err(e) = result {
            warn!("Unable to extract client package {}: {e}", package_path.display());
        }

        if profile.remove_package {
            let _ = fs::remove_file(&package_path).await;
        }

        Ok(())
    }
}

/// JVM flags every launch gets, ahead of descriptor and user arguments
pub fn base_jvm_args(profile: &LaunchProfile, vanilla: &GameManifest, natives_dir: &Path) -> Vec<String> {
    let memory = profile.memory();

    let mut args = vec![
        "-XX:-UseAdaptiveSizePolicy".to_string(),
        "-XX:-OmitStackTraceInFastThrow".to_string(),
        "-Dfml.ignorePatchDiscrepancies=true".to_string(),
        "-Dfml.ignoreInvalidMinecraftCertificates=true".to_string(),
        format!("-Djava.library.path={}", natives_dir.display()),
        format!("-Xmx{}M", memory.max),
        format!("-Xms{}M", memory.min)
    ];

    match profile.os() {
        Os::Windows => args.push(
            "-XX:HeapDumpPath=MojangTricksIntelDriversForPerformance_javaw.exe_minecraft.exe.heapdump".to_string()
        ),
        Os::Osx => {
            if vanilla.minor_version().map_or(true, |minor| minor > 12) {
                args.push("-XstartOnFirstThread".to_string());
            }
        }
        Os::Linux => args.push("-Xss1M".to_string())
    }

    args.extend(profile.custom_args.iter().cloned());

    args
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }

    std::env::current_dir()
        .map(|dir| dir.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
