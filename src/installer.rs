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
use async_trait::async_trait;
use serde_json::Value;
use std::{collections::HashSet, fs::File, path::{Path, PathBuf}};
use tokio::{fs, process::Command, task};
use tracing::{debug, info, warn};

use crate::{
    archive,
    json::{
        ArgEntry, GameManifest, LaunchProfile, Library, LibraryArtifact,
        LibraryDownloads, LoaderArguments, LoaderManifest
    },
    libraries::name_to_path,
    Error
};

const FORGE_WRAPPER_MAIN: &str = "io.github.zekerzhayard.forgewrapper.installer.Main";

/// Everything an installer needs to derive a loader descriptor
pub struct InstallRequest<'a> {
    /// Path of the loader installer jar
    pub installer: &'a Path,
    pub vanilla: &'a GameManifest,
    pub profile: &'a LaunchProfile
}

impl InstallRequest<'_> {
    pub fn cache_path(&self) -> PathBuf {
        self.profile.root
            .join("forge")
            .join(&self.vanilla.id)
            .join("version.json")
    }
}

/// Turns a mod loader installer into an override descriptor
#[async_trait]
pub trait LoaderInstaller: Send + Sync {
    async fn install(&self, request: &InstallRequest<'_>) -> Result<LoaderManifest>;

    /// Jar placed ahead of every library on the classpath, if any
    fn classpath_prefix(&self, _request: &InstallRequest<'_>, _manifest: &LoaderManifest) -> Option<PathBuf> {
        None
    }
}

/// Decides whether a loader descriptor uses the modern (wrapper) layout
pub trait ModernLoaderPolicy: Send + Sync {
    fn is_modern(&self, manifest: &LoaderManifest) -> bool;
}

/// Forge builds for 1.12 and later are modern, except 1.12.2 build 2847
/// which still ships the legacy layout
pub struct ForgePolicy;

impl ModernLoaderPolicy for ForgePolicy {
    fn is_modern(&self, manifest: &LoaderManifest) -> bool {
        let Some(inherits_from) = &manifest.inherits_from else {
            return false;
        };

        let version: semver::Version = match lenient_semver::parse(inherits_from) {
            Ok(version) => version,
            Err(e) => {
                warn!("Unable to parse loader base version '{inherits_from}': {e}");
                return false;
            }
        };

        if version.major != 1 || version.minor < 12 {
            return false;
        }

        let build = manifest.id.rsplit('.').next().unwrap_or_default();
        !(inherits_from == "1.12.2" && build == "2847")
    }
}

/// Reads the descriptor bundled in a Forge installer and rewires it to
/// launch through ForgeWrapper
pub struct ForgeWrapperInstaller {
    policy: Box<dyn ModernLoaderPolicy>
}

impl Default for ForgeWrapperInstaller {
    fn default() -> Self {
        ForgeWrapperInstaller::new(Box::new(ForgePolicy))
    }
}

impl ForgeWrapperInstaller {
    pub fn new(policy: Box<dyn ModernLoaderPolicy>) -> Self {
        ForgeWrapperInstaller { policy }
    }

    async fn read_cache(&self, request: &InstallRequest<'_>) -> Option<LoaderManifest> {
        let cache_path = request.cache_path();
        let json = fs::read_to_string(&cache_path).await.ok()?;

        match serde_json::from_str::<LoaderManifest>(&json) {
            Ok(manifest) if manifest.forge_wrapper_version.as_deref() == Some(request.profile.overrides.fw.version.as_str()) => {
                debug!("Using cached loader descriptor {}", cache_path.display());
                Some(manifest)
            }
            Ok(_) => {
                info!("Loader descriptor cache was built for another ForgeWrapper version");
                None
            }
            Err(e) => {
                warn!("Regenerating corrupt loader descriptor {}: {e}", cache_path.display());
                None
            }
        }
    }

    fn wrap_modern(&self, manifest: &mut LoaderManifest, request: &InstallRequest) {
        let profile = request.profile;
        let fw = &profile.overrides.fw;
        let maven_forge = &profile.overrides.url.maven_forge;

        let wrapper_name = format!("io.github.zekerzhayard:ForgeWrapper:{}", fw.version);

        manifest.libraries.push(Library {
            downloads: Some(LibraryDownloads {
                artifact: Some(LibraryArtifact {
                    path: name_to_path(&wrapper_name).ok(),
                    sha1: Some(fw.sha1.clone()),
                    size: Some(fw.size),
                    url: format!("{}{ver}/ForgeWrapper-{ver}.jar", fw.base_url, ver = fw.version)
                }),
                classifiers: None
            }),
            name: wrapper_name,
            ..Default::default()
        });

        manifest.main_class = Some(FORGE_WRAPPER_MAIN.to_string());

        // the universal jar has no download url in the installer profile
        if let Some(forge) = manifest.maven_files.iter_mut().find(|lib| is_forge_library(&lib.name)) {
            if let Some(artifact) = forge.downloads.as_mut().and_then(|d| d.artifact.as_mut()) {
                if let Some(path) = &artifact.path {
                    artifact.url = format!("{maven_forge}{path}");
                }
            }
        }

        // the wrapper sets up the module path itself, loader jvm args are dropped
        manifest.arguments.get_or_insert_with(LoaderArguments::default).jvm = Some(vec![
            ArgEntry::Plain(format!("-Dforgewrapper.librariesDir={}", profile.library_root().display())),
            ArgEntry::Plain(format!("-Dforgewrapper.installer={}", request.installer.display())),
            ArgEntry::Plain(format!("-Dforgewrapper.minecraft={}", profile.client_jar().display()))
        ]);
    }

    fn set_legacy_urls(&self, manifest: &mut LoaderManifest, profile: &LaunchProfile) {
        let urls = &profile.overrides.url;

        for lib in manifest.libraries.iter_mut().filter(|lib| lib.downloads.is_none() && lib.url.is_none()) {
            let mojang_hosted = lib.clientreq.is_some() || lib.serverreq.is_some();

            lib.url = Some(if mojang_hosted {
                urls.default_repo_forge.clone()
            } else {
                urls.maven_forge.clone()
            });
        }
    }

    /// Point the forge library at the jar flavour the launch layout expects
    fn fix_forge_library(&self, manifest: &mut LoaderManifest, jar_ending: &str, maven_forge: &str) -> Result<()> {
        let Some(first) = manifest.libraries.first_mut() else {
            return Ok(());
        };

        if !is_forge_library(&first.name) {
            return Ok(());
        }

        if first.downloads.is_none() {
            // legacy forge, the installer jar itself goes on the classpath
            manifest.libraries.remove(0);
            return Ok(());
        }

        if !first.name.ends_with(jar_ending) {
            first.name = format!("{}:{jar_ending}", first.name);
        }

        let path = name_to_path(&first.name)?;

        if let Some(artifact) = first.downloads.as_mut().and_then(|d| d.artifact.as_mut()) {
            artifact.url = format!("{maven_forge}{path}");
            artifact.path = Some(path);
            // the published hash belongs to the jar without the classifier
            artifact.sha1 = None;
        }

        Ok(())
    }
}

#[async_trait]
impl LoaderInstaller for ForgeWrapperInstaller {
    async fn install(&self, request: &InstallRequest<'_>) -> Result<LoaderManifest> {
        if let Some(manifest) = self.read_cache(request).await {
            return Ok(manifest);
        }

        info!("Reading loader installer {}", request.installer.display());

        let version_json = read_installer_entry(request.installer, "version.json").await?;
        let install_profile = read_installer_entry(request.installer, "install_profile.json").await?
            .map(|json| serde_json::from_str::<Value>(&json))
            .transpose()?;

        let mut manifest: LoaderManifest = match (version_json, &install_profile) {
            (Some(json), _) => serde_json::from_str(&json)?,
            // legacy installers embed the descriptor in the install profile
            (None, Some(profile)) => match profile.get("versionInfo") {
                Some(info) => serde_json::from_value(info.clone())?,
                None => bail!(Error::LoaderDescriptor("install_profile.json has no versionInfo".to_string()))
            },
            (None, None) => bail!(Error::LoaderDescriptor(format!(
                "{} contains neither version.json nor install_profile.json",
                request.installer.display()
            )))
        };

        if let Some(libs) = install_profile.as_ref().and_then(|p| p.get("libraries")) {
            let libs: Vec<Library> = serde_json::from_value(libs.clone())?;
            manifest.maven_files.extend(libs);
        }

        let profile = request.profile;
        let mut jar_ending = "universal";

        if self.policy.is_modern(&manifest) {
            if manifest.inherits_from.as_deref() != Some("1.12.2") {
                self.wrap_modern(&mut manifest, request);
                jar_ending = "launcher";
            } else {
                manifest.maven_files.retain(|lib| !is_forge_library(&lib.name));
            }
        } else {
            self.set_legacy_urls(&mut manifest, profile);
        }

        self.fix_forge_library(&mut manifest, jar_ending, &profile.overrides.url.maven_forge)?;

        let mut seen = HashSet::new();
        manifest.libraries.retain(|lib| seen.insert(lib.name.clone()));

        manifest.forge_wrapper_version = Some(profile.overrides.fw.version.clone());

        let cache_path = request.cache_path();
        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&cache_path, serde_json::to_string_pretty(&manifest)?).await?;

        Ok(manifest)
    }

    fn classpath_prefix(&self, request: &InstallRequest<'_>, manifest: &LoaderManifest) -> Option<PathBuf> {
        if self.policy.is_modern(manifest) {
            None
        } else {
            Some(request.installer.to_path_buf())
        }
    }
}

/// Runs the loader's own installer (`java -jar <installer> <args>`) and
/// loads the descriptor it writes under `versions/`
pub struct CommandInstaller {
    pub args: Vec<String>
}

impl Default for CommandInstaller {
    fn default() -> Self {
        CommandInstaller { args: vec!["--installClient".to_string()] }
    }
}

#[async_trait]
impl LoaderInstaller for CommandInstaller {
    async fn install(&self, request: &InstallRequest<'_>) -> Result<LoaderManifest> {
        let root = &request.profile.root;

        let Some(version_json) = read_installer_entry(request.installer, "version.json").await? else {
            bail!(Error::LoaderDescriptor(format!("{} has no version.json", request.installer.display())));
        };
        let bundled: LoaderManifest = serde_json::from_str(&version_json)?;

        let version_path = root.join("versions").join(&bundled.id).join(format!("{}.json", bundled.id));

        if !version_path.exists() {
            // installers refuse to run without a launcher profile
            let launcher_profiles = root.join("launcher_profiles.json");
            if !launcher_profiles.exists() {
                fs::create_dir_all(root).await?;
                fs::write(&launcher_profiles, r#"{"profiles":{}}"#).await?;
            }

            info!("Running loader installer {}", request.installer.display());

            let status = Command::new(request.profile.java_path())
                .current_dir(root)
                .arg("-jar")
                .arg(request.installer)
                .args(&self.args)
                .arg(root)
                .status()
                .await?;

            if !status.success() {
                bail!(Error::InstallerFailed(status.to_string()));
            }
        }

        let json = match fs::read_to_string(&version_path).await {
            Ok(json) => json,
            Err(_) => bail!(Error::LoaderDescriptor(format!("installer did not write {}", version_path.display())))
        };

        Ok(serde_json::from_str(&json)?)
    }
}

fn is_forge_library(name: &str) -> bool {
    let mut parts = name.split(':');
    parts.next() == Some("net.minecraftforge") && parts.next().map_or(false, |a| a.contains("forge"))
}

async fn read_installer_entry(installer: &Path, name: &'static str) -> Result<Option<String>> {
    let installer = installer.to_path_buf();

    let entry = task::spawn_blocking(move || {
        archive::read_entry(File::open(&installer)?, name)
    }).await??;

    Ok(entry)
}
