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

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::env::{self, Os};

pub const DEFAULT_META_URL: &str = "https://launchermeta.mojang.com";
pub const DEFAULT_RESOURCE_URL: &str = "https://resources.download.minecraft.net";
pub const DEFAULT_MAVEN_FORGE_URL: &str = "http://files.minecraftforge.net/maven/";
pub const DEFAULT_REPO_FORGE_URL: &str = "https://libraries.minecraft.net/";
pub const DEFAULT_FALLBACK_MAVEN_URL: &str = "https://search.maven.org/remotecontent?filepath=";

/// Everything needed to launch one game instance
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LaunchProfile {
    #[serde(default = "env::get_data_dir")]
    pub root: PathBuf,
    pub version: VersionSelector,
    #[serde(default)]
    pub memory: Option<Memory>,
    #[serde(default)]
    pub window: Option<Window>,
    #[serde(default)]
    pub proxy: Option<Proxy>,
    #[serde(default)]
    pub features: Option<Vec<String>>,
    #[serde(default)]
    pub quick_play: Option<QuickPlay>,
    #[serde(default)]
    pub custom_args: Vec<String>,
    #[serde(default)]
    pub custom_launch_args: Vec<String>,
    pub authorization: Credentials,
    #[serde(default)]
    pub java_path: Option<PathBuf>,
    /// Path to a mod loader installer jar
    #[serde(default)]
    pub forge: Option<PathBuf>,
    /// Local path or http(s) url of a zip extracted into root before launch
    #[serde(default)]
    pub client_package: Option<String>,
    #[serde(default)]
    pub remove_package: bool,
    #[serde(default)]
    pub overrides: Overrides
}

impl LaunchProfile {
    pub fn new<P: Into<PathBuf>>(root: P, version: &str, authorization: Credentials) -> Self {
        LaunchProfile {
            root: root.into(),
            version: VersionSelector {
                number: version.to_string(),
                release_type: default_release_type(),
                custom: None
            },
            memory: None,
            window: None,
            proxy: None,
            features: None,
            quick_play: None,
            custom_args: Vec::new(),
            custom_launch_args: Vec::new(),
            authorization,
            java_path: None,
            forge: None,
            client_package: None,
            remove_package: false,
            overrides: Overrides::default()
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read launch profile {}", path.display()))?;

        let mut profile: LaunchProfile = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse launch profile {}", path.display()))?;

        // relative roots are relative to the directory containing the profile
        if profile.root.is_relative() {
            let base = path.parent().unwrap_or(Path::new("."));
            profile.root = base.join(&profile.root);
        }

        profile.normalize();
        Ok(profile)
    }

    /// Replace invalid or missing memory settings with the safe default pair
    pub fn normalize(&mut self) {
        self.memory = Some(Memory::normalized(self.memory));
    }

    pub fn memory(&self) -> Memory {
        Memory::normalized(self.memory)
    }

    pub fn os(&self) -> Os {
        self.overrides.os.unwrap_or_else(Os::host)
    }

    pub fn features(&self) -> &[String] {
        self.features.as_deref().unwrap_or(&[])
    }

    pub fn java_path(&self) -> PathBuf {
        self.java_path.clone().unwrap_or_else(|| PathBuf::from("java"))
    }

    pub fn cwd(&self) -> PathBuf {
        self.overrides.cwd.clone().unwrap_or_else(|| self.root.clone())
    }

    pub fn game_directory(&self) -> PathBuf {
        self.overrides.game_directory.clone().unwrap_or_else(|| self.root.clone())
    }

    /// Directory holding `versions/<id>/<id>.{json,jar}`
    pub fn version_dir(&self, id: &str) -> PathBuf {
        match &self.overrides.directory {
            Some(dir) => dir.clone(),
            None => self.root.join("versions").join(id)
        }
    }

    pub fn client_jar(&self) -> PathBuf {
        let id = &self.version.number;

        self.overrides.minecraft_jar.clone()
            .unwrap_or_else(|| self.version_dir(id).join(format!("{id}.jar")))
    }

    pub fn natives_dir(&self) -> PathBuf {
        self.overrides.natives.clone()
            .unwrap_or_else(|| self.root.join("natives").join(&self.version.number))
    }

    pub fn asset_root(&self) -> PathBuf {
        self.overrides.asset_root.clone().unwrap_or_else(|| self.root.join("assets"))
    }

    pub fn library_root(&self) -> PathBuf {
        self.overrides.library_root.clone().unwrap_or_else(|| self.root.join("libraries"))
    }

    pub fn resources_dir(&self) -> PathBuf {
        self.root.join("resources")
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct VersionSelector {
    pub number: String,
    #[serde(rename = "type", default = "default_release_type")]
    pub release_type: String,
    /// Name of a custom version json under `versions/`
    #[serde(default)]
    pub custom: Option<String>
}

fn default_release_type() -> String {
    String::from("release")
}

/// Heap sizes in megabytes
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Memory {
    pub min: u32,
    pub max: u32
}

impl Default for Memory {
    fn default() -> Self {
        Memory { min: 512, max: 1024 }
    }
}

impl Memory {
    pub fn normalized(memory: Option<Memory>) -> Memory {
        match memory {
            Some(m) if m.min > m.max => {
                warn!("Minimum memory {}M exceeds maximum {}M, using defaults", m.min, m.max);
                Memory::default()
            }
            Some(m) => m,
            None => Memory::default()
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Window {
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(default)]
    pub fullscreen: bool
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Proxy {
    pub host: String,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct QuickPlay {
    #[serde(rename = "type")]
    pub play_type: String,
    pub identifier: String,
    pub path: Option<String>
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Credentials {
    pub access_token: String,
    #[serde(default)]
    pub client_token: Option<String>,
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub user_properties: Value,
    #[serde(default)]
    pub meta: Option<CredentialsMeta>
}

impl Credentials {
    pub fn user_properties(&self) -> String {
        match &self.user_properties {
            Value::String(props) => props.clone(),
            Value::Null => String::from("{}"),
            props => props.to_string()
        }
    }

    pub fn user_type(&self) -> &str {
        self.meta.as_ref()
            .and_then(|m| m.user_type.as_deref())
            .unwrap_or("mojang")
    }

    pub fn is_demo(&self) -> bool {
        self.meta.as_ref().map_or(false, |m| m.demo)
    }

    pub fn xuid(&self) -> &str {
        self.meta.as_ref()
            .and_then(|m| m.xuid.as_deref())
            .unwrap_or(&self.access_token)
    }

    pub fn client_id(&self) -> &str {
        self.meta.as_ref()
            .and_then(|m| m.client_id.as_deref())
            .or(self.client_token.as_deref())
            .unwrap_or(&self.access_token)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsMeta {
    #[serde(rename = "type")]
    pub user_type: Option<String>,
    #[serde(default)]
    pub demo: bool,
    pub client_id: Option<String>,
    pub xuid: Option<String>
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase", default)]
pub struct Overrides {
    pub game_directory: Option<PathBuf>,
    pub minecraft_jar: Option<PathBuf>,
    /// Version directory, replaces `root/versions/<id>`
    pub directory: Option<PathBuf>,
    pub natives: Option<PathBuf>,
    pub asset_root: Option<PathBuf>,
    pub asset_index: Option<String>,
    pub library_root: Option<PathBuf>,
    pub cwd: Option<PathBuf>,
    pub detached: bool,
    pub min_args: Option<usize>,
    /// Request timeout in milliseconds
    pub timeout: u64,
    pub log4j_configuration_file: Option<PathBuf>,
    pub os: Option<Os>,
    pub url: UrlOverrides,
    pub fw: ForgeWrapperOverrides
}

impl Default for Overrides {
    fn default() -> Self {
        Overrides {
            game_directory: None,
            minecraft_jar: None,
            directory: None,
            natives: None,
            asset_root: None,
            asset_index: None,
            library_root: None,
            cwd: None,
            detached: true,
            min_args: None,
            timeout: 50_000,
            log4j_configuration_file: None,
            os: None,
            url: UrlOverrides::default(),
            fw: ForgeWrapperOverrides::default()
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase", default)]
pub struct UrlOverrides {
    pub meta: String,
    pub resource: String,
    pub maven_forge: String,
    pub default_repo_forge: String,
    pub fallback_maven: String
}

impl Default for UrlOverrides {
    fn default() -> Self {
        UrlOverrides {
            meta: DEFAULT_META_URL.to_string(),
            resource: DEFAULT_RESOURCE_URL.to_string(),
            maven_forge: DEFAULT_MAVEN_FORGE_URL.to_string(),
            default_repo_forge: DEFAULT_REPO_FORGE_URL.to_string(),
            fallback_maven: DEFAULT_FALLBACK_MAVEN_URL.to_string()
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase", default)]
pub struct ForgeWrapperOverrides {
    pub base_url: String,
    pub version: String,
    pub sha1: String,
    pub size: u64
}

impl Default for ForgeWrapperOverrides {
    fn default() -> Self {
        ForgeWrapperOverrides {
            base_url: String::from("https://github.com/ZekerZhayard/ForgeWrapper/releases/download/"),
            version: String::from("1.6.0"),
            sha1: String::from("035a51fe6439792a61507630d89382f621da0f1f"),
            size: 28679
        }
    }
}
