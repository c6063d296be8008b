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

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Version descriptor as published by the version manifest
#[derive(Deserialize, Debug)]
#[serde(try_from = "GameManifestRaw")]
pub struct GameManifest {
    pub arguments: GameArguments,
    pub asset_index: GameAssetIndex,
    pub assets: Option<String>,
    pub downloads: HashMap<String, AssetDownload>,
    pub id: String,
    pub libraries: Vec<Library>,
    pub main_class: String,
    pub release_type: Option<String>
}

/// Exactly one argument schema is authoritative for a descriptor.
///
/// A modern descriptor that also ships `minecraftArguments` keeps the string
/// as `legacy`, it is only consulted when the modern list is too short.
#[derive(Clone, Debug)]
pub enum GameArguments {
    Modern { game: Vec<ArgEntry>, jvm: Vec<ArgEntry>, legacy: Option<String> },
    Legacy(String)
}

impl GameArguments {
    /// Game argument tokens, legacy strings are split on spaces
    pub fn game(&self) -> Vec<ArgEntry> {
        match self {
            GameArguments::Modern { game, .. } => game.clone(),
            GameArguments::Legacy(args) => split_legacy_args(args)
        }
    }

    pub fn jvm(&self) -> &[ArgEntry] {
        match self {
            GameArguments::Modern { jvm, .. } => jvm,
            GameArguments::Legacy(_) => &[]
        }
    }

    /// Legacy tokens kept next to a modern list, empty for legacy descriptors
    pub fn legacy_fallback(&self) -> Vec<ArgEntry> {
        match self {
            GameArguments::Modern { legacy: Some(args), .. } => split_legacy_args(args),
            _ => Vec::new()
        }
    }
}

pub fn split_legacy_args(args: &str) -> Vec<ArgEntry> {
    args.split(' ')
        .filter(|a| !a.is_empty())
        .map(|a| ArgEntry::Plain(a.to_string()))
        .collect()
}

impl GameManifest {
    /// Assets tag `legacy` and `pre-1.6` use the flat resources layout
    pub fn is_legacy_assets(&self) -> bool {
        matches!(self.assets.as_deref(), Some("legacy") | Some("pre-1.6"))
    }

    pub fn client_download(&self) -> Option<&AssetDownload> {
        self.downloads.get("client")
    }

    pub fn minor_version(&self) -> Option<u32> {
        version_part(&self.id, 1)
    }

    pub fn patch_version(&self) -> Option<u32> {
        version_part(&self.id, 2)
    }
}

/// Numeric part of a dotted release id, `1.14.4` has minor 14 and patch 4
pub fn version_part(id: &str, index: usize) -> Option<u32> {
    id.split('.').nth(index).and_then(|p| p.parse().ok())
}

#[derive(Deserialize)]
struct GameManifestRaw {
    arguments: Option<GameArgsIndex>,
    #[serde(rename(deserialize = "assetIndex"))]
    asset_index: GameAssetIndex,
    assets: Option<String>,
    #[serde(default)]
    downloads: HashMap<String, AssetDownload>,
    id: String,
    #[serde(default)]
    libraries: Vec<Library>,
    #[serde(rename(deserialize = "mainClass"))]
    main_class: String,
    #[serde(rename(deserialize = "minecraftArguments"))]
    minecraft_arguments: Option<String>,
    #[serde(rename(deserialize = "type"))]
    release_type: Option<String>
}

#[derive(Deserialize)]
struct GameArgsIndex {
    #[serde(default)]
    game: Vec<ArgEntry>,
    #[serde(default)]
    jvm: Vec<ArgEntry>
}

impl TryFrom<GameManifestRaw> for GameManifest {
    type Error = String;

    fn try_from(raw: GameManifestRaw) -> Result<Self, Self::Error> {
        let arguments = match (raw.arguments, raw.minecraft_arguments) {
            (Some(args), legacy) => GameArguments::Modern { game: args.game, jvm: args.jvm, legacy },
            (None, Some(args)) => GameArguments::Legacy(args),
            (None, None) => {
                return Err(format!("version {} has neither arguments nor minecraftArguments", raw.id));
            }
        };

        Ok(GameManifest {
            arguments,
            asset_index: raw.asset_index,
            assets: raw.assets,
            downloads: raw.downloads,
            id: raw.id,
            libraries: raw.libraries,
            main_class: raw.main_class,
            release_type: raw.release_type
        })
    }
}

/// One element of an `arguments.game` or `arguments.jvm` array
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum ArgEntry {
    Plain(String),
    Number(serde_json::Number),
    Conditional {
        #[serde(default)]
        rules: Vec<Rule>,
        value: ArgValue
    },
    Malformed(serde_json::Value)
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum ArgValue {
    Single(String),
    Many(Vec<String>)
}

impl ArgValue {
    pub fn values(&self) -> Vec<String> {
        match self {
            ArgValue::Single(v) => vec![v.clone()],
            ArgValue::Many(v) => v.to_vec()
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<HashMap<String, bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<OsProperties>
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct OsProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>
}

#[derive(Deserialize, Debug)]
pub struct GameAssetIndex {
    pub id: String,
    pub url: String,
    pub sha1: Option<String>,
    pub size: Option<u64>,
    #[serde(rename(deserialize = "totalSize"))]
    pub total_size: Option<u64>
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct AssetDownload {
    pub sha1: Option<String>,
    pub size: Option<u64>,
    pub url: String
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Library {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloads: Option<LibraryDownloads>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extract: Option<LibraryExtract>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub natives: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<Rule>>,
    /// Maven repository base, used by entries without `downloads`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clientreq: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serverreq: Option<bool>
}

impl Library {
    pub fn artifact(&self) -> Option<&LibraryArtifact> {
        self.downloads.as_ref().and_then(|d| d.artifact.as_ref())
    }

    pub fn classifiers(&self) -> Option<&HashMap<String, LibraryArtifact>> {
        self.downloads.as_ref().and_then(|d| d.classifiers.as_ref())
    }

    /// Artifact id, the second segment of `group:artifact:version`
    pub fn artifact_id(&self) -> Option<&str> {
        self.name.split(':').nth(1)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct LibraryDownloads {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<LibraryArtifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifiers: Option<HashMap<String, LibraryArtifact>>
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct LibraryArtifact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    // forge installers publish artifacts with an empty url for generated jars
    #[serde(default)]
    pub url: String
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct LibraryExtract {
    #[serde(default)]
    pub exclude: Vec<String>
}
