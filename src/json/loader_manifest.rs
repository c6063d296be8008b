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
use serde_json::{Map, Value};

use super::{split_legacy_args, ArgEntry, GameArguments, GameManifest, Library};

/// Override descriptor produced by a mod loader (or a custom version json),
/// shallow merged over the vanilla descriptor it inherits from.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct LoaderManifest {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "inheritsFrom", skip_serializing_if = "Option::is_none")]
    pub inherits_from: Option<String>,
    #[serde(rename = "mainClass", skip_serializing_if = "Option::is_none")]
    pub main_class: Option<String>,
    #[serde(default)]
    pub libraries: Vec<Library>,
    /// Libraries that must be downloaded but are not put on the classpath
    #[serde(rename = "mavenFiles", default, skip_serializing_if = "Vec::is_empty")]
    pub maven_files: Vec<Library>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<LoaderArguments>,
    #[serde(rename = "minecraftArguments", skip_serializing_if = "Option::is_none")]
    pub minecraft_arguments: Option<String>,
    #[serde(rename = "forgeWrapperVersion", skip_serializing_if = "Option::is_none")]
    pub forge_wrapper_version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct LoaderArguments {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game: Option<Vec<ArgEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jvm: Option<Vec<ArgEntry>>
}

impl LoaderManifest {
    /// Game arguments declared by the override, if it declares any
    pub fn game_arguments(&self) -> Option<Vec<ArgEntry>> {
        if let Some(args) = &self.minecraft_arguments {
            return Some(split_legacy_args(args));
        }

        self.arguments.as_ref()
            .and_then(|a| a.game.clone())
    }

    pub fn jvm_arguments(&self) -> &[ArgEntry] {
        self.arguments.as_ref()
            .and_then(|a| a.jvm.as_deref())
            .unwrap_or(&[])
    }
}

/// Discriminant of the descriptor a launch is driven by
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DescriptorSchema {
    Modern,
    Legacy,
    CustomOverride
}

/// Vanilla descriptor, optionally with an override merged over it
#[derive(Clone, Copy, Debug)]
pub enum LaunchDescriptor<'a> {
    Vanilla(&'a GameManifest),
    CustomOverride {
        vanilla: &'a GameManifest,
        custom: &'a LoaderManifest
    }
}

impl<'a> LaunchDescriptor<'a> {
    pub fn new(vanilla: &'a GameManifest, custom: Option<&'a LoaderManifest>) -> Self {
        match custom {
            Some(custom) => LaunchDescriptor::CustomOverride { vanilla, custom },
            None => LaunchDescriptor::Vanilla(vanilla)
        }
    }

    pub fn schema(&self) -> DescriptorSchema {
        match self {
            LaunchDescriptor::CustomOverride { .. } => DescriptorSchema::CustomOverride,
            LaunchDescriptor::Vanilla(v) => match v.arguments {
                GameArguments::Modern { .. } => DescriptorSchema::Modern,
                GameArguments::Legacy(_) => DescriptorSchema::Legacy
            }
        }
    }

    pub fn vanilla(&self) -> &'a GameManifest {
        match self {
            LaunchDescriptor::Vanilla(v) => v,
            LaunchDescriptor::CustomOverride { vanilla, .. } => vanilla
        }
    }

    pub fn custom(&self) -> Option<&'a LoaderManifest> {
        match self {
            LaunchDescriptor::Vanilla(_) => None,
            LaunchDescriptor::CustomOverride { custom, .. } => Some(custom)
        }
    }

    pub fn main_class(&self) -> &'a str {
        match self {
            LaunchDescriptor::Vanilla(v) => &v.main_class,
            LaunchDescriptor::CustomOverride { vanilla, custom } => {
                custom.main_class.as_deref().unwrap_or(&vanilla.main_class)
            }
        }
    }

    /// Primary game argument source, the override's when it declares one
    pub fn game_arguments(&self) -> Vec<ArgEntry> {
        match self {
            LaunchDescriptor::Vanilla(v) => v.arguments.game(),
            LaunchDescriptor::CustomOverride { vanilla, custom } => {
                custom.game_arguments()
                    .unwrap_or_else(|| vanilla.arguments.game())
            }
        }
    }

    /// Modern jvm arguments, vanilla entries followed by override entries
    pub fn jvm_arguments(&self) -> Vec<ArgEntry> {
        let mut args = self.vanilla().arguments.jvm().to_vec();

        if let Some(custom) = self.custom() {
            args.extend_from_slice(custom.jvm_arguments());
        }

        args
    }
}
