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

use std::{collections::HashMap, path::PathBuf};
use tracing::{debug, warn};

use crate::{
    env,
    json::{ArgEntry, LaunchDescriptor, LaunchProfile},
    rules::{argument_applies, RulesContext}
};

const DEFAULT_WIDTH: u32 = 856;
const DEFAULT_HEIGHT: u32 = 482;
const DEFAULT_SERVER_PORT: &str = "25565";
const DEFAULT_PROXY_PORT: u16 = 8080;

/// Locations that are only known once natives and libraries are in place
#[derive(Clone, Debug, Default)]
pub struct LaunchPaths {
    pub natives_directory: PathBuf,
    /// Fully joined classpath string
    pub classpath: String
}

/// Turns templated descriptor arguments into concrete command line tokens.
///
/// Holds no state between calls, expanding the same descriptor twice yields
/// the same tokens.
pub struct ArgumentEngine<'a> {
    profile: &'a LaunchProfile,
    rules_ctx: RulesContext
}

impl<'a> ArgumentEngine<'a> {
    pub fn new(profile: &'a LaunchProfile) -> Self {
        ArgumentEngine {
            profile,
            rules_ctx: RulesContext::new(profile.os(), profile.features())
        }
    }

    /// Game arguments, everything after the main class
    pub fn expand(&self, descriptor: &LaunchDescriptor, paths: &LaunchPaths) -> Vec<String> {
        let vanilla = descriptor.vanilla();
        let mut entries = descriptor.game_arguments();

        let min_args = self.profile.overrides.min_args
            .unwrap_or(if vanilla.is_legacy_assets() { 5 } else { 11 });

        if entries.len() < min_args {
            match descriptor {
                LaunchDescriptor::CustomOverride { .. } => {
                    debug!("Loader declares {} game arguments, appending vanilla arguments", entries.len());
                    entries.extend(vanilla.arguments.game());
                }
                LaunchDescriptor::Vanilla(_) => {
                    let legacy = vanilla.arguments.legacy_fallback();

                    if !legacy.is_empty() {
                        debug!("Descriptor declares {} game arguments, appending minecraftArguments", entries.len());
                        entries.extend(legacy);
                    }
                }
            }
        }

        entries.extend(self.profile.custom_launch_args.iter().cloned().map(ArgEntry::Plain));

        let ctx = self.substitutions(descriptor, paths);
        let mut args = self.walk(&entries, &ctx);

        self.append_demo(&mut args);
        self.append_window(&mut args);
        self.append_quick_play(&mut args);
        self.append_proxy(&mut args);

        args
    }

    /// Rule filtered `arguments.jvm` of modern descriptors.
    ///
    /// The classpath and library path flags are left out, the launcher
    /// supplies its own.
    pub fn jvm_arguments(&self, descriptor: &LaunchDescriptor, paths: &LaunchPaths) -> Vec<String> {
        let mut entries = Vec::new();
        let mut skip_next = false;

        for entry in descriptor.jvm_arguments() {
            if skip_next {
                skip_next = false;
                continue;
            }

            let launcher_owned = match &entry {
                ArgEntry::Plain(arg) if arg == "-cp" || arg == "-classpath" => {
                    skip_next = true;
                    true
                }
                ArgEntry::Plain(arg) => arg.starts_with("-Djava.library.path="),
                _ => false
            };

            if !launcher_owned {
                entries.push(entry);
            }
        }

        let ctx = self.substitutions(descriptor, paths);
        self.walk(&entries, &ctx)
    }

    /// Values for every `${token}` an argument template may reference
    pub fn substitutions(&self, descriptor: &LaunchDescriptor, paths: &LaunchPaths) -> HashMap<&'static str, String> {
        let profile = self.profile;
        let vanilla = descriptor.vanilla();
        let creds = &profile.authorization;

        let assets_root = if vanilla.is_legacy_assets() {
            profile.resources_dir()
        } else {
            profile.asset_root()
        };

        let assets_index_name = profile.overrides.asset_index.clone()
            .unwrap_or_else(|| vanilla.asset_index.id.clone());

        let version_name = profile.version.custom.clone()
            .unwrap_or_else(|| profile.version.number.clone());

        let mut ctx = HashMap::new();

        ctx.insert("auth_access_token", creds.access_token.clone());
        ctx.insert("auth_session", creds.access_token.clone());
        ctx.insert("auth_player_name", creds.name.clone());
        ctx.insert("auth_uuid", creds.uuid.clone());
        ctx.insert("auth_xuid", creds.xuid().to_string());
        ctx.insert("user_properties", creds.user_properties());
        ctx.insert("user_type", creds.user_type().to_string());
        ctx.insert("version_name", version_name);
        ctx.insert("version_type", profile.version.release_type.clone());
        ctx.insert("assets_index_name", assets_index_name);
        ctx.insert("game_directory", profile.game_directory().to_string_lossy().to_string());
        ctx.insert("assets_root", assets_root.to_string_lossy().to_string());
        ctx.insert("game_assets", assets_root.to_string_lossy().to_string());
        ctx.insert("clientid", creds.client_id().to_string());
        ctx.insert("resolution_width", self.window_width().to_string());
        ctx.insert("resolution_height", self.window_height().to_string());
        ctx.insert("natives_directory", paths.natives_directory.to_string_lossy().to_string());
        ctx.insert("launcher_name", env::get_package_name().to_string());
        ctx.insert("launcher_version", env::get_package_version().to_string());
        ctx.insert("classpath", paths.classpath.clone());
        ctx.insert("classpath_separator", profile.os().classpath_separator().to_string());
        ctx.insert("library_directory", profile.library_root().to_string_lossy().to_string());

        ctx
    }

    fn walk(&self, entries: &[ArgEntry], ctx: &HashMap<&'static str, String>) -> Vec<String> {
        let mut args = Vec::new();

        for entry in entries {
            match entry {
                ArgEntry::Plain(arg) => args.push(substitute(arg, ctx)),
                ArgEntry::Number(n) => args.push(n.to_string()),
                ArgEntry::Conditional { rules, value } => {
                    if argument_applies(rules, &self.rules_ctx) {
                        args.extend(value.values().iter().map(|v| substitute(v, ctx)));
                    }
                }
                ArgEntry::Malformed(value) => debug!("Dropping malformed argument {value}")
            }
        }

        args
    }

    fn window_width(&self) -> u32 {
        self.profile.window.as_ref()
            .and_then(|w| w.width)
            .unwrap_or(DEFAULT_WIDTH)
    }

    fn window_height(&self) -> u32 {
        self.profile.window.as_ref()
            .and_then(|w| w.height)
            .unwrap_or(DEFAULT_HEIGHT)
    }

    fn append_demo(&self, args: &mut Vec<String>) {
        let demo_feature = self.rules_ctx.features.iter().any(|f| f == "is_demo_user");

        if self.profile.authorization.is_demo() && !demo_feature {
            args.push("--demo".to_string());
        }
    }

    fn append_window(&self, args: &mut Vec<String>) {
        let Some(window) = &self.profile.window else {
            return;
        };

        if window.fullscreen {
            args.push("--fullscreen".to_string());
        } else {
            if let Some(width) = window.width {
                args.extend(["--width".to_string(), width.to_string()]);
            }
            if let Some(height) = window.height {
                args.extend(["--height".to_string(), height.to_string()]);
            }
        }
    }

    fn append_quick_play(&self, args: &mut Vec<String>) {
        let Some(quick_play) = &self.profile.quick_play else {
            return;
        };

        let flag = match quick_play.play_type.as_str() {
            "singleplayer" => "--quickPlaySingleplayer",
            "multiplayer" => "--quickPlayMultiplayer",
            "realms" => "--quickPlayRealms",
            "legacy" => {
                let (host, port) = quick_play.identifier.split_once(':')
                    .unwrap_or((quick_play.identifier.as_str(), DEFAULT_SERVER_PORT));

                args.extend([
                    "--server".to_string(), host.to_string(),
                    "--port".to_string(), port.to_string()
                ]);
                ""
            }
            other => {
                warn!("Unknown quick play type '{other}', ignoring");
                return;
            }
        };

        if !flag.is_empty() {
            args.extend([flag.to_string(), quick_play.identifier.clone()]);
        }

        if let Some(path) = &quick_play.path {
            args.extend(["--quickPlayPath".to_string(), path.clone()]);
        }
    }

    fn append_proxy(&self, args: &mut Vec<String>) {
        let Some(proxy) = &self.profile.proxy else {
            return;
        };

        args.extend([
            "--proxyHost".to_string(), proxy.host.clone(),
            "--proxyPort".to_string(), proxy.port.unwrap_or(DEFAULT_PROXY_PORT).to_string()
        ]);

        if let Some(user) = &proxy.username {
            args.extend(["--proxyUser".to_string(), user.clone()]);
        }
        if let Some(pass) = &proxy.password {
            args.extend(["--proxyPass".to_string(), pass.clone()]);
        }
    }
}

fn substitute(arg: &str, ctx: &HashMap<&'static str, String>) -> String {
    shellexpand::env_with_context_no_errors(arg, |var: &str| ctx.get(var)).to_string()
}
