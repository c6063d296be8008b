mod archive;
mod arguments;
mod assets;
mod checksum;
mod downloader;
pub mod env;
mod events;
mod installer;
mod java;
mod json;
mod launch_cmd;
mod launcher;
mod libraries;
mod natives;
mod rules;
mod versions;

pub use {
    arguments::{ArgumentEngine, LaunchPaths},
    assets::AssetSync,
    checksum::{sha1_hex, verify},
    downloader::{Downloader, FetchOutcome},
    env::Os,
    events::{Events, LaunchEvent, LaunchState, Phase, PhaseProgress},
    installer::{
        CommandInstaller, ForgePolicy, ForgeWrapperInstaller, InstallRequest,
        LoaderInstaller, ModernLoaderPolicy
    },
    java::{probe_java, JavaInfo},
    json::*,
    launch_cmd::{GameProcess, LaunchCommand},
    launcher::Launcher,
    libraries::{Classpath, ClasspathBuilder, name_to_path},
    natives::NativesExtractor,
    rules::{argument_applies, library_applies, RulesContext},
    versions::VersionResolver
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Minecraft version '{0}' not found in version manifest")]
    VersionNotFound(String),

    #[error("Unable to fetch {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Java runtime '{path}' could not be started: {reason}")]
    JavaNotFound { path: String, reason: String },

    #[error("Asset index '{0}' is missing and could not be downloaded")]
    AssetIndexMissing(String),

    #[error("Unexpected library name '{0}'")]
    InvalidLibraryName(String),

    #[error("Invalid mod loader descriptor: {0}")]
    LoaderDescriptor(String),

    #[error("Mod loader installer exited with {0}")]
    InstallerFailed(String)
}
