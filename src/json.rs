mod asset_manifest;
mod game_manifest;
mod launch_profile;
mod loader_manifest;
mod version_manifest;

pub use asset_manifest::*;
pub use game_manifest::*;
pub use launch_profile::*;
pub use loader_manifest::*;
pub use version_manifest::*;
