use serde::{Deserialize, Serialize};
use std::{env, fmt, path::PathBuf};

/// Operating system names as they appear in mojang json files
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Windows,
    Osx,
    Linux
}

impl Os {
    pub fn host() -> Self {
        match env::consts::OS {
            "windows" => Os::Windows,
            // mojang json files uses "osx" instead of "macos" for os name
            "macos" => Os::Osx,
            _ => Os::Linux
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Os::Windows => "windows",
            Os::Osx => "osx",
            Os::Linux => "linux"
        }
    }

    pub fn classpath_separator(&self) -> &'static str {
        match self {
            Os::Windows => ";",
            _ => ":"
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Base directory used as launch root when a profile doesn't set one.
///
/// `$BLOCKLAUNCH_DATA_HOME`, else `$XDG_DATA_HOME/blocklaunch`, else
/// `~/.local/share/blocklaunch`.
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = env::var("BLOCKLAUNCH_DATA_HOME") {
        return PathBuf::from(dir);
    }

    // get base data directory from XDG_DATA_HOME, or ~/.local/share
    let base_data_dir = match env::var("XDG_DATA_HOME") {
        Ok(var) => PathBuf::from(var),
        Err(_) => {
            let home_dir = env::var("HOME")
                .or_else(|_| env::var("USERPROFILE"))
                .unwrap_or_else(|_| String::from("."));

            PathBuf::from(home_dir).join(".local").join("share")
        }
    };

    base_data_dir.join(get_package_name())
}

pub fn get_host_arch() -> &'static str {
    match env::consts::ARCH {
        "x86" => "x86",
        "aarch64" => "arm64",
        arch => arch
    }
}

/// Bitness used for `${arch}` in legacy natives classifier keys
pub fn get_host_bitness() -> &'static str {
    if cfg!(target_pointer_width = "64") { "64" } else { "32" }
}

pub fn get_package_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}

pub fn get_package_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
