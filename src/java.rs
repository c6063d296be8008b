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
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

use crate::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JavaInfo {
    /// Version string reported by `java -version`, when it could be parsed
    pub version: Option<String>,
    pub banner: String
}

/// Run `<java> -version` to make sure the runtime starts at all
pub async fn probe_java(java_path: &Path) -> Result<JavaInfo> {
    let output = Command::new(java_path)
        .arg("-version")
        .output()
        .await;

    let output = match output {
        Ok(output) => output,
        Err(e) => bail!(Error::JavaNotFound {
            path: java_path.to_string_lossy().to_string(),
            reason: e.to_string()
        })
    };

    // the version banner is printed on stderr
    let banner = String::from_utf8_lossy(&output.stderr).to_string();

    if !output.status.success() {
        bail!(Error::JavaNotFound {
            path: java_path.to_string_lossy().to_string(),
            reason: format!("{}: {}", output.status, banner.trim())
        });
    }

    let version = parse_version(&banner);

    match &version {
        Some(v) => info!("Using Java {v} ({})", java_path.display()),
        None => debug!("Unrecognised java version banner: {banner}")
    }

    Ok(JavaInfo { version, banner })
}

fn parse_version(banner: &str) -> Option<String> {
    let line = banner.lines().find(|l| l.contains("version"))?;
    let start = line.find('"')? + 1;
    let end = start + line[start..].find('"')?;

    Some(line[start..end].to_string())
}
