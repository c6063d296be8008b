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

use sha1::{Digest, Sha1};
use std::path::Path;
use tokio::{fs::File, io::AsyncReadExt};
use tracing::warn;

pub fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

/// True when the file at `path` has the SHA-1 `expected`. Any I/O failure
/// counts as a mismatch.
pub async fn verify<P: AsRef<Path>>(expected: &str, path: P) -> bool {
    let path = path.as_ref();

    match file_sha1(path).await {
        Ok(actual) => actual.eq_ignore_ascii_case(expected),
        Err(e) => {
            warn!("Unable to hash {}: {e}", path.display());
            false
        }
    }
}

pub async fn file_sha1(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path).await?;
    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; 64 * 1024];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}
