use std::{fs::{self, File}, io::{self, Result}, path::Path};
use zip::ZipArchive;

// extraction adapted from the zip crate sample code
// https://github.com/zip-rs/zip/tree/21a20584bc9e05dfa4f3c5b0bc420a1389fae2c3/examples

/// Extract `zip_file` into `out_dir`, skipping entries whose name starts
/// with one of the `exclude` prefixes
pub fn extract_zip(zip_file: File, out_dir: &Path, exclude: &[String]) -> Result<()> {
    let mut archive = ZipArchive::new(zip_file)?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;

        if exclude.iter().any(|prefix| file.name().starts_with(prefix.as_str())) {
            continue;
        }

        let outpath = match file.enclosed_name() {
            Some(path) => out_dir.join(path),
            None => continue,
        };

        if (*file.name()).ends_with('/') {
            fs::create_dir_all(&outpath)?;
        } else {
            if let Some(p) = outpath.parent() {
                if !p.exists() {
                    fs::create_dir_all(p)?;
                }
            }
            let mut outfile = fs::File::create(&outpath)?;
            io::copy(&mut file, &mut outfile)?;
        }
    }

    Ok(())
}

/// Read a single entry of a zip into a string
pub fn read_entry(zip_file: File, name: &str) -> Result<Option<String>> {
    let mut archive = ZipArchive::new(zip_file)?;

    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into())
    };

    let mut contents = String::new();
    io::Read::read_to_string(&mut entry, &mut contents)?;

    Ok(Some(contents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::{write::SimpleFileOptions, ZipWriter};

    fn make_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());

        for (name, contents) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(contents.as_bytes()).unwrap();
        }

        zip.finish().unwrap();
    }

    #[test]
    fn extract_honours_exclude_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("natives.jar");
        let out_dir = dir.path().join("out");

        make_zip(&zip_path, &[
            ("liblwjgl.so", "elf"),
            ("META-INF/MANIFEST.MF", "manifest"),
            ("sub/dir/file.txt", "nested")
        ]);

        extract_zip(File::open(&zip_path).unwrap(), &out_dir, &["META-INF/".to_string()]).unwrap();

        assert_eq!(fs::read_to_string(out_dir.join("liblwjgl.so")).unwrap(), "elf");
        assert_eq!(fs::read_to_string(out_dir.join("sub/dir/file.txt")).unwrap(), "nested");
        assert!(!out_dir.join("META-INF").exists());
    }

    #[test]
    fn read_single_entry() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("installer.jar");

        make_zip(&zip_path, &[("version.json", "{}")]);

        assert_eq!(read_entry(File::open(&zip_path).unwrap(), "version.json").unwrap().as_deref(), Some("{}"));
        assert_eq!(read_entry(File::open(&zip_path).unwrap(), "missing.json").unwrap(), None);
    }
}
