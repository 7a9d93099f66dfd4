use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Bundles `files` (archive name, source path) under a `<root>/` directory.
/// The archive is written next to its final path and renamed into place.
pub fn write_zip(zip_path: &Path, root: &str, files: &[(&str, &Path)]) -> Result<()> {
    let mut tmp_name = zip_path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    let file = File::create(tmp_path)
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;
    let mut zip = ZipWriter::new(file);
    let result = write_entries(&mut zip, root, files);

    match result.and_then(|_| zip.finish().map(|_| ()).with_context(|| "failed to finalize zip")) {
        Ok(()) => {
            fs::rename(tmp_path, zip_path)
                .with_context(|| format!("failed to move zip to {}", zip_path.display()))?;
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_file(tmp_path);
            Err(e)
        }
    }
}

fn write_entries(zip: &mut ZipWriter<File>, root: &str, files: &[(&str, &Path)]) -> Result<()> {
    // DateTime::default() is 1980-01-01 00:00:00, so archives are reproducible.
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    zip.add_directory(format!("{}/", root), options)
        .with_context(|| "failed to add directory entry to zip")?;
    for (name, src) in files {
        add_file(zip, src, &format!("{}/{}", root, name), options)
            .with_context(|| format!("failed to add {} to zip", name))?;
    }
    Ok(())
}

fn add_file(
    zip: &mut ZipWriter<File>,
    src_path: &Path,
    zip_path: &str,
    options: SimpleFileOptions,
) -> Result<()> {
    let mut file =
        File::open(src_path).with_context(|| format!("failed to open {}", src_path.display()))?;
    zip.start_file(zip_path, options)?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        zip.write_all(&buf[..n])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundles_files_under_root_directory() {
        let dir = tempfile::tempdir().unwrap();
        let html = dir.path().join("atlas.html");
        let summary = dir.path().join("atlas_summary.txt");
        fs::write(&html, "<html></html>").unwrap();
        fs::write(&summary, "PASS\tGene matching\tm.tsv\n").unwrap();
        let zip_path = dir.path().join("atlas_atlas.zip");

        write_zip(
            &zip_path,
            "atlas",
            &[("atlas.html", html.as_path()), ("atlas_summary.txt", summary.as_path())],
        )
        .unwrap();

        assert!(!dir.path().join("atlas_atlas.zip.tmp").exists());
        let mut archive = zip::ZipArchive::new(File::open(&zip_path).unwrap()).unwrap();
        assert_eq!(archive.len(), 3);
        let mut text = String::new();
        archive
            .by_name("atlas/atlas.html")
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "<html></html>");
    }

    #[test]
    fn missing_source_leaves_no_archive() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("out.zip");
        let missing = dir.path().join("nope.html");
        assert!(write_zip(&zip_path, "out", &[("nope.html", missing.as_path())]).is_err());
        assert!(!zip_path.exists());
        assert!(!dir.path().join("out.zip.tmp").exists());
    }
}
