use crate::core::error::{AtlasError, Result};
use flate2::read::MultiGzDecoder;
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

pub struct MmapSource {
    mmap: Mmap,
}

impl MmapSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| AtlasError::io(path, e))?;
        // SAFETY: read-only file mapping.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| AtlasError::io(path, e))?;
        Ok(Self { mmap })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.mmap
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InputKind {
    Plain,
    Gzip,
}

impl InputKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InputKind::Plain => "plain text",
            InputKind::Gzip => "gzip",
        }
    }
}

/// Whole-file view of a tabular input, either mapped or decompressed.
pub enum InputSource {
    Mmap(MmapSource),
    Owned(Vec<u8>),
}

impl InputSource {
    pub fn open(path: &Path) -> Result<(Self, InputKind)> {
        let kind = detect_input_kind(path)?;
        let source = match kind {
            InputKind::Plain => {
                let len = std::fs::metadata(path)
                    .map_err(|e| AtlasError::io(path, e))?
                    .len();
                if len == 0 {
                    InputSource::Owned(Vec::new())
                } else {
                    InputSource::Mmap(MmapSource::open(path)?)
                }
            }
            InputKind::Gzip => InputSource::Owned(read_gzip(path)?),
        };
        Ok((source, kind))
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            InputSource::Mmap(m) => m.bytes(),
            InputSource::Owned(v) => v.as_slice(),
        }
    }
}

pub fn detect_input_kind(path: &Path) -> Result<InputKind> {
    if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
        let ext = ext.to_ascii_lowercase();
        if ext == "gz" {
            return Ok(InputKind::Gzip);
        }
    }
    let mut file = File::open(path).map_err(|e| AtlasError::io(path, e))?;
    let mut magic = [0u8; 2];
    let n = file.read(&mut magic).map_err(|e| AtlasError::io(path, e))?;
    if n == 2 && magic == [0x1f, 0x8b] {
        Ok(InputKind::Gzip)
    } else {
        Ok(InputKind::Plain)
    }
}

fn read_gzip(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path).map_err(|e| AtlasError::io(path, e))?;
    let mut decoder = MultiGzDecoder::new(BufReader::new(file));
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| AtlasError::io(path, e))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    #[test]
    fn plain_files_are_mapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.tsv");
        std::fs::write(&path, b"gene\tS1\nG1\t1\n").unwrap();
        let (src, kind) = InputSource::open(&path).unwrap();
        assert_eq!(kind, InputKind::Plain);
        assert_eq!(src.bytes(), b"gene\tS1\nG1\t1\n");
    }

    #[test]
    fn empty_plain_file_yields_empty_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.tsv");
        std::fs::write(&path, b"").unwrap();
        let (src, _) = InputSource::open(&path).unwrap();
        assert!(src.bytes().is_empty());
    }

    #[test]
    fn gzip_detected_by_magic_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.txt");
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"gene,S1\nG1,2.5\n").unwrap();
        std::fs::write(&path, enc.finish().unwrap()).unwrap();
        let (src, kind) = InputSource::open(&path).unwrap();
        assert_eq!(kind, InputKind::Gzip);
        assert_eq!(src.bytes(), b"gene,S1\nG1,2.5\n");
    }

    #[test]
    fn missing_file_reports_path() {
        let err = InputSource::open(Path::new("/nonexistent/matrix.tsv"))
            .err()
            .unwrap();
        assert!(err.to_string().contains("/nonexistent/matrix.tsv"));
    }
}
