//! EDS package import: a ZIP archive holding many EDS variants.
//!
//! Each entry is independent; callers fan the returned entries out across a
//! worker pool when throughput matters.

use std::io::Read;
use std::path::Path;

use thiserror::Error;

use crate::parser::{parse_eds_bytes, EdsParseError, EdsParseOutcome};

#[derive(Debug, Error)]
pub enum EdsPackageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("no EDS files found in package")]
    NoEdsFiles,
}

/// One archive entry's parse result. Per-file failures stay per-file; a bad
/// variant never aborts the rest of the package.
#[derive(Debug)]
pub struct PackageEntry {
    pub name: String,
    pub result: Result<EdsParseOutcome, EdsParseError>,
}

/// Read an EDS package from a file path.
pub fn read_eds_package(path: &Path) -> Result<Vec<PackageEntry>, EdsPackageError> {
    let file = std::fs::File::open(path)?;
    read_eds_package_from_reader(file)
}

/// Extract the raw bytes of every `.eds` entry in a package. Callers that
/// need the original bytes (hashing, archival) start here.
pub fn read_eds_package_bytes<R: Read + std::io::Seek>(
    reader: R,
) -> Result<Vec<(String, Vec<u8>)>, EdsPackageError> {
    let mut archive = zip::ZipArchive::new(reader)?;
    let mut entries = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();

        if !name.to_lowercase().ends_with(".eds") {
            continue;
        }

        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        entries.push((name, bytes));
    }

    if entries.is_empty() {
        return Err(EdsPackageError::NoEdsFiles);
    }
    Ok(entries)
}

/// Read an EDS package from any reader (for testing with in-memory data).
pub fn read_eds_package_from_reader<R: Read + std::io::Seek>(
    reader: R,
) -> Result<Vec<PackageEntry>, EdsPackageError> {
    let mut entries = Vec::new();
    for (name, bytes) in read_eds_package_bytes(reader)? {
        log::info!("Parsing EDS from package entry: {}", name);
        let result = parse_eds_bytes(&bytes);
        if let Err(e) = &result {
            log::warn!("Package entry '{}' failed to parse: {}", name, e);
        }
        entries.push(PackageEntry { name, result });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    fn build_archive(files: &[(&str, &str)]) -> Cursor<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            for (name, content) in files {
                writer
                    .start_file(name.to_string(), SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        cursor.set_position(0);
        cursor
    }

    #[test]
    fn reads_all_eds_entries() {
        let archive = build_archive(&[
            ("variant_a.eds", "[Device]\nVendCode = 1;\n"),
            ("variant_b.EDS", "[Device]\nVendCode = 2;\n"),
            ("readme.txt", "not an eds"),
        ]);
        let entries = read_eds_package_from_reader(archive).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.result.is_ok()));
    }

    #[test]
    fn bad_entry_does_not_abort_package() {
        let archive = build_archive(&[
            ("good.eds", "[Device]\nVendCode = 1;\n"),
            ("bad.eds", "no sections here"),
        ]);
        let entries = read_eds_package_from_reader(archive).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries.iter().filter(|e| e.result.is_ok()).count(), 1);
    }

    #[test]
    fn empty_package_is_an_error() {
        let archive = build_archive(&[("readme.txt", "x")]);
        assert!(matches!(
            read_eds_package_from_reader(archive),
            Err(EdsPackageError::NoEdsFiles)
        ));
    }
}
