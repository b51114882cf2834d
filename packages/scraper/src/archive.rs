//! ZIP archive access.
//!
//! Origins publish their bulk datasets as ZIP files whose inner layout
//! occasionally gains a folder prefix or changes letter case between
//! releases, so entries are resolved by exact name first and then by
//! case-insensitive file name.

use std::io::{Read, Seek};

use zip::ZipArchive;

use crate::ScrapeError;

/// Opens a ZIP archive from any seekable reader.
///
/// # Errors
///
/// Returns [`ScrapeError::Archive`] if the central directory cannot be read.
pub fn open_archive<R: Read + Seek>(reader: R) -> Result<ZipArchive<R>, ScrapeError> {
    let archive = ZipArchive::new(reader)?;
    log::debug!("Opened archive with {} entries", archive.len());
    Ok(archive)
}

/// Finds the stored name of the entry matching `name`.
///
/// # Errors
///
/// Returns [`ScrapeError::MissingEntry`] listing the available entries if
/// nothing matches.
pub fn resolve_entry<R: Read + Seek>(
    archive: &ZipArchive<R>,
    name: &str,
) -> Result<String, ScrapeError> {
    let names: Vec<String> = archive.file_names().map(str::to_owned).collect();
    let wanted = name.to_lowercase();

    names
        .iter()
        .find(|n| n.as_str() == name)
        .or_else(|| {
            names.iter().find(|n| {
                let lower = n.to_lowercase();
                lower == wanted || lower.rsplit('/').next() == Some(wanted.as_str())
            })
        })
        .cloned()
        .ok_or_else(|| ScrapeError::MissingEntry {
            name: name.to_owned(),
            available: names.clone(),
        })
}

/// Opens the entry matching `name` and hands its decompressing reader to
/// `read`.
///
/// # Errors
///
/// Returns the error produced by `read`, or a [`ScrapeError`] (converted
/// into `E`) if the entry is missing or cannot be opened.
pub fn with_entry<R, T, E, F>(archive: &mut ZipArchive<R>, name: &str, read: F) -> Result<T, E>
where
    R: Read + Seek,
    E: From<ScrapeError>,
    F: FnOnce(&mut dyn Read) -> Result<T, E>,
{
    let resolved = resolve_entry(archive, name)?;
    log::debug!("Reading archive entry {resolved}");
    let mut entry = archive.by_name(&resolved).map_err(ScrapeError::from)?;
    read(&mut entry)
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write as _};

    use super::*;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn reads_entry_by_exact_name() {
        let bytes = build_zip(&[("reclamacoes.csv", b"a;b\n1;2\n")]);
        let mut archive = open_archive(Cursor::new(bytes)).unwrap();

        let text = with_entry(&mut archive, "reclamacoes.csv", |reader| {
            let mut s = String::new();
            reader.read_to_string(&mut s)?;
            Ok::<_, ScrapeError>(s)
        })
        .unwrap();

        assert_eq!(text, "a;b\n1;2\n");
    }

    #[test]
    fn resolves_entry_in_folder_ignoring_case() {
        let bytes = build_zip(&[("dados/Reclamacoes.CSV", b"x")]);
        let archive = open_archive(Cursor::new(bytes)).unwrap();
        let resolved = resolve_entry(&archive, "reclamacoes.csv").unwrap();
        assert_eq!(resolved, "dados/Reclamacoes.CSV");
    }

    #[test]
    fn reports_missing_entry_with_available_names() {
        let bytes = build_zip(&[("other.csv", b"x")]);
        let archive = open_archive(Cursor::new(bytes)).unwrap();
        let err = resolve_entry(&archive, "reclamacoes.csv").unwrap_err();
        match err {
            ScrapeError::MissingEntry { name, available } => {
                assert_eq!(name, "reclamacoes.csv");
                assert_eq!(available, vec!["other.csv".to_owned()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_corrupt_archive() {
        let result = open_archive(Cursor::new(b"definitely not a zip".to_vec()));
        assert!(matches!(result, Err(ScrapeError::Archive(_))));
    }
}
