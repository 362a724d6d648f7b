//! Export Packager: one zip holding every chapter artifact that exists

use serde::Serialize;
use std::fs::File;
use std::io::copy;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BundleReport {
    pub path: PathBuf,
    /// Archive entry names, in the order written
    pub entries: Vec<String>,
    /// Inputs that did not exist and were left out
    pub missing: Vec<PathBuf>,
}

/// Zip every existing path in `paths` under its base file name.
///
/// Missing inputs are skipped and reported; a later path whose base name
/// was already written is skipped as well. The archive is always created,
/// even when it ends up empty.
pub fn bundle(paths: &[PathBuf], zip_path: &Path) -> Result<BundleReport, PackageError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| PackageError::Io { path, source }
    };

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let tmp_path = zip_path.with_extension("zip.tmp");
    let file = File::create(&tmp_path).map_err(io_err(&tmp_path))?;
    let mut zip = ZipWriter::new(file);
    let mut entries: Vec<String> = Vec::new();
    let mut missing = Vec::new();

    let result = (|| -> Result<(), PackageError> {
        for path in paths {
            let name = match path.file_name() {
                Some(n) if path.is_file() => n.to_string_lossy().to_string(),
                _ => {
                    log::warn!("Skipping missing artifact {}", path.display());
                    missing.push(path.clone());
                    continue;
                }
            };
            if entries.contains(&name) {
                log::warn!("Duplicate entry name {}, keeping the first", name);
                continue;
            }
            let mut input = File::open(path).map_err(io_err(path))?;
            zip.start_file(name.as_str(), options)?;
            copy(&mut input, &mut zip).map_err(io_err(path))?;
            entries.push(name);
        }
        zip.finish()?;
        Ok(())
    })();

    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }
    std::fs::rename(&tmp_path, zip_path).map_err(io_err(zip_path))?;

    log::info!(
        "Bundled {} file(s) into {} ({} missing)",
        entries.len(),
        zip_path.display(),
        missing.len()
    );
    Ok(BundleReport {
        path: zip_path.to_path_buf(),
        entries,
        missing,
    })
}

/// Entry names of a zip archive, in archive order
pub fn list_entries(zip_path: &Path) -> Result<Vec<String>, PackageError> {
    let file = File::open(zip_path).map_err(|source| PackageError::Io {
        path: zip_path.to_path_buf(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        names.push(archive.by_index(i)?.name().to_string());
    }
    Ok(names)
}
