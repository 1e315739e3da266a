//! # Patient History Files
//!
//! Uploaded history documents live on disk, one folder per patient under a
//! configurable root. This module owns the folder layout: writing uploads,
//! listing a folder and packing it into a zip archive for download.

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{AppError, AppResult};

/// Root folder used when none is configured.
pub const DEFAULT_ROOT: &str = "patients-history-folder";

/// On-disk store of patient history folders.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    root: PathBuf,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT)
    }
}

impl HistoryStore {
    /// Creates a store rooted at `root`. The folder is created on first upload.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The folder holding every patient folder.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn patient_dir(&self, patient_name: &str) -> AppResult<PathBuf> {
        validate_component(patient_name, "patient name")?;
        Ok(self.root.join(patient_name))
    }

    fn existing_dir(&self, patient_name: &str) -> AppResult<PathBuf> {
        let dir = self.patient_dir(patient_name)?;
        if !dir.is_dir() {
            return Err(AppError::NotFound(format!(
                "History folder for {patient_name}"
            )));
        }
        Ok(dir)
    }

    /// Writes `contents` as `file_name` in the patient's folder, replacing a
    /// file of the same name. Returns the name the file was stored under.
    ///
    /// Browsers may send a full client-side path as the file name; only the
    /// last component is kept.
    pub fn store(&self, patient_name: &str, file_name: &str, contents: &[u8]) -> AppResult<String> {
        let dir = self.patient_dir(patient_name)?;
        let file_name = base_name(file_name);
        validate_component(file_name, "file name")?;

        fs::create_dir_all(&dir)?;
        fs::write(dir.join(file_name), contents)?;
        tracing::debug!(patient = patient_name, file = file_name, bytes = contents.len(), "stored history file");
        Ok(file_name.to_owned())
    }

    /// Names of the regular files in the patient's folder, sorted.
    pub fn list(&self, patient_name: &str) -> AppResult<Vec<String>> {
        let dir = self.existing_dir(patient_name)?;
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Packs the patient's folder into a zip archive.
    ///
    /// Entries are named by their path relative to the folder, so nested
    /// folders survive the round trip.
    pub fn archive(&self, patient_name: &str) -> AppResult<Vec<u8>> {
        let dir = self.existing_dir(patient_name)?;
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in WalkDir::new(&dir).sort_by_file_name() {
            let entry = entry.map_err(|e| AppError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&dir)
                .map_err(|e| AppError::General(e.to_string()))?;
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            zip.start_file(name, options)?;
            zip.write_all(&fs::read(entry.path())?)?;
        }

        Ok(zip.finish()?.into_inner())
    }

    /// Deletes the patient's folder and everything in it.
    pub fn remove(&self, patient_name: &str) -> AppResult<()> {
        let dir = self.existing_dir(patient_name)?;
        fs::remove_dir_all(dir)?;
        Ok(())
    }
}

fn base_name(file_name: &str) -> &str {
    file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
}

/// Rejects anything that could escape the history root when joined onto a
/// path.
fn validate_component(value: &str, what: &str) -> AppResult<()> {
    let invalid = value.trim().is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0']);
    if invalid {
        return Err(AppError::BadRequest(format!("Invalid {what}: {value:?}")));
    }
    Ok(())
}
