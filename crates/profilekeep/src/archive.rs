//! Archiver: timestamped zip snapshots of the profile directory.
//!
//! Layout:
//! ```text
//! {backup_dir}/
//! ├── 03_14_2026-09_26_53.zip
//! │   └── profiles/
//! │       ├── alice-5f1a.json
//! │       └── ...
//! └── 03_14_2026-10_26_54.zip
//! ```
//!
//! Archives are written once and never touched again. Two backups in the
//! same second share a name; the second one replaces the first.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use tracing::info;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{KeepError, Result};

/// Characters that are not allowed in file names on common platforms.
const ILLEGAL_FILENAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Deflate's maximum level.
const MAX_COMPRESSION: i64 = 9;

/// Replace every filename-illegal character with `_`.
pub fn sanitize_label(raw: &str) -> String {
    raw.chars()
        .map(|c| if ILLEGAL_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// `MM_DD_YYYY-HH_MM_SS` for a point in time.
pub fn timestamp_label<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    sanitize_label(&at.format("%m/%d/%Y-%H:%M:%S").to_string())
}

/// Writes backups into a fixed directory.
#[derive(Debug, Clone)]
pub struct Archiver {
    backup_dir: PathBuf,
}

impl Archiver {
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Create the backup directory if missing. Returns `true` if it had to be created.
    ///
    /// Called once at startup; `create_backup` assumes the directory exists.
    pub fn ensure_backup_dir(&self) -> Result<bool> {
        if self.backup_dir.is_dir() {
            return Ok(false);
        }
        fs::create_dir_all(&self.backup_dir).map_err(|e| KeepError::io(&self.backup_dir, e))?;
        Ok(true)
    }

    /// Snapshot `source` into `<backup_dir>/<local timestamp>.zip`.
    pub fn create_backup(&self, source: &Path) -> Result<PathBuf> {
        self.create_backup_at(source, &Local::now())
    }

    /// Snapshot `source` using the label for `at`.
    pub fn create_backup_at<Tz: TimeZone>(&self, source: &Path, at: &DateTime<Tz>) -> Result<PathBuf>
    where
        Tz::Offset: std::fmt::Display,
    {
        let dest = self
            .backup_dir
            .join(format!("{}.zip", timestamp_label(at)));

        let entries = zip_directory(&dest, source, &self.backup_dir)?;
        info!(
            archive = %dest.display(),
            entries,
            "backed up {}",
            source.display()
        );
        Ok(dest)
    }
}

/// Zip every file and directory under `source` into `dest`.
///
/// Entries are named `<source dir name>/<relative path>`. `dest` and
/// everything under `exclude` are left out when they live inside `source`.
/// Returns the number of entries written.
pub fn zip_directory(dest: &Path, source: &Path, exclude: &Path) -> Result<usize> {
    let root = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let file = File::create(dest).map_err(|e| KeepError::io(dest, e))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(MAX_COMPRESSION));

    let mut entries = 0;
    let prune = exclude != source && exclude.starts_with(source);
    let walker = WalkDir::new(source)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(prune && e.path().starts_with(exclude)));
    for entry in walker {
        let entry = entry?;
        let path = entry.path();
        if path == dest {
            continue;
        }

        let relative = path.strip_prefix(source).unwrap_or(path);
        let name = entry_name(&root, relative);

        if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
        } else if entry.file_type().is_file() {
            zip.start_file(name, options)?;
            let mut input = File::open(path).map_err(|e| KeepError::io(path, e))?;
            io::copy(&mut input, &mut zip).map_err(|e| KeepError::io(path, e))?;
        } else {
            continue;
        }
        entries += 1;
    }

    zip.finish()?;
    Ok(entries)
}

/// Archive-internal name with `/` separators.
fn entry_name(root: &str, relative: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !root.is_empty() {
        parts.push(root.to_string());
    }
    parts.extend(
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    parts.join("/")
}
