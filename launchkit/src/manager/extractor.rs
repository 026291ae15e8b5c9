//! Archive extraction for package installation.
//!
//! This module handles:
//! - Extracting zip archives with the system `unzip`
//! - Applying the stale-file list shipped inside update archives

use std::fs;
use std::io;
use std::path::{Component, Path};
use std::process::Command;

use tracing::{debug, warn};
use walkdir::WalkDir;

use super::error::{ManagerError, ManagerResult};
use super::traits::ArchiveExtractor;
use crate::package::DELETE_LIST_FILE;

/// Shell-based archive extractor.
///
/// Uses the system `unzip` tool, overwriting existing files.
#[derive(Debug, Default)]
pub struct ShellExtractor;

impl ShellExtractor {
    /// Create a new shell-based extractor.
    pub fn new() -> Self {
        Self
    }

    fn extract_zip(&self, archive: &Path, dest_dir: &Path) -> ManagerResult<usize> {
        fs::create_dir_all(dest_dir).map_err(|e| ManagerError::CreateDirFailed {
            path: dest_dir.to_path_buf(),
            source: e,
        })?;

        let output = Command::new("unzip")
            .arg("-o")
            .arg(archive)
            .arg("-d")
            .arg(dest_dir)
            .output()
            .map_err(|e| ManagerError::ExtractionFailed {
                path: archive.to_path_buf(),
                reason: format!("Failed to run unzip: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ManagerError::ExtractionFailed {
                path: archive.to_path_buf(),
                reason: format!("unzip failed: {}", stderr.trim()),
            });
        }

        Ok(count_files_recursive(dest_dir))
    }
}

impl ArchiveExtractor for ShellExtractor {
    fn extract(&self, archive: &Path, dest_dir: &Path) -> ManagerResult<usize> {
        self.extract_zip(archive, dest_dir)
    }
}

/// Count files recursively in a directory.
fn count_files_recursive(dir: &Path) -> usize {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .count()
}

/// Remove the files listed in `install_dir/deletefiles.txt`.
///
/// Each non-empty line is a path relative to `install_dir`. Entries that no
/// longer exist are skipped, and entries escaping `install_dir` are
/// rejected. The list itself is removed afterwards.
///
/// Returns the number of files removed; 0 when there is no list.
pub fn apply_delete_list(install_dir: &Path) -> ManagerResult<usize> {
    let list_path = install_dir.join(DELETE_LIST_FILE);

    let contents = match fs::read_to_string(&list_path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => {
            return Err(ManagerError::ReadFailed {
                path: list_path,
                source: e,
            })
        }
    };

    let mut removed = 0;
    for line in contents.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let relative = Path::new(line);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            warn!(entry = line, "ignoring delete list entry outside the install directory");
            continue;
        }

        let target = install_dir.join(relative);
        match fs::remove_file(&target) {
            Ok(()) => {
                debug!(path = %target.display(), "removed stale file");
                removed += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ManagerError::WriteFailed {
                    path: target,
                    source: e,
                })
            }
        }
    }

    fs::remove_file(&list_path).map_err(|e| ManagerError::WriteFailed {
        path: list_path.clone(),
        source: e,
    })?;

    Ok(removed)
}
