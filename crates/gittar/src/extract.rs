//! Archive extraction
//!
//! Unpacks a cached `.tar.gz` into a target directory.

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};
use tar::Archive;
use tracing::{debug, info, warn};

/// Options controlling how an archive is unpacked
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Leading path components dropped from every entry
    ///
    /// Provider archives wrap everything in a `<name>-<ref>/` directory; `strip: 1`
    /// unpacks its contents directly into the target.
    pub strip: usize,
}

impl ExtractOptions {
    /// Set the number of leading path components to drop
    pub fn strip(mut self, strip: usize) -> Self {
        self.strip = strip;
        self
    }
}

/// Unpack `file` into `target`, creating `target` if needed
///
/// Runs on the blocking thread pool; returns the number of entries written.
/// Entries, symlinks included, that would resolve outside `target` abort the
/// extraction. Hard links are skipped.
pub async fn extract_archive(
    file: &Path,
    target: &Path,
    options: &ExtractOptions,
) -> Result<usize> {
    let file = file.to_path_buf();
    let target = target.to_path_buf();
    let strip = options.strip;

    tokio::task::spawn_blocking(move || unpack(&file, &target, strip))
        .await
        .map_err(|e| Error::Extraction(format!("extraction task failed: {}", e)))?
}

fn unpack(file: &Path, target: &Path, strip: usize) -> Result<usize> {
    if !file.is_file() {
        return Err(Error::FileNotFound(file.to_path_buf()));
    }
    fs::create_dir_all(target)?;
    let root = fs::canonicalize(target)?;

    let decoder = GzDecoder::new(File::open(file)?);
    let mut archive = Archive::new(decoder);
    let mut written = 0;

    let entries = archive
        .entries()
        .map_err(|e| Error::Extraction(format!("Failed to read tar entries: {}", e)))?;
    for entry in entries {
        let mut entry =
            entry.map_err(|e| Error::Extraction(format!("Failed to read entry: {}", e)))?;

        let entry_path = entry
            .path()
            .map_err(|e| Error::Extraction(format!("Invalid entry path: {}", e)))?
            .into_owned();

        let relative = match strip_components(&entry_path, strip)? {
            Some(relative) => relative,
            None => continue,
        };

        let entry_type = entry.header().entry_type();
        if entry_type.is_hard_link() {
            warn!(entry = %entry_path.display(), "Skipping hard link");
            continue;
        }
        if entry_type.is_symlink() {
            let link = entry
                .link_name()
                .map_err(|e| Error::Extraction(format!("Invalid link target: {}", e)))?
                .ok_or_else(|| {
                    Error::Extraction(format!("Symlink without target: {}", entry_path.display()))
                })?;
            if link_escapes(&relative, &link) {
                return Err(Error::Extraction(format!(
                    "Refusing symlink outside target: {} -> {}",
                    entry_path.display(),
                    link.display()
                )));
            }
        }

        let dest_path = root.join(&relative);
        ensure_inside(&root, &dest_path)?;

        if entry_type.is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }
            // Never write through a link left by an earlier entry
            if fs::symlink_metadata(&dest_path).is_ok_and(|m| m.file_type().is_symlink()) {
                fs::remove_file(&dest_path)?;
            }
            entry.unpack(&dest_path).map_err(|e| {
                Error::Extraction(format!("Failed to extract {}: {}", dest_path.display(), e))
            })?;
        }
        written += 1;
    }

    debug!(file = %file.display(), entries = written, "Unpacked archive");
    info!(target = %target.display(), "Extracted archive");
    Ok(written)
}

/// Fail if the deepest existing ancestor of `path` resolves outside `root`
///
/// `path` itself is not resolved: a link at that spot is replaced, not followed.
fn ensure_inside(root: &Path, path: &Path) -> Result<()> {
    let start = path.parent().unwrap_or(root);
    let existing = start
        .ancestors()
        .find(|p| p.symlink_metadata().is_ok())
        .unwrap_or(root);
    let resolved = fs::canonicalize(existing)?;

    if resolved.starts_with(root) {
        Ok(())
    } else {
        Err(Error::Extraction(format!(
            "Refusing to extract entry outside target: {}",
            path.display()
        )))
    }
}

/// Whether a symlink at `entry` pointing to `link` leaves the extraction root
fn link_escapes(entry: &Path, link: &Path) -> bool {
    let mut depth = entry.components().count().saturating_sub(1);
    for component in link.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return true,
            },
            Component::RootDir | Component::Prefix(_) => return true,
        }
    }
    false
}

/// Drop `strip` leading components; `None` when nothing is left
///
/// Entries that would land outside the target directory are rejected.
fn strip_components(path: &Path, strip: usize) -> Result<Option<PathBuf>> {
    let mut kept = PathBuf::new();
    let mut skipped = 0;

    for component in path.components() {
        match component {
            Component::Normal(part) => {
                if skipped < strip {
                    skipped += 1;
                } else {
                    kept.push(part);
                }
            }
            Component::CurDir => {}
            _ => {
                return Err(Error::Extraction(format!(
                    "Refusing to extract entry outside target: {}",
                    path.display()
                )))
            }
        }
    }

    Ok((!kept.as_os_str().is_empty()).then_some(kept))
}
