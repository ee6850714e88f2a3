//! Archive cache
//!
//! Stores downloaded archives under a per-user root, keyed by the canonical
//! repository identifier rather than by content.
//!
//! Directory structure:
//! ```text
//! ~/.gittar/
//! ├── github/
//! │   └── <owner>/<name>/
//! │       ├── master.tar.gz
//! │       └── v1.0.0.tar.gz
//! ├── gitlab/
//! ├── bitbucket/
//! └── config.toml
//! ```

use crate::error::{Error, Result};
use crate::source::{RepoSource, Site};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Extension of every cached archive
pub const ARCHIVE_EXTENSION: &str = "tar.gz";

/// Name of the cache root directory inside the home directory
pub const CACHE_DIR_NAME: &str = ".gittar";

/// On-disk archive cache rooted at a single directory
#[derive(Debug, Clone)]
pub struct Cache {
    /// Root cache directory (~/.gittar/)
    root: PathBuf,
}

impl Cache {
    /// Create a cache rooted at `root`
    ///
    /// Nothing is created on disk until an archive is stored.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the default cache directory
    ///
    /// Returns ~/.gittar/ or an error if home directory cannot be determined.
    pub fn default_root() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(CACHE_DIR_NAME))
    }

    /// Get the cache root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path an archive for `source` is stored at
    ///
    /// `<root>/<site>/<owner>/<name>/<ref>.tar.gz`
    ///
    /// # Example
    /// ```
    /// # use gittar::{Cache, RepoSource};
    /// # use std::path::Path;
    /// let cache = Cache::new("/cache");
    /// let source = RepoSource::parse("gitlab:user/repo#v1", None).unwrap();
    /// assert_eq!(cache.archive_path(&source), Path::new("/cache/gitlab/user/repo/v1.tar.gz"));
    /// ```
    pub fn archive_path(&self, source: &RepoSource) -> PathBuf {
        let mut path = self.root.join(source.site.name());
        path.extend(source.repo.split('/'));

        // Refs like `feature/x` nest one directory deeper
        let mut parts: Vec<&str> = source.reference.split('/').collect();
        let file = parts.pop().unwrap_or(source.reference.as_str());
        path.extend(parts);
        path.join(format!("{}.{}", file, ARCHIVE_EXTENSION))
    }

    /// Resolve an absolute path or a repository identifier to a cached archive
    ///
    /// Never touches the network.
    ///
    /// # Arguments
    /// * `input` - Absolute `.tar.gz` path, or an identifier such as `user/repo#v1`
    /// * `host` - Provider for identifiers without a `<provider>:` hint
    ///
    /// # Returns
    /// * `Ok(Some(path))` - The archive is cached at `path`
    /// * `Ok(None)` - Nothing on disk
    /// * `Err(Error)` - `input` is neither a path nor a valid identifier
    pub fn exists(&self, input: &str, host: Option<Site>) -> Result<Option<PathBuf>> {
        let path = self.resolve(input, host)?;
        Ok(path.is_file().then_some(path))
    }

    /// Map an input to the file it refers to, without checking it exists
    pub fn resolve(&self, input: &str, host: Option<Site>) -> Result<PathBuf> {
        let candidate = Path::new(input);
        if candidate.is_absolute() {
            return Ok(candidate.to_path_buf());
        }

        let source = RepoSource::parse(input, host)?;
        Ok(self.archive_path(&source))
    }

    /// Write archive bytes to `path`, creating parent directories as needed
    ///
    /// Each call writes its own uniquely named temporary sibling and renames it into
    /// place, so concurrent stores of the same archive never clobber each other's
    /// partial data and readers never observe a half-written archive.
    ///
    /// # Arguments
    /// * `path` - Destination, usually from [`Cache::archive_path`]
    /// * `bytes` - Archive contents
    ///
    /// # Returns
    /// * `Ok(())` - Archive is in place
    /// * `Err(Error)` - Directory creation, write or rename failed
    pub fn store(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Config(format!("Invalid cache path: {}", path.display())))?;
        fs::create_dir_all(parent)?;

        let mut tmp_file = NamedTempFile::new_in(parent)?;
        tmp_file.write_all(bytes)?;
        tmp_file.as_file().sync_all()?;
        tmp_file.persist(path).map_err(|e| Error::Io(e.error))?;

        Ok(())
    }

    /// Async [`Cache::store`], run on the blocking thread pool
    pub async fn store_async(&self, path: &Path, bytes: Vec<u8>) -> Result<()> {
        let cache = self.clone();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || cache.store(&path, &bytes))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))?
    }

    /// Remove the cached archive for `source`
    ///
    /// Returns whether a file was removed.
    pub fn remove(&self, source: &RepoSource) -> Result<bool> {
        let path = self.archive_path(source);
        if !path.is_file() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        Ok(true)
    }

    /// Clear every cached archive
    ///
    /// **Warning:** This deletes all provider directories! The config file is kept.
    pub fn clear(&self) -> Result<()> {
        if !self.root.exists() {
            return Ok(());
        }

        for site in Site::ALL {
            let dir = self.root.join(site.name());
            if dir.is_dir() {
                fs::remove_dir_all(&dir)?;
            }
        }

        Ok(())
    }
}
