//! Configuration
//!
//! Settings come from `<cache-root>/config.toml` when present, then from the
//! environment, then from whatever the caller overrides.
//!
//! The cache root itself is picked first: an explicit root (`--cache-dir`) or
//! `GITTAR_CACHE_DIR` always wins. Only the default `~/.gittar/config.toml` may
//! move the cache elsewhere through `cache_root`.
//!
//! ```toml
//! default_host = "gitlab"
//! probe_host = "example.com"
//! max_redirects = 5
//!
//! [providers]
//! github = "https://github.example.com"
//! ```

use crate::cache::Cache;
use crate::error::{Error, Result};
use crate::source::Site;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the cache root
pub const CACHE_DIR_ENV: &str = "GITTAR_CACHE_DIR";

/// Name of the config file inside the cache root
pub const CONFIG_FILE: &str = "config.toml";

/// Host resolved by the reachability probe
pub const DEFAULT_PROBE_HOST: &str = "google.com";

/// Maximum archive size (50 MB)
pub const MAX_CONTENT_SIZE: u64 = 50 * 1024 * 1024;

/// Base URLs archives are downloaded from, one per provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Providers {
    pub github: String,
    pub gitlab: String,
    pub bitbucket: String,
}

impl Default for Providers {
    fn default() -> Self {
        Self {
            github: Site::GitHub.default_base_url(),
            gitlab: Site::GitLab.default_base_url(),
            bitbucket: Site::Bitbucket.default_base_url(),
        }
    }
}

impl Providers {
    /// Every provider served from the same base (mirrors, test servers)
    pub fn all(base: &str) -> Self {
        Self {
            github: base.to_string(),
            gitlab: base.to_string(),
            bitbucket: base.to_string(),
        }
    }

    /// Base URL for `site`
    pub fn base(&self, site: Site) -> &str {
        match site {
            Site::GitHub => &self.github,
            Site::GitLab => &self.gitlab,
            Site::Bitbucket => &self.bitbucket,
        }
    }
}

/// Process-wide settings for a [`crate::Gittar`] client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where archives are cached; `~/.gittar` when unset
    pub cache_root: Option<PathBuf>,

    /// Provider used when neither the identifier nor the caller names one
    pub default_host: Site,

    /// Host resolved to decide whether the network is reachable
    pub probe_host: String,

    /// Upper bound on the reachability probe
    pub probe_timeout_ms: u64,

    /// Skip the probe and assume the given connectivity
    pub offline: Option<bool>,

    /// Redirect hops followed before giving up
    pub max_redirects: usize,

    /// Whole-request timeout for archive downloads
    pub request_timeout_secs: u64,

    /// Largest archive accepted, in bytes
    pub max_content_size: u64,

    /// Archive download base URLs
    pub providers: Providers,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_root: None,
            default_host: Site::default(),
            probe_host: DEFAULT_PROBE_HOST.to_string(),
            probe_timeout_ms: 2_000,
            offline: None,
            max_redirects: 10,
            request_timeout_secs: 30,
            max_content_size: MAX_CONTENT_SIZE,
            providers: Providers::default(),
        }
    }
}

impl Config {
    /// Load configuration for the default cache root
    ///
    /// `GITTAR_CACHE_DIR`, when set, picks the root and pins it. Otherwise the
    /// root is `~/.gittar`, and its `config.toml` may relocate the cache through
    /// `cache_root`.
    ///
    /// # Returns
    /// * `Ok(Config)` - Defaults overlaid with the config file, if any
    /// * `Err(Error)` - No home directory, or an unreadable config file
    pub fn load() -> Result<Self> {
        match std::env::var_os(CACHE_DIR_ENV) {
            Some(dir) if !dir.is_empty() => Self::load_from_root(Path::new(&dir)),
            _ => {
                let root = Cache::default_root()?;
                let mut config = Self::read_root(&root)?;
                if config.cache_root.is_none() {
                    config.cache_root = Some(root);
                }
                Ok(config)
            }
        }
    }

    /// Load `config.toml` from an explicitly chosen `root`
    ///
    /// The cache stays in `root` even if the file sets `cache_root`.
    ///
    /// # Arguments
    /// * `root` - Cache root, also the directory holding `config.toml`
    ///
    /// # Example
    /// ```no_run
    /// # use gittar::Config;
    /// # use std::path::Path;
    /// let config = Config::load_from_root(Path::new("/tmp/gittar")).unwrap();
    /// assert_eq!(config.cache_root.as_deref(), Some(Path::new("/tmp/gittar")));
    /// ```
    pub fn load_from_root(root: &Path) -> Result<Self> {
        let mut config = Self::read_root(root)?;
        config.cache_root = Some(root.to_path_buf());
        Ok(config)
    }

    /// `<root>/config.toml`, or defaults when absent
    fn read_root(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if path.is_file() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse config from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))
    }

    /// Effective cache root
    pub fn cache_root(&self) -> Result<PathBuf> {
        match &self.cache_root {
            Some(root) => Ok(root.clone()),
            None => Cache::default_root(),
        }
    }

    /// Use `root` for the cache instead of `~/.gittar`
    pub fn with_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = Some(root.into());
        self
    }

    /// Replace every provider base URL
    ///
    /// # Example
    /// ```
    /// # use gittar::{Config, Providers, Site};
    /// let config = Config::default().with_providers(Providers::all("http://127.0.0.1:8080"));
    /// assert_eq!(config.providers.base(Site::GitLab), "http://127.0.0.1:8080");
    /// ```
    pub fn with_providers(mut self, providers: Providers) -> Self {
        self.providers = providers;
        self
    }

    /// Skip the reachability probe; `true` never touches the network
    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = Some(offline);
        self
    }

    /// Upper bound on the reachability probe
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Whole-request timeout for downloads
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.default_host, Site::GitHub);
        assert_eq!(config.max_redirects, 10);
        assert_eq!(config.providers.base(Site::Bitbucket), "https://bitbucket.org");
        assert_eq!(config.offline, None);
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml(
            r#"
            default_host = "gitlab"
            max_redirects = 3

            [providers]
            github = "http://127.0.0.1:8080"
            "#,
        )
        .unwrap();

        assert_eq!(config.default_host, Site::GitLab);
        assert_eq!(config.max_redirects, 3);
        assert_eq!(config.providers.github, "http://127.0.0.1:8080");
        assert_eq!(config.providers.gitlab, "https://gitlab.com");
        assert_eq!(config.probe_host, DEFAULT_PROBE_HOST);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let result = Config::from_toml("default_host = \"sourcehut\"");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_root_without_file() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_from_root(temp.path()).unwrap();
        assert_eq!(config.cache_root.as_deref(), Some(temp.path()));
        assert_eq!(config.max_content_size, MAX_CONTENT_SIZE);
    }

    #[test]
    fn test_load_from_root_with_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE), "offline = true\n").unwrap();

        let config = Config::load_from_root(temp.path()).unwrap();
        assert_eq!(config.offline, Some(true));
        assert_eq!(config.cache_root().unwrap(), temp.path().to_path_buf());
    }

    #[test]
    fn test_explicit_root_beats_file_cache_root() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE),
            "cache_root = \"/elsewhere\"\nmax_redirects = 2\n",
        )
        .unwrap();

        let config = Config::load_from_root(temp.path()).unwrap();
        assert_eq!(config.cache_root.as_deref(), Some(temp.path()));
        assert_eq!(config.max_redirects, 2);
    }

    #[test]
    fn test_load_honors_cache_dir_env() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE),
            "cache_root = \"/elsewhere\"\noffline = true\n",
        )
        .unwrap();

        // Only test in this crate touching the variable
        std::env::set_var(CACHE_DIR_ENV, temp.path());
        let config = Config::load();
        std::env::remove_var(CACHE_DIR_ENV);

        let config = config.unwrap();
        assert_eq!(config.cache_root.as_deref(), Some(temp.path()));
        assert_eq!(config.offline, Some(true));
    }
}
