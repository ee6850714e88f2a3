//! Public entry points: [`Gittar::fetch`] and [`Gittar::extract`]

use crate::cache::Cache;
use crate::config::{Config, Providers};
use crate::download::Downloader;
use crate::error::{Error, Result};
use crate::extract::{extract_archive, ExtractOptions};
use crate::probe::Reachability;
use crate::source::{RepoSource, Site};
use crate::strategy::{self, Outcome, Strategy};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Options for a single fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Provider for identifiers without a `<provider>:` hint
    pub host: Option<Site>,
    /// Never touch the network
    pub use_cache: bool,
    /// Download even when a cached archive exists
    pub force: bool,
}

impl FetchOptions {
    /// Set the provider used when the identifier carries no hint
    ///
    /// # Example
    /// ```
    /// # use gittar::{FetchOptions, Site};
    /// let options = FetchOptions::default().host(Site::GitLab);
    /// assert_eq!(options.host, Some(Site::GitLab));
    /// ```
    pub fn host(mut self, host: Site) -> Self {
        self.host = Some(host);
        self
    }

    /// Restrict the fetch to the local cache
    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Try the network first even for refs that are already cached
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// Archive resolver bound to one cache root
#[derive(Debug, Clone)]
pub struct Gittar {
    cache: Cache,
    providers: Providers,
    default_host: Site,
    downloader: Downloader,
    reachability: Reachability,
}

impl Gittar {
    /// Create a client from explicit configuration
    pub fn new(config: Config) -> Result<Self> {
        let cache = Cache::new(config.cache_root()?);
        let downloader = Downloader::new(&config)?;
        let reachability = Reachability::from_config(&config);

        Ok(Self {
            cache,
            providers: config.providers,
            default_host: config.default_host,
            downloader,
            reachability,
        })
    }

    /// Create a client from `~/.gittar` (or `GITTAR_CACHE_DIR`) and its config file
    pub fn from_default_config() -> Result<Self> {
        Self::new(Config::load()?)
    }

    /// Replace the reachability probe
    pub fn with_reachability(mut self, reachability: Reachability) -> Self {
        self.reachability = reachability;
        self
    }

    /// Cache this client reads from and writes to
    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Parse `input`, applying the caller's host or the configured default
    pub fn source(&self, input: &str, host: Option<Site>) -> Result<RepoSource> {
        RepoSource::parse(input, host.or(Some(self.default_host)))
    }

    /// Download URL for a parsed identifier
    pub fn remote_url(&self, source: &RepoSource) -> String {
        source
            .site
            .archive_url(self.providers.base(source.site), &source.repo, &source.reference)
    }

    /// Resolve `input` to an archive in the cache, downloading it when needed
    ///
    /// Returns the absolute path of the cached `.tar.gz`.
    pub async fn fetch(&self, input: &str, options: &FetchOptions) -> Result<PathBuf> {
        let source = self.source(input, options.host)?;
        let file = self.cache.archive_path(&source);
        let url = self.remote_url(&source);

        let connectivity = self.reachability.check().await;
        let plan = Strategy::plan(options, &source, connectivity);
        debug!(%source, ?connectivity, ?plan, "Resolving archive");

        let canonical = source.to_string();
        strategy::run(&plan, |strategy| {
            let canonical = canonical.clone();
            let file = file.clone();
            let url = url.clone();
            async move {
                match strategy {
                    Strategy::Local => self.local(&canonical),
                    Strategy::Remote => self.remote(&url, &file).await,
                }
            }
        })
        .await
    }

    /// Unpack a cached archive into `target`
    ///
    /// `input` is an absolute archive path or an identifier; nothing is downloaded.
    /// Returns `target` once every entry is written.
    pub async fn extract(
        &self,
        input: &str,
        target: &Path,
        options: &ExtractOptions,
    ) -> Result<PathBuf> {
        let host = Some(self.default_host);
        let file = match self.cache.exists(input, host)? {
            Some(file) => file,
            None => return Err(Error::FileNotFound(self.cache.resolve(input, host)?)),
        };

        extract_archive(&file, target, options).await?;
        Ok(target.to_path_buf())
    }

    /// Cache lookup for a canonical `site:repo#ref` identifier
    fn local(&self, canonical: &str) -> Outcome {
        match self.cache.exists(canonical, None) {
            Ok(Some(file)) => Outcome::Resolved(file),
            Ok(None) => Outcome::Missed,
            Err(e) => Outcome::Failed(e),
        }
    }

    async fn remote(&self, url: &str, file: &Path) -> Outcome {
        info!(%url, "Downloading archive");
        let bytes = match self.downloader.get(url).await {
            Ok(bytes) => bytes,
            Err(e) => return Outcome::Failed(e),
        };

        match self.cache.store_async(file, bytes).await {
            Ok(()) => Outcome::Resolved(file.to_path_buf()),
            Err(e) => Outcome::Failed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::Connectivity;
    use tempfile::TempDir;

    fn offline_client(root: &Path) -> Gittar {
        Gittar::new(Config::default().with_cache_root(root).with_offline(true)).unwrap()
    }

    #[test]
    fn test_remote_url_uses_providers() {
        let temp = TempDir::new().unwrap();
        let client = Gittar::new(
            Config::default()
                .with_cache_root(temp.path())
                .with_providers(Providers::all("http://127.0.0.1:9999/")),
        )
        .unwrap();

        let source = client.source("bitbucket:user/repo#v1", None).unwrap();
        assert_eq!(
            client.remote_url(&source),
            "http://127.0.0.1:9999/user/repo/get/v1.tar.gz"
        );
    }

    #[test]
    fn test_default_host_from_config() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default().with_cache_root(temp.path());
        config.default_host = Site::GitLab;
        let client = Gittar::new(config).unwrap();

        assert_eq!(client.source("user/repo", None).unwrap().site, Site::GitLab);
        assert_eq!(
            client.source("user/repo", Some(Site::Bitbucket)).unwrap().site,
            Site::Bitbucket
        );
    }

    #[tokio::test]
    async fn test_offline_serves_cache() {
        let temp = TempDir::new().unwrap();
        let client = offline_client(temp.path());
        let source = client.source("user/repo", None).unwrap();
        let path = client.cache().archive_path(&source);
        client.cache().store(&path, b"cached").unwrap();

        // Default branch would normally go remote first
        let fetched = client.fetch("user/repo", &FetchOptions::default()).await.unwrap();
        assert_eq!(fetched, path);
    }

    #[tokio::test]
    async fn test_local_strategy_finds_archive_stored_for_host_option() {
        let temp = TempDir::new().unwrap();
        let client = offline_client(temp.path());
        let source = client.source("user/repo#v3", Some(Site::GitLab)).unwrap();
        let path = client.cache().archive_path(&source);
        client.cache().store(&path, b"cached").unwrap();

        let options = FetchOptions::default().host(Site::GitLab).use_cache(true);
        let fetched = client.fetch("user/repo#v3", &options).await.unwrap();
        assert_eq!(fetched, path);

        let extracted = client
            .extract("gitlab:user/repo#v3", &temp.path().join("out"), &ExtractOptions::default())
            .await;
        // Cached bytes are not a real archive; the lookup itself must succeed
        assert!(matches!(extracted, Err(Error::Extraction(_))));
    }

    #[tokio::test]
    async fn test_use_cache_miss_is_silent() {
        let temp = TempDir::new().unwrap();
        let client = Gittar::new(Config::default().with_cache_root(temp.path()))
            .unwrap()
            .with_reachability(Reachability::Assume(Connectivity::Online));

        let err = client
            .fetch("user/repo#v1", &FetchOptions::default().use_cache(true))
            .await
            .unwrap_err();
        assert!(err.is_cache_miss());
    }

    #[tokio::test]
    async fn test_fetch_parse_error() {
        let temp = TempDir::new().unwrap();
        let client = offline_client(temp.path());
        let err = client.fetch("nope", &FetchOptions::default()).await.unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[tokio::test]
    async fn test_extract_missing() {
        let temp = TempDir::new().unwrap();
        let client = offline_client(temp.path());
        let err = client
            .extract("user/repo", &temp.path().join("out"), &ExtractOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
        assert!(!temp.path().join("out").exists());
    }
}
