//! Gittar
//!
//! Resolves short repository identifiers such as `user/repo#v1.0.0` or
//! `gitlab:user/repo` to source archives, keeps them in a per-user cache and
//! unpacks them on demand:
//! - Identifier parsing into a canonical `{site, repo, ref}` record
//! - Deterministic cache paths and per-provider archive URLs
//! - Cache-first, network-first or cache-only retrieval with fallback
//! - Redirect-following downloads with a bounded hop count
//! - `.tar.gz` extraction
//!
//! ```no_run
//! use gittar::{ExtractOptions, FetchOptions, Gittar};
//! use std::path::Path;
//!
//! # async fn run() -> gittar::Result<()> {
//! let gittar = Gittar::from_default_config()?;
//! let archive = gittar.fetch("lukeed/mri#v1.1.0", &FetchOptions::default()).await?;
//! let options = ExtractOptions::default().strip(1);
//! gittar
//!     .extract(archive.to_str().unwrap_or_default(), Path::new("mri"), &options)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod download;
pub mod error;
pub mod extract;
pub mod probe;
pub mod source;
pub mod strategy;

pub use cache::Cache;
pub use client::{FetchOptions, Gittar};
pub use config::{Config, Providers};
pub use download::Downloader;
pub use error::{Error, Result};
pub use extract::ExtractOptions;
pub use probe::{Connectivity, Reachability};
pub use source::{RepoSource, Site, DEFAULT_BRANCH};
pub use strategy::{Outcome, Strategy};
