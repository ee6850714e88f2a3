//! Retrieval strategies
//!
//! A fetch is resolved by trying an ordered list of strategies one after the
//! other. The order depends on the caller's options, how volatile the ref is and
//! whether the network looks reachable.

use crate::client::FetchOptions;
use crate::error::{Error, Result};
use crate::probe::Connectivity;
use crate::source::RepoSource;
use std::future::Future;
use std::path::PathBuf;
use tracing::{debug, warn};

/// One way of producing a cached archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Use the archive already on disk
    Local,
    /// Download the archive and write it to the cache
    Remote,
}

impl Strategy {
    /// Order in which strategies are tried
    ///
    /// - cache only when `use_cache` is set or the network is unreachable
    /// - network first when `force` is set or the ref is the default branch
    /// - otherwise cache first, network as fallback
    pub fn plan(
        options: &FetchOptions,
        source: &RepoSource,
        connectivity: Connectivity,
    ) -> Vec<Strategy> {
        if options.use_cache || connectivity.is_offline() {
            vec![Strategy::Local]
        } else if options.force || source.is_default_branch() {
            vec![Strategy::Remote, Strategy::Local]
        } else {
            vec![Strategy::Local, Strategy::Remote]
        }
    }
}

/// Result of a single strategy attempt
#[derive(Debug)]
pub enum Outcome {
    /// Archive is available at this path
    Resolved(PathBuf),
    /// Nothing found, try the next strategy
    Missed,
    /// Attempt failed, try the next strategy
    Failed(Error),
}

/// Run `plan` in order, stopping at the first resolved path
///
/// Strategies run strictly one at a time. When every strategy comes up empty the
/// error is whatever the last one produced: its failure, or [`Error::NotCached`]
/// for a miss. An empty plan is a miss.
pub async fn run<F, Fut>(plan: &[Strategy], mut attempt: F) -> Result<PathBuf>
where
    F: FnMut(Strategy) -> Fut,
    Fut: Future<Output = Outcome>,
{
    let mut last = Error::NotCached;

    for &strategy in plan {
        debug!(?strategy, "Trying strategy");
        match attempt(strategy).await {
            Outcome::Resolved(path) => {
                debug!(?strategy, path = %path.display(), "Strategy resolved");
                return Ok(path);
            }
            Outcome::Missed => {
                debug!(?strategy, "Strategy missed");
                last = Error::NotCached;
            }
            Outcome::Failed(e) => {
                warn!(?strategy, error = %e, "Strategy failed");
                last = e;
            }
        }
    }

    Err(last)
}
