//! Reachability probe
//!
//! A best-effort guess at whether the network is usable: resolve a well-known
//! host with a short timeout. A successful lookup says nothing about whether the
//! archive host will answer, and a failed one may just be a flaky resolver.

use std::time::Duration;
use tokio::net::lookup_host;
use tokio::time::timeout;
use tracing::debug;

use crate::config::Config;

/// Result of a reachability check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub fn is_offline(self) -> bool {
        self == Connectivity::Offline
    }
}

/// How connectivity is determined
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reachability {
    /// Resolve `host` within `timeout`
    Dns { host: String, timeout: Duration },
    /// Skip the lookup
    Assume(Connectivity),
}

impl Reachability {
    /// Build the probe described by `config`
    pub fn from_config(config: &Config) -> Self {
        match config.offline {
            Some(true) => Reachability::Assume(Connectivity::Offline),
            Some(false) => Reachability::Assume(Connectivity::Online),
            None => Reachability::Dns {
                host: config.probe_host.clone(),
                timeout: config.probe_timeout(),
            },
        }
    }

    /// Run the probe
    pub async fn check(&self) -> Connectivity {
        match self {
            Reachability::Assume(connectivity) => *connectivity,
            Reachability::Dns { host, timeout: limit } => {
                let lookup = lookup_host((host.as_str(), 80));
                match timeout(*limit, lookup).await {
                    Ok(Ok(_)) => Connectivity::Online,
                    Ok(Err(e)) => {
                        debug!(%host, error = %e, "DNS lookup failed");
                        Connectivity::Offline
                    }
                    Err(_) => {
                        debug!(%host, ?limit, "DNS lookup timed out");
                        Connectivity::Offline
                    }
                }
            }
        }
    }

    /// Shorthand for `check().await.is_offline()`
    pub async fn is_offline(&self) -> bool {
        self.check().await.is_offline()
    }
}
