//! Archive downloads
//!
//! Fetches a URL into memory, following redirects by hand so the chain is
//! bounded and relative `Location` headers resolve against the current hop.

use crate::config::Config;
use crate::error::{Error, Result};
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Connection establishment timeout
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for archive payloads
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    max_size: u64,
    max_redirects: usize,
}

impl Downloader {
    /// Create a downloader using the limits from `config`
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(CONNECT_TIMEOUT)
            .redirect(Policy::none())
            .user_agent(format!("gittar/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            max_size: config.max_content_size,
            max_redirects: config.max_redirects,
        })
    }

    /// Download `url` and return the response body
    ///
    /// Any 3xx with a `Location` is followed, up to the redirect limit. A status of
    /// 400 or above fails with the status code and its reason phrase.
    pub async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let mut current = parse_http_url(url)?;

        for _ in 0..=self.max_redirects {
            let mut response = self.client.get(current.clone()).send().await?;
            let status = response.status();

            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| Error::InvalidRedirect {
                        url: current.to_string(),
                        reason: format!("{} without a Location header", status.as_u16()),
                    })?;
                let next = current.join(location).map_err(|e| Error::InvalidRedirect {
                    url: current.to_string(),
                    reason: format!("bad Location `{}`: {}", location, e),
                })?;
                debug!(from = %current, to = %next, status = status.as_u16(), "Following redirect");
                current = parse_http_url(next.as_str())?;
                continue;
            }

            if status.as_u16() >= 400 {
                return Err(Error::Http {
                    code: status.as_u16(),
                    message: status.canonical_reason().unwrap_or("Unknown").to_string(),
                });
            }

            if let Some(len) = response.content_length() {
                if len > self.max_size {
                    return Err(Error::ContentTooLarge {
                        size: len,
                        max: self.max_size,
                    });
                }
            }

            let mut content = Vec::new();
            while let Some(chunk) = response.chunk().await? {
                content.extend_from_slice(&chunk);
                if content.len() as u64 > self.max_size {
                    return Err(Error::ContentTooLarge {
                        size: content.len() as u64,
                        max: self.max_size,
                    });
                }
            }

            debug!(url = %current, bytes = content.len(), "Downloaded");
            return Ok(content);
        }

        Err(Error::TooManyRedirects {
            url: url.to_string(),
            limit: self.max_redirects,
        })
    }
}

fn parse_http_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|_| Error::InvalidUrl(url.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        _ => Err(Error::InvalidUrl(url.to_string())),
    }
}
