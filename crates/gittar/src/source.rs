//! Repository identifiers
//!
//! Turns loosely structured strings into a canonical [`RepoSource`].
//!
//! ## Supported formats
//!
//! - `user/repo` - default provider, default branch
//! - `user/repo#v1.0.0` - explicit ref (branch, tag or commit)
//! - `gitlab:user/repo#v1.0.0` - provider hint, overrides the `host` option
//! - `https://github.com/user/repo#dev` - full URL, the path and fragment are used

use crate::error::{Error, Result};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ref used when an identifier does not name one
pub const DEFAULT_BRANCH: &str = "master";

/// Supported source hosting providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    #[default]
    GitHub,
    GitLab,
    Bitbucket,
}

impl Site {
    /// All supported providers
    pub const ALL: [Site; 3] = [Site::GitHub, Site::GitLab, Site::Bitbucket];

    /// Lowercase name, also used as the cache directory
    pub fn name(self) -> &'static str {
        match self {
            Site::GitHub => "github",
            Site::GitLab => "gitlab",
            Site::Bitbucket => "bitbucket",
        }
    }

    /// Public host of the provider
    pub fn domain(self) -> &'static str {
        match self {
            Site::GitHub => "github.com",
            Site::GitLab => "gitlab.com",
            Site::Bitbucket => "bitbucket.org",
        }
    }

    /// Base URL archive downloads are served from
    pub fn default_base_url(self) -> String {
        format!("https://{}", self.domain())
    }

    /// Provider matching a URL host, `www.` prefix ignored
    pub fn from_domain(host: &str) -> Option<Site> {
        let host = host.trim_start_matches("www.");
        Site::ALL
            .into_iter()
            .find(|site| site.domain().eq_ignore_ascii_case(host))
    }

    /// Build the `.tar.gz` download URL for `repo` at `reference`
    ///
    /// - GitHub: `{base}/{repo}/archive/{ref}.tar.gz`
    /// - GitLab: `{base}/{repo}/-/archive/{ref}/{name}-{ref}.tar.gz`
    /// - Bitbucket: `{base}/{repo}/get/{ref}.tar.gz`
    pub fn archive_url(self, base: &str, repo: &str, reference: &str) -> String {
        let base = base.trim_end_matches('/');
        match self {
            Site::GitHub => format!("{}/{}/archive/{}.tar.gz", base, repo, reference),
            Site::GitLab => {
                let name = repo.rsplit('/').next().unwrap_or(repo);
                // GitLab names the file after the ref; slashes are not allowed there
                let file_ref = reference.replace('/', "-");
                format!(
                    "{}/{}/-/archive/{}/{}-{}.tar.gz",
                    base, repo, reference, name, file_ref
                )
            }
            Site::Bitbucket => format!("{}/{}/get/{}.tar.gz", base, repo, reference),
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Site {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Site::ALL
            .into_iter()
            .find(|site| site.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnsupportedProvider(s.to_string()))
    }
}

/// Canonical `{site, repo, ref}` record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSource {
    /// Hosting provider
    pub site: Site,
    /// `owner/name` path, case preserved
    pub repo: String,
    /// Branch, tag or commit
    pub reference: String,
}

impl RepoSource {
    /// Parse an identifier
    ///
    /// `host` is used when the input carries no provider hint of its own.
    pub fn parse(input: &str, host: Option<Site>) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::parse(input, "identifier is empty"));
        }

        let (hint, path, fragment) = if trimmed.contains("://") {
            split_url(input, trimmed)?
        } else {
            let (hint, rest) = split_host_hint(trimmed)?;
            let (path, fragment) = match rest.split_once('#') {
                Some((path, fragment)) => (path.to_string(), Some(fragment.to_string())),
                None => (rest.to_string(), None),
            };
            (hint, path, fragment)
        };

        let site = hint.or(host).unwrap_or_default();
        let repo = normalize_repo(input, &path)?;
        let reference = normalize_ref(input, fragment.as_deref())?;

        Ok(Self {
            site,
            repo,
            reference,
        })
    }

    /// True when the ref is the default branch, whose archive changes over time
    pub fn is_default_branch(&self) -> bool {
        self.reference == DEFAULT_BRANCH
    }
}

impl fmt::Display for RepoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}#{}", self.site, self.repo, self.reference)
    }
}

/// Strip a leading `<provider>:` hint
fn split_host_hint(input: &str) -> Result<(Option<Site>, &str)> {
    match input.split_once(':') {
        Some((prefix, rest))
            if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_alphabetic()) =>
        {
            Ok((Some(prefix.parse()?), rest))
        }
        _ => Ok((None, input)),
    }
}

/// Split a full URL into provider, path and fragment
///
/// Path and fragment come back percent-decoded, so `https://github.com/u/r#v%201`
/// is validated exactly like `u/r#v 1`.
fn split_url(input: &str, trimmed: &str) -> Result<(Option<Site>, String, Option<String>)> {
    let parsed =
        url::Url::parse(trimmed).map_err(|e| Error::parse(input, format!("invalid URL: {}", e)))?;
    let site = parsed.host_str().and_then(Site::from_domain);
    let path = decode(input, parsed.path())?;
    let fragment = parsed.fragment().map(|f| decode(input, f)).transpose()?;
    Ok((site, path, fragment))
}

fn decode(input: &str, encoded: &str) -> Result<String> {
    percent_decode_str(encoded)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| Error::parse(input, format!("invalid percent-encoding: {}", e)))
}

fn normalize_repo(input: &str, path: &str) -> Result<String> {
    let path = path.trim().trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() < 2 || segments.iter().any(|s| s.is_empty()) {
        return Err(Error::parse(input, "expected `owner/name`"));
    }
    for segment in &segments {
        check_segment(input, segment)?;
        if segment.contains('#') {
            return Err(Error::parse(input, format!("unexpected `#` in `{}`", segment)));
        }
    }

    Ok(segments.join("/"))
}

fn normalize_ref(input: &str, fragment: Option<&str>) -> Result<String> {
    let reference = match fragment.map(str::trim) {
        Some(r) if !r.is_empty() => r,
        _ => return Ok(DEFAULT_BRANCH.to_string()),
    };
    for segment in reference.split('/') {
        if segment.is_empty() {
            return Err(Error::parse(input, "empty segment in ref"));
        }
        check_segment(input, segment)?;
    }
    Ok(reference.to_string())
}

/// Segments become cache directories, so they must stay inside the cache root
fn check_segment(input: &str, segment: &str) -> Result<()> {
    if segment == "." || segment == ".." {
        return Err(Error::parse(input, "relative path segment"));
    }
    if segment
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || c == ':' || c == '\\')
    {
        return Err(Error::parse(
            input,
            format!("unexpected character in `{}`", segment),
        ));
    }
    Ok(())
}
