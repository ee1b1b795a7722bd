//! Package references.
//!
//! A reference is either a bare URL (`example.org/foo`) or a URL pinned to a
//! revision (`https://example.org/foo@v1.2`). The lock file is keyed by the
//! reference exactly as the caller wrote it.

use thiserror::Error;
use tracing::debug;

/// Error resolving a URL to its canonical location.
#[derive(Debug, Error)]
#[error("failed to fetch url '{url}': {source}")]
pub struct UrlError {
  pub url: String,
  #[source]
  pub source: Box<dyn std::error::Error + Send + Sync>,
}

/// A parsed package reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
  raw: String,
  url: String,
  rev: Option<String>,
}

impl PackageRef {
  /// Split `reference` into URL and optional revision pin.
  ///
  /// The pin is whatever follows the last `@`, provided it looks like a
  /// revision rather than part of a URL (no `/` or `:`), so `git@host:repo`
  /// stays unpinned.
  pub fn parse(reference: &str) -> Self {
    let (url, rev) = match reference.rsplit_once('@') {
      Some((url, rev)) if !url.is_empty() && !rev.is_empty() && !rev.contains(['/', ':']) => {
        (url.to_string(), Some(rev.to_string()))
      }
      _ => (reference.to_string(), None),
    };
    Self {
      raw: reference.to_string(),
      url,
      rev,
    }
  }

  /// The reference as written, used as the lock key.
  pub fn as_str(&self) -> &str {
    &self.raw
  }

  pub fn url(&self) -> &str {
    &self.url
  }

  /// The pinned revision, if any.
  pub fn rev(&self) -> Option<&str> {
    self.rev.as_deref()
  }

  pub fn is_pinned(&self) -> bool {
    self.rev.is_some()
  }

  /// URL with a scheme, defaulting to `https://`.
  pub fn normalized_url(&self) -> String {
    with_scheme(&self.url)
  }
}

impl std::fmt::Display for PackageRef {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.raw)
  }
}

/// Prefix `https://` onto URLs without a scheme.
pub fn with_scheme(url: &str) -> String {
  if url.contains("://") {
    url.to_string()
  } else {
    format!("https://{}", url)
  }
}

/// Resolves vanity URLs to the location they redirect to.
pub trait UrlResolver {
  fn resolve(&self, url: &str) -> Result<String, UrlError>;
}

/// Follows HTTP redirects with a blocking GET.
///
/// URLs with schemes other than `http`/`https` are returned untouched.
#[derive(Debug, Default)]
pub struct HttpResolver;

impl UrlResolver for HttpResolver {
  fn resolve(&self, url: &str) -> Result<String, UrlError> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
      return Ok(url.to_string());
    }
    let wrap = |e: reqwest::Error| UrlError {
      url: url.to_string(),
      source: Box::new(e),
    };
    let client = reqwest::blocking::Client::builder().build().map_err(wrap)?;
    let response = client.get(url).send().map_err(wrap)?;
    let resolved = response.url().to_string();
    if resolved != url {
      debug!(from = url, to = %resolved, "url redirected");
    }
    Ok(resolved)
  }
}
