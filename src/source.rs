//! Source resolution: turning a designator into a local EPUB path.
//!
//! Local paths pass through untouched. Remote http/https sources are fetched
//! and materialized under a managed cache directory, named after the URL's
//! final path segment so re-fetching the same URL overwrites the prior copy.
//! Files are staged under a private name and renamed into place, so a reader
//! never observes a half-written EPUB and a failed fetch leaves nothing
//! behind.

use std::fs;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use reqwest::Url;
use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::SourceError;

pub struct SourceResolver {
    cache_dir: PathBuf,
    client: Client,
}

impl SourceResolver {
    pub fn new(config: &AppConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(config.fetch_timeout())
            .build()
            .map_err(SourceError::Client)?;
        Ok(SourceResolver {
            cache_dir: config.cache_dir.clone(),
            client,
        })
    }

    /// Resolve a local path or remote URL to a readable local EPUB path.
    pub fn resolve(&self, designator: &str) -> Result<PathBuf, SourceError> {
        if designator.starts_with("http://") || designator.starts_with("https://") {
            return self.fetch_remote(designator);
        }
        let path = PathBuf::from(designator);
        if path.is_file() {
            debug!(path = %path.display(), "Using local EPUB");
            Ok(path)
        } else {
            Err(SourceError::Missing(path))
        }
    }

    fn fetch_remote(&self, url: &str) -> Result<PathBuf, SourceError> {
        let parsed = Url::parse(url).map_err(|err| SourceError::BadUrl {
            url: url.to_string(),
            reason: err.to_string(),
        })?;
        let name = remote_file_name(&parsed)?;

        info!(%url, "Fetching remote EPUB");
        let response = self
            .client
            .get(parsed)
            .send()
            .map_err(|err| SourceError::Fetch {
                url: url.to_string(),
                source: err,
            })?;
        if !response.status().is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }
        let bytes = response.bytes().map_err(|err| SourceError::Fetch {
            url: url.to_string(),
            source: err,
        })?;

        fs::create_dir_all(&self.cache_dir).map_err(|err| SourceError::Cache {
            path: self.cache_dir.clone(),
            source: err,
        })?;
        let target = self.cache_dir.join(&name);
        // Stage under a process-private name, then rename onto the cache
        // path. Readers only ever see fully materialized files.
        let staging = self
            .cache_dir
            .join(format!("{name}.part-{}", std::process::id()));
        fs::write(&staging, &bytes).map_err(|err| SourceError::Cache {
            path: staging.clone(),
            source: err,
        })?;
        if let Err(err) = fs::rename(&staging, &target) {
            let _ = fs::remove_file(&staging);
            return Err(SourceError::Cache {
                path: target,
                source: err,
            });
        }
        info!(path = %target.display(), bytes = bytes.len(), "Cached remote EPUB");
        Ok(target)
    }
}

/// Derive the cache filename from the URL's final path segment.
///
/// The segment is percent-decoded so a unicode-bearing name round-trips
/// byte-for-byte onto the filesystem. Decoded names that would escape the
/// cache directory are rejected; the URL is untrusted input.
fn remote_file_name(url: &Url) -> Result<String, SourceError> {
    let segment = url
        .path_segments()
        .and_then(|segments| segments.last())
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| SourceError::UnnamedRemote(url.to_string()))?;
    let decoded = percent_decode_str(segment)
        .decode_utf8()
        .map_err(|err| SourceError::BadUrl {
            url: url.to_string(),
            reason: err.to_string(),
        })?;
    if decoded.contains('/') || decoded.contains('\\') || decoded == "." || decoded == ".." {
        return Err(SourceError::UnnamedRemote(url.to_string()));
    }
    Ok(decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver_with_cache(cache_dir: &Path) -> SourceResolver {
        let config = AppConfig {
            cache_dir: cache_dir.to_path_buf(),
            fetch_timeout_secs: 2,
            ..AppConfig::default()
        };
        SourceResolver::new(&config).expect("resolver should build")
    }

    #[test]
    fn local_path_passes_through_unchanged() {
        let file = tempfile::NamedTempFile::new().expect("temp file should be created");
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let resolver = resolver_with_cache(dir.path());
        let resolved = resolver
            .resolve(&file.path().display().to_string())
            .expect("existing local path should resolve");
        assert_eq!(resolved, file.path());
    }

    #[test]
    fn missing_local_path_is_a_source_error() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let resolver = resolver_with_cache(dir.path());
        let err = resolver
            .resolve("/no/such/book.epub")
            .expect_err("missing file should not resolve");
        assert!(matches!(err, SourceError::Missing(_)));
    }

    #[test]
    fn failed_fetch_leaves_no_file_behind() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let resolver = resolver_with_cache(dir.path());
        // Port 1 is never serving; the connection is refused immediately.
        let err = resolver
            .resolve("http://127.0.0.1:1/book.epub")
            .expect_err("unreachable host should fail");
        assert!(matches!(err, SourceError::Fetch { .. }));
        let leftovers: Vec<_> = match fs::read_dir(dir.path()) {
            Ok(entries) => entries.collect(),
            Err(_) => Vec::new(),
        };
        assert!(leftovers.is_empty(), "cache dir should stay empty");
    }

    #[test]
    fn unicode_file_names_round_trip() {
        let url = Url::parse("http://localhost/books/%E6%97%A5%E6%9C%AC%E8%AA%9E.epub")
            .expect("url should parse");
        assert_eq!(
            remote_file_name(&url).expect("name should derive"),
            "日本語.epub"
        );
    }

    #[test]
    fn plain_file_names_ignore_query_and_fragment() {
        let url = Url::parse("http://localhost/shelf/test.epub?raw=1#cover")
            .expect("url should parse");
        assert_eq!(
            remote_file_name(&url).expect("name should derive"),
            "test.epub"
        );
    }

    #[test]
    fn unnameable_urls_are_rejected() {
        let bare = Url::parse("http://localhost/").expect("url should parse");
        assert!(matches!(
            remote_file_name(&bare),
            Err(SourceError::UnnamedRemote(_))
        ));

        let traversal =
            Url::parse("http://localhost/%2E%2E%2Fescape.epub").expect("url should parse");
        assert!(matches!(
            remote_file_name(&traversal),
            Err(SourceError::UnnamedRemote(_))
        ));
    }
}
