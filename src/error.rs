//! Failure domains of the ingestion and search pipeline.
//!
//! Each stage owns its own error type so callers can tell a bad designator
//! from a bad package from a store rejection. `IngestError` is the
//! per-document umbrella: one value of it describes why a single document
//! dropped out of a batch without touching its siblings.

use std::path::PathBuf;

use thiserror::Error;

/// The designator could not be turned into local EPUB bytes.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("file not found: {0}")]
    Missing(PathBuf),

    #[error("invalid source URL {url}: {reason}")]
    BadUrl { url: String, reason: String },

    #[error("cannot derive a cache filename from {0}")]
    UnnamedRemote(String),

    #[error("HTTP client setup failed: {0}")]
    Client(#[source] reqwest::Error),

    #[error("fetching {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("fetching {url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("writing cached copy {path}: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The package opened, but the content required for indexing is not there.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("package designates no resolvable unique identifier")]
    MissingUniqueIdentifier,

    #[error("package declares no modification date")]
    MissingModified,

    #[error("unparseable modification date {0:?}")]
    InvalidModified(String),

    #[error("package spine is empty")]
    EmptySpine,

    #[error("spine item {0:?} does not resolve through the manifest")]
    UnresolvedSpineItem(String),

    #[error("spine item {0:?} has no readable content")]
    UnreadableSpineItem(String),
}

/// A remote store command failed; the offending command is named.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request {command} failed: {source}")]
    Http {
        command: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("store returned a malformed response to {command}")]
    MalformedResponse { command: &'static str },

    #[error("store rejected {command} (return code {code}): {message}")]
    Rejected {
        command: &'static str,
        code: i64,
        message: String,
    },

    #[error("could not serialize load payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Why one document fell out of an ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("cannot open EPUB package: {0}")]
    Parse(String),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}
