//! epub-searcher - ingestion and indexing pipeline for EPUB full-text search.
//!
//! The pipeline resolves an EPUB designator (local path or URL) to local
//! bytes, extracts bibliographic metadata and reading-order text, and loads
//! the result into a remote bigram-indexed document store. The query side
//! builds the multi-field selects (with snippets and an author facet) that a
//! search front end issues against the same store.
//!
//! ```no_run
//! use epub_searcher::{AppConfig, RemoteStore, SearchRequest, SourceResolver, ingest};
//!
//! let config = AppConfig::default();
//! let resolver = SourceResolver::new(&config)?;
//! let store = RemoteStore::open(&config)?;
//!
//! store.setup_schema()?;
//! ingest::run_batch(&resolver, &store, &["book.epub".to_string()])?;
//!
//! let results = store.search(&SearchRequest::with_words("全文検索"))?;
//! println!("{} hits", results.hits);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod ingest;
pub mod query;
pub mod schema;
pub mod source;
pub mod store;

pub use config::{AppConfig, LogLevel, load_config};
pub use document::ExtractedDocument;
pub use error::{ExtractionError, IngestError, SourceError, StoreError};
pub use query::{FacetBucket, ResultRow, SearchRequest, SearchResults};
pub use source::SourceResolver;
pub use store::{Command, HttpTransport, RemoteStore, Transport};
