//! Batch ingestion: designators in, one loaded batch out.
//!
//! Each designator runs the full resolve → parse → extract sequence on its
//! own; a bad source or package never takes its siblings down. Every failure
//! is reported back per document so the caller can skip-and-continue or
//! abort. The surviving documents go to the store as a single load request;
//! a store failure there aborts the whole batch.

use std::path::Path;

use tracing::{info, warn};

use crate::document::ExtractedDocument;
use crate::error::{IngestError, StoreError};
use crate::source::SourceResolver;
use crate::store::{RemoteStore, Transport};

/// One designator that dropped out of the run, and why.
#[derive(Debug)]
pub struct IngestFailure {
    pub designator: String,
    pub error: IngestError,
}

/// Outcome of a batch run: rows loaded plus per-document failures.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub loaded: u64,
    pub failures: Vec<IngestFailure>,
}

/// Ingest every designator and load the extracted documents as one batch.
pub fn run_batch<T: Transport>(
    resolver: &SourceResolver,
    store: &RemoteStore<T>,
    designators: &[String],
) -> Result<IngestReport, StoreError> {
    let mut documents = Vec::new();
    let mut failures = Vec::new();
    for designator in designators {
        match extract_one(resolver, designator) {
            Ok(document) => documents.push(document),
            Err(error) => {
                warn!(%designator, "Skipping document: {error}");
                failures.push(IngestFailure {
                    designator: designator.clone(),
                    error,
                });
            }
        }
    }

    let loaded = if documents.is_empty() {
        0
    } else {
        store.load_documents(&documents)?
    };
    info!(
        loaded,
        failed = failures.len(),
        "Ingestion batch finished"
    );
    Ok(IngestReport { loaded, failures })
}

fn extract_one(
    resolver: &SourceResolver,
    designator: &str,
) -> Result<ExtractedDocument, IngestError> {
    let path = resolver.resolve(designator)?;
    extract_document(&path)
}

/// Extract a single already-resolved package.
pub fn extract_document(path: &Path) -> Result<ExtractedDocument, IngestError> {
    ExtractedDocument::open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::error::SourceError;
    use crate::store::Command;
    use serde_json::{Value, json};
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingTransport {
        commands: Arc<Mutex<Vec<Command>>>,
    }

    impl Transport for RecordingTransport {
        fn execute(&self, command: &Command) -> Result<Value, StoreError> {
            self.commands
                .lock()
                .expect("commands lock should be available")
                .push(command.clone());
            Ok(json!([[0, 1371430074.16, 0.0001], 1]))
        }
    }

    fn test_resolver(cache_dir: &Path) -> SourceResolver {
        let config = AppConfig {
            cache_dir: cache_dir.to_path_buf(),
            ..AppConfig::default()
        };
        SourceResolver::new(&config).expect("resolver should build")
    }

    // A minimal but complete single-item package.
    fn write_fixture_epub(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("fixture.epub");
        let file = std::fs::File::create(&path).expect("fixture file should be created");
        let mut writer = zip::ZipWriter::new(file);
        let stored = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        let deflated = zip::write::SimpleFileOptions::default();
        writer
            .start_file("mimetype", stored)
            .expect("mimetype entry should start");
        writer
            .write_all(b"application/epub+zip")
            .expect("mimetype should be written");
        writer
            .start_file("META-INF/container.xml", deflated)
            .expect("container entry should start");
        writer
            .write_all(
                br#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
            )
            .expect("container should be written");
        writer
            .start_file("content.opf", deflated)
            .expect("opf entry should start");
        writer
            .write_all(
                br#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="pub-id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="pub-id">fixture-0001</dc:identifier>
    <dc:title>Fixture</dc:title>
    <dc:creator>tester</dc:creator>
    <meta property="dcterms:modified">2013-06-20T02:44:04Z</meta>
  </metadata>
  <manifest>
    <item id="item0001" href="item0001.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine>
    <itemref idref="item0001"/>
  </spine>
</package>"#,
            )
            .expect("opf should be written");
        writer
            .start_file("item0001.xhtml", deflated)
            .expect("content entry should start");
        writer
            .write_all(
                br#"<html xmlns="http://www.w3.org/1999/xhtml"><body><p>hello search</p></body></html>"#,
            )
            .expect("content should be written");
        writer.finish().expect("fixture zip should finish");
        path
    }

    #[test]
    fn failed_documents_do_not_abort_the_batch() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let epub = write_fixture_epub(dir.path());
        let resolver = test_resolver(dir.path());
        let transport = RecordingTransport::default();
        let store = RemoteStore::with_transport(transport.clone());

        let designators = vec![
            epub.display().to_string(),
            "/no/such/book.epub".to_string(),
        ];
        let report = run_batch(&resolver, &store, &designators).expect("batch should run");

        assert_eq!(report.loaded, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].designator, "/no/such/book.epub");
        assert!(matches!(
            report.failures[0].error,
            IngestError::Source(SourceError::Missing(_))
        ));

        let commands = transport
            .commands
            .lock()
            .expect("commands lock should be available")
            .clone();
        assert_eq!(commands.len(), 1, "one batch means one load request");
        assert_eq!(commands[0].name(), "load");
    }

    #[test]
    fn an_empty_run_issues_no_load() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let resolver = test_resolver(dir.path());
        let transport = RecordingTransport::default();
        let store = RemoteStore::with_transport(transport.clone());

        let report = run_batch(&resolver, &store, &["missing.epub".to_string()])
            .expect("batch should run");
        assert_eq!(report.loaded, 0);
        assert_eq!(report.failures.len(), 1);
        assert!(
            transport
                .commands
                .lock()
                .expect("commands lock should be available")
                .is_empty()
        );
    }
}
