//! Document extraction: from a parsed EPUB package to an indexable record.
//!
//! The archive/XML decoding itself is the `epub` crate's job; this module
//! only walks what the parser exposes (metadata entries, the manifest, and
//! the spine) and produces one immutable [`ExtractedDocument`] per package.
//! Extraction is all-or-nothing: a missing unique identifier, a missing
//! modification date, or a spine item that does not resolve through the
//! manifest fails the whole document rather than producing a partial record.

use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use chrono::DateTime;
use epub::doc::EpubDoc;
use tracing::{debug, info, warn};

use crate::error::{ExtractionError, IngestError};

/// Width passed to the markup stripper. Large enough that no hard line
/// breaks are baked into the extracted text.
const TEXT_WIDTH: usize = 10_000;

/// Everything the index needs from one EPUB publication.
///
/// `creators`, `contributors`, and `xhtml_spine` keep declaration order;
/// `main_text` follows `xhtml_spine` ordering exactly, one `\n` between
/// spine items.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDocument {
    /// Local path the package bytes were read from (the cached copy, for
    /// remote origin).
    pub source_path: PathBuf,
    pub title: String,
    pub creators: Vec<String>,
    pub contributors: Vec<String>,
    pub unique_identifier: String,
    /// Modification timestamp as fractional seconds since the epoch.
    pub modified: f64,
    pub main_text: String,
    /// Archive-relative spine item paths, reading order. Kept for
    /// verification; not indexed.
    pub xhtml_spine: Vec<String>,
}

impl ExtractedDocument {
    /// Open the package at `path` and extract it.
    pub fn open(path: &Path) -> Result<Self, IngestError> {
        let mut doc = EpubDoc::new(path).map_err(|err| IngestError::Parse(err.to_string()))?;
        Ok(Self::from_package(&mut doc, path)?)
    }

    /// Extract from an already-parsed package.
    pub fn from_package<R: Read + Seek>(
        doc: &mut EpubDoc<R>,
        source_path: &Path,
    ) -> Result<Self, ExtractionError> {
        let title = doc.mdata("title").unwrap_or_default();
        let creators = doc.metadata.get("creator").cloned().unwrap_or_default();
        let contributors = doc.metadata.get("contributor").cloned().unwrap_or_default();
        let unique_identifier = doc
            .unique_identifier
            .clone()
            .ok_or(ExtractionError::MissingUniqueIdentifier)?;
        let modified_raw = doc
            .mdata("dcterms:modified")
            .ok_or(ExtractionError::MissingModified)?;
        let modified = parse_modified(&modified_raw)?;

        if doc.spine.is_empty() {
            return Err(ExtractionError::EmptySpine);
        }
        let spine = doc.spine.clone();
        let mut xhtml_spine = Vec::with_capacity(spine.len());
        let mut main_text = String::new();
        for (index, idref) in spine.iter().enumerate() {
            let (item_path, _mime) = doc
                .resources
                .get(idref)
                .cloned()
                .ok_or_else(|| ExtractionError::UnresolvedSpineItem(idref.clone()))?;
            let (content, _mime) = doc
                .get_resource_str(idref)
                .ok_or_else(|| ExtractionError::UnreadableSpineItem(idref.clone()))?;
            let text = match html2text::from_read(content.as_bytes(), TEXT_WIDTH) {
                Ok(stripped) => stripped,
                Err(err) => {
                    warn!(item = %idref, "Markup stripping failed, keeping raw content: {err}");
                    content
                }
            };
            if index > 0 {
                main_text.push('\n');
            }
            main_text.push_str(text.trim_end_matches(['\r', '\n']));
            xhtml_spine.push(item_path.to_string_lossy().into_owned());
            debug!(item = %idref, chars = main_text.len(), "Extracted spine item");
        }

        info!(
            path = %source_path.display(),
            items = xhtml_spine.len(),
            total_chars = main_text.len(),
            "Extracted document"
        );
        Ok(ExtractedDocument {
            source_path: source_path.to_path_buf(),
            title,
            creators,
            contributors,
            unique_identifier,
            modified,
            main_text,
            xhtml_spine,
        })
    }

    /// The value indexed as `author`: creators joined by a single space.
    pub fn author(&self) -> String {
        self.creators.join(" ")
    }
}

/// Parse the package's modification date into fractional epoch seconds.
///
/// Accepts RFC 3339 and the common ISO-8601 offset spellings; the timezone
/// is folded into the epoch value rather than kept zone-relative.
fn parse_modified(raw: &str) -> Result<f64, ExtractionError> {
    const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M:%S%z"];
    let trimmed = raw.trim();
    let parsed = DateTime::parse_from_rfc3339(trimmed).ok().or_else(|| {
        OFFSET_FORMATS
            .iter()
            .find_map(|format| DateTime::parse_from_str(trimmed, format).ok())
    });
    let timestamp = parsed.ok_or_else(|| ExtractionError::InvalidModified(raw.to_string()))?;
    Ok(timestamp.timestamp() as f64 + f64::from(timestamp.timestamp_subsec_micros()) / 1e6)
}
