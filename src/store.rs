//! Remote document-store client.
//!
//! The store speaks an HTTP command dialect: every operation is a named
//! command with query parameters, answered by a JSON envelope of
//! `[[return_code, start, elapsed, ...], body]`. [`Command`] values are
//! built by the schema and query modules; the [`Transport`] trait is the
//! seam between command construction and the wire, so tests can record
//! commands without a live store.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::document::ExtractedDocument;
use crate::error::StoreError;
use crate::query::{self, SearchRequest, SearchResults};
use crate::schema;

/// Protocol version marker attached to every request.
pub const COMMAND_VERSION: &str = "2";

/// One store command: name, ordered parameters, optional JSON payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: &'static str,
    params: Vec<(String, String)>,
    body: Option<String>,
}

impl Command {
    pub fn new(name: &'static str) -> Self {
        Command {
            name,
            params: vec![("command_version".to_string(), COMMAND_VERSION.to_string())],
            body: None,
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

/// Executes a command and returns the store's raw response envelope.
pub trait Transport {
    fn execute(&self, command: &Command) -> Result<Value, StoreError>;
}

/// Blocking HTTP transport against the store's `/d/<command>` endpoint.
pub struct HttpTransport {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(config: &AppConfig) -> Result<Self, StoreError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.store_timeout())
            .build()
            .map_err(|err| StoreError::Http {
                command: "connect",
                source: err,
            })?;
        Ok(HttpTransport {
            endpoint: config.store_endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }
}

impl Transport for HttpTransport {
    fn execute(&self, command: &Command) -> Result<Value, StoreError> {
        let url = format!("{}/d/{}", self.endpoint, command.name());
        let request = match command.body() {
            // `load` ships its rows as the request body; everything else is
            // parameter-only.
            Some(body) => self
                .client
                .post(&url)
                .query(command.params())
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.to_string()),
            None => self.client.get(&url).query(command.params()),
        };
        let response = request.send().map_err(|err| StoreError::Http {
            command: command.name(),
            source: err,
        })?;
        // Command failures still come back as a JSON envelope with a
        // non-zero return code; the HTTP status alone is not the verdict.
        let text = response.text().map_err(|err| StoreError::Http {
            command: command.name(),
            source: err,
        })?;
        serde_json::from_str(&text).map_err(|_| StoreError::MalformedResponse {
            command: command.name(),
        })
    }
}

/// One loaded `Books` row. Field order is the wire order.
#[derive(Debug, Serialize)]
struct BookRow<'a> {
    author: String,
    main_text: &'a str,
    title: &'a str,
    file_path: String,
    unique_identifier: &'a str,
    modified: f64,
}

impl<'a> BookRow<'a> {
    fn from_document(document: &'a ExtractedDocument) -> Self {
        BookRow {
            author: document.author(),
            main_text: &document.main_text,
            title: &document.title,
            file_path: document.source_path.to_string_lossy().into_owned(),
            unique_identifier: &document.unique_identifier,
            modified: document.modified,
        }
    }
}

/// High-level operations against the remote store.
pub struct RemoteStore<T: Transport> {
    transport: T,
}

impl RemoteStore<HttpTransport> {
    pub fn open(config: &AppConfig) -> Result<Self, StoreError> {
        Ok(RemoteStore::with_transport(HttpTransport::new(config)?))
    }
}

impl<T: Transport> RemoteStore<T> {
    pub fn with_transport(transport: T) -> Self {
        RemoteStore { transport }
    }

    /// Create the `Books` record table and the `Terms` lexicon.
    pub fn setup_schema(&self) -> Result<(), StoreError> {
        for command in schema::setup_commands() {
            self.run(command)?;
        }
        info!("Store schema created");
        Ok(())
    }

    /// Load one batch of documents as a single request. The whole batch
    /// stands or falls together; there is no row-level retry.
    pub fn load_documents(&self, documents: &[ExtractedDocument]) -> Result<u64, StoreError> {
        let rows: Vec<BookRow> = documents.iter().map(BookRow::from_document).collect();
        let values = serde_json::to_string(&rows)?;
        let body = self.run(
            Command::new("load")
                .param("table", schema::BOOKS_TABLE)
                .with_body(values),
        )?;
        let loaded = body
            .as_u64()
            .ok_or(StoreError::MalformedResponse { command: "load" })?;
        info!(loaded, "Loaded document batch");
        Ok(loaded)
    }

    /// Run a search request and interpret the response.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchResults, StoreError> {
        let body = self.run(query::build_select(request))?;
        query::parse_select(&body)
    }

    /// Full `Books` listing plus the author facet, for the browse view.
    pub fn books_listing(&self) -> Result<SearchResults, StoreError> {
        let body = self.run(query::build_books_listing())?;
        query::parse_select(&body)
    }

    /// Remove one record by its store-assigned id. Administrative.
    pub fn delete(&self, table: &str, id: u64) -> Result<(), StoreError> {
        self.run(
            Command::new("delete")
                .param("table", table)
                .param("id", id.to_string()),
        )?;
        Ok(())
    }

    /// Clear a table. Administrative.
    pub fn truncate(&self, table: &str) -> Result<(), StoreError> {
        self.run(Command::new("truncate").param("target_name", table))?;
        Ok(())
    }

    fn run(&self, command: Command) -> Result<Value, StoreError> {
        debug!(command = command.name(), "Issuing store command");
        let envelope = self.transport.execute(&command)?;
        unwrap_envelope(command.name(), envelope)
    }
}

/// Split the response envelope into return code and body, surfacing
/// non-zero return codes as rejections.
fn unwrap_envelope(command: &'static str, envelope: Value) -> Result<Value, StoreError> {
    let Value::Array(mut parts) = envelope else {
        return Err(StoreError::MalformedResponse { command });
    };
    if parts.is_empty() {
        return Err(StoreError::MalformedResponse { command });
    }
    let header = parts.remove(0);
    let header = header
        .as_array()
        .ok_or(StoreError::MalformedResponse { command })?;
    let code = header
        .first()
        .and_then(Value::as_i64)
        .ok_or(StoreError::MalformedResponse { command })?;
    if code != 0 {
        let message = header
            .get(3)
            .and_then(Value::as_str)
            .unwrap_or("unknown store error")
            .to_string();
        return Err(StoreError::Rejected {
            command,
            code,
            message,
        });
    }
    Ok(parts.into_iter().next().unwrap_or(Value::Null))
}
