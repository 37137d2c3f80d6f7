//! Search request construction and response interpretation.
//!
//! A [`SearchRequest`] captures the two recognized inputs (free-text words
//! and an author filter set) and maps onto exactly three select shapes:
//! free text matched across `author,title,main_text` with snippets, author
//! clauses scoped to the `author` column, and (with neither input) an
//! aggregation-only request that returns just the author facet for the
//! browse view. Responses parse into rows, a hit count, and facet buckets;
//! zero hits is a normal result, never an error.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::error::StoreError;
use crate::schema::BOOKS_TABLE;
use crate::store::Command;

const MATCH_COLUMNS: &str = "author,title,main_text";
const RESULT_COLUMNS: &str = "_id,author,title,file_path,unique_identifier,snippet_html(main_text)";
const LISTING_COLUMNS: &str = "_id,author,title,file_path,unique_identifier";
const DRILLDOWN_COLUMNS: &str = "_key,_nsubrecs";

/// What the caller asked for: optional query words, optional author facet
/// selections. Authors are a set: duplicates collapse, order is stable.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub words: Option<String>,
    pub authors: BTreeSet<String>,
}

impl SearchRequest {
    pub fn with_words(words: impl Into<String>) -> Self {
        SearchRequest {
            words: Some(words.into()),
            authors: BTreeSet::new(),
        }
    }

    pub fn words(&self) -> Option<&str> {
        self.words
            .as_deref()
            .map(str::trim)
            .filter(|words| !words.is_empty())
    }

    pub fn has_criteria(&self) -> bool {
        self.words().is_some() || !self.authors.is_empty()
    }
}

/// Build the select command for a request.
pub fn build_select(request: &SearchRequest) -> Command {
    let command = Command::new("select").param("table", BOOKS_TABLE);
    if !request.has_criteria() {
        // Nothing to match: ask only for the author facet over the whole
        // corpus and suppress the row set.
        return with_author_drilldown(
            command.param("limit", "0").param("output_columns", "_id"),
        );
    }

    let mut clauses = Vec::new();
    if let Some(words) = request.words() {
        clauses.push(words.to_string());
    }
    for author in &request.authors {
        clauses.push(format!("author:@{}", quote(author)));
    }
    // Space-separated clauses conjoin; author filters always narrow the
    // free-text condition.
    let match_columns = if request.words().is_some() {
        MATCH_COLUMNS
    } else {
        "author"
    };
    with_author_drilldown(
        command
            .param("query", clauses.join(" "))
            .param("match_columns", match_columns)
            .param("output_columns", RESULT_COLUMNS),
    )
}

/// Build the full-listing select backing the books view.
pub fn build_books_listing() -> Command {
    with_author_drilldown(
        Command::new("select")
            .param("table", BOOKS_TABLE)
            .param("limit", "-1")
            .param("output_columns", LISTING_COLUMNS),
    )
}

fn with_author_drilldown(command: Command) -> Command {
    command
        .param("drilldown", "author")
        .param("drilldown_output_columns", DRILLDOWN_COLUMNS)
        .param("drilldown_sort_keys", "-_nsubrecs")
        .param("drilldown_limit", "-1")
}

/// Quote a filter value for the query syntax; author names may carry
/// spaces and quotes.
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

/// One matched row, columns in response order.
#[derive(Debug, Clone)]
pub struct ResultRow {
    columns: Vec<(String, Value)>,
}

impl ResultRow {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Snippet excerpts for a highlighted column, empty when absent.
    pub fn snippets(&self, name: &str) -> Vec<&str> {
        self.get(name)
            .and_then(Value::as_array)
            .map(|snippets| snippets.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// One author facet bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetBucket {
    pub value: String,
    pub count: i64,
}

/// Rows, total hit count, and facet buckets from one select response.
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub hits: u64,
    pub records: Vec<ResultRow>,
    pub drilldowns: Vec<FacetBucket>,
}

/// Interpret a select response body.
pub fn parse_select(body: &Value) -> Result<SearchResults, StoreError> {
    const COMMAND: &str = "select";
    let parts = body
        .as_array()
        .ok_or(StoreError::MalformedResponse { command: COMMAND })?;
    let (hits, records) = parse_result_table(parts.first())
        .ok_or(StoreError::MalformedResponse { command: COMMAND })?;
    let drilldowns = match parts.get(1) {
        Some(facet_table) => {
            parse_facet_table(facet_table)
                .ok_or(StoreError::MalformedResponse { command: COMMAND })?
        }
        None => Vec::new(),
    };
    Ok(SearchResults {
        hits,
        records,
        drilldowns,
    })
}

/// A result table is `[[hits], [column defs], row...]`.
fn parse_result_table(value: Option<&Value>) -> Option<(u64, Vec<ResultRow>)> {
    let table = value?.as_array()?;
    let hits = table.first()?.as_array()?.first()?.as_u64()?;
    let columns: Vec<String> = table
        .get(1)?
        .as_array()?
        .iter()
        .filter_map(|definition| {
            definition
                .as_array()
                .and_then(|pair| pair.first())
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .collect();
    let records = table[2..]
        .iter()
        .filter_map(Value::as_array)
        .map(|row| ResultRow {
            columns: columns.iter().cloned().zip(row.iter().cloned()).collect(),
        })
        .collect();
    Some((hits, records))
}

fn parse_facet_table(value: &Value) -> Option<Vec<FacetBucket>> {
    let table = value.as_array()?;
    let buckets = table
        .get(2..)
        .unwrap_or_default()
        .iter()
        .filter_map(Value::as_array)
        .filter_map(|row| {
            Some(FacetBucket {
                value: row.first()?.as_str()?.to_string(),
                count: row.get(1)?.as_i64()?,
            })
        })
        .collect();
    Some(buckets)
}
