//! Search client over a Solr collection.
//!
//! [`SearchClient`] owns a long-lived blocking HTTP client and exposes five
//! stateless operations: [`search`](SearchClient::search),
//! [`get_by_id`](SearchClient::get_by_id),
//! [`more_like_this`](SearchClient::more_like_this),
//! [`facet_values`](SearchClient::facet_values) and
//! [`stats`](SearchClient::stats).
//!
//! No operation returns an error. Transport failures, HTTP error statuses and
//! malformed bodies are logged and folded into a structurally valid result
//! with an `error` field (or an empty value where the operation has no
//! result envelope).
//!
//! The `run_*` functions at the bottom are the CLI entry points.

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{BackendConfig, Config};
use crate::error::BackendError;
use crate::models::Doc;
use crate::query::{self, FilterValue, Params, SearchRequest};
use crate::solr::{self, ErrorBody, FacetCount, Highlighting, SelectResponse};

/// Uniform search result. Always structurally valid, even on failure.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub docs: Vec<Doc>,
    pub num_found: u64,
    pub start: usize,
    pub rows: usize,
    pub query: String,
    pub filters: BTreeMap<String, FilterValue>,
    pub facets: BTreeMap<String, Vec<FacetCount>>,
    pub highlighting: Highlighting,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResult {
    fn failed(req: &SearchRequest, error: &BackendError) -> Self {
        Self {
            docs: Vec::new(),
            num_found: 0,
            start: 0,
            rows: req.rows,
            query: req.query.clone(),
            filters: req.filters.clone(),
            facets: BTreeMap::new(),
            highlighting: BTreeMap::new(),
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimilarResult {
    pub docs: Vec<Doc>,
    pub num_found: usize,
    pub source_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResult {
    pub total_docs: u64,
    /// `ok` or `error`.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct SearchClient {
    http: reqwest::blocking::Client,
    select_url: String,
}

impl SearchClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            select_url: format!("{}/select", config.url.trim_end_matches('/')),
        })
    }

    /// One `/select` round trip, classified into [`BackendError`].
    fn select(&self, params: &Params) -> Result<SelectResponse, BackendError> {
        debug!(url = %self.select_url, ?params, "solr select");
        let resp = self.http.get(&self.select_url).query(params).send()?;
        let status = resp.status();
        let body = resp.text()?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.msg)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            return Err(BackendError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    pub fn search(&self, req: &SearchRequest) -> SearchResult {
        let params = query::compile_search(req);
        let resp = match self.select(&params) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, query = %req.query, "search failed");
                return SearchResult::failed(req, &e);
            }
        };

        let facets = if req.facets.is_empty() {
            BTreeMap::new()
        } else {
            solr::parse_facets(resp.facet_counts.as_ref())
        };
        let highlighting = if req.highlight {
            resp.highlighting
        } else {
            BTreeMap::new()
        };

        let mut docs = resp.response.docs;
        docs.truncate(req.rows);

        SearchResult {
            docs,
            num_found: resp.response.num_found,
            start: req.start,
            rows: req.rows,
            query: req.query.clone(),
            filters: req.filters.clone(),
            facets,
            highlighting,
            error: None,
        }
    }

    /// Documents similar to `doc_id`. Empty `fields` selects the default set.
    pub fn more_like_this(&self, doc_id: &str, fields: &[String], rows: usize) -> SimilarResult {
        let params = query::compile_more_like_this(doc_id, fields, rows);
        match self.select(&params) {
            Ok(resp) => {
                let mut docs = solr::parse_more_like_this(resp, doc_id);
                docs.truncate(rows);
                SimilarResult {
                    num_found: docs.len(),
                    docs,
                    source_id: doc_id.to_string(),
                    error: None,
                }
            }
            Err(e) => {
                warn!(error = %e, doc_id, "more-like-this failed");
                SimilarResult {
                    docs: Vec::new(),
                    num_found: 0,
                    source_id: doc_id.to_string(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// `None` when the document does not exist or the backend failed.
    pub fn get_by_id(&self, doc_id: &str) -> Option<Doc> {
        match self.select(&query::compile_get_by_id(doc_id)) {
            Ok(resp) => resp.response.docs.into_iter().next(),
            Err(e) => {
                warn!(error = %e, doc_id, "get by id failed");
                None
            }
        }
    }

    /// Distinct values of `field` across the collection, most frequent first.
    pub fn facet_values(&self, field: &str, limit: usize) -> Vec<FacetCount> {
        match self.select(&query::compile_facet_values(field, limit)) {
            Ok(resp) => solr::parse_facets(resp.facet_counts.as_ref())
                .remove(field)
                .unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, field, "facet values failed");
                Vec::new()
            }
        }
    }

    pub fn stats(&self) -> StatsResult {
        match self.select(&query::compile_stats()) {
            Ok(resp) => StatsResult {
                total_docs: resp.response.num_found,
                status: "ok".to_string(),
                error: None,
            },
            Err(e) => StatsResult {
                total_docs: 0,
                status: "error".to_string(),
                error: Some(e.to_string()),
            },
        }
    }
}

// ============ CLI entry points ============

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn fail(error: &str) -> ! {
    eprintln!("Error: {}", error);
    std::process::exit(1);
}

fn str_field<'a>(doc: &'a Doc, name: &str) -> Option<&'a str> {
    doc.get(name).and_then(|v| v.as_str())
}

fn list_field(doc: &Doc, name: &str) -> String {
    doc.get(name)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

fn print_doc_line(i: usize, doc: &Doc) {
    let title = str_field(doc, "title").unwrap_or("(untitled)");
    let year = doc
        .get("year")
        .and_then(|v| v.as_i64())
        .map(|y| format!(" ({})", y))
        .unwrap_or_default();
    let rating = doc
        .get("rating")
        .and_then(|v| v.as_f64())
        .map(|r| format!("[{:.1}] ", r))
        .unwrap_or_default();
    println!("{}. {}{}{}", i + 1, rating, title, year);

    let genres = list_field(doc, "genres");
    if !genres.is_empty() {
        println!("    genres: {}", genres);
    }
    let directors = list_field(doc, "directors");
    if !directors.is_empty() {
        println!("    directors: {}", directors);
    }
    if let Some(id) = str_field(doc, "id") {
        println!("    id: {}", id);
    }
}

pub fn run_search(config: &Config, req: &SearchRequest, json: bool) -> Result<()> {
    let client = SearchClient::new(&config.backend)?;
    let result = client.search(req);

    if let Some(ref err) = result.error {
        fail(err);
    }
    if json {
        return print_json(&result);
    }

    if result.docs.is_empty() {
        println!("No results.");
        return Ok(());
    }

    println!(
        "{} results (showing {}-{})",
        result.num_found,
        result.start + 1,
        result.start + result.docs.len()
    );
    println!();

    for (i, doc) in result.docs.iter().enumerate() {
        print_doc_line(result.start + i, doc);
        if let Some(fields) = str_field(doc, "id").and_then(|id| result.highlighting.get(id)) {
            for (field, fragments) in fields {
                for fragment in fragments {
                    println!("    {}: \"{}\"", field, fragment.replace('\n', " ").trim());
                }
            }
        }
        println!();
    }

    for (field, buckets) in &result.facets {
        println!("facet {}:", field);
        for b in buckets {
            println!("  {:<32} {:>6}", b.value, b.count);
        }
        println!();
    }

    Ok(())
}

pub fn run_similar(
    config: &Config,
    doc_id: &str,
    fields: &[String],
    rows: usize,
    json: bool,
) -> Result<()> {
    let client = SearchClient::new(&config.backend)?;
    let result = client.more_like_this(doc_id, fields, rows);

    if let Some(ref err) = result.error {
        fail(err);
    }
    if json {
        return print_json(&result);
    }

    if result.docs.is_empty() {
        println!("No similar movies for {}.", doc_id);
        return Ok(());
    }

    println!("Similar to {}:", doc_id);
    println!();
    for (i, doc) in result.docs.iter().enumerate() {
        print_doc_line(i, doc);
        println!();
    }
    Ok(())
}

pub fn run_get(config: &Config, doc_id: &str) -> Result<()> {
    let client = SearchClient::new(&config.backend)?;
    match client.get_by_id(doc_id) {
        Some(doc) => print_json(&doc),
        None => fail(&format!("document not found: {}", doc_id)),
    }
}

pub fn run_facets(config: &Config, field: &str, limit: usize) -> Result<()> {
    let client = SearchClient::new(&config.backend)?;
    let buckets = client.facet_values(field, limit);

    if buckets.is_empty() {
        println!("No values for {}.", field);
        return Ok(());
    }

    println!("{:<32} {:>6}", field.to_uppercase(), "COUNT");
    for b in &buckets {
        println!("{:<32} {:>6}", b.value, b.count);
    }
    Ok(())
}

pub fn run_stats(config: &Config) -> Result<()> {
    let client = SearchClient::new(&config.backend)?;
    let stats = client.stats();

    println!("reelsearch: Collection Stats");
    println!("============================");
    println!();
    println!("  Backend:     {}", config.backend.url);
    println!("  Status:      {}", stats.status);
    println!("  Documents:   {}", stats.total_docs);

    if let Some(ref err) = stats.error {
        println!();
        fail(err);
    }
    Ok(())
}
