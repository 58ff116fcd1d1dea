//! Multi-source record reconciliation.
//!
//! Joins the primary catalog with the enrichment, article, and fallback
//! datasets into one [`MovieDocument`] per primary identifier:
//!
//! ```text
//! primary (tconst) ──┬── enrichment (imdb_id, 1:1)      → scores, poster, plot override
//!                    ├── articles   (imdb_id, 1:many)   → review headline/abstract/snippet lists
//!                    └── fallback   (title+year key)    → scores, only without enrichment
//! ```
//!
//! Identifier-keyed and title/year-keyed indexes are kept in separate maps
//! with separate key types, so a join can never cross key spaces.
//!
//! Output order follows primary-source insertion order, which makes two runs
//! over unchanged inputs byte-identical.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::config::Config;
use crate::models::{
    ArticleRecord, EnrichmentRecord, FallbackRecord, MovieDocument, PrimaryRecord,
    RESERVED_FIELDS, SOURCE_ARTICLES, SOURCE_ENRICHMENT, SOURCE_FALLBACK, SOURCE_PRIMARY,
};
use crate::sources::{self, SourceSet};

/// Composite join key: lowercased title plus release year.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TitleYearKey(String);

impl TitleYearKey {
    pub fn new(title: &str, year: i32) -> Self {
        Self(format!("{}_{}", title.to_lowercase(), year))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Per-source counts for one run. Zero means "no contribution".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeCounts {
    pub primary: usize,
    pub primary_dropped: usize,
    pub enrichment: usize,
    pub article_groups: usize,
    pub articles: usize,
    pub fallback: usize,
}

/// Source indexes for one reconciliation run.
#[derive(Debug, Default)]
pub struct Reconciler {
    primary_order: Vec<String>,
    primary: HashMap<String, PrimaryRecord>,
    primary_dropped: usize,
    enrichment: HashMap<String, EnrichmentRecord>,
    articles: HashMap<String, Vec<ArticleRecord>>,
    article_count: usize,
    fallback: HashMap<TitleYearKey, FallbackRecord>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build all indexes from loaded source files.
    pub fn from_sources(set: SourceSet) -> Self {
        let mut r = Self::new();
        for rec in set.primary.records {
            r.add_primary(rec);
        }
        for rec in set.enrichment.records {
            r.add_enrichment(rec);
        }
        for rec in set.articles.records {
            r.add_article(rec);
        }
        for rec in set.fallback.records {
            r.add_fallback(rec);
        }
        r
    }

    /// Index a primary record. Returns `false` when it has no identifier.
    ///
    /// A repeated identifier replaces the earlier record but keeps its
    /// position in the output order.
    pub fn add_primary(&mut self, record: PrimaryRecord) -> bool {
        let id = match record_id(record.tconst.as_deref()) {
            Some(id) => id.to_string(),
            None => {
                warn!(
                    title = record.title.as_deref().unwrap_or("(untitled)"),
                    "dropping primary record without tconst"
                );
                self.primary_dropped += 1;
                return false;
            }
        };

        if self.primary.insert(id.clone(), record).is_none() {
            self.primary_order.push(id);
        }
        true
    }

    /// Last write wins for a repeated identifier.
    pub fn add_enrichment(&mut self, record: EnrichmentRecord) {
        if let Some(id) = record_id(record.imdb_id.as_deref()) {
            self.enrichment.insert(id.to_string(), record);
        }
    }

    pub fn add_article(&mut self, record: ArticleRecord) {
        if let Some(id) = record_id(record.imdb_id.as_deref()) {
            self.articles.entry(id.to_string()).or_default().push(record);
            self.article_count += 1;
        }
    }

    pub fn add_fallback(&mut self, record: FallbackRecord) {
        let key = TitleYearKey::new(&record.title, record.year);
        self.fallback.insert(key, record);
    }

    pub fn counts(&self) -> MergeCounts {
        MergeCounts {
            primary: self.primary_order.len(),
            primary_dropped: self.primary_dropped,
            enrichment: self.enrichment.len(),
            article_groups: self.articles.len(),
            articles: self.article_count,
            fallback: self.fallback.len(),
        }
    }

    /// Produce one merged document per primary identifier, in insertion order.
    pub fn merge(&self) -> Vec<MovieDocument> {
        self.primary_order
            .iter()
            .filter_map(|id| self.primary.get(id).map(|rec| self.merge_one(id, rec)))
            .collect()
    }

    fn merge_one(&self, id: &str, record: &PrimaryRecord) -> MovieDocument {
        let mut extra = record.extra.clone();
        extra.retain(|k, _| !RESERVED_FIELDS.contains(&k.as_str()));

        let mut doc = MovieDocument {
            id: id.to_string(),
            title: record.title.clone(),
            year: record.year,
            cast: record.cast.clone(),
            directors: record.directors.clone(),
            genres: record.genres.clone(),
            plot: record.plot.clone(),
            rating: record.rating,
            source: vec![SOURCE_PRIMARY.to_string()],
            plot_source: non_empty(record.plot.as_deref()).map(|_| SOURCE_PRIMARY.to_string()),
            metascore: None,
            tomatometer: None,
            audience_score: None,
            score_source: None,
            poster: None,
            nyt_reviews_headlines: Vec::new(),
            nyt_reviews_abstracts: Vec::new(),
            nyt_reviews_snippets: Vec::new(),
            extra,
        };

        if let Some(enr) = self.enrichment.get(id) {
            doc.metascore = enr.metascore;
            doc.tomatometer = enr.tomatometer;
            doc.poster = enr.poster.clone();
            doc.score_source = Some(SOURCE_ENRICHMENT.to_string());
            if let Some(plot) = non_empty(enr.plot.as_deref()) {
                doc.plot = Some(plot.to_string());
                doc.plot_source = Some(SOURCE_ENRICHMENT.to_string());
            }
            doc.source.push(SOURCE_ENRICHMENT.to_string());
        } else if let Some(fb) = self.fallback_for(record) {
            doc.tomatometer = fb.tomatometer;
            doc.audience_score = fb.audience_score;
            doc.score_source = Some(SOURCE_FALLBACK.to_string());
        }

        if let Some(articles) = self.articles.get(id) {
            doc.nyt_reviews_headlines = collect_field(articles, |a| a.headline.as_deref());
            doc.nyt_reviews_abstracts = collect_field(articles, |a| a.abstract_text.as_deref());
            doc.nyt_reviews_snippets = collect_field(articles, |a| a.snippet.as_deref());
            doc.source.push(SOURCE_ARTICLES.to_string());
        }

        doc
    }

    fn fallback_for(&self, record: &PrimaryRecord) -> Option<&FallbackRecord> {
        let title = record.title.as_deref()?;
        let year = record.year?;
        self.fallback.get(&TitleYearKey::new(title, year))
    }
}

/// Convenience wrapper: index all four collections and merge.
pub fn reconcile(
    primary: Vec<PrimaryRecord>,
    enrichment: Vec<EnrichmentRecord>,
    articles: Vec<ArticleRecord>,
    fallback: Vec<FallbackRecord>,
) -> Vec<MovieDocument> {
    let mut r = Reconciler::new();
    primary.into_iter().for_each(|rec| {
        r.add_primary(rec);
    });
    enrichment.into_iter().for_each(|rec| r.add_enrichment(rec));
    articles.into_iter().for_each(|rec| r.add_article(rec));
    fallback.into_iter().for_each(|rec| r.add_fallback(rec));
    r.merge()
}

/// Identifiers are compared trimmed in every source.
fn record_id(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|v| !v.is_empty())
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.is_empty())
}

fn collect_field<F>(articles: &[ArticleRecord], field: F) -> Vec<String>
where
    F: Fn(&ArticleRecord) -> Option<&str>,
{
    articles
        .iter()
        .filter_map(|a| non_empty(field(a)))
        .map(str::to_string)
        .collect()
}

/// Write the merged documents as a pretty-printed JSON array.
///
/// Returns the SHA-256 hex digest of the bytes written, or `None` (and writes
/// nothing) when there are no documents.
pub fn save_documents(docs: &[MovieDocument], path: &Path) -> Result<Option<String>> {
    if docs.is_empty() {
        warn!("No data to save.");
        return Ok(None);
    }

    let json = serde_json::to_string_pretty(docs)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }
    std::fs::write(path, &json)
        .with_context(|| format!("Failed to write merged data: {}", path.display()))?;

    let digest = format!("{:x}", Sha256::digest(json.as_bytes()));
    info!(path = %path.display(), documents = docs.len(), "saved merged data");
    Ok(Some(digest))
}

/// CLI entry point for `reel merge`.
pub fn run_merge(config: &Config) -> Result<()> {
    let set = sources::load_sources(&config.sources);
    let reconciler = Reconciler::from_sources(set);
    let counts = reconciler.counts();
    info!(
        primary = counts.primary,
        enrichment = counts.enrichment,
        article_groups = counts.article_groups,
        fallback = counts.fallback,
        "loaded sources"
    );

    let docs = reconciler.merge();

    println!("merge");
    println!(
        "  primary: {} movies ({} dropped without id)",
        counts.primary, counts.primary_dropped
    );
    println!("  enrichment: {} records", counts.enrichment);
    println!(
        "  articles: {} articles for {} movies",
        counts.articles, counts.article_groups
    );
    println!("  fallback: {} records", counts.fallback);
    println!("  merged documents: {}", docs.len());

    match save_documents(&docs, &config.output.path)? {
        Some(digest) => {
            println!("  output: {}", config.output.path.display());
            println!("  sha256: {}", digest);
            println!("ok");
        }
        None => {
            println!("No data to save.");
        }
    }

    Ok(())
}
