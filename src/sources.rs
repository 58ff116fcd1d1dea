//! Loading of the pre-fetched source datasets.
//!
//! Each source is a JSON array of objects on disk. A missing file, unreadable
//! file, or malformed document degrades that source to "no contribution";
//! a single record of the wrong shape is skipped. Neither is fatal.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

use crate::config::SourcesConfig;
use crate::models::{ArticleRecord, EnrichmentRecord, FallbackRecord, PrimaryRecord};

/// How a single source file fared during loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Loaded,
    Missing,
    Unreadable,
}

/// Records parsed from one source file, plus what was skipped.
#[derive(Debug, Clone)]
pub struct SourceLoad<T> {
    pub records: Vec<T>,
    pub skipped: usize,
    pub status: LoadStatus,
}

impl<T> SourceLoad<T> {
    pub fn empty(status: LoadStatus) -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
            status,
        }
    }
}

/// The four datasets feeding one reconciliation run.
#[derive(Debug, Clone)]
pub struct SourceSet {
    pub primary: SourceLoad<PrimaryRecord>,
    pub enrichment: SourceLoad<EnrichmentRecord>,
    pub articles: SourceLoad<ArticleRecord>,
    pub fallback: SourceLoad<FallbackRecord>,
}

pub fn load_sources(config: &SourcesConfig) -> SourceSet {
    SourceSet {
        primary: load_records(&config.primary_path()),
        enrichment: load_records(&config.enrichment_path()),
        articles: load_records(&config.articles_path()),
        fallback: load_records(&config.fallback_path()),
    }
}

/// Load a JSON array of records from `path`, never failing.
pub fn load_records<T: DeserializeOwned>(path: &Path) -> SourceLoad<T> {
    if !path.exists() {
        warn!(path = %path.display(), "source file not found, skipping");
        return SourceLoad::empty(LoadStatus::Missing);
    }

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read source file");
            return SourceLoad::empty(LoadStatus::Unreadable);
        }
    };

    let values: Vec<Value> = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "source file is not a JSON array");
            return SourceLoad::empty(LoadStatus::Unreadable);
        }
    };

    let mut load = SourceLoad::empty(LoadStatus::Loaded);
    for (i, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<T>(value) {
            Ok(rec) => load.records.push(rec),
            Err(e) => {
                debug!(path = %path.display(), index = i, error = %e, "skipping malformed record");
                load.skipped += 1;
            }
        }
    }

    if load.skipped > 0 {
        warn!(
            path = %path.display(),
            skipped = load.skipped,
            "skipped records that did not match the expected shape"
        );
    }

    load
}
