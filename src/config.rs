//! TOML configuration for the reconciler and the search client.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) yields a working configuration pointed at a local Solr core and the
//! conventional `data/raw` → `data/solr/movies.json` layout.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Locations of the pre-fetched source datasets.
#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    #[serde(default = "default_sources_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_primary_file")]
    pub primary: String,
    #[serde(default = "default_enrichment_file")]
    pub enrichment: String,
    #[serde(default = "default_articles_file")]
    pub articles: String,
    #[serde(default = "default_fallback_file")]
    pub fallback: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            dir: default_sources_dir(),
            primary: default_primary_file(),
            enrichment: default_enrichment_file(),
            articles: default_articles_file(),
            fallback: default_fallback_file(),
        }
    }
}

impl SourcesConfig {
    pub fn primary_path(&self) -> PathBuf {
        self.dir.join(&self.primary)
    }
    pub fn enrichment_path(&self) -> PathBuf {
        self.dir.join(&self.enrichment)
    }
    pub fn articles_path(&self) -> PathBuf {
        self.dir.join(&self.articles)
    }
    pub fn fallback_path(&self) -> PathBuf {
        self.dir.join(&self.fallback)
    }
}

fn default_sources_dir() -> PathBuf {
    PathBuf::from("data/raw")
}
fn default_primary_file() -> String {
    "imdb_movies.json".to_string()
}
fn default_enrichment_file() -> String {
    "omdb_movies.json".to_string()
}
fn default_articles_file() -> String {
    "nyt_articles.json".to_string()
}
fn default_fallback_file() -> String {
    "rottentomatoes_movies.json".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("data/solr/movies.json")
}

/// Connection parameters for the Solr collection.
#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// Base URL of the collection, e.g. `http://localhost:8983/solr/movies`.
    #[serde(default = "default_backend_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_backend_url() -> String {
    "http://localhost:8983/solr/movies".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_rows")]
    pub rows: usize,
    #[serde(default = "default_similar_rows")]
    pub similar_rows: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            similar_rows: default_similar_rows(),
        }
    }
}

fn default_rows() -> usize {
    10
}
fn default_similar_rows() -> usize {
    5
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let url = config.backend.url.trim();
    if url.is_empty() {
        anyhow::bail!("backend.url must not be empty");
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!(
            "backend.url must be an http(s) URL, got '{}'",
            config.backend.url
        );
    }
    if config.backend.timeout_secs == 0 {
        anyhow::bail!("backend.timeout_secs must be > 0");
    }

    if config.search.rows == 0 {
        anyhow::bail!("search.rows must be >= 1");
    }
    if config.search.similar_rows == 0 {
        anyhow::bail!("search.similar_rows must be >= 1");
    }

    Ok(())
}
