//! # reelsearch CLI (`reel`)
//!
//! Builds the merged movie catalog and queries it through Solr.
//!
//! ## Usage
//!
//! ```bash
//! reel [--config ./config/reel.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `reel merge` | Reconcile the raw source files into the merged document file |
//! | `reel search "<query>"` | Faceted, filtered search |
//! | `reel similar <id>` | Movies similar to a given one |
//! | `reel get <id>` | Print one stored document |
//! | `reel facets <field>` | Distinct values of a field with counts |
//! | `reel stats` | Collection document count |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`
//! (default `reelsearch=info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reelsearch::config::{self, Config};
use reelsearch::query::{self, FilterValue, SearchRequest};
use reelsearch::{reconcile, search};

/// reelsearch: multi-source movie catalog reconciliation and faceted search.
#[derive(Parser)]
#[command(name = "reel", version, about)]
struct Cli {
    /// Path to a TOML configuration file. Built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge the raw source datasets into one document file.
    ///
    /// Reads the primary, enrichment, article and fallback files from
    /// `[sources].dir` and writes `[output].path`. Missing sources are
    /// skipped with a warning.
    Merge,

    /// Search the collection.
    Search {
        /// Free-text query. `*:*` matches everything.
        #[arg(default_value = "*:*")]
        query: String,

        /// Exact-match filter `field=value`. Repeat a field to OR its values.
        #[arg(long = "filter", value_parser = parse_key_val)]
        filters: Vec<(String, String)>,

        /// Inclusive range filter `field=low..high` (either side may be empty).
        #[arg(long = "range", value_parser = parse_range)]
        ranges: Vec<(String, FilterValue)>,

        /// Field to facet on. Repeatable.
        #[arg(long = "facet")]
        facets: Vec<String>,

        /// Sort expression, e.g. `rating desc`.
        #[arg(long)]
        sort: Option<String>,

        #[arg(long, default_value_t = 0)]
        start: usize,

        /// Page size. Defaults to `[search].rows`.
        #[arg(long)]
        rows: Option<usize>,

        /// Return highlighted fragments from narrative fields.
        #[arg(long)]
        highlight: bool,

        /// Print the raw result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Find movies similar to the given document id.
    Similar {
        id: String,

        /// Field to compare on. Repeatable; defaults to text, genres, cast, directors.
        #[arg(long = "field")]
        fields: Vec<String>,

        /// Defaults to `[search].similar_rows`.
        #[arg(long)]
        rows: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Print a stored document as JSON.
    Get { id: String },

    /// List the values of a facet field with counts.
    Facets {
        field: String,

        #[arg(long, default_value_t = query::FACET_LIMIT)]
        limit: usize,
    },

    /// Show collection statistics.
    Stats,
}

/// Parse a `key=value` pair.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid FIELD=VALUE: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

/// Parse a `field=low..high` range.
fn parse_range(s: &str) -> Result<(String, FilterValue), String> {
    let (field, range) = parse_key_val(s)?;
    let value = FilterValue::parse_range(&range)
        .ok_or_else(|| format!("invalid range '{}': expected LOW..HIGH", range))?;
    Ok((field, value))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reelsearch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => {
            debug!("no --config given, using defaults");
            Config::default()
        }
    };

    match cli.command {
        Commands::Merge => {
            reconcile::run_merge(&cfg)?;
        }
        Commands::Search {
            query: text,
            filters,
            ranges,
            facets,
            sort,
            start,
            rows,
            highlight,
            json,
        } => {
            let req = SearchRequest {
                query: text,
                filters: query::collect_filters(&filters, &ranges),
                facets,
                sort,
                start,
                rows: rows.unwrap_or(cfg.search.rows),
                highlight,
            };
            search::run_search(&cfg, &req, json)?;
        }
        Commands::Similar {
            id,
            fields,
            rows,
            json,
        } => {
            let rows = rows.unwrap_or(cfg.search.similar_rows);
            search::run_similar(&cfg, &id, &fields, rows, json)?;
        }
        Commands::Get { id } => {
            search::run_get(&cfg, &id)?;
        }
        Commands::Facets { field, limit } => {
            search::run_facets(&cfg, &field, limit)?;
        }
        Commands::Stats => {
            search::run_stats(&cfg)?;
        }
    }

    Ok(())
}
