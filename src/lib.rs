//! # reelsearch
//!
//! Multi-source movie catalog reconciliation and faceted search over Solr.
//!
//! reelsearch merges independently fetched datasets (a primary catalog,
//! a ratings source, a news-article source, and a fallback review source)
//! into one document per movie, and provides a query layer that compiles
//! search intents into Solr requests and parses the responses back into a
//! uniform result shape.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────┐   ┌─────────────┐
//! │ data/raw/*   │──▶│ Reconciler │──▶│ movies.json │──▶ index loader ──▶ Solr
//! └──────────────┘   └────────────┘   └─────────────┘                      │
//!                                                                          │
//!                    ┌──────────┐     ┌──────────────────┐                 │
//!                    │ reel CLI │◀───▶│   SearchClient   │◀────────────────┘
//!                    └──────────┘     │ compile / parse  │
//!                                     └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! reel merge                               # data/raw → data/solr/movies.json
//! reel search "mafia" --facet genres --filter genres=Crime --range year=1970..1979
//! reel similar tt0068646
//! reel facets directors --limit 50
//! reel stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Source records and the merged document |
//! | [`sources`] | Tolerant loading of source files |
//! | [`reconcile`] | Multi-source join and output |
//! | [`query`] | Search intent → Solr parameters |
//! | [`solr`] | Solr response shapes and parsers |
//! | [`search`] | Search client and CLI output |
//! | [`error`] | Backend error classification |

pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod reconcile;
pub mod search;
pub mod solr;
pub mod sources;
