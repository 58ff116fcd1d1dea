//! Query compilation: abstract search intent → Solr request parameters.
//!
//! The compiled form is an ordered list of `(name, value)` pairs so repeated
//! parameters (`fq`, `facet.field`) survive intact when encoded into the
//! request URL.
//!
//! Filters are always emitted as separate `fq` clauses, never folded into
//! `q`, so Solr can cache each one independently of the scored query.

use serde::Serialize;
use std::collections::BTreeMap;

/// Match-all query sentinel; passed through without field qualification.
pub const MATCH_ALL: &str = "*:*";
/// Catch-all field free text is searched against.
pub const TEXT_FIELD: &str = "text";

/// Stored fields returned for every search hit.
pub const RETURN_FIELDS: &str = "id,title,year,rating,genres,directors,cast,plot,plot_source,\
metascore,tomatometer,audience_score,score_source,poster,source,url,\
nyt_reviews_headlines,nyt_reviews_abstracts,nyt_reviews_snippets";

pub const FACET_MIN_COUNT: usize = 1;
pub const FACET_LIMIT: usize = 20;

/// Narrative fields eligible for highlighting. Structured fields are excluded.
pub const HIGHLIGHT_FIELDS: &str = "plot,nyt_reviews_abstracts,nyt_reviews_snippets";
pub const HIGHLIGHT_PRE: &str = "<mark>";
pub const HIGHLIGHT_POST: &str = "</mark>";
pub const HIGHLIGHT_FRAGSIZE: usize = 200;

pub const MLT_DEFAULT_FIELDS: &[&str] = &["text", "genres", "cast", "directors"];
pub const MLT_MIN_DF: usize = 1;
pub const MLT_MIN_TF: usize = 1;
pub const MLT_MIN_WORD_LEN: usize = 3;
pub const MLT_MAX_QUERY_TERMS: usize = 25;

pub const DEFAULT_ROWS: usize = 10;

/// Ordered request parameters.
pub type Params = Vec<(String, String)>;

/// Value side of a filter entry. Its shape selects the clause type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Single exact match.
    Exact(String),
    /// Any of the listed values (OR).
    AnyOf(Vec<String>),
    /// Inclusive `[low TO high]` range; `*` leaves a side open.
    Range(String, String),
}

impl FilterValue {
    pub fn range(low: impl ToString, high: impl ToString) -> Self {
        Self::Range(low.to_string(), high.to_string())
    }

    /// Parse `low..high`; an empty side becomes `*`.
    pub fn parse_range(s: &str) -> Option<Self> {
        let (low, high) = s.split_once("..")?;
        let side = |v: &str| {
            let v = v.trim();
            if v.is_empty() {
                "*".to_string()
            } else {
                v.to_string()
            }
        };
        Some(Self::Range(side(low), side(high)))
    }
}

/// Group repeated `field=value` pairs: one value is an exact match, several
/// become an OR-list. Ranges are added afterwards and win on conflict.
pub fn collect_filters(
    exact: &[(String, String)],
    ranges: &[(String, FilterValue)],
) -> BTreeMap<String, FilterValue> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (field, value) in exact {
        grouped.entry(field.clone()).or_default().push(value.clone());
    }

    let mut filters: BTreeMap<String, FilterValue> = grouped
        .into_iter()
        .map(|(field, mut values)| {
            let value = if values.len() == 1 {
                FilterValue::Exact(values.remove(0))
            } else {
                FilterValue::AnyOf(values)
            };
            (field, value)
        })
        .collect();

    for (field, range) in ranges {
        filters.insert(field.clone(), range.clone());
    }
    filters
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::Exact(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::Exact(v)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Exact(v.to_string())
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(v: Vec<&str>) -> Self {
        Self::AnyOf(v.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(v: Vec<String>) -> Self {
        Self::AnyOf(v)
    }
}

impl From<(i64, i64)> for FilterValue {
    fn from((low, high): (i64, i64)) -> Self {
        Self::range(low, high)
    }
}

/// What a caller wants from a search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub filters: BTreeMap<String, FilterValue>,
    pub facets: Vec<String>,
    /// Raw sort expression, e.g. `rating desc`.
    pub sort: Option<String>,
    pub start: usize,
    pub rows: usize,
    pub highlight: bool,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: MATCH_ALL.to_string(),
            filters: BTreeMap::new(),
            facets: Vec::new(),
            sort: None,
            start: 0,
            rows: DEFAULT_ROWS,
            highlight: false,
        }
    }
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn facet(mut self, field: impl Into<String>) -> Self {
        self.facets.push(field.into());
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn page(mut self, start: usize, rows: usize) -> Self {
        self.start = start;
        self.rows = rows;
        self
    }

    pub fn highlight(mut self, on: bool) -> Self {
        self.highlight = on;
        self
    }
}

fn push(params: &mut Params, name: &str, value: impl ToString) {
    params.push((name.to_string(), value.to_string()));
}

/// Free text → `text:(...)`; the match-all sentinel (or blank) passes through.
pub fn compile_query(query: &str) -> String {
    let q = query.trim();
    if q.is_empty() || q == MATCH_ALL {
        MATCH_ALL.to_string()
    } else {
        format!("{}:({})", TEXT_FIELD, q)
    }
}

/// Quote a value for an exact-match clause.
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn range_bound(bound: &str) -> String {
    let b = bound.trim();
    let plain = !b.is_empty()
        && b
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ':' | '*'));
    if plain {
        b.to_string()
    } else {
        quote(b)
    }
}

/// Compile one filter entry into an `fq` clause. An empty OR-list yields
/// no clause.
pub fn compile_filter(field: &str, value: &FilterValue) -> Option<String> {
    match value {
        FilterValue::Exact(v) => Some(format!("{}:{}", field, quote(v))),
        FilterValue::AnyOf(values) if values.is_empty() => None,
        FilterValue::AnyOf(values) => {
            let clauses: Vec<String> = values
                .iter()
                .map(|v| format!("{}:{}", field, quote(v)))
                .collect();
            Some(format!("({})", clauses.join(" OR ")))
        }
        FilterValue::Range(low, high) => Some(format!(
            "{}:[{} TO {}]",
            field,
            range_bound(low),
            range_bound(high)
        )),
    }
}

pub fn compile_search(req: &SearchRequest) -> Params {
    let mut params = Params::new();
    push(&mut params, "q", compile_query(&req.query));
    push(&mut params, "start", req.start);
    push(&mut params, "rows", req.rows);
    push(&mut params, "fl", RETURN_FIELDS);
    push(&mut params, "wt", "json");

    if let Some(sort) = req.sort.as_deref().filter(|s| !s.trim().is_empty()) {
        push(&mut params, "sort", sort.trim());
    }

    for (field, value) in &req.filters {
        if let Some(fq) = compile_filter(field, value) {
            push(&mut params, "fq", fq);
        }
    }

    if !req.facets.is_empty() {
        push_facet_params(&mut params, &req.facets, FACET_LIMIT);
    }

    if req.highlight {
        push(&mut params, "hl", "true");
        push(&mut params, "hl.fl", HIGHLIGHT_FIELDS);
        push(&mut params, "hl.simple.pre", HIGHLIGHT_PRE);
        push(&mut params, "hl.simple.post", HIGHLIGHT_POST);
        push(&mut params, "hl.fragsize", HIGHLIGHT_FRAGSIZE);
    }

    params
}

fn push_facet_params(params: &mut Params, fields: &[String], limit: usize) {
    push(params, "facet", "true");
    for field in fields {
        push(params, "facet.field", field);
    }
    push(params, "facet.mincount", FACET_MIN_COUNT);
    push(params, "facet.limit", limit);
}

/// Similarity query for one source document. `fields` overrides the default
/// field set when non-empty.
pub fn compile_more_like_this(doc_id: &str, fields: &[String], rows: usize) -> Params {
    let mlt_fields = if fields.is_empty() {
        MLT_DEFAULT_FIELDS.join(",")
    } else {
        fields.join(",")
    };

    let mut params = Params::new();
    push(&mut params, "q", format!("id:{}", quote(doc_id)));
    push(&mut params, "mlt", "true");
    push(&mut params, "mlt.fl", mlt_fields);
    push(&mut params, "mlt.mindf", MLT_MIN_DF);
    push(&mut params, "mlt.mintf", MLT_MIN_TF);
    push(&mut params, "mlt.minwl", MLT_MIN_WORD_LEN);
    push(&mut params, "mlt.maxqt", MLT_MAX_QUERY_TERMS);
    push(&mut params, "mlt.count", rows);
    push(&mut params, "fl", RETURN_FIELDS);
    push(&mut params, "wt", "json");
    params
}

pub fn compile_get_by_id(doc_id: &str) -> Params {
    let mut params = Params::new();
    push(&mut params, "q", format!("id:{}", quote(doc_id)));
    push(&mut params, "rows", 1);
    push(&mut params, "wt", "json");
    params
}

/// Facet-only request over the whole collection.
pub fn compile_facet_values(field: &str, limit: usize) -> Params {
    let mut params = Params::new();
    push(&mut params, "q", MATCH_ALL);
    push(&mut params, "rows", 0);
    push(&mut params, "wt", "json");
    push_facet_params(&mut params, &[field.to_string()], limit);
    params
}

pub fn compile_stats() -> Params {
    let mut params = Params::new();
    push(&mut params, "q", MATCH_ALL);
    push(&mut params, "rows", 0);
    push(&mut params, "wt", "json");
    params
}
