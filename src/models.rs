//! Core data models used throughout reelsearch.
//!
//! Source records mirror what each upstream fetcher writes to `data/raw`;
//! [`MovieDocument`] is the reconciled shape written for indexing.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Provenance tag for the primary catalog (IMDb).
pub const SOURCE_PRIMARY: &str = "imdb";
/// Provenance tag for the ratings/enrichment source (OMDb).
pub const SOURCE_ENRICHMENT: &str = "omdb";
/// Provenance tag for the news-article source (NYT).
pub const SOURCE_ARTICLES: &str = "nyt";
/// Provenance tag for the fallback review source (Rotten Tomatoes sample).
pub const SOURCE_FALLBACK: &str = "rottentomatoes";

/// A search-backend document as returned by the backend: field name → value.
pub type Doc = Map<String, Value>;

/// Primary catalog record. `tconst` is the entity identifier.
///
/// Built from the raw JSON object so that a record with a usable identifier
/// is never rejected over one oddly typed field. Values that cannot be
/// converted stay in `extra` under their original key.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct PrimaryRecord {
    pub tconst: Option<String>,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub cast: Vec<String>,
    pub directors: Vec<String>,
    pub genres: Vec<String>,
    pub plot: Option<String>,
    pub rating: Option<f64>,
    /// Anything else the fetcher emitted (`url`, `num_votes`, ...).
    pub extra: Map<String, Value>,
}

impl From<Map<String, Value>> for PrimaryRecord {
    fn from(mut extra: Map<String, Value>) -> Self {
        let tconst = match extra.remove("tconst") {
            Some(Value::String(s)) => Some(s),
            Some(other) => {
                extra.insert("tconst".to_string(), other);
                None
            }
            None => None,
        };
        Self {
            tconst,
            title: take(&mut extra, "title", string_value),
            year: take(&mut extra, "year", year_value),
            cast: take(&mut extra, "cast", string_list).unwrap_or_default(),
            directors: take(&mut extra, "directors", string_list).unwrap_or_default(),
            genres: take(&mut extra, "genres", string_list).unwrap_or_default(),
            plot: take(&mut extra, "plot", string_value),
            rating: take(&mut extra, "rating", float_value),
            extra,
        }
    }
}

/// Remove `key` and convert it. Null counts as absent; an unconvertible
/// value is put back.
fn take<T>(
    map: &mut Map<String, Value>,
    key: &str,
    convert: fn(&Value) -> Option<T>,
) -> Option<T> {
    let value = map.remove(key)?;
    if value.is_null() {
        return None;
    }
    let converted = convert(&value);
    if converted.is_none() {
        map.insert(key.to_string(), value);
    }
    converted
}

/// Ratings/enrichment record, keyed by the same identifier as the primary
/// catalog but under `imdb_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub imdb_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub metascore: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub tomatometer: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub poster: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub plot: Option<String>,
}

/// News article about a movie. Several may exist per identifier.
#[derive(Debug, Clone, Deserialize)]
pub struct ArticleRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub imdb_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub headline: Option<String>,
    #[serde(default, rename = "abstract", deserialize_with = "lenient_string")]
    pub abstract_text: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub snippet: Option<String>,
}

/// Fallback review record. Carries no identifier; joined by title and year.
#[derive(Debug, Clone, Deserialize)]
pub struct FallbackRecord {
    pub title: String,
    #[serde(deserialize_with = "required_year")]
    pub year: i32,
    #[serde(default, deserialize_with = "lenient_int")]
    pub tomatometer: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub audience_score: Option<i64>,
}

/// Reconciled movie document, one per primary identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieDocument {
    pub id: String,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub cast: Vec<String>,
    pub directors: Vec<String>,
    pub genres: Vec<String>,
    pub plot: Option<String>,
    pub rating: Option<f64>,
    /// Contributing sources, primary tag first.
    pub source: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metascore: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tomatometer: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience_score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nyt_reviews_headlines: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nyt_reviews_abstracts: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nyt_reviews_snippets: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Keys owned by [`MovieDocument`]; passthrough fields with these names are
/// discarded so the flattened output never carries duplicate keys.
pub const RESERVED_FIELDS: &[&str] = &[
    "id",
    "tconst",
    "title",
    "year",
    "cast",
    "directors",
    "genres",
    "plot",
    "rating",
    "source",
    "plot_source",
    "metascore",
    "tomatometer",
    "audience_score",
    "score_source",
    "poster",
    "nyt_reviews_headlines",
    "nyt_reviews_abstracts",
    "nyt_reviews_snippets",
];

// Value conversions shared by the source record types. Scrapers are loose
// about types: years arrive as strings, scores as floats, lists as a single
// comma-separated string.

fn string_value(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Integers, integral floats, and numeric strings.
fn int_value(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn year_value(v: &Value) -> Option<i32> {
    int_value(v).and_then(|n| i32::try_from(n).ok())
}

fn float_value(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Arrays keep their scalar items; a bare string is split on commas.
fn string_list(v: &Value) -> Option<Vec<String>> {
    match v {
        Value::Array(items) => Some(items.iter().filter_map(string_value).collect()),
        Value::String(s) => Some(
            s.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(string_value(&Value::deserialize(deserializer)?))
}

fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(int_value(&Value::deserialize(deserializer)?))
}

fn required_year<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    year_value(&value).ok_or_else(|| D::Error::custom(format!("invalid year: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_primary_record_keeps_unknown_fields() {
        let rec: PrimaryRecord = serde_json::from_value(json!({
            "tconst": "tt0068646",
            "title": "The Godfather",
            "year": 1972,
            "genres": null,
            "url": "https://www.imdb.com/title/tt0068646/"
        }))
        .unwrap();
        assert_eq!(rec.tconst.as_deref(), Some("tt0068646"));
        assert!(rec.genres.is_empty());
        assert!(rec.cast.is_empty());
        assert_eq!(
            rec.extra.get("url"),
            Some(&json!("https://www.imdb.com/title/tt0068646/"))
        );
        assert!(!rec.extra.contains_key("tconst"));
    }

    #[test]
    fn test_article_abstract_rename() {
        let rec: ArticleRecord = serde_json::from_value(json!({
            "imdb_id": "tt1",
            "abstract": "A1"
        }))
        .unwrap();
        assert_eq!(rec.abstract_text.as_deref(), Some("A1"));
        assert!(rec.headline.is_none());
    }

    #[test]
    fn test_fallback_requires_title_and_year() {
        let res: Result<FallbackRecord, _> =
            serde_json::from_value(json!({ "title": "Heat", "tomatometer": 88 }));
        assert!(res.is_err());
    }

    #[test]
    fn test_primary_record_tolerates_loose_types() {
        let rec: PrimaryRecord = serde_json::from_value(json!({
            "tconst": "tt0068646",
            "title": "The Godfather",
            "year": "1972",
            "genres": "Crime, Drama",
            "cast": ["Marlon Brando", null, "Al Pacino"],
            "rating": "9.2",
            "plot": {"text": "nested"}
        }))
        .unwrap();
        assert_eq!(rec.year, Some(1972));
        assert_eq!(rec.genres, vec!["Crime", "Drama"]);
        assert_eq!(rec.cast, vec!["Marlon Brando", "Al Pacino"]);
        assert_eq!(rec.rating, Some(9.2));
        assert!(rec.plot.is_none());
        assert_eq!(rec.extra.get("plot"), Some(&json!({"text": "nested"})));
    }

    #[test]
    fn test_primary_record_non_string_tconst_is_missing() {
        let rec: PrimaryRecord =
            serde_json::from_value(json!({ "tconst": 68646, "title": "X" })).unwrap();
        assert!(rec.tconst.is_none());
        assert_eq!(rec.title.as_deref(), Some("X"));
    }

    #[test]
    fn test_enrichment_record_tolerates_loose_types() {
        let rec: EnrichmentRecord = serde_json::from_value(json!({
            "imdb_id": "tt4",
            "metascore": 7.5,
            "tomatometer": "91",
            "plot": "Better plot"
        }))
        .unwrap();
        assert_eq!(rec.imdb_id.as_deref(), Some("tt4"));
        assert!(rec.metascore.is_none());
        assert_eq!(rec.tomatometer, Some(91));
        assert_eq!(rec.plot.as_deref(), Some("Better plot"));
    }

    #[test]
    fn test_fallback_year_as_string() {
        let rec: FallbackRecord =
            serde_json::from_value(json!({ "title": "Heat", "year": "1995" })).unwrap();
        assert_eq!(rec.year, 1995);
        let res: Result<FallbackRecord, _> =
            serde_json::from_value(json!({ "title": "Heat", "year": "n/a" }));
        assert!(res.is_err());
    }

    #[test]
    fn test_document_omits_absent_enrichment() {
        let doc = MovieDocument {
            id: "tt1".to_string(),
            title: Some("T".to_string()),
            year: Some(1999),
            cast: vec![],
            directors: vec![],
            genres: vec![],
            plot: None,
            rating: None,
            source: vec![SOURCE_PRIMARY.to_string()],
            plot_source: None,
            metascore: None,
            tomatometer: None,
            audience_score: None,
            score_source: None,
            poster: None,
            nyt_reviews_headlines: vec![],
            nyt_reviews_abstracts: vec![],
            nyt_reviews_snippets: vec![],
            extra: Map::new(),
        };
        let v = serde_json::to_value(&doc).unwrap();
        let obj = v.as_object().unwrap();
        assert!(obj.contains_key("plot"));
        assert!(!obj.contains_key("metascore"));
        assert!(!obj.contains_key("nyt_reviews_headlines"));
        assert!(!obj.contains_key("tconst"));
    }
}
