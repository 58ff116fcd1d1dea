//! Solr response shapes and the parsers that turn them into uniform results.
//!
//! Each backend operation has an explicit response type validated by serde at
//! the boundary. Only the `response` block is required. The optional sections
//! are decoded piece by piece: an absent or malformed facet field,
//! highlighting entry, or more-like-this entry produces empty output for that
//! piece and leaves the rest of the response intact.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

use crate::models::Doc;

/// Field → fragments, per document id.
pub type Highlighting = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Top-level body of a `/select` response.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectResponse {
    pub response: DocList,
    #[serde(default, deserialize_with = "lenient")]
    pub facet_counts: Option<FacetCounts>,
    #[serde(default, deserialize_with = "lenient_highlighting")]
    pub highlighting: Highlighting,
    /// Raw entries per source id; see [`parse_more_like_this`].
    #[serde(default, rename = "moreLikeThis", deserialize_with = "object_or_empty")]
    pub more_like_this: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocList {
    #[serde(rename = "numFound")]
    pub num_found: u64,
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub docs: Vec<Doc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FacetCounts {
    /// Flat `[value, count, ...]` arrays per field, or `{value: count}`
    /// objects when the backend was asked for `json.nl=map`.
    #[serde(default, deserialize_with = "object_or_empty")]
    pub facet_fields: BTreeMap<String, Value>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    Ok(serde_json::from_value(Value::deserialize(deserializer)?).ok())
}

fn object_or_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Object(map) => Ok(map.into_iter().collect()),
        _ => Ok(BTreeMap::new()),
    }
}

/// Per-document highlighting; entries that are not `field → [fragment]`
/// maps are dropped.
fn lenient_highlighting<'de, D>(deserializer: D) -> Result<Highlighting, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(object_or_empty(deserializer)?
        .into_iter()
        .filter_map(|(id, fields)| serde_json::from_value(fields).ok().map(|f| (id, f)))
        .collect())
}

/// Similar documents for one source id. Newer Solr versions return a doc
/// list object; older response writers return a bare array of documents.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MltEntry {
    List(DocList),
    Docs(Vec<Doc>),
}

impl MltEntry {
    pub fn into_docs(self) -> Vec<Doc> {
        match self {
            MltEntry::List(list) => list.docs,
            MltEntry::Docs(docs) => docs,
        }
    }
}

/// Error body Solr sends with non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub msg: Option<String>,
}

/// One facet bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetCount {
    pub value: String,
    pub count: u64,
}

/// Pair up a flat facet array positionally. A trailing unpaired value, or a
/// pair whose count is not a non-negative integer, is skipped.
pub fn parse_facet_list(values: &[Value]) -> Vec<FacetCount> {
    values
        .chunks_exact(2)
        .filter_map(|pair| {
            let count = pair[1].as_u64()?;
            let value = match &pair[0] {
                Value::String(s) => s.clone(),
                Value::Null => return None,
                other => other.to_string(),
            };
            Some(FacetCount { value, count })
        })
        .collect()
}

/// Buckets from the `json.nl=map` shape, most frequent first.
pub fn parse_facet_map(values: &Map<String, Value>) -> Vec<FacetCount> {
    let mut buckets: Vec<FacetCount> = values
        .iter()
        .filter_map(|(value, count)| {
            Some(FacetCount {
                value: value.clone(),
                count: count.as_u64()?,
            })
        })
        .collect();
    buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    buckets
}

/// Buckets per facet field. A field in neither known shape yields an empty
/// list.
pub fn parse_facets(counts: Option<&FacetCounts>) -> BTreeMap<String, Vec<FacetCount>> {
    let Some(counts) = counts else {
        return BTreeMap::new();
    };
    counts
        .facet_fields
        .iter()
        .map(|(field, values)| {
            let buckets = match values {
                Value::Array(list) => parse_facet_list(list),
                Value::Object(map) => parse_facet_map(map),
                _ => {
                    warn!(field = %field, "unrecognised facet shape");
                    Vec::new()
                }
            };
            (field.clone(), buckets)
        })
        .collect()
}

/// Similar documents for `source_id`; empty when the key is absent or its
/// entry is in neither known shape. Other entries are never inspected.
pub fn parse_more_like_this(mut resp: SelectResponse, source_id: &str) -> Vec<Doc> {
    let Some(entry) = resp.more_like_this.remove(source_id) else {
        return Vec::new();
    };
    match serde_json::from_value::<MltEntry>(entry) {
        Ok(entry) => entry.into_docs(),
        Err(e) => {
            warn!(source_id, error = %e, "unrecognised more-like-this entry");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn select(v: Value) -> SelectResponse {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_facet_pairs() {
        let parsed = parse_facet_list(&[json!("Drama"), json!(10), json!("Comedy"), json!(3)]);
        assert_eq!(
            parsed,
            vec![
                FacetCount { value: "Drama".into(), count: 10 },
                FacetCount { value: "Comedy".into(), count: 3 },
            ]
        );
        let as_json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(
            as_json,
            json!([{"value": "Drama", "count": 10}, {"value": "Comedy", "count": 3}])
        );
    }

    #[test]
    fn test_facet_trailing_value_dropped() {
        let parsed = parse_facet_list(&[json!("Drama"), json!(10), json!("Comedy")]);
        assert_eq!(parsed, vec![FacetCount { value: "Drama".into(), count: 10 }]);
    }

    #[test]
    fn test_facet_bad_count_skipped() {
        let parsed = parse_facet_list(&[json!("Drama"), json!("ten"), json!(1994), json!(2)]);
        assert_eq!(parsed, vec![FacetCount { value: "1994".into(), count: 2 }]);
    }

    #[test]
    fn test_facet_empty() {
        assert!(parse_facet_list(&[]).is_empty());
        assert!(parse_facets(None).is_empty());
    }

    #[test]
    fn test_select_response_minimal() {
        let resp = select(json!({
            "responseHeader": {"status": 0, "QTime": 1},
            "response": {"numFound": 42, "start": 0, "docs": [{"id": "tt1"}]}
        }));
        assert_eq!(resp.response.num_found, 42);
        assert_eq!(resp.response.docs.len(), 1);
        assert!(resp.facet_counts.is_none());
        assert!(resp.highlighting.is_empty());
        assert!(resp.more_like_this.is_empty());
    }

    #[test]
    fn test_select_response_with_facets_and_highlighting() {
        let resp = select(json!({
            "response": {"numFound": 2, "docs": []},
            "facet_counts": {
                "facet_queries": {},
                "facet_fields": {"genres": ["Drama", 2, "Crime", 1]}
            },
            "highlighting": {
                "tt1": {"plot": ["a <mark>mob</mark> boss"]},
                "tt2": {}
            }
        }));
        let facets = parse_facets(resp.facet_counts.as_ref());
        assert_eq!(facets["genres"].len(), 2);
        assert_eq!(resp.highlighting["tt1"]["plot"][0], "a <mark>mob</mark> boss");
        assert!(resp.highlighting["tt2"].is_empty());
    }

    #[test]
    fn test_mlt_doc_list_form() {
        let resp = select(json!({
            "response": {"numFound": 1, "docs": [{"id": "tt1"}]},
            "moreLikeThis": {
                "tt1": {"numFound": 2, "start": 0, "docs": [{"id": "tt2"}, {"id": "tt3"}]}
            }
        }));
        let docs = parse_more_like_this(resp, "tt1");
        let ids: Vec<&str> = docs.iter().filter_map(|d| d["id"].as_str()).collect();
        assert_eq!(ids, vec!["tt2", "tt3"]);
    }

    #[test]
    fn test_mlt_bare_array_form() {
        let resp = select(json!({
            "response": {"numFound": 1, "docs": []},
            "moreLikeThis": {"tt1": [{"id": "tt9"}]}
        }));
        assert_eq!(parse_more_like_this(resp, "tt1").len(), 1);
    }

    #[test]
    fn test_mlt_missing_key_is_empty() {
        let resp = select(json!({
            "response": {"numFound": 0, "docs": []},
            "moreLikeThis": {"tt7": {"numFound": 1, "docs": [{"id": "tt8"}]}}
        }));
        assert!(parse_more_like_this(resp, "tt1").is_empty());
    }

    #[test]
    fn test_facet_map_shape() {
        let resp = select(json!({
            "response": {"numFound": 3, "docs": [{"id": "tt1"}]},
            "facet_counts": {"facet_fields": {
                "genres": {"Crime": 1, "Drama": 2, "Noir": "x"},
                "year": ["1972", 1],
                "cast": 17
            }}
        }));
        assert_eq!(resp.response.docs.len(), 1);
        let facets = parse_facets(resp.facet_counts.as_ref());
        assert_eq!(
            facets["genres"],
            vec![
                FacetCount { value: "Drama".into(), count: 2 },
                FacetCount { value: "Crime".into(), count: 1 },
            ]
        );
        assert_eq!(facets["year"].len(), 1);
        assert!(facets["cast"].is_empty());
    }

    #[test]
    fn test_malformed_optional_sections_keep_docs() {
        let resp = select(json!({
            "response": {"numFound": 5, "docs": [{"id": "tt1"}, {"id": "tt2"}]},
            "facet_counts": "oops",
            "highlighting": {"tt1": {"plot": ["<mark>x</mark>"]}, "tt2": "junk"},
            "moreLikeThis": {"tt1": {"numFound": 1, "docs": [{"id": "tt3"}]}, "tt2": "garbage"}
        }));
        assert_eq!(resp.response.num_found, 5);
        assert_eq!(resp.response.docs.len(), 2);
        assert!(resp.facet_counts.is_none());
        assert_eq!(resp.highlighting.len(), 1);
        assert!(parse_more_like_this(resp.clone(), "tt2").is_empty());
        assert_eq!(parse_more_like_this(resp, "tt1").len(), 1);
    }

    #[test]
    fn test_missing_response_block_is_error() {
        let res: Result<SelectResponse, _> = serde_json::from_value(json!({"facet_counts": {}}));
        assert!(res.is_err());
    }
}
