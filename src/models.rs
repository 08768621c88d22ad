//! Data types shared by the retrieval and generation steps

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use serde_json::Map;
use serde_json::Value;

/// Opaque scalar used for equality filtering on chunk metadata.
///
/// Values travel to the vector index exactly as supplied: `2024` and `"2024"`
/// are different filters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Int(i64),
    Text(String),
}

impl FilterValue {
    fn to_json(&self) -> Value {
        match self {
            Self::Int(v) => Value::from(*v),
            Self::Text(v) => Value::from(v.as_str()),
        }
    }

    /// Equality against a metadata value, with no coercion between text and numbers.
    ///
    /// Pinecone stores numbers as floats, so `2024` must match `2024.0`.
    #[allow(clippy::float_cmp)]
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Int(wanted), Value::Number(actual)) => {
                actual.as_i64() == Some(*wanted) || actual.as_f64() == Some(*wanted as f64)
            }
            (Self::Text(wanted), Value::String(actual)) => wanted == actual,
            _ => false,
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Equality filter on year and quarter; absent fields are not constrained.
///
/// Several quarters select chunks from any of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub year: Option<FilterValue>,
    #[serde(default)]
    pub quarters: Vec<FilterValue>,
}

impl MetadataFilter {
    pub fn new(year: Option<FilterValue>, quarter: Option<FilterValue>) -> Self {
        Self::with_quarters(year, quarter.into_iter().collect())
    }

    pub fn with_quarters(year: Option<FilterValue>, quarters: Vec<FilterValue>) -> Self {
        let mut unique: Vec<FilterValue> = Vec::with_capacity(quarters.len());
        for quarter in quarters {
            if !unique.contains(&quarter) {
                unique.push(quarter);
            }
        }
        Self {
            year,
            quarters: unique,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.year.is_none() && self.quarters.is_empty()
    }

    /// Render as a Pinecone metadata filter, or `None` when unconstrained
    pub fn to_pinecone(&self) -> Option<Value> {
        if self.is_empty() {
            return None;
        }
        let mut filter = Map::new();
        if let Some(year) = &self.year {
            filter.insert("year".to_string(), json!({ "$eq": year.to_json() }));
        }
        match self.quarters.as_slice() {
            [] => {}
            [quarter] => {
                filter.insert("quarter".to_string(), json!({ "$eq": quarter.to_json() }));
            }
            quarters => {
                let values: Vec<Value> = quarters.iter().map(FilterValue::to_json).collect();
                filter.insert("quarter".to_string(), json!({ "$in": values }));
            }
        }
        Some(Value::Object(filter))
    }

    /// Whether a chunk's metadata satisfies every present constraint
    pub fn accepts(&self, metadata: &ChunkMetadata) -> bool {
        let year_ok = match &self.year {
            None => true,
            Some(wanted) => metadata.year.as_ref().is_some_and(|a| wanted.matches(a)),
        };
        let quarter_ok = self.quarters.is_empty()
            || metadata
                .quarter
                .as_ref()
                .is_some_and(|a| self.quarters.iter().any(|q| q.matches(a)));
        year_ok && quarter_ok
    }
}

impl fmt::Display for MetadataFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year = self
            .year
            .as_ref()
            .map_or_else(|| "any".to_string(), ToString::to_string);
        let quarter = match self.quarters.as_slice() {
            [] => "any".to_string(),
            [quarter] => quarter.to_string(),
            quarters => quarters
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("|"),
        };
        write!(f, "year={year}, quarter={quarter}")
    }
}

/// Metadata stored next to each chunk in the vector index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default)]
    pub year: Option<Value>,
    #[serde(default)]
    pub quarter: Option<Value>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A segment of an ingested report, read-only from this crate's perspective
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A chunk together with its similarity score from the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_filter_value_untagged_deserialize() {
        let int: FilterValue = serde_json::from_value(json!(2024)).unwrap();
        let text: FilterValue = serde_json::from_value(json!("q2")).unwrap();
        assert_eq!(int, FilterValue::Int(2024));
        assert_eq!(text, FilterValue::Text("q2".to_string()));
    }

    #[test]
    fn test_filter_value_matching_is_strict() {
        assert!(FilterValue::Int(2024).matches(&json!(2024)));
        assert!(!FilterValue::Int(2024).matches(&json!("2024")));
        assert!(!FilterValue::from("2024").matches(&json!(2024)));
        assert!(!FilterValue::Int(2024).matches(&json!(2024.5)));
        assert!(FilterValue::from("Q1").matches(&json!("Q1")));
        assert!(!FilterValue::from("Q1").matches(&json!("q1")));
    }

    #[test]
    fn test_pinecone_filter_rendering() {
        let filter = MetadataFilter::new(Some(2024.into()), Some("q2".into()));
        assert_eq!(
            filter.to_pinecone(),
            Some(json!({ "year": { "$eq": 2024 }, "quarter": { "$eq": "q2" } }))
        );

        let year_only = MetadataFilter::new(Some("2023".into()), None);
        assert_eq!(
            year_only.to_pinecone(),
            Some(json!({ "year": { "$eq": "2023" } }))
        );

        assert_eq!(MetadataFilter::default().to_pinecone(), None);
    }

    #[test]
    fn test_filter_accepts_metadata() {
        let filter = MetadataFilter::new(Some(2024.into()), Some(2.into()));
        let good = ChunkMetadata {
            year: Some(json!(2024)),
            quarter: Some(json!(2)),
            ..ChunkMetadata::default()
        };
        let wrong_quarter = ChunkMetadata {
            quarter: Some(json!(3)),
            ..good.clone()
        };
        let missing_year = ChunkMetadata {
            year: None,
            ..good.clone()
        };

        assert!(filter.accepts(&good));
        assert!(!filter.accepts(&wrong_quarter));
        assert!(!filter.accepts(&missing_year));
        assert!(MetadataFilter::default().accepts(&missing_year));
    }

    #[test]
    fn test_chunk_metadata_keeps_extra_fields() {
        let metadata: ChunkMetadata = serde_json::from_value(json!({
            "year": "2022",
            "quarter": "Q2",
            "source": "NVIDIA_10Q_2022_Q2",
            "page": 14
        }))
        .unwrap();

        assert_eq!(metadata.source.as_deref(), Some("NVIDIA_10Q_2022_Q2"));
        assert_eq!(metadata.extra.get("page"), Some(&json!(14)));
    }

    #[test]
    fn test_filter_display() {
        let filter = MetadataFilter::new(Some(2024.into()), None);
        assert_eq!(filter.to_string(), "year=2024, quarter=any");
    }

    #[test]
    fn test_integer_filter_matches_float_metadata() {
        assert!(FilterValue::Int(2024).matches(&json!(2024.0)));

        let metadata: ChunkMetadata =
            serde_json::from_value(json!({ "year": 2024.0, "quarter": 2.0 })).unwrap();
        let filter = MetadataFilter::new(Some(2024.into()), Some(2.into()));
        assert!(filter.accepts(&metadata));
    }

    #[test]
    fn test_several_quarters_render_as_in() {
        let filter =
            MetadataFilter::with_quarters(Some("2023".into()), vec!["Q1".into(), "Q3".into()]);
        assert_eq!(
            filter.to_pinecone(),
            Some(json!({ "year": { "$eq": "2023" }, "quarter": { "$in": ["Q1", "Q3"] } }))
        );
        assert_eq!(filter.to_string(), "year=2023, quarter=Q1|Q3");
    }

    #[test]
    fn test_several_quarters_accept_any_of_them() {
        let filter = MetadataFilter::with_quarters(None, vec!["Q1".into(), "Q3".into()]);
        let in_quarter = |q: &str| ChunkMetadata {
            quarter: Some(json!(q)),
            ..ChunkMetadata::default()
        };

        assert!(filter.accepts(&in_quarter("Q1")));
        assert!(filter.accepts(&in_quarter("Q3")));
        assert!(!filter.accepts(&in_quarter("Q2")));
        assert!(!filter.accepts(&ChunkMetadata::default()));
    }

    #[test]
    fn test_duplicate_quarters_collapse() {
        let filter = MetadataFilter::with_quarters(None, vec!["Q2".into(), "Q2".into()]);
        assert_eq!(filter, MetadataFilter::new(None, Some("Q2".into())));
        assert_eq!(filter.to_pinecone(), Some(json!({ "quarter": { "$eq": "Q2" } })));
    }
}
