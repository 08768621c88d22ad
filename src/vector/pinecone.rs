//! Pinecone REST client (data plane plus index lookup on the control plane)

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::normalize_host;
use crate::config::AppConfig;
use crate::errors::RagError;
use crate::errors::Result;
use crate::http::HttpTransport;
use crate::http::Upstream;
use crate::models::ChunkMetadata;
use crate::models::DocumentChunk;
use crate::models::MetadataFilter;
use crate::models::ScoredChunk;
use crate::vector::IndexStats;
use crate::vector::VectorIndex;

const API_VERSION: &str = "2024-07";
const LIST_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct PineconeClient {
    host: String,
    api_key: String,
    namespace: Option<String>,
    transport: HttpTransport,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    dimension: usize,
    #[serde(default)]
    index_fullness: f64,
    #[serde(default)]
    total_vector_count: u64,
    #[serde(default)]
    namespaces: BTreeMap<String, NamespaceStats>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceStats {
    #[serde(default)]
    vector_count: u64,
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    vectors: Vec<ListedVector>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct ListedVector {
    id: String,
}

#[derive(Deserialize)]
struct Pagination {
    next: Option<String>,
}

#[derive(Deserialize)]
struct IndexDescription {
    host: String,
    #[serde(default)]
    dimension: Option<usize>,
}

impl PineconeClient {
    pub fn new(
        host: &str,
        api_key: String,
        namespace: Option<String>,
        transport: HttpTransport,
    ) -> Self {
        Self {
            host: normalize_host(host),
            api_key,
            namespace,
            transport,
        }
    }

    /// Build a client for the configured index.
    ///
    /// Without `pinecone.index_host` the host is looked up on the control
    /// plane, so a misspelled index name fails here rather than on the first query.
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let api_key = config.pinecone_api_key().ok_or_else(|| {
            RagError::ConfigError("pinecone.api_key (env PINECONE_API_KEY) is not set".to_string())
        })?;
        let index_name = config.pinecone_index_name().ok_or_else(|| {
            RagError::ConfigError("pinecone.index_name (env PINECONE_INDEX) is not set".to_string())
        })?;
        let transport = HttpTransport::from_config(config)?;

        let host = match config.pinecone_index_host() {
            Some(host) => host.to_string(),
            None => {
                let description = describe_index(
                    &transport,
                    &config.pinecone.control_plane_url,
                    api_key,
                    index_name,
                )
                .await?;
                if let Some(dimension) = description.dimension {
                    if dimension != config.embedding_dimension() {
                        return Err(RagError::ConfigError(format!(
                            "Pinecone index '{index_name}' has dimension {dimension}, \
                             but embeddings.dimension is {}",
                            config.embedding_dimension()
                        )));
                    }
                }
                description.host
            }
        };

        info!("Using Pinecone index '{}' at {}", index_name, host);

        Ok(Self::new(
            &host,
            api_key.to_string(),
            config.pinecone_namespace().map(ToString::to_string),
            transport,
        ))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// List every vector id in the namespace, following pagination
    pub async fn list_ids(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let url = format!("{}/vectors/list", self.host);
        let mut ids = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut params: Vec<(&str, String)> = vec![("limit", LIST_PAGE_SIZE.to_string())];
            if let Some(namespace) = &self.namespace {
                params.push(("namespace", namespace.clone()));
            }
            if let Some(prefix) = prefix {
                params.push(("prefix", prefix.to_string()));
            }
            if let Some(token) = &token {
                params.push(("paginationToken", token.clone()));
            }

            let page: ListResponse = self
                .transport
                .send_json(Upstream::VectorIndex, |client| {
                    self.authorized(client.get(&url)).query(&params)
                })
                .await?;

            debug!("Listed {} vector ids", page.vectors.len());
            ids.extend(page.vectors.into_iter().map(|v| v.id));

            token = page.pagination.and_then(|p| p.next);
            if token.is_none() {
                break;
            }
        }

        Ok(ids)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }
}

async fn describe_index(
    transport: &HttpTransport,
    control_plane_url: &str,
    api_key: &str,
    index_name: &str,
) -> Result<IndexDescription> {
    let url = format!(
        "{}/indexes/{}",
        control_plane_url.trim_end_matches('/'),
        index_name
    );
    debug!("Resolving Pinecone index host: {}", url);

    transport
        .send_json_optional(Upstream::VectorIndex, |client| {
            client
                .get(&url)
                .header("Api-Key", api_key)
                .header("X-Pinecone-API-Version", API_VERSION)
        })
        .await?
        .ok_or_else(|| {
            RagError::ConfigError(format!("Pinecone index '{index_name}' not found"))
        })
}

/// Convert a raw match into a chunk, or `None` when it carries no text
fn into_scored_chunk(raw: QueryMatch) -> Option<ScoredChunk> {
    let mut metadata = raw.metadata.unwrap_or_default();
    let text = match metadata.remove("text") {
        Some(Value::String(text)) => text,
        _ => {
            warn!("Skipping match {} without text metadata", raw.id);
            return None;
        }
    };

    let metadata: ChunkMetadata = match serde_json::from_value(Value::Object(metadata)) {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!("Skipping match {} with unreadable metadata: {}", raw.id, e);
            return None;
        }
    };

    Some(ScoredChunk {
        chunk: DocumentChunk {
            id: raw.id,
            text,
            metadata,
        },
        score: raw.score,
    })
}

#[async_trait]
impl VectorIndex for PineconeClient {
    async fn query(
        &self,
        vector: Vec<f32>,
        filter: &MetadataFilter,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let url = format!("{}/query", self.host);
        let request = QueryRequest {
            vector: &vector,
            top_k,
            include_metadata: true,
            filter: filter.to_pinecone(),
            namespace: self.namespace.as_deref(),
        };
        debug!("Querying Pinecone: top_k={}, filter: {}", top_k, filter);

        let response: QueryResponse = self
            .transport
            .send_json(Upstream::VectorIndex, |client| {
                self.authorized(client.post(&url)).json(&request)
            })
            .await?;

        debug!("Pinecone returned {} matches", response.matches.len());
        Ok(response
            .matches
            .into_iter()
            .filter_map(into_scored_chunk)
            .collect())
    }

    async fn describe_stats(&self) -> Result<IndexStats> {
        let url = format!("{}/describe_index_stats", self.host);
        let response: StatsResponse = self
            .transport
            .send_json(Upstream::VectorIndex, |client| {
                self.authorized(client.post(&url)).json(&serde_json::json!({}))
            })
            .await?;

        Ok(IndexStats {
            dimension: response.dimension,
            index_fullness: response.index_fullness,
            total_vector_count: response.total_vector_count,
            namespaces: response
                .namespaces
                .into_iter()
                .map(|(name, stats)| (name, stats.vector_count))
                .collect(),
        })
    }
}

/// Group ids of the form `2022_Q2_...` by their `YYYY_Qn` period prefix.
///
/// Ids without such a prefix are left out.
pub fn group_ids_by_period<I, S>(ids: I) -> BTreeMap<String, Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for id in ids {
        let id = id.into();
        if let Some(period) = period_prefix(&id) {
            groups.entry(period.to_string()).or_default().push(id);
        }
    }
    groups
}

fn period_prefix(id: &str) -> Option<&str> {
    let bytes = id.as_bytes();
    if bytes.len() < 8 || !bytes[..4].iter().all(u8::is_ascii_digit) || &bytes[4..6] != b"_Q" {
        return None;
    }
    let digits = bytes[6..].iter().take_while(|b| b.is_ascii_digit()).count();
    let end = 6 + digits;
    if digits == 0 || bytes.get(end) != Some(&b'_') {
        return None;
    }
    Some(&id[..end])
}
