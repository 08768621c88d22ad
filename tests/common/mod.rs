//! Fake upstream servers for integration tests
#![allow(dead_code)]

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use axum::http::HeaderMap;
use axum::Router;
use reportrag::http::HttpTransport;
use reportrag::http::RetryPolicy;
use reportrag::AppConfig;
use serde_json::json;
use serde_json::Value;
use tokio::net::TcpListener;

pub const DIMENSION: usize = 4;

/// Bind `router` on an ephemeral local port and return its base URL
pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Transport with one retry and a short backoff
pub fn fast_transport() -> HttpTransport {
    HttpTransport::new(
        Duration::from_secs(5),
        RetryPolicy {
            max_retries: 1,
            backoff: Duration::from_millis(10),
        },
    )
    .unwrap()
}

/// Records every request a fake endpoint receives
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<Value>>>,
    headers: Arc<Mutex<Vec<HeaderMap>>>,
}

impl Recorder {
    /// Record a request and return its 1-based sequence number
    pub fn hit(&self, headers: &HeaderMap, body: Value) -> usize {
        self.headers.lock().unwrap().push(headers.clone());
        self.bodies.lock().unwrap().push(body);
        self.calls.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_body(&self) -> Value {
        self.bodies.lock().unwrap().last().cloned().unwrap_or(Value::Null)
    }

    pub fn last_header(&self, name: &str) -> Option<String> {
        self.headers
            .lock()
            .unwrap()
            .last()
            .and_then(|h| h.get(name))
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    }
}

pub fn embedding_body(dimension: usize) -> Value {
    let embedding: Vec<f32> = (0..dimension).map(|i| i as f32 / 10.0).collect();
    json!({ "data": [{ "embedding": embedding, "index": 0 }] })
}

pub fn chat_body(content: &str) -> Value {
    json!({ "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }] })
}

pub fn pinecone_match(id: &str, text: &str, year: &str, quarter: &str, score: f32) -> Value {
    json!({
        "id": id,
        "score": score,
        "metadata": {
            "text": text,
            "year": year,
            "quarter": quarter,
            "source": format!("NVIDIA_10Q_{year}_{quarter}"),
        }
    })
}

/// Configuration pointing every provider at `base`
pub fn config_for(base: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.embeddings.endpoint = base.to_string();
    config.embeddings.api_key = Some("sk-embed".to_string());
    config.embeddings.dimension = DIMENSION;
    config.llm.llm_endpoint = base.to_string();
    config.llm.llm_key = Some("sk-chat".to_string());
    config.pinecone.api_key = Some("pc-key".to_string());
    config.pinecone.index_name = Some("financial-reports".to_string());
    config.pinecone.control_plane_url = base.to_string();
    config.http.retry_backoff_ms = 10;
    config
}
