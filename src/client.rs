use crate::config::Config;

use async_trait::async_trait;
use http::{Request, header};
use http_body_util::BodyExt;
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;

type HttpsClient = Client<
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>,
    String,
>;

/// Turns a bare document name into the canonical path of a matching
/// document, or nothing. Implementations must not fail: every lookup
/// problem is an "absent" answer.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, name: &str) -> Option<String>;
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    id: &'a str,
    query: Vec<&'a str>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct SearchClient {
    client: Option<HttpsClient>,
    endpoint: String,
    search_id: String,
    timeout: Duration,
}

impl SearchClient {
    pub fn new(config: &Config) -> Result<Self, String> {
        if config.search_url.is_empty() {
            return Ok(Self {
                client: None,
                endpoint: String::new(),
                search_id: config.search_id.clone(),
                timeout: Duration::from_secs(config.resolve_timeout_secs),
            });
        }

        let mut root_store = rustls::RootCertStore::empty();
        let result = rustls_native_certs::load_native_certs();
        root_store.add_parsable_certificates(result.certs);

        if root_store.is_empty() {
            return Err("No valid system certificates found.".to_string());
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let https_connector = HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .build();

        let http_client = Client::builder(TokioExecutor::new()).build(https_connector);

        Ok(Self {
            client: Some(http_client),
            endpoint: config.search_url.clone(),
            search_id: config.search_id.clone(),
            timeout: Duration::from_secs(config.resolve_timeout_secs),
        })
    }

    /// One POST per call, no retry, no caching. The response lists candidate
    /// paths; the first whose final segment (extension removed) equals `name`
    /// wins and is returned with its extension removed.
    async fn lookup(&self, name: &str) -> Result<Option<String>, String> {
        let client = self.client.as_ref().ok_or("Offline")?;

        let body = serde_json::to_string(&SearchRequest {
            id: &self.search_id,
            query: vec![name],
        })
        .map_err(|e| e.to_string())?;

        let request = Request::builder()
            .method("POST")
            .uri(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .map_err(|e| e.to_string())?;

        let response = timeout(self.timeout, client.request(request))
            .await
            .map_err(|_| "Timeout".to_string())?
            .map_err(|e| format!("{:?}", e))?;

        if !response.status().is_success() {
            return Err(format!("Search: {}", response.status()));
        }

        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| format!("{:?}", e))?
            .to_bytes();

        let parsed: SearchResponse =
            serde_json::from_slice(&bytes).map_err(|e| e.to_string())?;

        for path in &parsed.results {
            let stem = strip_extension(path);
            let segment = stem.rsplit('/').next().unwrap_or(stem);
            if segment == name {
                return Ok(Some(stem.to_string()));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl Resolver for SearchClient {
    async fn resolve(&self, name: &str) -> Option<String> {
        match self.lookup(name).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::debug!(name, error = %e, "reference lookup failed");
                None
            }
        }
    }
}

/// Drop the extension of the final path segment, if it has one.
fn strip_extension(path: &str) -> &str {
    let segment_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[segment_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..segment_start + dot],
        _ => path,
    }
}
