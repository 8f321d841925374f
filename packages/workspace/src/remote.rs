//! # Remote Sources
//!
//! Where design documents come from. `HttpRemoteSource` talks to the design
//! service's REST API; tests substitute their own `RemoteSource`.

use crate::json;
use serde::Deserialize;
use std::future::Future;
use stylesync_common::{RawNode, RemoteDocument, SyncError, SyncResult, MAX_TREE_DEPTH};

pub const DEFAULT_API_BASE_URL: &str = "https://api.figma.com";

/// A successfully fetched document and the name the service gives the file
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedDocument {
    pub display_name: Option<String>,
    pub document: RemoteDocument,
}

/// Fetches design documents.
///
/// Sources are cloned into background fetch tasks, so they must be cheap to
/// clone and `'static`.
pub trait RemoteSource: Clone + Send + Sync + 'static {
    fn fetch_document(
        &self,
        file_key: &str,
        credential: &str,
    ) -> impl Future<Output = SyncResult<FetchedDocument>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpRemoteSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemoteSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn file_url(&self, file_key: &str) -> String {
        format!("{}/v1/files/{}", self.base_url.trim_end_matches('/'), file_key)
    }
}

impl Default for HttpRemoteSource {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}

impl RemoteSource for HttpRemoteSource {
    fn fetch_document(
        &self,
        file_key: &str,
        credential: &str,
    ) -> impl Future<Output = SyncResult<FetchedDocument>> + Send {
        let request = self
            .client
            .get(self.file_url(file_key))
            .header("X-Figma-Token", credential);
        let file_key = file_key.to_string();

        async move {
            tracing::debug!(file_key = %file_key, "Fetching design document");

            let response = request.send().await.map_err(SyncError::remote_fetch_failed)?;

            let status = response.status();
            if !status.is_success() {
                let body = response.bytes().await.unwrap_or_default();
                let detail = serde_json::from_slice::<ApiError>(&body)
                    .ok()
                    .and_then(|error| error.err)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());
                return Err(SyncError::remote_fetch_failed(format!(
                    "{} {}",
                    status.as_u16(),
                    detail
                )));
            }

            let body = response.bytes().await.map_err(SyncError::remote_fetch_failed)?;
            decode_file_response(&body)
        }
    }
}

#[derive(Deserialize)]
struct ApiError {
    err: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiFile {
    name: Option<String>,
    last_modified: String,
    document: ApiDocument,
}

#[derive(Deserialize)]
struct ApiDocument {
    #[serde(default)]
    children: Vec<ApiPage>,
}

#[derive(Deserialize)]
struct ApiPage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    children: Vec<RawNode>,
}

/// Decode a `GET /v1/files/:key` response body.
///
/// The service wraps the tree in a document node whose children are pages;
/// the pages' children become the root nodes, in page order.
pub fn decode_file_response(body: &[u8]) -> SyncResult<FetchedDocument> {
    let file: ApiFile = json::from_slice(body).map_err(|err| {
        SyncError::remote_fetch_failed(format!("unexpected response from design service: {err}"))
    })?;

    let root_nodes = file
        .document
        .children
        .into_iter()
        .filter(|page| page.kind == "CANVAS")
        .flat_map(|page| page.children)
        .collect();

    let document = RemoteDocument::new(file.last_modified, root_nodes);
    let depth = document.depth();
    if depth > MAX_TREE_DEPTH {
        return Err(SyncError::remote_fetch_failed(format!(
            "design tree nests {depth} levels deep, the limit is {MAX_TREE_DEPTH}"
        )));
    }

    Ok(FetchedDocument {
        display_name: file.name,
        document,
    })
}
