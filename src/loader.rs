//! Schema loading from files and HTTP URLs.
//!
//! A [`Loader`] dispatches on the URL scheme to a [`Transport`] and memoizes
//! documents for the lifetime of one resolution, coalescing concurrent
//! requests for the same URL into a single fetch.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;
use url::Url;

use crate::error::ResolveError;
use crate::uri::{file_path, without_fragment, Scheme};

#[cfg(feature = "remote")]
use std::time::Duration;

/// Fetches the raw JSON document a URL identifies.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch and parse the document at `url` (fragment already removed).
    async fn fetch(&self, url: &Url) -> Result<Value, ResolveError>;
}

/// Reads `file://` URLs from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTransport;

#[async_trait]
impl Transport for FileTransport {
    async fn fetch(&self, url: &Url) -> Result<Value, ResolveError> {
        let path = file_path(url)?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| match source.kind() {
                std::io::ErrorKind::NotFound => ResolveError::FileNotFound { path: path.clone() },
                _ => ResolveError::ReadError {
                    path: path.clone(),
                    source,
                },
            })?;
        parse_document(url.as_str(), &content)
    }
}

/// Issues HTTP GET requests for `http://` and `https://` URLs.
///
/// Requires the `remote` feature (enabled by default).
#[cfg(feature = "remote")]
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

#[cfg(feature = "remote")]
impl HttpTransport {
    /// Build a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::HttpClient` if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration) -> Result<Self, ResolveError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ResolveError::HttpClient { source })?;
        Ok(Self { client })
    }
}

#[cfg(feature = "remote")]
#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &Url) -> Result<Value, ResolveError> {
        let network_error = |source| ResolveError::NetworkError {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(network_error)?;

        // Check for HTTP errors before parsing
        let response = response.error_for_status().map_err(network_error)?;
        let body = response.text().await.map_err(network_error)?;
        parse_document(url.as_str(), &body)
    }
}

/// Load a schema from a JSON string.
///
/// # Errors
///
/// Returns `ResolveError::InvalidJson` if the string isn't valid JSON.
pub fn load_schema_str(content: &str) -> Result<Value, ResolveError> {
    parse_document("<string>", content)
}

fn parse_document(uri: &str, content: &str) -> Result<Value, ResolveError> {
    serde_json::from_str(content).map_err(|source| ResolveError::InvalidJson {
        uri: uri.to_string(),
        source,
    })
}

type Slot = Arc<OnceCell<Arc<Value>>>;

/// Scheme-dispatching document loader with a per-resolution cache.
pub struct Loader {
    file: Arc<dyn Transport>,
    http: Option<Arc<dyn Transport>>,
    cache: Mutex<HashMap<Url, Slot>>,
}

impl Loader {
    /// Create a loader. With `http` unset, `http`/`https` URLs are rejected.
    pub fn new(file: Arc<dyn Transport>, http: Option<Arc<dyn Transport>>) -> Self {
        Self {
            file,
            http,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Load the document `url` identifies, ignoring its fragment.
    ///
    /// Every URL is fetched at most once per loader; callers asking for a
    /// URL whose fetch is still in flight wait for that fetch.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::UnsupportedScheme` for schemes other than
    /// `file`, `http` and `https`, or the transport's error.
    pub async fn load(&self, url: &Url) -> Result<Arc<Value>, ResolveError> {
        let url = without_fragment(url);
        let transport = self.transport_for(&url)?;

        let slot = {
            let mut cache = self.cache.lock().await;
            Arc::clone(cache.entry(url.clone()).or_default())
        };

        if let Some(document) = slot.get() {
            debug!(%url, "document cache hit");
            return Ok(Arc::clone(document));
        }

        let document = slot
            .get_or_try_init(|| async {
                debug!(%url, "fetching document");
                transport.fetch(&url).await.map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(document))
    }

    fn transport_for(&self, url: &Url) -> Result<Arc<dyn Transport>, ResolveError> {
        let unsupported = || ResolveError::UnsupportedScheme {
            uri: url.to_string(),
            scheme: url.scheme().to_string(),
        };
        match Scheme::from_url(url).ok_or_else(unsupported)? {
            Scheme::File => Ok(Arc::clone(&self.file)),
            Scheme::Http => self.http.clone().ok_or_else(unsupported),
        }
    }
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("remote", &self.http.is_some())
            .finish_non_exhaustive()
    }
}
