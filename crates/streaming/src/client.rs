use std::cell::RefCell;
use std::collections::BTreeMap;
use std::future::Future;

use bytes::Bytes;
use image::RgbaImage;
use tracing::debug;

#[derive(Debug)]
pub enum FetchError {
    Http(reqwest::Error),
    Status { url: String, status: u16 },
    NotFound { url: String },
    Decode(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Http(err) => write!(f, "http error: {err}"),
            FetchError::Status { url, status } => write!(f, "{url} -> status {status}"),
            FetchError::NotFound { url } => write!(f, "no response registered for {url}"),
            FetchError::Decode(msg) => write!(f, "payload decode failed: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Http(err)
    }
}

/// Anything that can answer a GET for imagery, features or addresses.
pub trait Backend {
    fn get(&self, url: &str) -> impl Future<Output = Result<Bytes, FetchError>>;
}

/// `reqwest`-backed HTTP backend.
#[derive(Debug, Clone, Default)]
pub struct HttpBackend {
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Backend for HttpBackend {
    async fn get(&self, url: &str) -> Result<Bytes, FetchError> {
        debug!(%url, "GET");
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }
        Ok(resp.bytes().await?)
    }
}

/// Canned responses keyed by URL prefix; the longest matching prefix wins.
/// Used for offline runs and tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    routes: BTreeMap<String, Bytes>,
    requested: RefCell<Vec<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, prefix: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.routes.insert(prefix.into(), body.into());
        self
    }

    /// Every URL asked for so far, in order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }
}

impl Backend for MemoryBackend {
    async fn get(&self, url: &str) -> Result<Bytes, FetchError> {
        self.requested.borrow_mut().push(url.to_string());
        self.routes
            .iter()
            .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, body)| body.clone())
            .ok_or_else(|| FetchError::NotFound {
                url: url.to_string(),
            })
    }
}

pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, FetchError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|err| FetchError::Decode(err.to_string()))
}

pub fn decode_text(bytes: &[u8]) -> Result<String, FetchError> {
    String::from_utf8(bytes.to_vec()).map_err(|err| FetchError::Decode(err.to_string()))
}

pub async fn fetch_image<B: Backend>(backend: &B, url: &str) -> Result<RgbaImage, FetchError> {
    decode_image(&backend.get(url).await?)
}

pub async fn fetch_text<B: Backend>(backend: &B, url: &str) -> Result<String, FetchError> {
    decode_text(&backend.get(url).await?)
}
