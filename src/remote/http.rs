//! Blocking HTTP client adapted to the async pipeline
//!
//! Requests run through a shared `ureq` agent on tokio's blocking pool.
//! Status codes are never turned into transport errors by the agent;
//! each call classifies them itself.

use crate::config::schema::HttpConfig;
use crate::error::{NpmCacheError, NpmCacheResult, ServiceErrorKind};
use crate::remote::service::Transport;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use ureq::Agent;

/// Longest response body excerpt quoted in error messages
const BODY_EXCERPT_CHARS: usize = 200;

/// Method of a JSON service call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
        }
    }
}

/// Shared HTTP client with bounded redirects and a per-request timeout
#[derive(Clone)]
pub struct HttpClient {
    agent: Agent,
}

impl HttpClient {
    /// Build a client from the `[http]` config section
    pub fn new(config: &HttpConfig) -> Self {
        let timeout = (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs));

        let agent_config = Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(config.max_redirects)
            .timeout_global(timeout)
            .build();

        Self {
            agent: agent_config.into(),
        }
    }

    /// Call a JSON endpoint, decoding a 2xx response body as `T`.
    ///
    /// Non-2xx responses become [`NpmCacheError::Service`] classified by
    /// status, so callers can tell absence from failure.
    pub async fn request_json<T>(
        &self,
        service: &'static str,
        method: Method,
        url: &str,
        body: Option<String>,
    ) -> NpmCacheResult<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let agent = self.agent.clone();
        let url = url.to_string();
        debug!("{} {}", method, url);

        blocking(move || {
            let payload = body.unwrap_or_default();
            let result = match method {
                Method::Get => agent
                    .get(url.as_str())
                    .header("Accept", "application/json")
                    .call(),
                Method::Post => agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .send(payload),
                Method::Put => agent
                    .put(url.as_str())
                    .header("Content-Type", "application/json")
                    .send(payload),
            };

            let mut response = result.map_err(|e| {
                NpmCacheError::service(service, ServiceErrorKind::Other, format!("{} {}: {}", method, url, e))
            })?;

            let status = response.status().as_u16();
            let text = response.body_mut().read_to_string().map_err(|e| {
                NpmCacheError::service(service, ServiceErrorKind::Other, format!("reading response: {}", e))
            })?;

            if !is_success(status) {
                return Err(NpmCacheError::service(
                    service,
                    ServiceErrorKind::from_status(status),
                    format!("{} {} returned {}: {}", method, url, status, excerpt(&text)),
                ));
            }

            let text = if text.trim().is_empty() { "null" } else { text.as_str() };
            serde_json::from_str(text).map_err(|e| {
                NpmCacheError::service(service, ServiceErrorKind::Other, format!("invalid response body: {}", e))
            })
        })
        .await
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn fetch_text(&self, url: &str) -> NpmCacheResult<String> {
        let agent = self.agent.clone();
        let url = url.to_string();
        debug!("GET {}", url);

        blocking(move || {
            let fail = |reason: String| NpmCacheError::DownloadFailed {
                url: url.clone(),
                reason,
            };

            let mut response = agent.get(url.as_str()).call().map_err(|e| fail(e.to_string()))?;
            let status = response.status().as_u16();
            if !is_success(status) {
                return Err(fail(format!("HTTP {}", status)));
            }

            response
                .body_mut()
                .read_to_string()
                .map_err(|e| fail(e.to_string()))
        })
        .await
    }

    async fn download(&self, url: &str, dest: &Path) -> NpmCacheResult<u64> {
        let agent = self.agent.clone();
        let url = url.to_string();
        let dest: PathBuf = dest.to_path_buf();
        debug!("Downloading {} to {}", url, dest.display());

        blocking(move || {
            let fail = |reason: String| NpmCacheError::DownloadFailed {
                url: url.clone(),
                reason,
            };

            let response = agent.get(url.as_str()).call().map_err(|e| fail(e.to_string()))?;
            let status = response.status().as_u16();
            if !is_success(status) {
                return Err(fail(format!("HTTP {}", status)));
            }

            let mut reader = response.into_body().into_reader();
            let mut file = File::create(&dest)
                .map_err(|e| NpmCacheError::io(format!("creating {}", dest.display()), e))?;
            let written = std::io::copy(&mut reader, &mut file).map_err(|e| fail(e.to_string()))?;
            file.sync_all()
                .map_err(|e| NpmCacheError::io(format!("flushing {}", dest.display()), e))?;

            debug!("Downloaded {} bytes", written);
            Ok(written)
        })
        .await
    }

    async fn upload(&self, url: &str, source: &Path, headers: &[(&str, String)]) -> NpmCacheResult<()> {
        let agent = self.agent.clone();
        let url = url.to_string();
        let source = source.to_path_buf();
        let headers: Vec<(String, String)> = headers
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        debug!("Uploading {}", source.display());

        blocking(move || {
            let file = File::open(&source).map_err(|e| {
                NpmCacheError::UploadFailed(format!("opening {}: {}", source.display(), e))
            })?;

            let mut request = agent.put(url.as_str());
            for (name, value) in headers {
                request = request.header(name, value);
            }

            let mut response = request
                .send(file)
                .map_err(|e| NpmCacheError::UploadFailed(e.to_string()))?;

            let status = response.status().as_u16();
            if !is_success(status) {
                let body = response.body_mut().read_to_string().unwrap_or_default();
                return Err(NpmCacheError::UploadFailed(format!(
                    "PUT returned {}: {}",
                    status,
                    excerpt(&body)
                )));
            }

            Ok(())
        })
        .await
    }
}

/// Run a blocking closure on tokio's blocking pool
async fn blocking<T, F>(f: F) -> NpmCacheResult<T>
where
    F: FnOnce() -> NpmCacheResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| NpmCacheError::Internal(format!("blocking task failed: {}", e)))?
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

fn excerpt(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
