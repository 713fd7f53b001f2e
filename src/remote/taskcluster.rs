//! HTTP clients for the queue and index services

use crate::config::Config;
use crate::error::NpmCacheResult;
use crate::remote::http::{HttpClient, Method};
use crate::remote::service::{Index, Queue};
use crate::remote::types::{ArtifactRequest, ArtifactTarget, IndexEntry, IndexedTask, Task};
use async_trait::async_trait;
use std::borrow::Cow;
use tracing::debug;

/// Queue service client
pub struct QueueClient {
    http: HttpClient,
    base_url: String,
}

impl QueueClient {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: trim_base(base_url.into()),
        }
    }
}

#[async_trait]
impl Queue for QueueClient {
    async fn get_task(&self, task_id: &str) -> NpmCacheResult<Task> {
        let url = format!("{}/task/{}", self.base_url, encode_component(task_id));
        self.http.request_json("queue", Method::Get, &url, None).await
    }

    async fn create_artifact(
        &self,
        task_id: &str,
        run_id: u32,
        name: &str,
        request: &ArtifactRequest,
    ) -> NpmCacheResult<ArtifactTarget> {
        let url = format!(
            "{}/task/{}/runs/{}/artifacts/{}",
            self.base_url,
            encode_component(task_id),
            run_id,
            encode_component(name)
        );
        let body = serde_json::to_string(request)?;
        self.http
            .request_json("queue", Method::Post, &url, Some(body))
            .await
    }

    fn latest_artifact_url(&self, task_id: &str, name: &str) -> String {
        format!(
            "{}/task/{}/artifacts/{}",
            self.base_url,
            encode_component(task_id),
            encode_component(name)
        )
    }
}

/// Index service client
pub struct IndexClient {
    http: HttpClient,
    base_url: String,
}

impl IndexClient {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: trim_base(base_url.into()),
        }
    }
}

#[async_trait]
impl Index for IndexClient {
    async fn find_task(&self, namespace: &str) -> NpmCacheResult<IndexedTask> {
        let url = format!("{}/task/{}", self.base_url, encode_component(namespace));
        self.http.request_json("index", Method::Get, &url, None).await
    }

    async fn insert_task(&self, namespace: &str, entry: &IndexEntry) -> NpmCacheResult<()> {
        let url = format!("{}/task/{}", self.base_url, encode_component(namespace));
        let body = serde_json::to_string(entry)?;
        self.http
            .request_json::<serde_json::Value>("index", Method::Put, &url, Some(body))
            .await?;
        Ok(())
    }
}

/// The remote services of one run
pub struct Services {
    pub queue: QueueClient,
    pub index: IndexClient,
    pub transport: HttpClient,
}

/// Wire the HTTP services, routed through the worker proxy if requested
pub fn create_services(config: &Config, proxy: bool) -> Services {
    let http = HttpClient::new(&config.http);
    let (queue_url, index_url) = config.services.endpoints(proxy);
    debug!("Queue: {}, index: {}", queue_url, index_url);

    Services {
        queue: QueueClient::new(http.clone(), queue_url),
        index: IndexClient::new(http.clone(), index_url),
        transport: http,
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

/// Percent-encode a single path segment
fn encode_component(segment: &str) -> Cow<'_, str> {
    urlencoding::encode(segment)
}
