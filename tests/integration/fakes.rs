//! In-memory queue, index and blob store

use async_trait::async_trait;
use npm_cache::error::{NpmCacheError, NpmCacheResult, ServiceErrorKind};
use npm_cache::remote::{
    ArtifactRequest, ArtifactTarget, Index, IndexEntry, IndexedTask, Queue, Task, Transport,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Blobs by URL, shared between the fake services
pub type BlobStore = Arc<Mutex<HashMap<String, Vec<u8>>>>;

/// Queue, index and transport over shared memory
#[derive(Default)]
pub struct FakeServices {
    pub tasks: Mutex<HashMap<String, Task>>,
    pub entries: Mutex<HashMap<String, IndexedTask>>,
    pub blobs: BlobStore,
    pub artifact_requests: Mutex<Vec<ArtifactRequest>>,
    pub creates: AtomicUsize,
    pub uploads: AtomicUsize,
    pub inserts: AtomicUsize,
    /// Reject create-artifact calls
    reject_create: AtomicBool,
    /// Reject PUTs to the artifact store
    reject_upload: AtomicBool,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task(&self, task_id: &str, task: Task) {
        self.tasks.lock().unwrap().insert(task_id.to_string(), task);
    }

    pub fn add_blob(&self, url: &str, body: &[u8]) {
        self.blobs.lock().unwrap().insert(url.to_string(), body.to_vec());
    }

    pub fn entry(&self, namespace: &str) -> Option<IndexedTask> {
        self.entries.lock().unwrap().get(namespace).cloned()
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn fail_create(&self) {
        self.reject_create.store(true, Ordering::SeqCst);
    }

    pub fn fail_upload(&self) {
        self.reject_upload.store(true, Ordering::SeqCst);
    }

    /// Remote operations in the order they were invoked
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    fn artifact_url(task_id: &str, name: &str) -> String {
        format!("mem://artifacts/{}/{}", task_id, name)
    }
}

#[async_trait]
impl Queue for FakeServices {
    async fn get_task(&self, task_id: &str) -> NpmCacheResult<Task> {
        self.record("get_task");
        self.tasks
            .lock()
            .unwrap()
            .get(task_id)
            .cloned()
            .ok_or_else(|| NpmCacheError::service("queue", ServiceErrorKind::NotFound, task_id))
    }

    async fn create_artifact(
        &self,
        task_id: &str,
        _run_id: u32,
        name: &str,
        request: &ArtifactRequest,
    ) -> NpmCacheResult<ArtifactTarget> {
        self.record("create_artifact");
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.reject_create.load(Ordering::SeqCst) {
            return Err(NpmCacheError::service("queue", ServiceErrorKind::Other, "503 unavailable"));
        }
        self.artifact_requests.lock().unwrap().push(request.clone());
        Ok(ArtifactTarget {
            put_url: Self::artifact_url(task_id, name),
        })
    }

    fn latest_artifact_url(&self, task_id: &str, name: &str) -> String {
        Self::artifact_url(task_id, name)
    }
}

#[async_trait]
impl Index for FakeServices {
    async fn find_task(&self, namespace: &str) -> NpmCacheResult<IndexedTask> {
        self.record("find_task");
        self.entry(namespace)
            .ok_or_else(|| NpmCacheError::service("index", ServiceErrorKind::NotFound, namespace))
    }

    async fn insert_task(&self, namespace: &str, entry: &IndexEntry) -> NpmCacheResult<()> {
        self.record("insert_task");
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().unwrap().insert(
            namespace.to_string(),
            IndexedTask {
                namespace: Some(namespace.to_string()),
                task_id: entry.task_id.clone(),
                rank: entry.rank,
                data: entry.data.clone(),
                expires: entry.expires,
            },
        );
        Ok(())
    }
}

#[async_trait]
impl Transport for FakeServices {
    async fn fetch_text(&self, url: &str) -> NpmCacheResult<String> {
        self.record("fetch_text");
        let body = self.blobs.lock().unwrap().get(url).cloned();
        let body = body.ok_or_else(|| NpmCacheError::DownloadFailed {
            url: url.to_string(),
            reason: "404".to_string(),
        })?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    async fn download(&self, url: &str, dest: &Path) -> NpmCacheResult<u64> {
        self.record("download");
        let body = self.blobs.lock().unwrap().get(url).cloned();
        let body = body.ok_or_else(|| NpmCacheError::DownloadFailed {
            url: url.to_string(),
            reason: "404".to_string(),
        })?;
        std::fs::write(dest, &body).map_err(|e| NpmCacheError::io("writing download", e))?;
        Ok(body.len() as u64)
    }

    async fn upload(&self, url: &str, source: &Path, _headers: &[(&str, String)]) -> NpmCacheResult<()> {
        self.record("upload");
        if self.reject_upload.load(Ordering::SeqCst) {
            return Err(NpmCacheError::UploadFailed("PUT returned 403".to_string()));
        }
        let body = std::fs::read(source).map_err(|e| NpmCacheError::io("reading upload", e))?;
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.add_blob(url, &body);
        Ok(())
    }
}
