//! End-to-end put/get runs against in-memory services
//!
//! The installer is a shell snippet standing in for npm: it creates
//! node_modules/debug and copies the manifest into it.

#![cfg(unix)]

use crate::fakes::FakeServices;
use chrono::{Duration, Utc};
use npm_cache::cache::{fingerprint, manifest_hash, Installer, ManifestPolicy, PlatformSignature};
use npm_cache::error::NpmCacheError;
use npm_cache::pipeline::{GetOutcome, GetPipeline, GetRequest, PutOutcome, PutPipeline, PutRequest};
use npm_cache::remote::Task;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const MANIFEST_URL: &str = "mem://manifests/package.json";
const MANIFEST: &str = r#"{"name":"app","dependencies":{"debug":"^4.0.0"}}"#;

fn signature() -> PlatformSignature {
    PlatformSignature::new("v20.11.0", "linux", "x64").unwrap()
}

fn fake_npm() -> Installer {
    Installer::new(
        "sh",
        [
            "-c",
            "mkdir -p node_modules/debug && cp package.json node_modules/debug/ && echo ran >> install.log",
        ],
    )
}

fn namespace() -> String {
    format!("test_{}", uuid::Uuid::new_v4().simple())
}

fn caching_task(url: &str) -> Task {
    Task {
        metadata: None,
        extra: Some(json!({
            "npmCache": {
                "url": url,
                "expires": (Utc::now() + Duration::days(1)).to_rfc3339(),
            }
        })),
    }
}

fn services_with(manifest: &str) -> FakeServices {
    let services = FakeServices::new();
    services.add_task("task-1", caching_task(MANIFEST_URL));
    services.add_blob(MANIFEST_URL, manifest.as_bytes());
    services
}

fn put_request(namespace: &str, policy: ManifestPolicy) -> PutRequest {
    PutRequest {
        task_id: "task-1".to_string(),
        run_id: 0,
        namespace: namespace.to_string(),
        policy,
    }
}

fn get_request(dir: &Path, manifest: &str, namespace: &str) -> GetRequest {
    let manifest_path = dir.join("source").join("package.json");
    fs::create_dir_all(manifest_path.parent().unwrap()).unwrap();
    fs::write(&manifest_path, manifest).unwrap();

    GetRequest {
        manifest_path,
        namespace: namespace.to_string(),
        target: dir.join("target"),
        post_install: false,
        fallback_install: true,
        policy: ManifestPolicy::Verbatim,
    }
}

/// An installer that records its working directory in `log`, then
/// runs `script`
fn recording_npm(log: &Path, script: &str) -> Installer {
    Installer::new(
        "sh",
        ["-c".to_string(), format!("pwd > '{}'; {}", log.display(), script)],
    )
}

fn recorded_workspace(log: &Path) -> PathBuf {
    PathBuf::from(fs::read_to_string(log).unwrap().trim())
}

async fn put(services: &FakeServices, request: &PutRequest) -> Result<PutOutcome, NpmCacheError> {
    put_with(services, request, &fake_npm()).await
}

async fn put_with(
    services: &FakeServices,
    request: &PutRequest,
    installer: &Installer,
) -> Result<PutOutcome, NpmCacheError> {
    let signature = signature();
    PutPipeline::new(services, services, services, installer, &signature)
        .run(request)
        .await
}

async fn get(services: &FakeServices, request: &GetRequest) -> Result<GetOutcome, NpmCacheError> {
    let installer = fake_npm();
    let signature = signature();
    GetPipeline::new(services, services, services, &installer, &signature)
        .run(request)
        .await
}

#[tokio::test]
async fn put_then_get_restores_modules() {
    let services = services_with(MANIFEST);
    let ns = namespace();

    let outcome = put(&services, &put_request(&ns, ManifestPolicy::Verbatim))
        .await
        .unwrap();
    let key = fingerprint(MANIFEST, &ns, &signature());
    assert_eq!(outcome, PutOutcome::Published { key: key.clone() });

    let entry = services.entry(&key).unwrap();
    assert_eq!(entry.task_id, "task-1");
    assert_eq!(entry.rank, 0);
    assert_eq!(entry.data["signature"], "node-v20-11.linux-x64");
    assert_eq!(entry.data["manifestHash"], manifest_hash(MANIFEST));

    let dir = TempDir::new().unwrap();
    let request = get_request(dir.path(), MANIFEST, &ns);
    let outcome = get(&services, &request).await.unwrap();

    assert_eq!(
        outcome,
        GetOutcome::Extracted {
            key,
            task_id: "task-1".to_string(),
            post_installed: false,
        }
    );

    let restored = request.target.join("node_modules/debug/package.json");
    assert_eq!(fs::read_to_string(restored).unwrap(), MANIFEST);
    assert!(!request.target.join("install.log").exists());
}

#[tokio::test]
async fn artifact_carries_task_expiry() {
    let services = services_with(MANIFEST);
    let task = caching_task(MANIFEST_URL);
    let expires = task.extra.as_ref().unwrap()["npmCache"]["expires"]
        .as_str()
        .unwrap()
        .parse::<chrono::DateTime<Utc>>()
        .unwrap();
    services.add_task("task-1", task);

    let ns = namespace();
    put(&services, &put_request(&ns, ManifestPolicy::Verbatim))
        .await
        .unwrap();

    let requests = services.artifact_requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].storage_type, "s3");
    assert_eq!(requests[0].content_type, "application/x-tar");
    assert_eq!(requests[0].expires, expires);

    let key = fingerprint(MANIFEST, &ns, &signature());
    assert_eq!(services.entry(&key).unwrap().expires, expires);
}

#[tokio::test]
async fn second_put_is_a_no_op() {
    let services = services_with(MANIFEST);
    let request = put_request(&namespace(), ManifestPolicy::Verbatim);

    put(&services, &request).await.unwrap();
    let again = put(&services, &request).await.unwrap();

    assert!(matches!(again, PutOutcome::AlreadyCached { ref task_id, .. } if task_id == "task-1"));
    assert_eq!(services.creates(), 1);
    assert_eq!(services.uploads(), 1);
    assert_eq!(services.inserts(), 1);
}

#[tokio::test]
async fn invalid_task_uploads_nothing() {
    let services = FakeServices::new();
    services.add_task("task-1", Task::default());

    let err = put(&services, &put_request(&namespace(), ManifestPolicy::Verbatim))
        .await
        .unwrap_err();

    assert!(matches!(err, NpmCacheError::Validation { .. }));
    assert_eq!(services.creates(), 0);
    assert_eq!(services.inserts(), 0);
}

#[tokio::test]
async fn expired_task_uploads_nothing() {
    let services = FakeServices::new();
    services.add_task(
        "task-1",
        Task {
            metadata: None,
            extra: Some(json!({
                "npmCache": {
                    "url": MANIFEST_URL,
                    "expires": (Utc::now() - Duration::hours(1)).to_rfc3339(),
                }
            })),
        },
    );
    services.add_blob(MANIFEST_URL, MANIFEST.as_bytes());

    let err = put(&services, &put_request(&namespace(), ManifestPolicy::Verbatim))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("not in the future"));
    assert_eq!(services.creates(), 0);
}

#[tokio::test]
async fn unreachable_manifest_registers_nothing() {
    let services = FakeServices::new();
    services.add_task("task-1", caching_task("mem://manifests/missing.json"));

    let err = put(&services, &put_request(&namespace(), ManifestPolicy::Verbatim))
        .await
        .unwrap_err();

    assert!(matches!(err, NpmCacheError::DownloadFailed { .. }));
    assert_eq!(services.inserts(), 0);
}

#[tokio::test]
async fn miss_installs_locally() {
    let services = FakeServices::new();
    let ns = namespace();
    let dir = TempDir::new().unwrap();
    let request = get_request(dir.path(), MANIFEST, &ns);

    let outcome = get(&services, &request).await.unwrap();

    assert_eq!(
        outcome,
        GetOutcome::Installed {
            key: fingerprint(MANIFEST, &ns, &signature()),
        }
    );
    assert!(request.target.join("node_modules/debug").is_dir());
    assert!(request.target.join("install.log").exists());
    assert_eq!(services.inserts(), 0);
}

#[tokio::test]
async fn miss_without_fallback_fails() {
    let services = FakeServices::new();
    let dir = TempDir::new().unwrap();
    let mut request = get_request(dir.path(), MANIFEST, &namespace());
    request.fallback_install = false;

    let err = get(&services, &request).await.unwrap_err();

    assert!(matches!(err, NpmCacheError::CacheMiss(_)));
    assert!(!request.target.join("node_modules").exists());
}

#[tokio::test]
async fn post_install_runs_after_extract() {
    let services = services_with(MANIFEST);
    let ns = namespace();
    put(&services, &put_request(&ns, ManifestPolicy::Verbatim))
        .await
        .unwrap();

    let dir = TempDir::new().unwrap();
    let mut request = get_request(dir.path(), MANIFEST, &ns);
    request.post_install = true;

    let outcome = get(&services, &request).await.unwrap();

    assert!(matches!(outcome, GetOutcome::Extracted { post_installed: true, .. }));
    assert!(request.target.join("install.log").exists());
}

#[tokio::test]
async fn different_manifest_misses() {
    let services = services_with(MANIFEST);
    let ns = namespace();
    put(&services, &put_request(&ns, ManifestPolicy::Verbatim))
        .await
        .unwrap();

    let dir = TempDir::new().unwrap();
    let mut request = get_request(
        dir.path(),
        r#"{"name":"app","dependencies":{"debug":"^4.1.0"}}"#,
        &ns,
    );
    request.fallback_install = false;

    let err = get(&services, &request).await.unwrap_err();
    assert!(matches!(err, NpmCacheError::CacheMiss(_)));
}

#[tokio::test]
async fn stripped_local_deps_share_a_key() {
    let with_local =
        r#"{"name":"app","dependencies":{"debug":"^4.0.0","shared":"file:../shared"}}"#;
    let services = services_with(with_local);
    let ns = namespace();

    let outcome = put(&services, &put_request(&ns, ManifestPolicy::StripLocalPaths))
        .await
        .unwrap();
    let PutOutcome::Published { key } = outcome else {
        panic!("expected a fresh publication");
    };
    assert_ne!(key, fingerprint(with_local, &ns, &signature()));

    let dir = TempDir::new().unwrap();
    let mut request = get_request(dir.path(), with_local, &ns);
    request.policy = ManifestPolicy::StripLocalPaths;

    let outcome = get(&services, &request).await.unwrap();
    assert!(matches!(outcome, GetOutcome::Extracted { key: ref k, .. } if *k == key));

    let installed = fs::read_to_string(request.target.join("node_modules/debug/package.json")).unwrap();
    assert!(!installed.contains("file:../shared"));
    assert!(installed.contains("debug"));
}

const POPULATE: &str = "mkdir -p node_modules/debug && cp package.json node_modules/debug/";

#[tokio::test]
async fn miss_then_put_then_hit() {
    let services = services_with(MANIFEST);
    let ns = namespace();
    let dir = TempDir::new().unwrap();

    let mut request = get_request(dir.path(), MANIFEST, &ns);
    request.fallback_install = false;
    let err = get(&services, &request).await.unwrap_err();
    assert!(matches!(err, NpmCacheError::CacheMiss(_)));

    put(&services, &put_request(&ns, ManifestPolicy::Verbatim))
        .await
        .unwrap();

    let outcome = get(&services, &request).await.unwrap();
    assert!(matches!(outcome, GetOutcome::Extracted { ref task_id, .. } if task_id == "task-1"));
    assert!(request.target.join("node_modules/debug/package.json").is_file());
}

#[tokio::test]
async fn upload_completes_before_registration() {
    let services = services_with(MANIFEST);

    put(&services, &put_request(&namespace(), ManifestPolicy::Verbatim))
        .await
        .unwrap();

    assert_eq!(
        services.calls(),
        vec!["get_task", "fetch_text", "find_task", "create_artifact", "upload", "insert_task"]
    );
}

#[tokio::test]
async fn rejected_artifact_creation_registers_nothing() {
    let services = services_with(MANIFEST);
    services.fail_create();
    let scratch = TempDir::new().unwrap();
    let log = scratch.path().join("cwd");

    let err = put_with(
        &services,
        &put_request(&namespace(), ManifestPolicy::Verbatim),
        &recording_npm(&log, POPULATE),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, NpmCacheError::UploadFailed(_)));
    assert_eq!(services.uploads(), 0);
    assert_eq!(services.inserts(), 0);
    assert!(!recorded_workspace(&log).exists());
}

#[tokio::test]
async fn rejected_upload_registers_nothing() {
    let services = services_with(MANIFEST);
    services.fail_upload();
    let scratch = TempDir::new().unwrap();
    let log = scratch.path().join("cwd");

    let err = put_with(
        &services,
        &put_request(&namespace(), ManifestPolicy::Verbatim),
        &recording_npm(&log, POPULATE),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, NpmCacheError::UploadFailed(_)));
    assert_eq!(services.creates(), 1);
    assert_eq!(services.inserts(), 0);
    assert!(!recorded_workspace(&log).exists());
}

#[tokio::test]
async fn failed_install_registers_nothing() {
    let services = services_with(MANIFEST);
    let scratch = TempDir::new().unwrap();
    let log = scratch.path().join("cwd");

    let err = put_with(
        &services,
        &put_request(&namespace(), ManifestPolicy::Verbatim),
        &recording_npm(&log, "echo 'npm ERR! code E404' >&2; exit 1"),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, NpmCacheError::InstallFailed { code: 1, .. }));
    assert_eq!(services.creates(), 0);
    assert_eq!(services.inserts(), 0);
    assert!(!recorded_workspace(&log).exists());
}

#[tokio::test]
async fn empty_install_registers_nothing() {
    let services = services_with(MANIFEST);
    let scratch = TempDir::new().unwrap();
    let log = scratch.path().join("cwd");

    let err = put_with(
        &services,
        &put_request(&namespace(), ManifestPolicy::Verbatim),
        &recording_npm(&log, "true"),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, NpmCacheError::NothingToExport(_)));
    assert_eq!(services.creates(), 0);
    assert_eq!(services.inserts(), 0);
    assert!(!recorded_workspace(&log).exists());
}

#[tokio::test]
async fn failed_upload_leaves_key_unregistered() {
    let services = services_with(MANIFEST);
    let ns = namespace();
    services.fail_upload();

    assert!(put(&services, &put_request(&ns, ManifestPolicy::Verbatim)).await.is_err());
    assert!(services.entry(&fingerprint(MANIFEST, &ns, &signature())).is_none());
}
