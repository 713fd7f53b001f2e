//! Integration tests for npm-cache

mod fakes;
mod pipeline_tests;

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn put() -> Command {
        cargo_bin_cmd!("npm-cache")
    }

    fn get() -> Command {
        cargo_bin_cmd!("npm-cache-get")
    }

    #[test]
    fn put_help_displays() {
        put()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("--task-id"))
            .stdout(predicate::str::contains("--namespace"));
    }

    #[test]
    fn put_version_displays() {
        put()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("npm-cache"));
    }

    #[test]
    fn put_requires_task_id() {
        put()
            .assert()
            .failure()
            .stderr(predicate::str::contains("--task-id"));
    }

    #[test]
    fn get_help_displays() {
        get()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("--no-install"))
            .stdout(predicate::str::contains("--target"));
    }

    #[test]
    fn get_missing_manifest() {
        get()
            .arg("/definitely/not/here/package.json")
            .assert()
            .failure()
            .stderr(predicate::str::contains("cannot be found"));
    }

    #[test]
    fn get_invalid_config() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("package.json");
        let config = dir.path().join("config.toml");
        fs::write(&manifest, "{}").unwrap();
        fs::write(&config, "[general\ntimeout_secs = ").unwrap();

        get()
            .arg(&manifest)
            .arg("--config")
            .arg(&config)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn get_config_from_env() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("package.json");
        let config = dir.path().join("config.toml");
        fs::write(&manifest, "{}").unwrap();
        fs::write(&config, "not valid toml [").unwrap();

        get()
            .arg(&manifest)
            .env("NPM_CACHE_CONFIG", &config)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }
}
