//! Command-line front ends for the put and get binaries

pub mod args;
pub mod commands;

pub use args::{GetCli, GlobalArgs, PutCli};

use crate::config::{Config, ConfigManager};
use crate::error::{NpmCacheError, NpmCacheResult};
use console::style;
use std::future::Future;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Load the configuration named by `--config`, or the default file
pub async fn load_config(global: &GlobalArgs) -> NpmCacheResult<Config> {
    ConfigManager::locate(global.config.clone()).load().await
}

/// Initialize logging: 0 = warn, 1 = info, 2+ = debug
pub fn init_logging(verbose: u8, log_format: &str) {
    let filter = match verbose {
        0 => EnvFilter::new("npm_cache=warn"),
        1 => EnvFilter::new("npm_cache=info"),
        _ => EnvFilter::new("npm_cache=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}

/// Bound a run by the configured deadline (0 = unbounded).
///
/// On expiry the run is dropped: a running installer is killed and
/// workspaces are removed. An HTTP call already on the blocking pool
/// cannot be cancelled and runs on until `http.timeout_secs`; the
/// binaries shut their runtime down without waiting for it.
pub async fn with_deadline<T, F>(secs: u64, run: F) -> NpmCacheResult<T>
where
    F: Future<Output = NpmCacheResult<T>>,
{
    if secs == 0 {
        return run.await;
    }

    tokio::time::timeout(Duration::from_secs(secs), run)
        .await
        .map_err(|_| NpmCacheError::Timeout(secs))?
}

/// Drive a run to completion on a fresh multi-threaded runtime.
///
/// Shutdown does not wait for blocking-pool work a timed-out run left
/// behind.
pub fn block_on<F>(run: F) -> NpmCacheResult<()>
where
    F: Future<Output = NpmCacheResult<()>>,
{
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| NpmCacheError::Internal(format!("starting runtime: {}", e)))?;
    let result = runtime.block_on(run);
    runtime.shutdown_background();
    result
}

/// Print the error (if any) and map the result to an exit code
pub fn finish(result: NpmCacheResult<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}
