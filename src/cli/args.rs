//! CLI argument definitions using clap derive

use clap::{ArgAction, Args, Parser};
use std::path::PathBuf;

/// Options shared by both binaries
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, env = "NPM_CACHE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// npm-cache - populate the node_modules cache for a task
///
/// Installs the dependencies named by the task's extra.npmCache.url
/// manifest, uploads them as an artifact of the task and registers them
/// in the index. Does nothing if the manifest is already cached.
#[derive(Parser, Debug)]
#[command(name = "npm-cache")]
#[command(author, version, about, long_about = None)]
pub struct PutCli {
    /// The task to run caching logic for
    #[arg(long)]
    pub task_id: String,

    /// Run id for the particular task
    #[arg(long, default_value_t = 0)]
    pub run_id: u32,

    /// Index namespace to use [default: npm_cache]
    #[arg(long)]
    pub namespace: Option<String>,

    /// Reach the queue and index through the worker's service proxy
    #[arg(long)]
    pub proxy: bool,

    /// Drop local path dependencies (file:, ./, ../, /, ~/) before
    /// hashing and installing
    #[arg(long)]
    pub strip_local_deps: bool,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// npm-cache-get - restore node_modules from the cache
///
/// Looks up the manifest in the index and extracts the cached
/// node_modules on a hit; installs locally on a miss.
#[derive(Parser, Debug)]
#[command(name = "npm-cache-get")]
#[command(author, version, about, long_about = None)]
pub struct GetCli {
    /// Path to package.json
    #[arg(value_parser = parse_existing_path)]
    pub package: PathBuf,

    /// Index namespace to use [default: npm_cache]
    #[arg(long)]
    pub namespace: Option<String>,

    /// Location where to create node_modules (defaults to current directory)
    #[arg(long)]
    pub target: Option<PathBuf>,

    /// Skip the install pass after extracting cached modules
    #[arg(long)]
    pub no_install: bool,

    /// Fail on a cache miss instead of installing locally
    #[arg(long)]
    pub no_fallback: bool,

    /// Reach the queue and index through the worker's service proxy
    #[arg(long)]
    pub proxy: bool,

    /// Drop local path dependencies before hashing and installing
    #[arg(long)]
    pub strip_local_deps: bool,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Resolve a path and require that it exists
fn parse_existing_path(s: &str) -> Result<PathBuf, String> {
    let path = std::path::absolute(s).map_err(|e| format!("invalid path \"{}\": {}", s, e))?;
    if !path.exists() {
        return Err(format!("\"{}\" cannot be found", path.display()));
    }
    Ok(path)
}
