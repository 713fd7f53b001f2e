//! npm-cache - populate the cache from a caching task

use clap::Parser;
use npm_cache::cli::{self, PutCli};
use npm_cache::error::NpmCacheResult;
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::finish(cli::block_on(run()))
}

async fn run() -> NpmCacheResult<()> {
    let args = PutCli::parse();

    let config = cli::load_config(&args.global).await?;
    cli::init_logging(args.global.verbose, &config.general.log_format);

    cli::commands::put(args, &config).await
}
