//! npm-cache-get - restore node_modules for a local package.json

use clap::Parser;
use npm_cache::cli::{self, GetCli};
use npm_cache::error::NpmCacheResult;
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::finish(cli::block_on(run()))
}

async fn run() -> NpmCacheResult<()> {
    let args = GetCli::parse();

    let config = cli::load_config(&args.global).await?;
    cli::init_logging(args.global.verbose, &config.general.log_format);

    cli::commands::get(args, &config).await
}
