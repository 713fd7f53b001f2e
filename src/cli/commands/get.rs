//! Get command - restore node_modules for a local manifest

use crate::cache::{Installer, ManifestPolicy, PlatformSignature};
use crate::cli::args::GetCli;
use crate::cli::with_deadline;
use crate::config::Config;
use crate::error::{NpmCacheError, NpmCacheResult};
use crate::pipeline::{GetOutcome, GetPipeline, GetRequest};
use crate::remote::create_services;
use console::style;

/// Execute the get command
pub async fn execute(args: GetCli, config: &Config) -> NpmCacheResult<()> {
    let target = match args.target {
        Some(path) => path,
        None => std::env::current_dir()
            .map_err(|e| NpmCacheError::io("getting current directory", e))?,
    };

    let signature = PlatformSignature::detect(&config.install.node_command).await?;

    let installer = Installer::from_config(&config.install);
    let services = create_services(config, args.proxy);

    let request = GetRequest {
        manifest_path: args.package,
        namespace: args
            .namespace
            .unwrap_or_else(|| config.cache.namespace.clone()),
        target,
        post_install: !args.no_install,
        fallback_install: !args.no_fallback,
        policy: ManifestPolicy::from_flag(args.strip_local_deps || config.cache.strip_local_deps),
    };

    let pipeline = GetPipeline::new(
        &services.queue,
        &services.index,
        &services.transport,
        &installer,
        &signature,
    );

    match with_deadline(config.general.timeout_secs, pipeline.run(&request)).await? {
        GetOutcome::Extracted { key, task_id, .. } => {
            println!(
                "{} Restored {} from task {} into {}",
                style("✓").green(),
                style(&key).cyan(),
                style(&task_id).cyan(),
                request.target.display()
            );
        }
        GetOutcome::Installed { key } => {
            println!(
                "{} Cache miss for {}, installed with {}",
                style("!").yellow(),
                style(&key).cyan(),
                installer.command_line()
            );
        }
    }

    Ok(())
}
