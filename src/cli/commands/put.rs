//! Put command - install, upload and register the modules of a task

use crate::cache::{Installer, ManifestPolicy, PlatformSignature};
use crate::cli::args::PutCli;
use crate::cli::with_deadline;
use crate::config::Config;
use crate::error::NpmCacheResult;
use crate::pipeline::{PutOutcome, PutPipeline, PutRequest};
use crate::remote::create_services;
use console::style;

/// Execute the put command
pub async fn execute(args: PutCli, config: &Config) -> NpmCacheResult<()> {
    let signature = PlatformSignature::detect(&config.install.node_command).await?;

    let installer = Installer::from_config(&config.install);
    let services = create_services(config, args.proxy);

    let request = PutRequest {
        task_id: args.task_id,
        run_id: args.run_id,
        namespace: args
            .namespace
            .unwrap_or_else(|| config.cache.namespace.clone()),
        policy: ManifestPolicy::from_flag(args.strip_local_deps || config.cache.strip_local_deps),
    };

    let pipeline = PutPipeline::new(
        &services.queue,
        &services.index,
        &services.transport,
        &installer,
        &signature,
    );

    match with_deadline(config.general.timeout_secs, pipeline.run(&request)).await? {
        PutOutcome::AlreadyCached { key, task_id } => {
            println!(
                "{} {} is already cached by task {}",
                style("✓").green(),
                style(&key).cyan(),
                style(&task_id).cyan()
            );
        }
        PutOutcome::Published { key } => {
            println!(
                "{} Cached node_modules of task {} as {}",
                style("✓").green(),
                style(&request.task_id).cyan(),
                style(&key).cyan()
            );
        }
    }

    Ok(())
}
