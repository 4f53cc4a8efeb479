//! edge-deploy - rolling restarts behind nginx
//!
//! This is the composition root that wires together all the components.

use anyhow::Context;
use clap::Parser;
use edge_deploy::adapters::inbound::{Cli, Commands};
use edge_deploy::config::{descriptor_path, load_config};
use edge_deploy::{
    NginxUpstreamPool, ReloadClassifier, RollingRestartService, ShellCommandRunner,
    ShellProcessController, ShellReloadController, UpstreamPool,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help / --version are not failures
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    // Setup logging
    let level = if cli.verbose || std::env::var_os("DEBUG").is_some() {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("[deploy error] {:#}, exit", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let descriptor = descriptor_path(cli.file);
    let cfg = load_config(&descriptor)
        .with_context(|| format!("deployment descriptor {}", descriptor.display()))?;

    tracing::info!(
        instances = cfg.instances.len(),
        proxy_config = %cfg.proxy_config_path.display(),
        "starting edge-deploy"
    );

    // ===== COMPOSITION ROOT =====

    // 1. Outbound adapters
    let runner = ShellCommandRunner::new();
    let pool = Arc::new(NginxUpstreamPool::new(
        cfg.proxy_config_path.clone(),
        cfg.upstream_name.clone(),
        cfg.pool_concurrency,
    ));
    let processes = Arc::new(ShellProcessController::new(
        runner.clone(),
        cfg.backend_start_command.clone(),
        cfg.backend_stop_command.clone(),
    ));
    let proxy = Arc::new(ShellReloadController::new(
        runner,
        cfg.reload_command.clone(),
        cfg.start_command.clone(),
    ));

    // 2. Application service
    let service = RollingRestartService::new(
        pool.clone(),
        processes,
        proxy,
        ReloadClassifier::new(cfg.not_running_signature.clone()),
        cfg.instances.clone(),
        cfg.wait_stop_time(),
    );

    // 3. Dispatch
    match cli.command {
        Commands::Start { args } => {
            let report = service.start(&args).await?;
            tracing::info!(
                bootstrapped = report.bootstrapped,
                restarted = report.restarted,
                "deploy finished"
            );
        }
        Commands::Stop => service.stop_all().await,
        Commands::Backends => {
            let backends = pool.list_backends().await?;
            println!("{}", serde_json::to_string_pretty(&backends)?);
        }
    }

    Ok(())
}
